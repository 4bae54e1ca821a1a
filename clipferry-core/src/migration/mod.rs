mod engine;
mod progress;
mod result;
mod validate;

pub use engine::MigrationEngine;
pub use progress::MigrationProgress;
pub use result::{MigrationItemFailure, MigrationItemSuccess, MigrationRunResult};
pub use validate::duration_tolerance;

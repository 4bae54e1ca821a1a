use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationItemSuccess {
    pub asset_id: String,
    pub destination: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationItemFailure {
    pub asset_id: String,
    pub message: String,
}

/// Terminal outcome of one migration run. Successes and failures each keep
/// processing order; together they cover every requested ID exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationRunResult {
    pub successes: Vec<MigrationItemSuccess>,
    pub failures: Vec<MigrationItemFailure>,
}

impl MigrationRunResult {
    /// One failure entry per requested ID, all with the same message.
    /// Used when a run-level fault stops the run before any item is touched.
    pub fn all_failed(asset_ids: &[String], message: &str) -> Self {
        Self {
            successes: Vec::new(),
            failures: asset_ids
                .iter()
                .map(|id| MigrationItemFailure {
                    asset_id: id.clone(),
                    message: message.to_string(),
                })
                .collect(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn total_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// IDs eligible for original-deletion after this run
    pub fn success_ids(&self) -> Vec<String> {
        self.successes.iter().map(|s| s.asset_id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_covers_every_id() {
        let ids = vec!["a".to_string(), "b".to_string()];
        let result = MigrationRunResult::all_failed(&ids, "folder gone");
        assert_eq!(result.success_count(), 0);
        assert_eq!(result.failure_count(), 2);
        assert!(result.failures.iter().all(|f| f.message == "folder gone"));
    }

    #[test]
    fn test_success_ids_in_processing_order() {
        let result = MigrationRunResult {
            successes: vec![
                MigrationItemSuccess {
                    asset_id: "x".into(),
                    destination: PathBuf::from("/dest/x.mov"),
                    bytes: 10,
                },
                MigrationItemSuccess {
                    asset_id: "y".into(),
                    destination: PathBuf::from("/dest/y.mov"),
                    bytes: 20,
                },
            ],
            failures: Vec::new(),
        };
        assert_eq!(result.success_ids(), ["x", "y"]);
        assert_eq!(result.total_count(), 2);
    }
}

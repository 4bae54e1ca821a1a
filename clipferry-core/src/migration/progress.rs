/// One snapshot on the progress stream of a migration run.
///
/// `is_indeterminate` is true while an item's transfer is underway and its
/// duration cannot be predicted, false once `completed` ticked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationProgress {
    pub completed: usize,
    pub total: usize,
    pub current_filename: Option<String>,
    pub is_indeterminate: bool,
}

impl MigrationProgress {
    pub fn starting(total: usize) -> Self {
        Self {
            completed: 0,
            total,
            current_filename: None,
            is_indeterminate: false,
        }
    }

    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction() {
        let progress = MigrationProgress {
            completed: 3,
            total: 4,
            current_filename: None,
            is_indeterminate: false,
        };
        assert_eq!(progress.fraction(), 0.75);
    }

    #[test]
    fn test_fraction_with_zero_total() {
        assert_eq!(MigrationProgress::starting(0).fraction(), 0.0);
    }
}

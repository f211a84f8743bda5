//! Path helpers for configured directories.

use std::path::{Path, PathBuf};

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a leading `~`, or when no home directory can be determined,
/// are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_unchanged() {
        assert_eq!(
            expand_home(Path::new("/var/lib/airflow")),
            PathBuf::from("/var/lib/airflow")
        );
    }

    #[test]
    fn test_relative_path_unchanged() {
        assert_eq!(expand_home(Path::new("dags")), PathBuf::from("dags"));
    }

    #[test]
    fn test_tilde_expands() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/airflow/dags")),
                home.join("airflow/dags")
            );
            assert_eq!(expand_home(Path::new("~")), home);
        }
    }

    #[test]
    fn test_tilde_user_form_unchanged() {
        assert_eq!(
            expand_home(Path::new("~other/dags")),
            PathBuf::from("~other/dags")
        );
    }
}

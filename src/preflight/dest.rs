//! Destination folder check.

use super::Check;
use std::path::Path;

/// The destination exists, or can be created, and accepts new files.
pub async fn check(dest: &Path) -> Check {
    if let Err(e) = tokio::fs::create_dir_all(dest).await {
        return Check::Failed {
            reason: format!("cannot create {} ({})", dest.display(), e),
            hint: "Pass a different folder with --dest",
        };
    }

    let marker = dest.join(format!(".jellyfetch.{}.tmp", uuid::Uuid::new_v4().simple()));
    match tokio::fs::write(&marker, b"").await {
        Ok(()) => {
            if let Err(e) = tokio::fs::remove_file(&marker).await {
                tracing::warn!("Failed to remove {:?}: {}", marker, e);
            }
            Check::Passed(format!("{} is writable", dest.display()))
        }
        Err(e) => Check::Failed {
            reason: format!("{} is not writable ({})", dest.display(), e),
            hint: "Check folder permissions or pass a different folder with --dest",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_writable_destination_passes() {
        let temp_dir = TempDir::new().unwrap();
        let result = check(&temp_dir.path().join("new")).await;
        assert!(result.is_passed());
        assert!(temp_dir.path().join("new").is_dir());
        assert_eq!(std::fs::read_dir(temp_dir.path().join("new")).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_destination_under_a_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("file"), "x").unwrap();
        let result = check(&temp_dir.path().join("file/sub")).await;
        assert!(matches!(result, Check::Failed { hint, .. } if hint.contains("--dest")));
    }
}

//! Local files the server pushes to or pulls from the client

use std::path::{Component, Path, PathBuf};

use log::info;
use tokio::fs;

use crate::error::ClientError;

/// Client-side file tree. Every server-supplied path is taken relative to
/// the root and may not climb out of it.
#[derive(Debug, Clone)]
pub struct LocalFiles {
    root: PathBuf,
}

impl LocalFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &str) -> Result<PathBuf, ClientError> {
        let relative = Path::new(path);
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(ClientError::UnsafePath(relative.to_path_buf()));
        }
        Ok(self.root.join(relative))
    }

    /// Writes `content` at `path`, creating parent directories.
    pub async fn save(&self, path: &str, content: &str) -> Result<PathBuf, ClientError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, content).await?;
        info!("Saved {}", target.display());
        Ok(target)
    }

    pub async fn read(&self, path: &str) -> Result<String, ClientError> {
        let target = self.resolve(path)?;
        Ok(fs::read_to_string(target).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_save_then_read() {
        let dir = tempdir().unwrap();
        let files = LocalFiles::new(dir.path());

        let saved = files
            .save("games/bob/ooxx/client.py", "print('hi')\n")
            .await
            .unwrap();
        assert_eq!(saved, dir.path().join("games/bob/ooxx/client.py"));
        assert_eq!(
            files.read("games/bob/ooxx/client.py").await.unwrap(),
            "print('hi')\n"
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempdir().unwrap();
        let files = LocalFiles::new(dir.path());
        assert!(matches!(
            files.read("games/none/server.py").await,
            Err(ClientError::Io(_))
        ));
    }

    #[test]
    fn test_paths_stay_under_root() {
        let files = LocalFiles::new("/srv/client");
        assert_eq!(
            files.resolve("./games/a/client.py").unwrap(),
            PathBuf::from("/srv/client/./games/a/client.py")
        );
        assert!(matches!(
            files.resolve("../secret"),
            Err(ClientError::UnsafePath(_))
        ));
        assert!(matches!(
            files.resolve("/etc/passwd"),
            Err(ClientError::UnsafePath(_))
        ));
        assert!(matches!(
            files.resolve("games/../../x"),
            Err(ClientError::UnsafePath(_))
        ));
    }
}

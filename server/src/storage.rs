//! Server-side game file storage
//!
//! Every game owns one directory under the games root holding its server
//! program, client program and description. Uploads are written to a
//! staging directory unique to the upload, and only swapped into place once
//! the catalog has accepted the game. The directory a swap replaces is kept
//! until the swap is committed, so a failed catalog write can restore it.

use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use shared::{CLIENT_PROGRAM, DESCRIPTION_FILE, SERVER_PROGRAM};
use tokio::fs;

use crate::transfer::GameBundle;

#[derive(Debug, Clone)]
pub struct GameFiles {
    root: PathBuf,
}

/// Files of one upload, written aside and invisible to readers.
#[derive(Debug)]
#[must_use = "a staged game must be published or discarded"]
pub struct StagedGame {
    name: String,
    dir: PathBuf,
}

/// A swapped-in game whose previous files are still kept aside.
#[derive(Debug)]
#[must_use = "a published game must be committed or rolled back"]
pub struct Published {
    target: PathBuf,
    retired: Option<PathBuf>,
}

impl GameFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn game_dir(&self, game: &str) -> PathBuf {
        self.root.join(game)
    }

    pub fn server_program(&self, game: &str) -> PathBuf {
        self.game_dir(game).join(SERVER_PROGRAM)
    }

    pub fn exists(&self, game: &str) -> bool {
        self.game_dir(game).is_dir()
    }

    /// The client program players download, if present and readable.
    pub async fn read_client(&self, game: &str) -> Option<String> {
        let path = self.game_dir(game).join(CLIENT_PROGRAM);
        match fs::read_to_string(&path).await {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Writes all three files of `bundle` into a fresh staging directory.
    pub async fn stage(&self, bundle: &GameBundle) -> io::Result<StagedGame> {
        fs::create_dir_all(&self.root).await?;
        let dir = self.aside(&bundle.name, "staging");
        fs::create_dir(&dir).await?;

        let staged = StagedGame {
            name: bundle.name.clone(),
            dir,
        };
        let written = async {
            fs::write(staged.dir.join(SERVER_PROGRAM), &bundle.server).await?;
            fs::write(staged.dir.join(CLIENT_PROGRAM), &bundle.client).await?;
            fs::write(staged.dir.join(DESCRIPTION_FILE), &bundle.description).await
        };
        if let Err(e) = written.await {
            self.discard(staged).await;
            return Err(e);
        }
        Ok(staged)
    }

    /// Drops staged files that will not be published.
    pub async fn discard(&self, staged: StagedGame) {
        if let Err(e) = remove_dir_if_present(&staged.dir).await {
            warn!("Failed to discard {}: {}", staged.dir.display(), e);
        }
    }

    /// Swaps staged files into the game's directory. Whatever was there
    /// before is kept aside until the result is committed or rolled back.
    pub async fn publish(&self, staged: StagedGame) -> io::Result<Published> {
        let target = self.game_dir(&staged.name);
        let retired = match fs::metadata(&target).await {
            Ok(_) => {
                let retired = self.aside(&staged.name, "retired");
                if let Err(e) = fs::rename(&target, &retired).await {
                    self.discard(staged).await;
                    return Err(e);
                }
                Some(retired)
            }
            Err(_) => None,
        };

        if let Err(e) = fs::rename(&staged.dir, &target).await {
            let published = Published { target, retired };
            if let Err(restore) = published.rollback().await {
                warn!("Failed to restore {}: {}", staged.name, restore);
            }
            self.discard(staged).await;
            return Err(e);
        }

        debug!("Installed {} into {}", staged.name, target.display());
        Ok(Published { target, retired })
    }

    fn aside(&self, game: &str, purpose: &str) -> PathBuf {
        self.root
            .join(format!(".{}.{:08x}.{}", game, rand::random::<u32>(), purpose))
    }
}

impl Published {
    /// Deletes the replaced files.
    pub async fn commit(self) {
        if let Some(retired) = &self.retired {
            if let Err(e) = remove_dir_if_present(retired).await {
                warn!("Failed to clean up {}: {}", retired.display(), e);
            }
        }
    }

    /// Puts the replaced files back, or removes the game directory when it
    /// did not exist before.
    pub async fn rollback(self) -> io::Result<()> {
        remove_dir_if_present(&self.target).await?;
        if let Some(retired) = &self.retired {
            fs::rename(retired, &self.target).await?;
        }
        debug!("Rolled back {}", self.target.display());
        Ok(())
    }
}

async fn remove_dir_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(version: &str) -> GameBundle {
        GameBundle {
            name: "ooxx".into(),
            server: format!("# server {}", version),
            client: format!("# client {}", version),
            description: format!("tic tac toe {}", version),
        }
    }

    fn entries(dir: &Path) -> Vec<std::ffi::OsString> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect()
    }

    async fn install(files: &GameFiles, bundle: &GameBundle) {
        let staged = files.stage(bundle).await.unwrap();
        files.publish(staged).await.unwrap().commit().await;
    }

    #[tokio::test]
    async fn test_publish_writes_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = GameFiles::new(dir.path().join("games"));

        install(&files, &bundle("v1")).await;

        assert!(files.exists("ooxx"));
        assert_eq!(files.read_client("ooxx").await.as_deref(), Some("# client v1"));
        let description = std::fs::read_to_string(files.game_dir("ooxx").join(DESCRIPTION_FILE)).unwrap();
        assert_eq!(description, "tic tac toe v1");
        assert!(files.server_program("ooxx").is_file());
    }

    #[tokio::test]
    async fn test_staged_files_stay_invisible() {
        let dir = tempfile::tempdir().unwrap();
        let files = GameFiles::new(dir.path());

        let staged = files.stage(&bundle("v1")).await.unwrap();
        assert!(!files.exists("ooxx"));
        assert!(files.read_client("ooxx").await.is_none());

        files.discard(staged).await;
        assert!(entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_stages_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let files = GameFiles::new(dir.path());
        install(&files, &bundle("v1")).await;

        // A second upload of the same name is staged and then abandoned.
        let loser = files.stage(&bundle("v2")).await.unwrap();
        let winner = files.stage(&bundle("v3")).await.unwrap();
        files.discard(loser).await;
        files.publish(winner).await.unwrap().commit().await;

        assert_eq!(files.read_client("ooxx").await.as_deref(), Some("# client v3"));
        assert_eq!(entries(dir.path()), vec![std::ffi::OsString::from("ooxx")]);
    }

    #[tokio::test]
    async fn test_commit_replaces_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = GameFiles::new(dir.path());

        install(&files, &bundle("v1")).await;
        install(&files, &bundle("v2")).await;

        assert_eq!(files.read_client("ooxx").await.as_deref(), Some("# client v2"));
        assert_eq!(entries(dir.path()), vec![std::ffi::OsString::from("ooxx")]);
    }

    #[tokio::test]
    async fn test_rollback_restores_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let files = GameFiles::new(dir.path());
        install(&files, &bundle("v1")).await;

        let staged = files.stage(&bundle("v2")).await.unwrap();
        let published = files.publish(staged).await.unwrap();
        assert_eq!(files.read_client("ooxx").await.as_deref(), Some("# client v2"));

        published.rollback().await.unwrap();
        assert_eq!(files.read_client("ooxx").await.as_deref(), Some("# client v1"));
        assert_eq!(entries(dir.path()), vec![std::ffi::OsString::from("ooxx")]);
    }

    #[tokio::test]
    async fn test_rollback_of_new_game_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let files = GameFiles::new(dir.path());

        let staged = files.stage(&bundle("v1")).await.unwrap();
        files.publish(staged).await.unwrap().rollback().await.unwrap();

        assert!(!files.exists("ooxx"));
        assert!(entries(dir.path()).is_empty());
    }
}

//! Starting the local game client program

use std::io;
use std::path::Path;

use log::info;
use tokio::process::{Child, Command};

/// Runs `<command...> <program> <host> <port>` and lets it outlive the
/// handle, so a match keeps running while the menu session continues.
#[derive(Debug, Clone)]
pub struct GameRunner {
    command: Vec<String>,
}

impl GameRunner {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn launch(&self, program: &Path, host: &str, port: u16) -> io::Result<Child> {
        let mut command = match self.command.split_first() {
            Some((interpreter, prefix)) => {
                let mut command = Command::new(interpreter);
                command.args(prefix).arg(program);
                command
            }
            None => Command::new(program),
        };
        let child = command.arg(host).arg(port.to_string()).spawn()?;
        info!(
            "Launching game: {} -> {}:{} (pid {:?})",
            program.display(),
            host,
            port,
            child.id()
        );
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_launch_arguments() {
        let runner = GameRunner::new(vec![
            "sh".into(),
            "-c".into(),
            r#"test "$1" = root/games/bob/ooxx/client.py && test "$2" = 10.0.0.5 && test "$3" = 20042"#
                .into(),
            "game".into(),
        ]);
        let mut child = runner
            .launch(Path::new("root/games/bob/ooxx/client.py"), "10.0.0.5", 20042)
            .unwrap();
        assert!(child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = GameRunner::new(Vec::new());
        assert!(runner
            .launch(Path::new("/definitely/not/here"), "127.0.0.1", 1)
            .is_err());
    }
}

//! Launching a game's own server program

use std::io;
use std::path::Path;

use log::info;
use tokio::process::{Child, Command};

/// Runs `<command...> <program> <host> <port>`.
#[derive(Debug, Clone)]
pub struct GameLauncher {
    command: Vec<String>,
}

impl GameLauncher {
    /// An empty `command` executes the program directly.
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    /// Starts the game server. The child is killed if its handle is dropped
    /// before it exits.
    pub fn spawn(&self, program: &Path, host: &str, port: u16) -> io::Result<Child> {
        let mut command = match self.command.split_first() {
            Some((interpreter, prefix)) => {
                let mut command = Command::new(interpreter);
                command.args(prefix).arg(program);
                command
            }
            None => Command::new(program),
        };
        command.arg(host).arg(port.to_string()).kill_on_drop(true);

        let child = command.spawn()?;
        info!(
            "Launched {} on {}:{} (pid {:?})",
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

    fn sh(script: &str) -> GameLauncher {
        GameLauncher::new(vec![
            "sh".into(),
            "-c".into(),
            script.into(),
            "game".into(),
        ])
    }

    #[tokio::test]
    async fn test_passes_program_host_and_port() {
        let launcher = sh(r#"test "$1" = games/ooxx/server.py && test "$2" = 127.0.0.1 && test "$3" = 20001"#);
        let mut child = launcher
            .spawn(Path::new("games/ooxx/server.py"), "127.0.0.1", 20001)
            .unwrap();
        assert!(child.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn test_exit_status_is_reported() {
        let mut child = sh("exit 3")
            .spawn(Path::new("server.py"), "0.0.0.0", 20002)
            .unwrap();
        assert_eq!(child.wait().await.unwrap().code(), Some(3));
    }

    #[tokio::test]
    async fn test_missing_interpreter_fails_to_spawn() {
        let launcher = GameLauncher::new(vec!["/definitely/not/here".into()]);
        assert!(launcher
            .spawn(Path::new("server.py"), "0.0.0.0", 20003)
            .is_err());
    }
}

//! Shared harness: a full platform on ephemeral ports and a scripted client
#![allow(dead_code)]

use server::config::ServerConfig;
use server::network::SessionServer;
use server::store::service::StoreServer;
use server::store::{CatalogStore, Tables};
use shared::framing::{recv_frame, send_frame};
use shared::models::AccountKind;
use shared::protocol::{ClientReply, InputSpec, ServerMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

const STEP_TIMEOUT: Duration = Duration::from_secs(10);

pub const SERVER_PY: &str = "import sys\nprint('serving', sys.argv)\n";
pub const CLIENT_PY: &str = "import sys\nprint('playing', sys.argv)\n";
pub const DESCRIPTION: &str = "Tic tac toe for two\n";

/// Store, player server and developer server sharing one scratch directory.
pub struct Platform {
    pub store: Arc<CatalogStore>,
    pub player_addr: SocketAddr,
    pub developer_addr: SocketAddr,
    pub games_dir: TempDir,
}

impl Platform {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Starts a platform whose session servers use a tweaked configuration.
    pub async fn start_with(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let store_server = StoreServer::bind("127.0.0.1:0", CatalogStore::new())
            .await
            .unwrap();
        let store_addr = store_server.local_addr().unwrap();
        let store = store_server.store();
        tokio::spawn(store_server.run());

        let games_dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig {
            store_addr: store_addr.to_string(),
            bind_host: "127.0.0.1".to_string(),
            game_host: "127.0.0.1".to_string(),
            game_ports: 42000..42200,
            games_dir: games_dir.path().to_path_buf(),
            poll_interval: Duration::from_millis(50),
            page_size: 9,
            // Stands in for a game server that plays one short match.
            launcher: vec![
                "sh".to_string(),
                "-c".to_string(),
                "sleep 1".to_string(),
                "game".to_string(),
            ],
        };
        configure(&mut config);

        let players = SessionServer::bind("127.0.0.1:0", AccountKind::Player, config.clone())
            .await
            .unwrap();
        let player_addr = players.local_addr().unwrap();
        tokio::spawn(players.run());

        let developers = SessionServer::bind("127.0.0.1:0", AccountKind::Developer, config)
            .await
            .unwrap();
        let developer_addr = developers.local_addr().unwrap();
        tokio::spawn(developers.run());

        Self {
            store,
            player_addr,
            developer_addr,
            games_dir,
        }
    }

    pub fn tables(&self) -> Tables {
        self.store.tables()
    }

    pub async fn player(&self) -> Script {
        Script::connect(self.player_addr).await
    }

    pub async fn developer(&self) -> Script {
        Script::connect(self.developer_addr).await
    }

    /// Waits until `check` holds for the catalog tables.
    pub async fn eventually(&self, what: &str, check: impl Fn(&Tables) -> bool) {
        let deadline = Instant::now() + STEP_TIMEOUT;
        while !check(&self.tables()) {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            sleep(Duration::from_millis(20)).await;
        }
    }

    /// Registers and logs in developer `dev`, then publishes `game`.
    pub async fn publish(&self, dev: &str, game: &str) -> Script {
        let mut script = self.developer().await;
        assert_eq!(script.register(dev, "pw").await, "Registration Successful!");
        assert_eq!(script.login(dev, "pw").await, format!("Welcome {}", dev));
        assert_eq!(
            script
                .upload(game, [Some(SERVER_PY), Some(CLIENT_PY), Some(DESCRIPTION)])
                .await,
            "Game uploaded successfully!"
        );
        script
    }

    /// Registers and logs in player `name`.
    pub async fn signed_in_player(&self, name: &str) -> Script {
        let mut script = self.player().await;
        assert_eq!(script.register(name, "pw").await, "Registration Successful!");
        assert_eq!(script.login(name, "pw").await, format!("Welcome {}", name));
        script
    }
}

/// A client that follows a script instead of a keyboard.
pub struct Script {
    stream: TcpStream,
}

impl Script {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    pub async fn next(&mut self) -> ServerMessage {
        timeout(STEP_TIMEOUT, recv_frame(&mut self.stream))
            .await
            .expect("server went silent")
            .unwrap()
            .expect("server closed the connection")
    }

    pub async fn display(&mut self) -> (String, InputSpec) {
        match self.next().await {
            ServerMessage::Display { text, input } => (text, input),
            other => panic!("expected a display, got {:?}", other),
        }
    }

    /// Skips informational displays up to the first display containing
    /// `needle` and returns its text.
    pub async fn wait_for(&mut self, needle: &str) -> String {
        loop {
            let (text, input) = self.display().await;
            if text.contains(needle) {
                return text;
            }
            assert!(
                !input.expects_reply(),
                "prompt {:?} skipped while waiting for {:?}",
                text,
                needle
            );
        }
    }

    pub async fn send(&mut self, reply: &str) {
        send_frame(&mut self.stream, &ClientReply::text(reply))
            .await
            .unwrap();
    }

    /// Answers the pending prompt `needle` with `reply`.
    pub async fn answer(&mut self, needle: &str, reply: &str) -> String {
        let text = self.wait_for(needle).await;
        self.send(reply).await;
        text
    }

    pub async fn expect_closed(&mut self) {
        let end: Option<ServerMessage> = timeout(STEP_TIMEOUT, recv_frame(&mut self.stream))
            .await
            .expect("server went silent")
            .unwrap();
        assert!(end.is_none(), "expected the connection to close");
    }

    async fn credentials(&mut self, menu_choice: &str, name: &str, password: &str) -> String {
        self.answer("1. Login\n2. Register\n3. Exit", menu_choice).await;
        self.answer("Enter Name:", name).await;
        self.answer("Enter Password:", password).await;
        self.display().await.0
    }

    pub async fn register(&mut self, name: &str, password: &str) -> String {
        self.credentials("2", name, password).await
    }

    pub async fn login(&mut self, name: &str, password: &str) -> String {
        self.credentials("1", name, password).await
    }

    /// Answers one upload request, or refuses it for `None`. Returns the
    /// requested path.
    pub async fn provide(&mut self, content: Option<&str>) -> String {
        let path = match self.next().await {
            ServerMessage::Upload { path } => path,
            other => panic!("expected an upload request, got {:?}", other),
        };
        let reply = match content {
            Some(content) => ClientReply::file(content.to_string()),
            None => ClientReply::upload_failed(),
        };
        send_frame(&mut self.stream, &reply).await.unwrap();
        path
    }

    /// Developer upload of a two-player CLI game. Files are offered in the
    /// order server, client, description; the first `None` is refused and
    /// ends the upload. Returns the outcome text.
    pub async fn upload(&mut self, game: &str, files: [Option<&str>; 3]) -> String {
        self.answer("1. Upload Game", "1").await;
        self.answer("Enter Game Name:", game).await;
        self.answer("Select Game Type:", "1").await;
        self.answer("Select Players:", "2").await;
        for content in files {
            self.provide(content).await;
            if content.is_none() {
                break;
            }
        }
        self.display().await.0
    }

    /// From the catalog, picks `game` and plays it, downloading the client
    /// program when needed, until the lobby menu is pending.
    pub async fn open_lobby(&mut self, game: &str) {
        let catalog = self.wait_for("--- Game Store ---").await;
        let entry = catalog
            .lines()
            .find(|line| line.contains(&format!(" {} (v", game)))
            .unwrap_or_else(|| panic!("{} not listed in {:?}", game, catalog));
        let number = entry.split('.').next().unwrap().to_string();
        self.send(&number).await;

        self.answer(&format!("--- {} ---\n1. Details\n2. Play", game), "2")
            .await;
        loop {
            match self.next().await {
                ServerMessage::Display { text, .. } if text.contains("Lobby ---") => return,
                ServerMessage::Display { input, text } => {
                    assert!(!input.expects_reply(), "unexpected prompt {:?}", text)
                }
                ServerMessage::Save { .. } => {}
                other => panic!("unexpected instruction {:?}", other),
            }
        }
    }

    /// From the lobby menu, opens a room and returns its code.
    pub async fn create_room(&mut self) -> String {
        self.send("1").await;
        let menu = self.wait_for("(Host) ---").await;
        menu.trim_start_matches("--- Room: ")
            .split(' ')
            .next()
            .unwrap()
            .to_string()
    }

    /// Expects a `connect` instruction and returns it as (game path, host, port).
    pub async fn connect_instruction(&mut self) -> (String, String, u16) {
        match self.next().await {
            ServerMessage::Connect {
                game_path,
                host,
                port,
            } => (game_path, host, port),
            other => panic!("expected a connect instruction, got {:?}", other),
        }
    }
}

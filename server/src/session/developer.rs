//! Developer menus: upload, read, update and remove published games
//!
//! Upload and update pull all three game files before touching anything.
//! A file the client cannot provide aborts the whole operation: nothing is
//! written to storage and the catalog is left alone. Files only go live
//! together with their catalog write; an update whose catalog patch fails
//! puts the previous files back.

use log::{error, info, warn};
use serde_json::{Map, Value};
use shared::catalog::{criteria, LibraryChange, StoreRequest};
use shared::models::{is_safe_name, AccountKind, Game, GameKind, OwnedGame};
use shared::protocol::{InputError, InputSpec};

use super::{describe_game, numbered_menu, Session};
use crate::connection::Transport;
use crate::error::SessionError;
use crate::transfer::{Collected, GameBundle};

const DEVELOPER_MENU: &str =
    "1. Upload Game\n2. Read Game\n3. Update Game\n4. Remove Game\n5. Logout";
const GAME_NAME_MAX_LEN: usize = 30;
const PLAYER_COUNTS: [&str; 4] = ["2", "3", "4", "5"];

impl<S: Transport> Session<S> {
    /// Developer loop; returns when the developer logs out.
    pub(super) async fn developer_menu(&mut self, dev: &str) -> Result<(), SessionError> {
        loop {
            match self.conn.choose(DEVELOPER_MENU, 5).await? {
                1 => self.upload_game(dev).await?,
                2 => self.read_game(dev).await?,
                3 => self.update_game(dev).await?,
                4 => self.remove_game(dev).await?,
                _ => return Ok(()),
            }
        }
    }

    /// The developer's games, optionally only those still up. `None` after
    /// telling the developer there is nothing to pick from.
    async fn pick_game(
        &mut self,
        dev: &str,
        only_up: bool,
        header: &str,
        empty: &str,
        label: fn(&Game) -> String,
    ) -> Result<Option<Game>, SessionError> {
        let Some(mut games) = self.ctx.store.games(criteria([("dev", dev)])).await else {
            self.conn
                .show("Error: the game catalog is unavailable.")
                .await?;
            return Ok(None);
        };
        if only_up {
            games.retain(Game::is_up);
        }
        if games.is_empty() {
            self.conn.show(empty).await?;
            return Ok(None);
        }

        let (text, count) = numbered_menu(header, games.iter().map(label), None);
        let choice = self.conn.choose(text, count).await?;
        let game = choice
            .checked_sub(1)
            .and_then(|index| games.into_iter().nth(index))
            .ok_or(SessionError::InvalidReply(InputError::NotAnOption))?;
        Ok(Some(game))
    }

    async fn upload_game(&mut self, dev: &str) -> Result<(), SessionError> {
        let name = self
            .conn
            .prompt("Enter Game Name:", InputSpec::text(GAME_NAME_MAX_LEN))
            .await?;
        if !is_safe_name(&name) {
            return self
                .conn
                .show(format!("Error: '{}' is not a valid game name.", name))
                .await;
        }
        match self.ctx.store.game(&name).await {
            None => {
                return self
                    .conn
                    .show("Error: the game catalog is unavailable.")
                    .await
            }
            Some(existing) if !existing.is_empty() => {
                return self
                    .conn
                    .show(format!("Error: The name '{}' is already taken.", name))
                    .await
            }
            Some(_) => {}
        }

        let kind = match self
            .conn
            .choose("Select Game Type:\n1. CLI\n2. GUI", 2)
            .await?
        {
            1 => GameKind::Cli,
            _ => GameKind::Gui,
        };
        let players: u32 = self
            .conn
            .prompt(
                "Select Players:\n[2] [3] [4] [5]",
                InputSpec::choice(PLAYER_COUNTS),
            )
            .await?
            .parse()
            .map_err(|_| SessionError::InvalidReply(InputError::NotAnOption))?;

        let Some(bundle) = self.collect_bundle(&name).await? else {
            return Ok(());
        };

        let staged = match self.ctx.files.stage(&bundle).await {
            Ok(staged) => staged,
            Err(e) => {
                error!("Failed to store files of {}: {}", name, e);
                return self
                    .conn
                    .show("Server internal error during save.")
                    .await;
            }
        };

        // Creating the row claims the name; only the winner's files go live.
        let created = self
            .ctx
            .store
            .request(&StoreRequest::CreateGame {
                name: name.clone(),
                dev: dev.to_string(),
                kind,
                players,
                description: bundle.description.clone(),
            })
            .await;
        if !created.is_success() {
            self.ctx.files.discard(staged).await;
            return self
                .conn
                .show(format!("DB Error: {}", created.reason()))
                .await;
        }

        match self.ctx.files.publish(staged).await {
            Ok(published) => published.commit().await,
            Err(e) => {
                error!("Failed to install files of {}: {}", name, e);
                return self
                    .conn
                    .show("Server internal error during save.")
                    .await;
            }
        }

        self.record_publication(dev, LibraryChange::Add(OwnedGame(name.clone(), 1)))
            .await;
        info!("{} uploaded {} ({}, {} players)", dev, name, kind.label(), players);
        self.conn.show("Game uploaded successfully!").await
    }

    async fn read_game(&mut self, dev: &str) -> Result<(), SessionError> {
        let picked = self
            .pick_game(
                dev,
                false,
                "Select Game to Read:",
                "You have not uploaded any games.",
                |game| {
                    let tag = if game.is_up() { "[UP]" } else { "[DOWN]" };
                    format!("{} {}", game.name, tag)
                },
            )
            .await?;

        match picked {
            Some(game) => self.conn.show(describe_game(&game, true)).await,
            None => Ok(()),
        }
    }

    async fn update_game(&mut self, dev: &str) -> Result<(), SessionError> {
        let Some(game) = self
            .pick_game(
                dev,
                true,
                "Select Game to Update:",
                "No active games found to update.",
                |game| format!("{} (v{})", game.name, game.version),
            )
            .await?
        else {
            return Ok(());
        };

        let Some(bundle) = self.collect_bundle(&game.name).await? else {
            return Ok(());
        };

        let installed = match self.ctx.files.stage(&bundle).await {
            Ok(staged) => self.ctx.files.publish(staged).await,
            Err(e) => Err(e),
        };
        let published = match installed {
            Ok(published) => published,
            Err(e) => {
                error!("Failed to store files of {}: {}", game.name, e);
                return self.conn.show("Server error during update.").await;
            }
        };

        let version = game.version + 1;
        let mut updates = Map::new();
        updates.insert("version".to_string(), Value::from(version));
        updates.insert("description".to_string(), Value::from(bundle.description));
        let updated = self
            .ctx
            .store
            .request(&StoreRequest::UpdateGame {
                name: game.name.clone(),
                updates,
            })
            .await;
        if !updated.is_success() {
            if let Err(e) = published.rollback().await {
                error!("Failed to restore files of {}: {}", game.name, e);
            }
            return self
                .conn
                .show(format!("DB Error: {}", updated.reason()))
                .await;
        }
        published.commit().await;

        self.record_publication(
            dev,
            LibraryChange::UpdateVersion(OwnedGame(game.name.clone(), version)),
        )
        .await;
        info!("{} updated {} to v{}", dev, game.name, version);
        self.conn
            .show(format!("Updated '{}' to v{}!", game.name, version))
            .await
    }

    async fn remove_game(&mut self, dev: &str) -> Result<(), SessionError> {
        let Some(game) = self
            .pick_game(
                dev,
                true,
                "Select Game to Remove (Shutdown):",
                "No active games found to remove.",
                |game| game.name.clone(),
            )
            .await?
        else {
            return Ok(());
        };

        let mut updates = Map::new();
        updates.insert("status".to_string(), Value::from("down"));
        let response = self
            .ctx
            .store
            .request(&StoreRequest::UpdateGame {
                name: game.name.clone(),
                updates,
            })
            .await;

        if response.is_success() {
            info!("{} took {} down", dev, game.name);
            self.conn
                .show(format!("Game '{}' is now down.", game.name))
                .await
        } else {
            self.conn
                .show(format!("Error removing game: {}", response.reason()))
                .await
        }
    }

    /// Pulls the three game files, telling the developer why when the
    /// upload has to be abandoned.
    async fn collect_bundle(&mut self, game: &str) -> Result<Option<GameBundle>, SessionError> {
        let failure = match GameBundle::collect(&mut self.conn, game).await? {
            Collected::Complete(bundle) => return Ok(Some(bundle)),
            Collected::Failed(file) => format!("Error uploading {}. Aborting.", file),
            Collected::TooLarge(file) => {
                format!("Error: {} is too large to transfer. Aborting.", file)
            }
        };
        self.conn.show(failure).await?;
        Ok(None)
    }

    /// Mirrors a publication in the developer's own games list.
    async fn record_publication(&self, dev: &str, change: LibraryChange) {
        let response = self
            .ctx
            .store
            .request(&StoreRequest::update_account_games(
                AccountKind::Developer,
                dev,
                change,
            ))
            .await;
        if !response.is_success() {
            warn!("Could not update games list of {}: {}", dev, response.reason());
        }
    }
}

//! Player menus: catalog browsing, game details, download, review

use log::{info, warn};
use shared::catalog::{criteria, LibraryChange, StoreRequest};
use shared::models::{AccountKind, Feedback, Game, OwnedGame};
use shared::protocol::{InputError, InputSpec};

use super::{client_copy_path, describe_game, Session};
use crate::connection::Transport;
use crate::error::SessionError;

/// Reply token for the next catalog page.
pub const NEXT_PAGE: &str = "n";
/// Reply token for the previous catalog page.
pub const PREVIOUS_PAGE: &str = "p";

const REVIEW_MAX_LEN: usize = 100;

/// One page of the game catalog as shown to a player.
#[derive(Debug)]
pub struct CatalogPage<'a> {
    games: &'a [Game],
    index: usize,
    pages: usize,
    page_size: usize,
}

/// What a catalog reply selects.
#[derive(Debug, PartialEq)]
pub enum CatalogChoice<'a> {
    Game(&'a Game),
    Next,
    Previous,
    Logout,
}

impl<'a> CatalogPage<'a> {
    /// Page `index` of `games`, clamped to the last page.
    pub fn new(games: &'a [Game], index: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let pages = games.len().div_ceil(page_size).max(1);
        Self {
            games,
            index: index.min(pages - 1),
            pages,
            page_size,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn entries(&self) -> &'a [Game] {
        let start = (self.index * self.page_size).min(self.games.len());
        let end = (start + self.page_size).min(self.games.len());
        &self.games[start..end]
    }

    fn has_next(&self) -> bool {
        self.index + 1 < self.pages
    }

    fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn render(&self) -> String {
        let mut text = String::from("--- Game Store ---");
        if self.pages > 1 {
            text.push_str(&format!("\nPage {}/{}", self.index + 1, self.pages));
        }
        let entries = self.entries();
        for (i, game) in entries.iter().enumerate() {
            text.push_str(&format!("\n{}. {} (v{})", i + 1, game.name, game.version));
        }
        if self.has_next() {
            text.push_str(&format!("\n{}. Next page", NEXT_PAGE));
        }
        if self.has_previous() {
            text.push_str(&format!("\n{}. Previous page", PREVIOUS_PAGE));
        }
        text.push_str(&format!("\n{}. Logout", entries.len() + 1));
        text
    }

    pub fn input(&self) -> InputSpec {
        let mut tokens: Vec<String> = (1..=self.entries().len() + 1)
            .map(|i| i.to_string())
            .collect();
        if self.has_next() {
            tokens.push(NEXT_PAGE.to_string());
        }
        if self.has_previous() {
            tokens.push(PREVIOUS_PAGE.to_string());
        }
        InputSpec::Choice(tokens)
    }

    pub fn resolve(&self, reply: &str) -> Option<CatalogChoice<'a>> {
        match reply {
            NEXT_PAGE if self.has_next() => Some(CatalogChoice::Next),
            PREVIOUS_PAGE if self.has_previous() => Some(CatalogChoice::Previous),
            _ => {
                let entries = self.entries();
                let choice: usize = reply.parse().ok()?;
                if choice == entries.len() + 1 {
                    Some(CatalogChoice::Logout)
                } else {
                    entries.get(choice.checked_sub(1)?).map(CatalogChoice::Game)
                }
            }
        }
    }
}

impl<S: Transport> Session<S> {
    /// Catalog loop; returns when the player logs out.
    pub(super) async fn player_menu(&mut self, player: &str) -> Result<(), SessionError> {
        let mut page = 0;
        loop {
            let games = match self.ctx.store.games(criteria([("status", "up")])).await {
                Some(games) => games,
                None => {
                    self.conn
                        .show("Error: the game catalog is unavailable.")
                        .await?;
                    Vec::new()
                }
            };

            let catalog = CatalogPage::new(&games, page, self.ctx.config.page_size);
            page = catalog.index();
            let reply = self.conn.prompt(catalog.render(), catalog.input()).await?;

            match catalog.resolve(&reply) {
                Some(CatalogChoice::Game(game)) => {
                    let name = game.name.clone();
                    self.game_menu(player, &name).await?;
                }
                Some(CatalogChoice::Next) => page += 1,
                Some(CatalogChoice::Previous) => page = page.saturating_sub(1),
                Some(CatalogChoice::Logout) => return Ok(()),
                None => return Err(InputError::NotAnOption.into()),
            }
        }
    }

    /// Current catalog row of `name` if it is still published.
    async fn published_game(&self, name: &str) -> Option<Game> {
        self.ctx
            .store
            .game(name)
            .await?
            .into_iter()
            .find(Game::is_up)
    }

    async fn owned_version(&self, player: &str, game: &str) -> Option<u32> {
        self.ctx
            .store
            .account(AccountKind::Player, player)
            .await?
            .first()?
            .owned_version(game)
    }

    async fn game_menu(&mut self, player: &str, name: &str) -> Result<(), SessionError> {
        loop {
            let Some(game) = self.published_game(name).await else {
                return self.conn.show("This game is no longer available.").await;
            };
            let owned = self.owned_version(player, name).await;

            let mut text = format!("--- {} ---\n1. Details\n2. Play", game.name);
            let mut options = 2;
            if owned.is_some() {
                text.push_str("\n3. Review");
                options += 1;
            }
            options += 1;
            text.push_str(&format!("\n{}. Back", options));

            match self.conn.choose(text, options).await? {
                1 => self.conn.show(describe_game(&game, false)).await?,
                2 => {
                    if self.ensure_installed(player, &game, owned).await? {
                        self.lobby(player, &game).await?;
                    }
                }
                3 if owned.is_some() => self.review(player, &game).await?,
                _ => return Ok(()),
            }
        }
    }

    /// Pushes the game's client program when the player lacks the current
    /// version. Returns whether the player can play.
    async fn ensure_installed(
        &mut self,
        player: &str,
        game: &Game,
        owned: Option<u32>,
    ) -> Result<bool, SessionError> {
        match owned {
            None => {
                self.conn
                    .show("You don't own this game. Downloading...")
                    .await?
            }
            Some(version) if version < game.version => {
                self.conn.show("Update available. Updating...").await?
            }
            Some(_) => return Ok(true),
        }

        let Some(content) = self.ctx.files.read_client(&game.name).await else {
            self.conn
                .show("Error: Game file missing on server.")
                .await?;
            return Ok(false);
        };
        if !self
            .conn
            .push_file(client_copy_path(player, &game.name), content)
            .await?
        {
            self.conn
                .show("Error: game file too large to transfer.")
                .await?;
            return Ok(false);
        }

        let entry = OwnedGame(game.name.clone(), game.version);
        let change = if owned.is_some() {
            LibraryChange::UpdateVersion(entry)
        } else {
            LibraryChange::Add(entry)
        };
        let recorded = self
            .ctx
            .store
            .request(&StoreRequest::update_account_games(
                AccountKind::Player,
                player,
                change,
            ))
            .await;
        if !recorded.is_success() {
            warn!(
                "Could not record download of {} v{} by {}: {}",
                game.name,
                game.version,
                player,
                recorded.reason()
            );
        }

        info!("{} downloaded {} v{}", player, game.name, game.version);
        self.conn.show("Download Complete!").await?;
        Ok(true)
    }

    async fn review(&mut self, player: &str, game: &Game) -> Result<(), SessionError> {
        let stars = self
            .conn
            .choose("Rate (1-5):", usize::from(Feedback::MAX_STARS))
            .await? as u8;
        let comment = self
            .conn
            .prompt("Write a short review:", InputSpec::text(REVIEW_MAX_LEN))
            .await?;

        let response = self
            .ctx
            .store
            .request(&StoreRequest::AddFeedback {
                name: game.name.clone(),
                feedback: Feedback(player.to_string(), stars, comment),
            })
            .await;
        if response.is_success() {
            self.conn.show("Review submitted.").await
        } else {
            self.conn
                .show(format!("Error submitting review: {}", response.reason()))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{GameKind, GameStatus};

    fn catalog(count: usize) -> Vec<Game> {
        (1..=count)
            .map(|i| Game {
                name: format!("game{}", i),
                dev: "dan".into(),
                version: 1,
                status: GameStatus::Up,
                kind: GameKind::Cli,
                players: 2,
                description: String::new(),
                feedback: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_single_page_has_no_navigation() {
        let games = catalog(2);
        let page = CatalogPage::new(&games, 0, 9);

        assert_eq!(
            page.render(),
            "--- Game Store ---\n1. game1 (v1)\n2. game2 (v1)\n3. Logout"
        );
        assert_eq!(page.input(), InputSpec::numbered(3));
        assert_eq!(page.resolve("3"), Some(CatalogChoice::Logout));
        assert_eq!(page.resolve("2"), Some(CatalogChoice::Game(&games[1])));
        assert_eq!(page.resolve("n"), None);
    }

    #[test]
    fn test_pages_are_numbered_locally() {
        let games = catalog(5);

        let first = CatalogPage::new(&games, 0, 2);
        assert_eq!(first.input(), InputSpec::choice(["1", "2", "3", "n"]));
        assert_eq!(first.resolve("n"), Some(CatalogChoice::Next));
        assert_eq!(first.resolve("p"), None);

        let second = CatalogPage::new(&games, 1, 2);
        assert!(second.render().contains("Page 2/3\n1. game3 (v1)\n2. game4 (v1)"));
        assert_eq!(second.resolve("1"), Some(CatalogChoice::Game(&games[2])));
        assert_eq!(second.resolve("p"), Some(CatalogChoice::Previous));

        let last = CatalogPage::new(&games, 2, 2);
        assert_eq!(last.input(), InputSpec::choice(["1", "2", "p"]));
        assert_eq!(last.resolve("2"), Some(CatalogChoice::Logout));
    }

    #[test]
    fn test_page_index_is_clamped() {
        let games = catalog(3);
        assert_eq!(CatalogPage::new(&games, 7, 2).index(), 1);

        let empty: Vec<Game> = Vec::new();
        let page = CatalogPage::new(&empty, 3, 0);
        assert_eq!(page.index(), 0);
        assert_eq!(page.render(), "--- Game Store ---\n1. Logout");
        assert_eq!(page.resolve("1"), Some(CatalogChoice::Logout));
        assert_eq!(page.resolve("0"), None);
    }
}

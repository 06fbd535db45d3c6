//! Pre-authentication menu: login, registration and exit

use log::info;
use shared::catalog::StoreRequest;
use shared::models::{is_safe_name, Account, AccountKind, AccountStatus};
use shared::protocol::InputSpec;
use thiserror::Error;

use super::{Session, CREDENTIAL_MAX_LEN};
use crate::connection::Transport;
use crate::error::SessionError;
use crate::store_client::StoreClient;

const PRE_AUTH_MENU: &str = "1. Login\n2. Register\n3. Exit";

/// Why a login attempt failed. Each reason has its own message so clients
/// can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoginRejection {
    #[error("User does not exist.")]
    UnknownUser,

    #[error("Incorrect password.")]
    WrongPassword,

    #[error("User is already logged in.")]
    AlreadyOnline,

    #[error("Server unavailable.")]
    Unavailable,
}

/// Checks a password against the queried account.
pub fn check_credentials(account: Option<&Account>, password: &str) -> Result<(), LoginRejection> {
    let account = account.ok_or(LoginRejection::UnknownUser)?;
    if account.password != password {
        return Err(LoginRejection::WrongPassword);
    }
    if account.status != AccountStatus::Offline {
        return Err(LoginRejection::AlreadyOnline);
    }
    Ok(())
}

/// Verifies credentials and claims the account. The claim is a
/// compare-and-set from offline to online, so of two racing logins only
/// one can win.
async fn authenticate(
    store: &StoreClient,
    kind: AccountKind,
    name: &str,
    password: &str,
) -> Result<(), LoginRejection> {
    let accounts = store
        .account(kind, name)
        .await
        .ok_or(LoginRejection::Unavailable)?;
    check_credentials(accounts.first(), password)?;

    let claim = store
        .request(&StoreRequest::update_account_status(
            kind,
            name,
            AccountStatus::Online,
            Some(AccountStatus::Offline),
        ))
        .await;
    if claim.is_success() {
        Ok(())
    } else {
        Err(LoginRejection::AlreadyOnline)
    }
}

impl<S: Transport> Session<S> {
    /// Runs the pre-auth menu until a login succeeds (`Some(name)`) or the
    /// client exits (`None`).
    pub(super) async fn pre_auth(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            match self.conn.choose(PRE_AUTH_MENU, 3).await? {
                1 => {
                    if let Some(name) = self.login().await? {
                        return Ok(Some(name));
                    }
                }
                2 => self.register().await?,
                _ => return Ok(None),
            }
        }
    }

    async fn credentials(&mut self) -> Result<(String, String), SessionError> {
        let name = self
            .conn
            .prompt("Enter Name:", InputSpec::text(CREDENTIAL_MAX_LEN))
            .await?;
        let password = self
            .conn
            .prompt("Enter Password:", InputSpec::text(CREDENTIAL_MAX_LEN))
            .await?;
        Ok((name, password))
    }

    async fn register(&mut self) -> Result<(), SessionError> {
        let (name, password) = self.credentials().await?;

        let outcome = if is_safe_name(&name) {
            let response = self
                .ctx
                .store
                .request(&StoreRequest::create_account(self.kind, name.as_str(), password))
                .await;
            if response.is_success() {
                Ok(())
            } else {
                Err(response.reason().to_string())
            }
        } else {
            Err("Username Invalid".to_string())
        };

        match outcome {
            Ok(()) => {
                info!("Registered {} {}", self.kind.noun(), name);
                self.conn.show("Registration Successful!").await
            }
            Err(reason) => {
                self.conn
                    .show(format!("Registration Failed: {}", reason))
                    .await
            }
        }
    }

    async fn login(&mut self) -> Result<Option<String>, SessionError> {
        let (name, password) = self.credentials().await?;

        match authenticate(&self.ctx.store, self.kind, &name, &password).await {
            Ok(()) => {
                info!("{} {} logged in from {}", self.kind.noun(), name, self.conn.peer());
                self.conn.show(format!("Welcome {}", name)).await?;
                Ok(Some(name))
            }
            Err(rejection) => {
                info!("Login of {} rejected: {}", name, rejection);
                self.conn
                    .show(format!("Login Failed: {}", rejection))
                    .await?;
                Ok(None)
            }
        }
    }
}

//! Server state.

use crate::auth::{AuthError, JwtValidator};
use folio_core::{Bus, Config, History};
use folio_storage::{DocumentRepo, VersionRepo};
use std::sync::Arc;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub history: History,
    pub config: Arc<Config>,
    pub jwt: JwtValidator,
}

impl AppState {
    pub fn new(history: History, config: Config, jwt: JwtValidator) -> Self {
        Self {
            history,
            config: Arc::new(config),
            jwt,
        }
    }

    /// Build the history service over `repo` and a validator from the
    /// configured secret. Fails without a secret unless dev mode is on.
    pub fn from_repos<R>(repo: Arc<R>, config: Config) -> Result<Self, AuthError>
    where
        R: DocumentRepo + VersionRepo + 'static,
    {
        let jwt = JwtValidator::from_secret(
            config.jwt_secret(),
            config.token_ttl_secs(),
            config.dev_mode(),
        )?;
        let history = History::new(repo.clone(), repo, &config, Bus::new());
        Ok(Self::new(history, config, jwt))
    }

    pub fn bus(&self) -> &Bus {
        self.history.bus()
    }
}

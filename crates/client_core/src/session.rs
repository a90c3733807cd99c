//! Signed-in user context shared by every view of one app instance.

use std::sync::Arc;

use shared::domain::User;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{error::ClientError, http::SsisClient};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Session check not finished yet.
    Loading,
    Authenticated(User),
    Unauthenticated,
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Explicit session handle passed to views; clones observe the same state.
#[derive(Clone)]
pub struct SessionContext {
    client: SsisClient,
    state: Arc<RwLock<AuthState>>,
}

impl SessionContext {
    pub fn new(client: SsisClient) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(AuthState::Loading)),
        }
    }

    pub fn client(&self) -> &SsisClient {
        &self.client
    }

    pub async fn current(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// Asks the server who owns the session cookie, if anyone.
    pub async fn initialize(&self) -> Result<AuthState, ClientError> {
        let state = match self.client.me().await {
            Ok(Some(user)) => AuthState::Authenticated(user),
            Ok(None) => AuthState::Unauthenticated,
            Err(err) => {
                *self.state.write().await = AuthState::Unauthenticated;
                return Err(err);
            }
        };
        *self.state.write().await = state.clone();
        Ok(state)
    }

    /// Drops any previous session, signs in, then confirms the new session
    /// with the server.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        if let Err(err) = self.client.logout().await {
            debug!(error = %err, "no previous session to close");
        }
        *self.state.write().await = AuthState::Loading;

        if let Err(err) = self.client.login(username, password).await {
            *self.state.write().await = AuthState::Unauthenticated;
            return Err(err);
        }

        match self.initialize().await? {
            AuthState::Authenticated(user) => {
                info!(username = %user.username, "signed in");
                Ok(user)
            }
            _ => Err(ClientError::InvalidResponse(
                "login succeeded but the session was not established".to_string(),
            )),
        }
    }

    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<(), ClientError> {
        self.client.signup(username, email, password).await
    }

    /// Tears the session down locally even when the server call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.client.logout().await;
        *self.state.write().await = AuthState::Unauthenticated;
        result
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, User};
use crate::auth::Session;
use crate::error::Result;

/// Login state on top of the API client.
pub struct AuthService {
    client: Arc<ApiClient>,
    session: Arc<Session>,
    user: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>, session: Arc<Session>) -> Self {
        Self {
            client,
            session,
            user: RwLock::new(None),
        }
    }

    /// Logs in, stores the returned credential and loads the user's profile.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let token = self.client.login(email, password).await?;
        self.session.store_token(&token.access_token).await?;

        let user = self.client.get_current_user().await?;
        info!("Logged in as {}", user.email);
        *self.user.write() = Some(user.clone());
        Ok(user)
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<User> {
        self.client.signup(email, password).await?;
        self.login(email, password).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        *self.user.write() = None;
        info!("Logged out");
        Ok(())
    }

    /// Reloads the profile for a credential left over from an earlier run.
    /// A credential the server no longer accepts is discarded.
    pub async fn restore(&self) -> Option<User> {
        self.session.token().await?;

        match self.client.get_current_user().await {
            Ok(user) => {
                debug!("Restored session for {}", user.email);
                *self.user.write() = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                warn!("Stored session could not be restored: {}", e);
                if let Err(e) = self.session.clear().await {
                    warn!("Failed to clear stale credential: {}", e);
                }
                None
            }
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }
}

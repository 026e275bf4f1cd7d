//! The credential and view state shared by every client call.
//!
//! The token is read at dispatch time, so a 401 that clears it while another
//! request is in flight only affects requests dispatched afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::api::{CredentialSource, SessionExpiry};
use crate::error::Result;
use crate::platform::{Navigator, TokenStore, LOGIN_PATH};

pub struct Session {
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    login_path: String,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store,
            navigator,
            login_path: LOGIN_PATH.to_string(),
        }
    }

    /// Where an expired session sends the user.
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// The stored credential. An unreadable store counts as no credential.
    pub async fn token(&self) -> Option<String> {
        match self.store.load().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Credential store unavailable, continuing unauthenticated: {}", e);
                None
            }
        }
    }

    pub async fn store_token(&self, token: &str) -> Result<()> {
        self.store.save(token).await?;
        info!("Session credential stored");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear().await?;
        info!("Session credential cleared");
        Ok(())
    }
}

#[async_trait]
impl CredentialSource for Session {
    async fn token(&self) -> Option<String> {
        Session::token(self).await
    }
}

#[async_trait]
impl SessionExpiry for Session {
    async fn expire(&self) {
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear expired credential: {}", e);
        }
        if self.navigator.current_path() != self.login_path {
            self.navigator.navigate(&self.login_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;
    use crate::platform::{MemoryTokenStore, ViewState, CHAT_PATH};

    /// Counts clears; optionally fails every read.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryTokenStore,
        clears: AtomicUsize,
        broken: bool,
    }

    #[async_trait]
    impl TokenStore for CountingStore {
        async fn load(&self) -> Result<Option<String>> {
            if self.broken {
                return Err(Error::platform("storage unavailable"));
            }
            self.inner.load().await
        }

        async fn save(&self, token: &str) -> Result<()> {
            self.inner.save(token).await
        }

        async fn clear(&self) -> Result<()> {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.inner.clear().await
        }
    }

    #[tokio::test]
    async fn test_expire_clears_once_and_navigates_to_login() {
        let store = Arc::new(CountingStore::default());
        let view = Arc::new(ViewState::new(CHAT_PATH));
        let session = Session::new(store.clone(), view.clone());
        session.store_token("abc").await.unwrap();

        SessionExpiry::expire(&session).await;

        assert_eq!(store.clears.load(Ordering::SeqCst), 1);
        assert_eq!(Session::token(&session).await, None);
        assert_eq!(view.current_path(), LOGIN_PATH);
        assert_eq!(view.visited(), vec![LOGIN_PATH.to_string()]);
    }

    #[tokio::test]
    async fn test_expire_on_login_view_does_not_navigate() {
        let store = Arc::new(CountingStore::default());
        let view = Arc::new(ViewState::new(LOGIN_PATH));
        let session = Session::new(store.clone(), view.clone());

        SessionExpiry::expire(&session).await;

        assert_eq!(store.clears.load(Ordering::SeqCst), 1);
        assert!(view.visited().is_empty());
    }

    #[tokio::test]
    async fn test_expire_uses_configured_login_path() {
        let view = Arc::new(ViewState::new(CHAT_PATH));
        let session = Session::new(Arc::new(MemoryTokenStore::default()), view.clone())
            .with_login_path("/signin");

        SessionExpiry::expire(&session).await;

        assert_eq!(view.current_path(), "/signin");
    }

    #[tokio::test]
    async fn test_unreadable_store_means_no_credential() {
        let store = Arc::new(CountingStore {
            broken: true,
            ..Default::default()
        });
        let session = Session::new(store, Arc::new(ViewState::default()));
        assert_eq!(Session::token(&session).await, None);
    }
}

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ApiClient, ReqwestTransport, Transport};
use crate::app::config::AppConfig;
use crate::auth::{AuthService, Session};
use crate::error::{Error, Result};
use crate::platform::{create_token_store, AppPaths, Navigator, TokenStore, ViewState, CHAT_PATH};

pub struct AppState {
    config: AppConfig,
    view: Arc<ViewState>,
    client: Arc<ApiClient>,
    auth: AuthService,
}

impl AppState {
    pub fn new(config: AppConfig, paths: AppPaths) -> Result<Self> {
        info!("Initializing application state");

        let transport = ReqwestTransport::new(config.base_url()?, config.timeout())
            .map_err(|e| Error::platform(format!("Failed to create HTTP client: {}", e)))?;
        let store = create_token_store(config.storage.backend, &paths);

        Ok(Self::with_parts(config, Arc::new(transport), store))
    }

    /// Wires the state around an explicit transport and credential store.
    pub fn with_parts(
        config: AppConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let view = Arc::new(ViewState::new(CHAT_PATH));
        let session = Arc::new(Session::new(store, view.clone()).with_login_path(config.ui.login_path.clone()));
        let client = Arc::new(ApiClient::with_session(transport, session.clone(), config.timeout()));
        let auth = AuthService::new(client.clone(), session);

        debug!("API client targets {}", config.api.base_url);

        Self {
            config,
            view,
            client,
            auth,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// True once a 401 has sent the user back to the login view.
    pub fn needs_login(&self) -> bool {
        self.view.current_path() == self.config.ui.login_path
    }
}

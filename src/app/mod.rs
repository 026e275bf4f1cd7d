pub mod config;
pub mod state;

pub use config::{ApiConfig, AppConfig, StorageConfig, UIConfig};
pub use state::AppState;

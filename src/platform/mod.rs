pub mod navigation;
pub mod paths;
pub mod secure_storage;

pub use navigation::{Navigator, ViewState, CHAT_PATH, LOGIN_PATH};
pub use paths::AppPaths;
pub use secure_storage::{
    create_token_store, FileTokenStore, KeyringTokenStore, MemoryTokenStore, StorageBackend,
    TokenStore,
};

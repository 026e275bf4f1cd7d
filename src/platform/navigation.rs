use parking_lot::RwLock;
use tracing::info;

pub const LOGIN_PATH: &str = "/login";
pub const CHAT_PATH: &str = "/chat";

/// The view the user is currently on, and a way to move them.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

/// Navigator that only records the current view.
#[derive(Debug)]
pub struct ViewState {
    path: RwLock<String>,
    history: RwLock<Vec<String>>,
}

impl ViewState {
    pub fn new(initial: &str) -> Self {
        Self {
            path: RwLock::new(initial.to_string()),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Paths navigated to since creation, oldest first.
    pub fn visited(&self) -> Vec<String> {
        self.history.read().clone()
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(CHAT_PATH)
    }
}

impl Navigator for ViewState {
    fn current_path(&self) -> String {
        self.path.read().clone()
    }

    fn navigate(&self, path: &str) {
        info!("Navigating to {}", path);
        *self.path.write() = path.to_string();
        self.history.write().push(path.to_string());
    }
}

use storage::Database;
use storage::services::versioning::RestorePolicy;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub restore_policy: RestorePolicy,
}

impl AppState {
    pub fn new(db: Database, restore_policy: RestorePolicy) -> Self {
        Self { db, restore_policy }
    }
}

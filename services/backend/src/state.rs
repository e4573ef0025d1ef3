use std::sync::Arc;

use crate::db::{Database, DbError};
use crate::secrets::SecretManager;

/// Shared by every handler. `database` is `None` when the store was not
/// configured or could not be opened at startup.
#[derive(Clone)]
pub struct AppState {
    pub database: Option<Database>,
    pub secrets: Arc<SecretManager>,
}

impl AppState {
    pub fn new(database: Option<Database>, secrets: Arc<SecretManager>) -> Self {
        Self { database, secrets }
    }

    pub fn database(&self) -> Result<&Database, DbError> {
        self.database.as_ref().ok_or(DbError::NotInitialized)
    }
}

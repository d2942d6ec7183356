//! Application state shared across request handlers.

use std::sync::Arc;

use crate::db::Database;
use crate::service::WatchService;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    service: WatchService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, service: WatchService) -> Self {
        Self {
            inner: Arc::new(AppStateInner { db, service }),
        }
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn service(&self) -> &WatchService {
        &self.inner.service
    }
}

//! Application context shared by the request handlers

use std::sync::Arc;

use cnvs_core::CnvsScraper;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Owns the single scraper (and so the single session) of the process
#[derive(Clone)]
pub struct AppContext {
    scraper: Arc<CnvsScraper>,
    shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(scraper: Arc<CnvsScraper>, shutdown: CancellationToken) -> Self {
        Self { scraper, shutdown }
    }

    pub fn scraper(&self) -> &CnvsScraper {
        &self.scraper
    }

    /// Whether the login has completed.
    pub fn is_ready(&self) -> bool {
        self.scraper.session().is_authenticated()
    }

    /// Fail with [`ApiError::NotReady`] until the login has completed.
    pub fn ensure_ready(&self) -> Result<(), ApiError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ApiError::NotReady)
        }
    }

    /// Root token, cancelled on process shutdown.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Token for one request; cancelled with the process.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

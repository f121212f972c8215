//! In-memory [`PageFetcher`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::client::{FetchRequest, FetchedPage, Method, PageFetcher};
use crate::error::{CnvsError, Result};

pub const BASE: &str = "https://cnvsweb.stream";

/// Serves canned pages keyed by method and path, recording every request.
pub struct FakeFetcher {
    base: Url,
    routes: Mutex<HashMap<(Method, String), (u16, String)>>,
    requests: Mutex<Vec<FetchRequest>>,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self {
            base: Url::parse(BASE).unwrap(),
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Every fetch sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn route(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), (status, body.to_string()));
        self
    }

    pub fn get(self, path: &str, body: &str) -> Self {
        self.route(Method::Get, path, 200, body)
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests made to `path` with any method.
    pub fn hits(&self, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| Url::parse(&r.url).map(|u| u.path() == path).unwrap_or(false))
            .count()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchedPage> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let url = Url::parse(&request.url).map_err(|e| CnvsError::InvalidUrl(e.to_string()))?;
        let route = self
            .routes
            .lock()
            .unwrap()
            .get(&(request.method, url.path().to_string()))
            .cloned();

        let (status, body) = route.unwrap_or((404, String::new()));
        Ok(FetchedPage {
            status,
            url: request.url,
            body,
        })
    }

    fn base_url(&self) -> &Url {
        &self.base
    }
}

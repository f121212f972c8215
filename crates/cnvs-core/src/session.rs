//! Authenticated session for the CNVS site
//!
//! [`SessionManager`] owns the login state and the idle timer. All outbound
//! traffic, foreground scraping and background keep-alive alike, goes through
//! [`SessionManager::fetch`], which holds one async mutex for the whole
//! request. The cookie store and the activity timestamp therefore never see
//! interleaved requests.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scraper::{Html, Selector};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::client::{FetchRequest, FetchedPage, PageFetcher};
use crate::error::{CnvsError, Result};

/// Idle time after which `ensure_fresh` refreshes the session
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(180);

/// How a successful login response is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginVerification {
    /// Require a logged-in marker in the post-login page
    Strict,
    /// Accept any success status; a followed redirect implies a valid session
    #[default]
    Lenient,
}

impl FromStr for LoginVerification {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(LoginVerification::Strict),
            "lenient" => Ok(LoginVerification::Lenient),
            other => Err(format!("unknown login verification mode: {other}")),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Access token submitted to the login form
    pub token: String,
    /// Idle duration tolerated before a refresh (default: 180s)
    pub idle_threshold: Duration,
    /// Upper bound on a single request (default: 30s)
    pub request_timeout: Duration,
    /// Login verification policy (default: lenient)
    pub login_verification: LoginVerification,
}

impl SessionConfig {
    /// Configuration with defaults for everything but the token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            request_timeout: Duration::from_secs(30),
            login_verification: LoginVerification::default(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    last_activity: Instant,
}

impl SessionState {
    fn touch(&mut self) {
        let now = Instant::now();
        if now > self.last_activity {
            self.last_activity = now;
        }
    }
}

/// Owner of the authenticated session
pub struct SessionManager {
    fetcher: Arc<dyn PageFetcher>,
    config: SessionConfig,
    authenticated: AtomicBool,
    /// Held for the duration of every request
    io: Mutex<SessionState>,
}

impl SessionManager {
    /// Create an unauthenticated session over `fetcher`.
    ///
    /// # Arguments
    /// * `fetcher` - Transport every session request goes through
    /// * `config` - Token, idle threshold, timeout and login verification
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: SessionConfig) -> Self {
        Self {
            fetcher,
            config,
            authenticated: AtomicBool::new(false),
            io: Mutex::new(SessionState {
                last_activity: Instant::now(),
            }),
        }
    }

    /// Whether a login has succeeded. Never reverts to false.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Time of the last completed request.
    pub async fn last_activity(&self) -> Instant {
        self.io.lock().await.last_activity
    }

    /// Configuration the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Site origin.
    pub fn base_url(&self) -> &Url {
        self.fetcher.base_url()
    }

    /// Resolve `href` against the site origin.
    pub fn absolute_url(&self, href: &str) -> Option<String> {
        self.fetcher.base_url().join(href).ok().map(String::from)
    }

    /// Log in with the configured token.
    ///
    /// Returns false on a transport fault or a non-success status. See
    /// [`LoginVerification`] for how a success status is judged.
    pub async fn login(&self, cancel: &CancellationToken) -> bool {
        match self.try_login(cancel).await {
            Ok(()) => {
                self.authenticated.store(true, Ordering::Release);
                true
            }
            Err(e) => {
                error!(error = %e, "login failed");
                false
            }
        }
    }

    async fn try_login(&self, cancel: &CancellationToken) -> Result<()> {
        let login_url = self
            .absolute_url("/login")
            .ok_or_else(|| CnvsError::InvalidUrl("/login".to_string()))?;

        let mut state = self.io.lock().await;

        debug!(url = %login_url, "opening login page for cookies");
        self.fetch_locked(&mut state, FetchRequest::get(login_url.as_str()), cancel)
            .await?;

        let response = self
            .fetch_locked(
                &mut state,
                FetchRequest::post(login_url.as_str()).form("token", self.config.token.as_str()),
                cancel,
            )
            .await?;

        if !response.is_success() {
            return Err(CnvsError::AuthFailed(response.status));
        }

        if has_logged_in_marker(&response.body) {
            info!("login succeeded");
            return Ok(());
        }

        match self.config.login_verification {
            LoginVerification::Lenient => {
                warn!(
                    url = %response.url,
                    "logged-in marker missing, accepting the redirect as a valid session"
                );
                Ok(())
            }
            LoginVerification::Strict => Err(CnvsError::ParseError(
                "logged-in marker missing from login response".to_string(),
            )),
        }
    }

    /// Refresh the session if it has been idle past the threshold.
    ///
    /// No-op while unauthenticated. Failures are logged, never returned.
    pub async fn ensure_fresh(&self, cancel: &CancellationToken) {
        if !self.is_authenticated() {
            return;
        }

        let mut state = self.io.lock().await;
        let idle = state.last_activity.elapsed();
        if idle <= self.config.idle_threshold {
            return;
        }

        let Some(home) = self.absolute_url("/") else {
            return;
        };

        debug!(idle_secs = idle.as_secs(), "refreshing idle session");
        match self
            .fetch_locked(&mut state, FetchRequest::get(home), cancel)
            .await
        {
            Ok(_) => info!("session refreshed"),
            Err(e) => warn!(error = %e, "session refresh failed"),
        }
    }

    /// Perform one request through the shared session.
    pub async fn fetch(
        &self,
        request: FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage> {
        let mut state = self.io.lock().await;
        self.fetch_locked(&mut state, request, cancel).await
    }

    /// `ensure_fresh` followed by a GET of `url`.
    pub async fn fetch_page(&self, url: &str, cancel: &CancellationToken) -> Result<FetchedPage> {
        self.ensure_fresh(cancel).await;
        self.fetch(FetchRequest::get(url), cancel).await
    }

    async fn fetch_locked(
        &self,
        state: &mut SessionState,
        request: FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage> {
        let timeout = self.config.request_timeout;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CnvsError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.fetcher.fetch(request)) => outcome,
        };

        let page = outcome.map_err(|_| CnvsError::Timeout(timeout))??;
        state.touch();
        Ok(page)
    }
}

/// Whether a page shows the logged-in profile menu or a logout link.
pub fn has_logged_in_marker(html: &str) -> bool {
    if html.contains("/logout") {
        return true;
    }

    let document = Html::parse_document(html);
    Selector::parse("ul.profile")
        .map(|selector| document.select(&selector).next().is_some())
        .unwrap_or(false)
}

//! Session guard: binds a request's lifetime to the revocation log
//!
//! `authenticate` validates the request's bearer credential, rejects sessions
//! that are already revoked and hands back an [`AuthenticatedContext`]. For a
//! logged in user a watcher task follows the revocation log and cancels the
//! context as soon as the session id shows up.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};
use warp::http::{Extensions, HeaderMap};

use crate::application::services::{LogoutIngestor, Pruner};
use crate::config::{AppConfig, FAKE_USER_ID};
use crate::domain::ports::{ErrorHandler, LogoutEventSource, TokenValidator};
use crate::domain::revocation::Cursor;
use crate::domain::session::{UserId, ANONYMOUS_USER_ID};
use crate::infrastructure::adapters::RevocationLog;
use crate::shared::error::{AppError, AppResult};
use crate::shared::metrics::RevocationMetrics;

const BEARER_PREFIX: &str = "bearer ";

/// User id marker stored in request extensions by the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

/// Cancelable request context carrying the authenticated user id.
///
/// Canceled when the session is revoked, when the parent token is canceled,
/// or when the context is dropped (request finished), whichever comes first.
#[derive(Debug)]
pub struct AuthenticatedContext {
    user_id: UserId,
    token: CancellationToken,
    revoked: Arc<AtomicBool>,
    watched: bool,
    _guard: DropGuard,
}

impl AuthenticatedContext {
    fn new(user_id: UserId, token: CancellationToken, revoked: Arc<AtomicBool>, watched: bool) -> Self {
        let guard = token.clone().drop_guard();
        Self {
            user_id,
            token,
            revoked,
            watched,
            _guard: guard,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }

    /// Whether a watcher follows the revocation log for this context
    pub fn is_watched(&self) -> bool {
        self.watched
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the watcher canceled this context because of a logout
    pub fn was_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }

    /// Completes when the context is canceled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Token for work spawned on behalf of this request
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Drive `work` until it finishes or the context is canceled.
    ///
    /// A revocation surfaces as `AppError::RevokedSession`, any other
    /// cancellation as `AppError::ContextCanceled`.
    pub async fn run_until_cancelled<F>(&self, work: F) -> AppResult<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(self.cancellation_error()),
            output = work => Ok(output),
        }
    }

    fn cancellation_error(&self) -> AppError {
        if self.was_revoked() {
            AppError::RevokedSession
        } else {
            AppError::ContextCanceled
        }
    }

    /// Record the user id in request extensions for [`Authenticator::from_context`]
    pub fn attach(&self, extensions: &mut Extensions) {
        extensions.insert(AuthUser(self.user_id));
    }
}

/// Authenticates requests and guards them against session revocation
pub struct Authenticator {
    config: Arc<AppConfig>,
    validator: Arc<dyn TokenValidator>,
    log: Arc<RevocationLog>,
    metrics: Arc<RevocationMetrics>,
}

impl Authenticator {
    pub fn new(
        config: Arc<AppConfig>,
        validator: Arc<dyn TokenValidator>,
        log: Arc<RevocationLog>,
        metrics: Arc<RevocationMetrics>,
    ) -> Self {
        Self {
            config,
            validator,
            log,
            metrics,
        }
    }

    pub fn log(&self) -> &Arc<RevocationLog> {
        &self.log
    }

    pub fn metrics(&self) -> &Arc<RevocationMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn is_fake(&self) -> bool {
        self.config.auth.fake
    }

    /// Authenticate a request from its headers.
    ///
    /// No credential means public access (user 0, never revoked). The returned
    /// context is a child of `parent`.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
        parent: &CancellationToken,
    ) -> AppResult<AuthenticatedContext> {
        if self.is_fake() {
            return Ok(self.authenticated_context(FAKE_USER_ID, parent));
        }

        let Some(credential) = self.credential(headers)? else {
            return Ok(self.authenticated_context(ANONYMOUS_USER_ID, parent));
        };

        let session = self.validator.validate(credential).await?;
        if session.is_anonymous() {
            return Ok(self.authenticated_context(ANONYMOUS_USER_ID, parent));
        }

        // Cursor 0 is always answered immediately thanks to the sentinel entry
        let (cursor, revoked) = self.log.receive(0, parent).await?;
        if revoked.iter().any(|sid| *sid == session.session_id) {
            return Err(AppError::RevokedSession);
        }

        let token = parent.child_token();
        let revoked_flag = Arc::new(AtomicBool::new(false));
        self.spawn_watcher(session.session_id, cursor, token.clone(), revoked_flag.clone());

        debug!(user_id = session.user_id, "Watching session for revocation");
        Ok(AuthenticatedContext::new(session.user_id, token, revoked_flag, true))
    }

    /// Context for `user_id` without credential checks or revocation watching.
    ///
    /// Meant for internal routes that authenticate by other means.
    pub fn authenticated_context(&self, user_id: UserId, parent: &CancellationToken) -> AuthenticatedContext {
        AuthenticatedContext::new(
            user_id,
            parent.child_token(),
            Arc::new(AtomicBool::new(false)),
            false,
        )
    }

    /// User id of a request whose context was attached to `extensions`.
    ///
    /// # Panics
    ///
    /// If the request never went through authentication. That is a wiring
    /// bug in the caller, not a runtime condition.
    pub fn from_context(&self, extensions: &Extensions) -> UserId {
        if self.is_fake() {
            return FAKE_USER_ID;
        }

        match extensions.get::<AuthUser>() {
            Some(AuthUser(user_id)) => *user_id,
            None => panic!("call to Authenticator::from_context() without Authenticator::authenticate()"),
        }
    }

    /// Start the logout ingestor and the pruner. Fake mode starts nothing.
    pub fn spawn_background(
        &self,
        source: Arc<dyn LogoutEventSource>,
        error_handler: Option<Arc<dyn ErrorHandler>>,
        shutdown: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        if self.is_fake() {
            info!("Fake authentication enabled, revocation tasks not started");
            return Vec::new();
        }

        let revocation = &self.config.revocation;
        let ingestor = LogoutIngestor::new(
            self.log.clone(),
            source,
            self.metrics.clone(),
            revocation.ingest_retry(),
        )
        .with_error_handler(error_handler);
        let pruner = Pruner::new(
            self.log.clone(),
            self.metrics.clone(),
            revocation.prune_interval(),
            revocation.retention_window(),
        );

        vec![
            tokio::spawn(ingestor.run(shutdown.clone())),
            tokio::spawn(pruner.run(shutdown)),
        ]
    }

    /// Bearer credential from the configured header, if any
    fn credential<'h>(&self, headers: &'h HeaderMap) -> AppResult<Option<&'h str>> {
        let Some(value) = headers.get(self.config.auth.header_name.as_str()) else {
            return Ok(None);
        };

        let value = value
            .to_str()
            .map_err(|_| AppError::InvalidCredential("authentication header is not valid text".to_string()))?;

        Ok(strip_bearer(value))
    }

    fn spawn_watcher(
        &self,
        session_id: String,
        cursor: Cursor,
        token: CancellationToken,
        revoked: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let log = self.log.clone();
        let metrics = self.metrics.clone();
        metrics.watcher_started();

        tokio::spawn(async move {
            let mut cursor = cursor;
            // Any receive error means the context is gone; nothing left to guard
            while let Ok((next, ids)) = log.receive(cursor, &token).await {
                if ids.iter().any(|sid| *sid == session_id) {
                    revoked.store(true, Ordering::Release);
                    metrics.record_session_revoked();
                    token.cancel();
                    info!(session_id = %session_id, "Session revoked, canceling request context");
                    break;
                }
                cursor = next;
            }
            metrics.watcher_stopped();
        })
    }
}

/// Strip a case-insensitive `bearer ` prefix. Without the prefix there is no credential.
fn strip_bearer(value: &str) -> Option<&str> {
    let prefix = value.get(..BEARER_PREFIX.len())?;
    if prefix.eq_ignore_ascii_case(BEARER_PREFIX) {
        Some(&value[BEARER_PREFIX.len()..])
    } else {
        None
    }
}

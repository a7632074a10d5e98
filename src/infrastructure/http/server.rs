//! HTTP server implementation
//!
//! Owns the revocation log and wires the logout ingestor, the pruner and the
//! routes around it. The server runs until Ctrl-C or until the shutdown token
//! is canceled, then waits for the background tasks to wind down.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};
use warp::{Filter, Reply};

use crate::application::services::Authenticator;
use crate::config::AppConfig;
use crate::domain::ports::{ErrorHandler, LogoutEventSource};
use crate::infrastructure::adapters::{ChannelLogoutSource, JwtTokenValidator, LogoutNotifier, RevocationLog};
use crate::infrastructure::http::routes::RouteBuilder;
use crate::shared::error::{AppError, AppResult};
use crate::shared::metrics::RevocationMetrics;

/// HTTP server guarding requests against session revocation
pub struct HttpServer {
    config: Arc<AppConfig>,
    authenticator: Arc<Authenticator>,
    source: Arc<dyn LogoutEventSource>,
    notifier: LogoutNotifier,
    metrics: Arc<RevocationMetrics>,
    shutdown: CancellationToken,
}

impl HttpServer {
    /// Create a new HTTP server instance
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let config = Arc::new(config);
        let metrics = Arc::new(RevocationMetrics::new()?);
        let log = Arc::new(RevocationLog::new());
        let validator = Arc::new(JwtTokenValidator::new(&config.auth.token));
        let (source, notifier) = ChannelLogoutSource::new();

        let authenticator = Arc::new(Authenticator::new(
            config.clone(),
            validator,
            log,
            metrics.clone(),
        ));

        Ok(Self {
            config,
            authenticator,
            source: Arc::new(source),
            notifier,
            metrics,
            shutdown: CancellationToken::new(),
        })
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    pub fn metrics(&self) -> &Arc<RevocationMetrics> {
        &self.metrics
    }

    /// Handle for feeding logout notifications in-process
    pub fn notifier(&self) -> LogoutNotifier {
        self.notifier.clone()
    }

    /// Token that stops the server when canceled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Create the application routes
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        RouteBuilder::build_routes(
            self.authenticator.clone(),
            self.notifier.clone(),
            self.metrics.clone(),
            self.shutdown.clone(),
        )
    }

    /// Start the background tasks without serving HTTP
    pub fn spawn_background(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let error_handler: Arc<dyn ErrorHandler> = Arc::new(|err: &AppError| {
            error!(error = %err, code = err.code(), "Revocation ingestion error");
        });

        self.authenticator
            .spawn_background(self.source.clone(), Some(error_handler), self.shutdown.clone())
    }

    /// Run the HTTP server
    #[instrument(skip(self))]
    pub async fn run(self) -> AppResult<()> {
        let addr = SocketAddr::new(self.config.server.bind_address, self.config.server.port);

        if self.authenticator.is_fake() {
            info!("Fake authentication enabled, every request runs as the fake user");
        }

        let tasks = self.spawn_background();
        let routes = self.routes();
        let shutdown = self.shutdown.clone();

        info!("Starting HTTP server on {}", addr);
        tokio::select! {
            _ = warp::serve(routes).run(addr) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
            }
            _ = shutdown.cancelled() => {
                info!("Shutdown requested");
            }
        }

        shutdown.cancel();
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Background task failed");
            }
        }

        info!("HTTP server stopped");
        Ok(())
    }
}

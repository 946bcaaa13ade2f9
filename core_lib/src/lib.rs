//! Core library for the church sound installation site: the contact/quote-request
//! submission pipeline and the HTTP surface that hosts the form.

pub mod config;
pub mod contact;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod site;
pub mod store;

pub use crate::config::AppConfig;
pub use contact::{
    ContactForm, ContactSubmissionService, DeliveryTarget, DeliveryTransport, HttpDelivery,
    SubmissionError, TokenRelayWidget,
};
pub use error::{AppError, Result};
pub use handlers::routes::create_routes;
pub use middleware::rate_limit::RateLimiter;
pub use site::SiteProfile;
pub use store::FormStore;

use axum::Router;
use contact::{Clock, SystemClock};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub app_name: String,
    pub version: String,
    pub config: Arc<AppConfig>,
    pub site: SiteProfile,
    pub forms: FormStore,
    pub delivery: Arc<dyn DeliveryTransport>,
    pub challenge_widget: Arc<TokenRelayWidget>,
    pub clock: Arc<dyn Clock>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.contact.request_timeout_ms);
        let delivery = HttpDelivery::new(timeout).map_err(|e| anyhow::anyhow!(e))?;
        Ok(Self::with_transport(config, Arc::new(delivery)))
    }

    pub fn with_transport(config: AppConfig, delivery: Arc<dyn DeliveryTransport>) -> Self {
        Self {
            app_name: config.site.business_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            site: SiteProfile::from_config(&config.site),
            forms: FormStore::from_config(&config.forms),
            rate_limiter: RateLimiter::from_config(&config.rate_limit),
            challenge_widget: Arc::new(TokenRelayWidget::new()),
            clock: Arc::new(SystemClock),
            delivery,
            config: Arc::new(config),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_challenge_widget(mut self, widget: Arc<TokenRelayWidget>) -> Self {
        self.challenge_widget = widget;
        self
    }

    /// A fresh form with its own submission state.
    pub async fn open_form(&self) -> ContactForm {
        let service =
            ContactSubmissionService::from_config(&self.config, self.delivery.clone(), self.clock.clone());
        ContactForm::with_challenge(service, self.challenge_widget.clone(), &self.config.challenge).await
    }

    pub fn delivery_configured(&self) -> bool {
        DeliveryTarget::resolve(&self.config.contact).is_ok()
    }

    /// Periodically drops idle form sessions and stale rate-limit entries.
    pub fn spawn_maintenance(&self) -> tokio::task::JoinHandle<()> {
        let forms = self.forms.clone();
        let rate_limiter = self.rate_limiter.clone();
        let period = Duration::from_secs(self.config.forms.prune_interval_seconds.max(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let pruned = forms.prune_idle();
                let forgotten = rate_limiter.cleanup();
                if pruned > 0 || forgotten > 0 {
                    info!(pruned, forgotten, open_forms = forms.len(), "maintenance sweep");
                }
            }
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    let mut router = Router::new().merge(create_routes(&state));

    router = router.layer(middleware::cors::cors_layer_from_config(&state.config.cors));
    router = middleware::logging::with_request_logging(router);

    router.with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let app = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use listgate::backend::{HttpBackend, MailingListBackend};
use listgate::config::Config;
use listgate::csrf::CsrfGate;
use listgate::lists::ListRegistry;
use listgate::notify::{Mailer, SmtpMailer};
use listgate::pipeline::{Pipeline, Services};
use listgate::server::{AppState, build_router};
use listgate::store::{RateLimiter, TokenStore};
use listgate::types::BackendName;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration is invalid");
            std::process::exit(1);
        }
    };

    let tokens = Arc::new(TokenStore::new(config.ttl));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let registry = Arc::new(ListRegistry::new());
    let csrf = CsrfGate::new(Arc::clone(&tokens));

    let mut backends: HashMap<BackendName, Arc<dyn MailingListBackend>> = HashMap::new();
    for backend_config in &config.backends {
        match HttpBackend::new(backend_config, config.http_timeout) {
            Ok(backend) => {
                backends.insert(backend_config.name.clone(), Arc::new(backend));
            }
            Err(e) => {
                tracing::error!(backend = %backend_config.name, error = %e, "backend client failed to build");
                std::process::exit(1);
            }
        }
    }

    let mailer: Arc<dyn Mailer> = match SmtpMailer::new(&config.smtp) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            tracing::error!(error = %e, "SMTP mailer failed to build");
            std::process::exit(1);
        }
    };

    let services = Arc::new(Services {
        tokens: Arc::clone(&tokens),
        limiter: Arc::clone(&limiter),
        csrf,
        registry: Arc::clone(&registry),
        backends,
        mailer,
        public_url: config.public_url.clone(),
        operator_email: config.operator_email.clone(),
        warn_every: config.warn_every,
        list_filter: config.list_filter.clone(),
    });

    services.refresh_registry().await;
    if registry.is_empty() {
        tracing::warn!("no lists are served after the initial fetch");
    } else {
        tracing::info!(lists = registry.len(), "serving lists");
    }

    let shutdown = CancellationToken::new();
    let pipeline = Pipeline::start(Arc::clone(&services), config.queue_capacity);

    let maintenance = tokio::spawn(maintenance_loop(
        Arc::clone(&services),
        config.refresh_interval,
        shutdown.clone(),
    ));

    let app_state = AppState::new(pipeline);
    let app = build_router(app_state.clone());

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "could not bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {}", config.listen_addr);

    let serve_result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
    .await;
    if let Err(e) = serve_result {
        tracing::error!(error = %e, "server error");
    }

    app_state.pipeline().shutdown().await;
    let _ = maintenance.await;
    tracing::info!("gateway stopped");
}

/// Waits for Ctrl-C, then propagates the shutdown signal.
async fn shutdown_signal(shutdown: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    shutdown.cancel();
}

/// Periodic maintenance: registry refresh plus store pruning.
///
/// Correctness never depends on this loop; expiry is evaluated lazily at
/// access time and the refresh merely keeps the list view current.
async fn maintenance_loop(
    services: Arc<Services>,
    refresh_interval: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(refresh_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; the initial fetch already ran.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                services.refresh_registry().await;
                let dropped_tokens = services.tokens.prune();
                let dropped_ips = services.limiter.prune();
                tracing::debug!(dropped_tokens, dropped_ips, "maintenance pass finished");
            }
        }
    }
}

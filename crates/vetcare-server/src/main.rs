//! VetCare+ API server
//!
//! Usage: `vetcare [config.ron]` (default `config/vetcare.ron`).
//! Secrets come from `VETCARE_AI_KEY` and `VETCARE_MAIL_KEY`; log filtering
//! from `RUST_LOG`.

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use vetcare_ai::{GeminiClient, GeminiConfig, GenerativeModel, ScriptedModel};
use vetcare_db::Store;
use vetcare_jobs::{spawn_daily_reminders, InvoiceWatcher, LogMailer, Mailer, ResendConfig, ResendMailer};
use vetcare_server::{dispatch, AppState, ApiRequest, Config, TokenAuthProvider};

const DEFAULT_CONFIG: &str = "config/vetcare.ron";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let mut config = if Path::new(&config_path).exists() {
        info!(path = %config_path, "loading configuration");
        Config::load(&config_path)?
    } else {
        warn!(path = %config_path, "configuration file not found, using defaults");
        Config::default()
    };
    config.apply_env();
    config.validate()?;

    let store = if config.in_memory() {
        warn!("using an in-memory database; data is lost on exit");
        Arc::new(Store::in_memory()?)
    } else {
        info!(path = %config.database, "opening database");
        Arc::new(Store::open(&config.database)?)
    };

    let model: Arc<dyn GenerativeModel> = match &config.ai.api_key {
        Some(key) => Arc::new(GeminiClient::new(GeminiConfig {
            base_url: config.ai.base_url.clone(),
            model: config.ai.model.clone(),
            api_key: key.clone(),
            timeout: Duration::from_secs(config.ai.timeout_secs),
        })?),
        None => {
            warn!("no AI key configured; generative routes will answer 502");
            Arc::new(ScriptedModel::default())
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.mail.api_key {
        Some(key) => Arc::new(ResendMailer::new(ResendConfig {
            base_url: config.mail.base_url.clone(),
            api_key: key.clone(),
            from: config.mail.from.clone(),
            timeout: Duration::from_secs(config.mail.timeout_secs),
        })?),
        None => {
            warn!("no mail key configured; emails are logged only");
            Arc::new(LogMailer)
        }
    };

    let auth = TokenAuthProvider::new(&config.tokens);
    if auth.is_empty() {
        warn!("no tokens configured; only public routes are reachable");
    }
    let state = Arc::new(AppState::new(
        store.clone(),
        Arc::new(auth),
        model,
        config.rate_limit.clone(),
        &config.cache,
    )?);

    let _cleanup = state.limiter.clone().start_cleanup_task();
    let reminders = config.jobs.reminders.then(|| {
        spawn_daily_reminders(
            store.clone(),
            mailer.clone(),
            config.clinic.clone(),
            config.jobs.reminder_hour_utc,
        )
    });
    let watcher = if config.jobs.payment_followup {
        Some(InvoiceWatcher::spawn(store.clone(), mailer.clone(), config.clinic.clone())?)
    } else {
        None
    };

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, routes = state.router.len(), "listening");

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "accept failed");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(serve(&state, req).await) }
            });
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!(%remote, error = %e, "connection error");
            }
        });
    }

    if let Some(handle) = reminders {
        handle.abort();
    }
    if let Some(watcher) = watcher {
        watcher.stop();
    }
    info!("server stopped");
    Ok(())
}

async fn serve(state: &AppState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let response = match ApiRequest::from_hyper(req).await {
        Ok(request) => dispatch(state, request).await,
        Err(e) => e.into_response(),
    };
    response.into_hyper()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

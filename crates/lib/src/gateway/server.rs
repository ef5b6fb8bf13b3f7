//! Gateway HTTP server: health route and the Telegram webhook route.

use crate::channels::TelegramChannel;
use crate::config::{self, Config};
use crate::error::RelayError;
use crate::llm::OpenAiClient;
use crate::relay::Relay;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

/// Body of `GET /`.
pub const STATUS_MESSAGE: &str = "Telegram relay bot is running";

/// Shared state for the gateway. Built once at startup; immutable afterwards.
#[derive(Clone)]
pub struct GatewayState {
    pub relay: Relay,
}

/// Build the HTTP routes. Separate from [`run_gateway`] so tests can drive it directly.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", post(webhook))
        .with_state(state)
}

/// Construct the Telegram channel from config (token and API base, env overrides applied).
pub fn telegram_channel(config: &Config) -> TelegramChannel {
    TelegramChannel::new(
        config::resolve_telegram_token(config),
        config::resolve_telegram_api_base(config),
    )
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Fails when no completion API key is configured.
/// When `channels.telegram.webhookUrl` is set, registers it with Telegram on startup and removes it on shutdown.
/// Blocks until shutdown (Ctrl+C or SIGTERM).
pub async fn run_gateway(config: Config) -> Result<()> {
    run_gateway_until(config, shutdown_signal()).await
}

/// Same as [`run_gateway`], but stops when `shutdown` completes instead of on a process signal.
pub async fn run_gateway_until<F>(config: Config, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let api_key = config::resolve_api_key(&config).context(
        "refusing to start without a completion API key (set completion.apiKey or API_KEY)",
    )?;
    let provider = OpenAiClient::new(config::resolve_completion_base_url(&config), Some(api_key));
    log::info!("completion provider: {}", provider.base_url());

    let telegram = Arc::new(telegram_channel(&config));
    if config::resolve_telegram_token(&config).is_none() {
        log::warn!("telegram bot token not configured (set channels.telegram.botToken or TELEGRAM_TOKEN); replies will fail");
    }

    let webhook_url = config.channels.telegram.webhook_url.clone();
    let telegram_webhook_for_shutdown = match webhook_url {
        Some(ref url) => {
            if let Err(e) = telegram.set_webhook(url).await {
                log::warn!("telegram set_webhook failed: {}", e);
            } else {
                log::info!("telegram webhook registered: {}", url);
            }
            Some(telegram.clone())
        }
        None => None,
    };

    let state = GatewayState {
        relay: Relay::new(Arc::new(provider), telegram),
    };
    let app = router(state);

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            log::info!("shutting down, draining connections");
            if let Some(t) = telegram_webhook_for_shutdown {
                if let Err(e) = t.delete_webhook().await {
                    log::debug!("telegram delete_webhook on shutdown: {}", e);
                }
            }
        })
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
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
    log::info!("shutdown signal received");
}

/// POST /webhook — relays one Telegram update. 200 `{"ok": true}` or 500 `{"error": ..}`.
/// The relay runs in its own task so a dropped webhook connection does not cancel it midway;
/// relay failures are logged inside that task for the same reason.
/// A body that cannot be buffered (e.g. over the body size limit) is a malformed update.
async fn webhook(
    State(state): State<GatewayState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<serde_json::Value>, RelayError> {
    let body = body.map_err(|e| {
        let err = RelayError::Malformed(e.body_text());
        log::error!("webhook: {}", err);
        err
    })?;
    let relay = state.relay.clone();
    let task = tokio::spawn(async move {
        relay
            .handle_inbound(&body)
            .await
            .inspect_err(|e| log::error!("webhook: {}", e))
    });
    match task.await {
        Ok(result) => result.map(|()| Json(json!({ "ok": true }))),
        Err(e) => {
            let err = RelayError::Task(e.to_string());
            log::error!("webhook: {}", err);
            Err(err)
        }
    }
}

/// GET / returns a fixed status JSON for liveness checks.
async fn health_http() -> Json<serde_json::Value> {
    Json(json!({ "message": STATUS_MESSAGE }))
}

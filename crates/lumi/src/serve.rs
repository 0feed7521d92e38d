// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `lumi serve` command implementation.
//!
//! Wires storage, the gateway client, the completion adapter, the agent
//! components and the HTTP surface together, then serves until a shutdown
//! signal arrives. Shutdown drains background tasks before the database is
//! checkpointed.

use std::sync::Arc;
use std::time::Duration;

use lumi_agent::{
    ConnectivityOrchestrator, ConversationEngine, ConversationSettings, OrchestratorSettings,
    TaskOutcome, TaskPool, install_signal_handler, spawn_outcome_logger,
};
use lumi_anthropic::AnthropicCompletion;
use lumi_config::model::LumiConfig;
use lumi_core::{CompletionAdapter, LumiError, SharedConnectivity};
use lumi_gateway::{AppState, build_router, start_server};
use lumi_storage::SqliteStorage;
use lumi_waha::WahaClient;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Everything the HTTP surface needs, plus handles kept for shutdown.
pub struct Services {
    pub state: AppState,
    pub storage: Arc<SqliteStorage>,
    pub outcomes: mpsc::Receiver<TaskOutcome>,
}

/// Opens storage and builds every collaborator from `config`.
pub async fn build_services(
    config: &LumiConfig,
    completion: Arc<dyn CompletionAdapter>,
    shutdown: CancellationToken,
) -> Result<Services, LumiError> {
    let storage = Arc::new(SqliteStorage::open(&config.storage).await?);
    info!(path = %config.storage.database_path, "storage opened");

    let gateway = Arc::new(WahaClient::from_config(&config.waha)?);
    let (tasks, outcomes) = TaskPool::new(config.tasks.max_concurrent, config.tasks.max_pending);

    let orchestrator = ConnectivityOrchestrator::new(
        gateway.clone(),
        storage.clone(),
        Arc::new(SharedConnectivity::new()),
        tasks.clone(),
        OrchestratorSettings::from_config(&config.waha),
    );
    let engine = ConversationEngine::new(
        storage.clone(),
        gateway.clone(),
        completion,
        ConversationSettings::from_config(config),
    );

    Ok(Services {
        state: AppState {
            orchestrator: Arc::new(orchestrator),
            engine: Arc::new(engine),
            store: storage.clone(),
            gateway,
            tasks,
            shutdown,
        },
        storage,
        outcomes,
    })
}

/// Runs the `lumi serve` command.
pub async fn run_serve(config: LumiConfig) -> Result<(), LumiError> {
    init_tracing(&config.agent.log_level);

    info!("starting lumi serve");

    let completion = Arc::new(AnthropicCompletion::new(&config.anthropic)?);
    let shutdown = install_signal_handler();

    let Services {
        state,
        storage,
        outcomes,
    } = build_services(&config, completion, shutdown.clone()).await?;

    if config.gateway.bearer_token.is_none() {
        warn!("gateway.bearer_token is not set; operator routes will reject every request");
    }

    let logger = spawn_outcome_logger(outcomes);
    let tasks = state.tasks.clone();
    let app = build_router(state, &config.gateway, &config.rate_limit);

    let served = start_server(&config.gateway, app, shutdown.clone()).await;
    shutdown.cancel();

    info!("http server stopped, draining background tasks");
    tasks
        .drain(Duration::from_secs(config.tasks.drain_timeout_secs))
        .await;
    logger.abort();

    if let Err(e) = storage.checkpoint().await {
        error!(error = %e, "final WAL checkpoint failed");
    }
    info!("lumi stopped");

    served
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lumi={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use lumi_core::{ChatKind, ChatStore};
    use lumi_test_utils::MockCompletion;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(dir: &tempfile::TempDir, waha_url: String) -> LumiConfig {
        let mut config = LumiConfig::default();
        config.storage.database_path = dir.path().join("lumi.db").to_string_lossy().into_owned();
        config.waha.base_url = waha_url;
        config.waha.api_key = Some("waha-key".into());
        config.gateway.bearer_token = Some("operator".into());
        config
    }

    #[tokio::test]
    async fn webhook_message_flows_through_sqlite_to_gateway() {
        let waha = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sendText"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "sent"})))
            .expect(2)
            .mount(&waha)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir, waha.uri());
        let completion = Arc::new(MockCompletion::with_responses(["Rust is great."]));
        let services = build_services(&config, completion.clone(), CancellationToken::new())
            .await
            .unwrap();

        services
            .storage
            .register_chat("15550001111@c.us", "Alice", ChatKind::Chat)
            .await
            .unwrap();

        let tasks = services.state.tasks.clone();
        let storage = services.storage.clone();
        let app = build_router(services.state, &config.gateway, &config.rate_limit);

        let event = json!({
            "event": "message",
            "session": "default",
            "payload": {
                "id": {"fromMe": false, "_serialized": "false_15550001111@c.us_X"},
                "from": "15550001111@c.us",
                "to": "15559990000@c.us",
                "body": "@lumi tell me about rust",
                "fromMe": false,
                "source": "app"
            }
        });
        let request = Request::post("/api/v1/webhook")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(event.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(tasks.drain(Duration::from_secs(10)).await);

        let calls = completion.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].prompt, "tell me about rust");

        let chat = storage.find_chat("15550001111@c.us").await.unwrap().unwrap();
        assert!(chat.is_agent_active);
        let history = storage.recent_messages("15550001111@c.us", 10).await.unwrap();
        assert_eq!(history[0].content, "Rust is great.");

        let sent = waha.received_requests().await.unwrap();
        let last: serde_json::Value = serde_json::from_slice(&sent[1].body).unwrap();
        assert_eq!(last["chatId"], "15550001111@c.us");
        assert_eq!(last["text"], "Rust is great.");
        assert_eq!(sent[1].headers.get("x-api-key").unwrap(), "waha-key");
    }

    #[tokio::test]
    async fn storage_is_created_under_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir, "http://127.0.0.1:9".into());
        config.storage.database_path = dir
            .path()
            .join("nested")
            .join("lumi.db")
            .to_string_lossy()
            .into_owned();

        let services = build_services(
            &config,
            Arc::new(MockCompletion::new()),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(services.storage.list_chats().await.unwrap().is_empty());
        assert!(dir.path().join("nested").join("lumi.db").exists());
    }
}

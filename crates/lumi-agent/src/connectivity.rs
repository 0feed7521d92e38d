// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drives the single gateway session towards a usable state.
//!
//! The orchestrator creates or starts the session as needed, then polls its
//! status until it can produce credentials (`SCAN_QR_CODE`) or is linked
//! (`WORKING`). Status pushes from the webhook update the shared
//! connectivity state, and a transition to `WORKING` registers the linked
//! account's own chat in the background.

use std::sync::Arc;
use std::time::Duration;

use lumi_config::model::WahaConfig;
use lumi_core::{
    ChatKind, ChatStore, ConnectivityState, GatewayClient, LinkCode, LumiError, Profile,
    SessionInfo, SessionStatus,
};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::tasks::TaskPool;

/// Session name and polling cadence.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub session_name: String,
    pub poll_interval: Duration,
    pub ready_timeout: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &WahaConfig) -> Self {
        Self {
            session_name: config.session_name.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            ready_timeout: Duration::from_secs(config.ready_timeout_secs),
        }
    }
}

pub struct ConnectivityOrchestrator {
    gateway: Arc<dyn GatewayClient>,
    store: Arc<dyn ChatStore>,
    state: Arc<dyn ConnectivityState>,
    tasks: TaskPool,
    settings: OrchestratorSettings,
}

impl ConnectivityOrchestrator {
    pub fn new(
        gateway: Arc<dyn GatewayClient>,
        store: Arc<dyn ChatStore>,
        state: Arc<dyn ConnectivityState>,
        tasks: TaskPool,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            state,
            tasks,
            settings,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.settings.session_name
    }

    /// Last status observed through polling or a webhook push.
    pub fn status(&self) -> String {
        self.state.get()
    }

    /// Ensures the session exists and is running, then waits until it is
    /// usable.
    ///
    /// A missing session is created; a `STOPPED` or `FAILED` one is
    /// started. Any other status is left alone and only polled.
    pub async fn start_session(&self, cancel: &CancellationToken) -> Result<(), LumiError> {
        let name = self.session_name();
        match self.gateway.session_status(name).await {
            Ok(status) => {
                self.state.set(&status.to_string());
                if matches!(status, SessionStatus::Stopped | SessionStatus::Failed) {
                    info!(session = name, %status, "starting existing session");
                    self.gateway.start_session(name).await?;
                }
            }
            Err(LumiError::SessionNotFound { .. }) => {
                info!(session = name, "session does not exist, creating it");
                self.gateway.create_session(name).await?;
            }
            Err(e) => return Err(e),
        }

        self.wait_until_ready(cancel).await
    }

    /// Restarts the session and waits until it is usable again.
    pub async fn restart_session(&self, cancel: &CancellationToken) -> Result<(), LumiError> {
        info!(session = self.session_name(), "restarting session");
        self.gateway.restart_session(self.session_name()).await?;
        self.wait_until_ready(cancel).await
    }

    pub async fn stop_session(&self) -> Result<(), LumiError> {
        info!(session = self.session_name(), "stopping session");
        self.gateway.stop_session(self.session_name()).await?;
        self.state.set(&SessionStatus::Stopped.to_string());
        Ok(())
    }

    pub async fn session_info(&self) -> Result<SessionInfo, LumiError> {
        let info = self.gateway.session_info(self.session_name()).await?;
        self.state.set(&info.status.to_string());
        Ok(info)
    }

    /// QR code image for linking. Only meaningful while `SCAN_QR_CODE`.
    pub async fn qr_code(&self) -> Result<Vec<u8>, LumiError> {
        self.gateway.qr_code(self.session_name()).await
    }

    pub async fn request_link_code(
        &self,
        phone_number: &str,
        method: Option<&str>,
    ) -> Result<LinkCode, LumiError> {
        self.gateway
            .request_link_code(self.session_name(), phone_number, method)
            .await
    }

    pub async fn profile(&self) -> Result<Profile, LumiError> {
        self.gateway.profile(self.session_name()).await
    }

    /// The linked account, or `None` when the session is not yet linked.
    ///
    /// A successful lookup also makes sure the account's own chat is
    /// registered.
    pub async fn linked_profile(&self) -> Option<Profile> {
        match self.profile().await {
            Ok(profile) => {
                if let Err(e) = ensure_self_registered(self.store.as_ref(), &profile).await {
                    warn!(error = %e, "failed to register self chat");
                }
                Some(profile)
            }
            Err(e) => {
                debug!(error = %e, "session has no linked profile");
                None
            }
        }
    }

    /// Records a status pushed by the gateway.
    ///
    /// The state is updated before returning. On `WORKING` the profile is
    /// fetched and the self chat registered on the task pool.
    pub fn on_session_status(&self, status: SessionStatus) {
        info!(session = self.session_name(), %status, "session status changed");
        self.state.set(&status.to_string());

        if status == SessionStatus::Working {
            let gateway = Arc::clone(&self.gateway);
            let store = Arc::clone(&self.store);
            let name = self.settings.session_name.clone();
            self.tasks.submit("self-registration", async move {
                let profile = gateway.profile(&name).await?;
                ensure_self_registered(store.as_ref(), &profile).await?;
                Ok(())
            });
        }
    }

    async fn wait_until_ready(&self, cancel: &CancellationToken) -> Result<(), LumiError> {
        let name = self.session_name();
        let timeout = self.settings.ready_timeout;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let period = self.settings.poll_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LumiError::Cancelled),
                _ = &mut deadline => {
                    warn!(session = name, ?timeout, "session did not become ready in time");
                    return Err(LumiError::Timeout { duration: timeout });
                }
                _ = ticker.tick() => {
                    let polled = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(LumiError::Cancelled),
                        _ = &mut deadline => {
                            warn!(session = name, ?timeout, "session status poll did not finish in time");
                            return Err(LumiError::Timeout { duration: timeout });
                        }
                        polled = self.gateway.session_status(name) => polled,
                    };
                    let status = match polled {
                        Ok(status) => status,
                        Err(e) if e.is_transient() => {
                            debug!(session = name, error = %e, "status poll failed, retrying");
                            continue;
                        }
                        Err(e) => {
                            warn!(session = name, error = %e, "status poll rejected");
                            return Err(e);
                        }
                    };
                    self.state.set(&status.to_string());
                    match status {
                        SessionStatus::ScanRequired | SessionStatus::Working => {
                            info!(session = name, %status, "session ready");
                            return Ok(());
                        }
                        SessionStatus::Failed => {
                            return Err(LumiError::SessionFailed { name: name.to_string() });
                        }
                        SessionStatus::Stopped => {
                            return Err(LumiError::SessionStopped { name: name.to_string() });
                        }
                        _ => debug!(session = name, %status, "session not ready yet"),
                    }
                }
            }
        }
    }
}

/// Registers the linked account's own chat unless it already is.
///
/// Returns `true` when a new registration was made.
pub async fn ensure_self_registered(
    store: &dyn ChatStore,
    profile: &Profile,
) -> Result<bool, LumiError> {
    if profile.id.is_empty() || store.is_chat_allowed(&profile.id).await? {
        return Ok(false);
    }
    store
        .register_chat(&profile.id, &profile.self_chat_name(), ChatKind::SelfChat)
        .await?;
    info!(chat_id = %profile.id, "registered self chat");
    Ok(true)
}

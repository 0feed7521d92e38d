// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion adapter for deterministic testing.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lumi_core::{CompletionAdapter, LumiError};

/// Arguments of one recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCall {
    pub system_prompt: String,
    pub history: Vec<String>,
    pub prompt: String,
}

/// A completion adapter returning queued responses.
///
/// When the queue is empty, `"mock reply"` is returned.
pub struct MockCompletion {
    responses: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<CompletionCall>>,
    fail: bool,
    delay: Option<Duration>,
}

impl Default for MockCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCompletion {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fail: false,
            delay: None,
        }
    }

    /// Pre-loads responses, returned in order.
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            ..Self::new()
        }
    }

    /// Every call fails with a completion error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Sleeps (on the tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every call made so far.
    pub async fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl CompletionAdapter for MockCompletion {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[String],
        prompt: &str,
    ) -> Result<String, LumiError> {
        self.calls.lock().await.push(CompletionCall {
            system_prompt: system_prompt.to_string(),
            history: history.to_vec(),
            prompt: prompt.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail {
            return Err(LumiError::Completion {
                message: "mock completion failure".into(),
                source: None,
            });
        }

        Ok(self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock reply".to_string()))
    }
}

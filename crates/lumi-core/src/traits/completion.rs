// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI text generation.

use async_trait::async_trait;

use crate::error::LumiError;

/// Opaque, stateless text completion.
#[async_trait]
pub trait CompletionAdapter: Send + Sync + 'static {
    /// Generates a reply to `prompt`.
    ///
    /// `history` holds earlier turns, oldest first, each already prefixed
    /// with its speaker (e.g. `"User: hi"`).
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[String],
        prompt: &str,
    ) -> Result<String, LumiError>;
}

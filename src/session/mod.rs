//! Inference session: one conversation thread bound to an Active model.
//!
//! A send is split in two halves so a driver can release its own locks
//! across the provider call:
//!
//! - `begin` validates input, records the user turn, writes the inbound log
//!   line and marks the session as awaiting. It never awaits.
//! - `settle` applies the provider outcome and clears the awaiting flag.
//!
//! `send` runs both halves for a caller that owns the session outright.
//! Non-conversational models never produce a request; `begin` logs the
//! signal line and returns `None`.

pub mod prompts;

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::catalog::ModelSpec;
use crate::eventlog::{EventCategory, EventLog};
use crate::provider::{InferenceProvider, InferenceReply, InferenceRequest, ProviderError};

/// Placeholder recorded when the backend replies with no text.
pub const EMPTY_REPLY: &str = "Empty";

/// Who spoke a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One conversation turn. Never edited after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Rejections from `begin`/`send`. A rejected send changes nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("input is empty")]
    EmptyInput,

    #[error("a response is already in flight")]
    AwaitingResponse,
}

/// What a completed send produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The model turn that was appended.
    Replied(ConversationTurn),
    /// The provider failed; nothing was appended.
    ProviderFailed(String),
    /// Non-conversational model: the payload was logged as a signal.
    Signal,
    /// The reply arrived for a session that is no longer open.
    Discarded,
}

/// Point-in-time copy of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub model_id: String,
    pub turns: Vec<ConversationTurn>,
    pub awaiting: bool,
}

#[derive(Debug)]
pub struct InferenceSession {
    id: Uuid,
    model: ModelSpec,
    turns: Vec<ConversationTurn>,
    awaiting: bool,
    log: EventLog,
}

impl InferenceSession {
    pub fn new(model: ModelSpec, log: EventLog) -> Self {
        Self {
            id: Uuid::new_v4(),
            model,
            turns: Vec::new(),
            awaiting: false,
            log,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// Validate and record an outgoing message.
    ///
    /// Returns the provider request for conversational models, `None` for
    /// the others. The logged payload size is the UTF-8 byte length of
    /// `text`, not its character count.
    pub fn begin(&mut self, text: &str) -> Result<Option<InferenceRequest>, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        if self.awaiting {
            return Err(SessionError::AwaitingResponse);
        }

        self.log.append(
            EventCategory::Inbound,
            format!("POST /inference - Payload: {}b", text.len()),
        );

        if !self.model.category.is_conversational() {
            self.log.append(
                EventCategory::Signal,
                format!("Processing {} stream...", self.model.category),
            );
            return Ok(None);
        }

        self.turns.push(ConversationTurn::user(text));
        self.awaiting = true;
        Ok(Some(InferenceRequest {
            model_id: self.model.id.clone(),
            prompt: text.to_string(),
            instruction: Some(prompts::response_instruction(&self.model.name)),
        }))
    }

    /// Apply a provider outcome to the request started by `begin`.
    pub fn settle(&mut self, result: Result<InferenceReply, ProviderError>) -> SendOutcome {
        if !self.awaiting {
            debug!(session = %self.id, "settle with no request in flight");
            return SendOutcome::Discarded;
        }
        self.awaiting = false;

        match result {
            Ok(reply) => {
                let text = if reply.text.is_empty() {
                    EMPTY_REPLY.to_string()
                } else {
                    reply.text
                };
                let turn = ConversationTurn::model(text);
                self.turns.push(turn.clone());
                self.log.append(EventCategory::Outbound, "200 OK");
                SendOutcome::Replied(turn)
            }
            Err(e) => {
                warn!(model_id = %self.model.id, "inference failed: {e}");
                self.log.append(EventCategory::Error, "Crash detected");
                SendOutcome::ProviderFailed(e.to_string())
            }
        }
    }

    /// Send a message and wait for the reply.
    pub async fn send(
        &mut self,
        text: &str,
        provider: &dyn InferenceProvider,
    ) -> Result<SendOutcome, SessionError> {
        let Some(request) = self.begin(text)? else {
            return Ok(SendOutcome::Signal);
        };
        let result = provider.infer(request).await;
        Ok(self.settle(result))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            model_id: self.model.id.clone(),
            turns: self.turns.clone(),
            awaiting: self.awaiting,
        }
    }
}

//! Reporting sink: pushes progress and result text back to a conversation

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::ReportError;
use crate::types::{ChatId, MessageId};

/// Capability to edit a message in the originating conversation
///
/// Implemented by the chat layer. The core only ever edits the message the
/// request layer created for the task.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Replace the text of `message` in `chat`
    async fn update_message(
        &self,
        chat: ChatId,
        message: MessageId,
        text: &str,
    ) -> Result<(), ReportError>;
}

/// Reporter that discards every update
///
/// Useful for headless runs where no conversation is attached.
pub struct NoOpReporter;

#[async_trait]
impl Reporter for NoOpReporter {
    async fn update_message(
        &self,
        _chat: ChatId,
        _message: MessageId,
        _text: &str,
    ) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Handle back to the conversation a task came from
///
/// Carries the ids of the status message, the reporter capability, and the
/// session's cancellation token. Cloning is cheap.
#[derive(Clone)]
pub struct ReportContext {
    /// Conversation the request came from
    pub chat_id: ChatId,
    /// Message edited with progress and results
    pub message_id: MessageId,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
}

impl ReportContext {
    /// Create a context with a fresh cancellation token
    pub fn new(chat_id: ChatId, message_id: MessageId, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            chat_id,
            message_id,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    /// Tie the context to an existing session token
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Session cancellation token
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the session has been canceled
    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Edit the status message; failures are logged and swallowed
    pub async fn update(&self, text: &str) {
        if let Err(e) = self
            .reporter
            .update_message(self.chat_id, self.message_id, text)
            .await
        {
            tracing::warn!(
                chat_id = %self.chat_id,
                message_id = %self.message_id,
                error = %e,
                "Failed to update status message"
            );
        }
    }
}

impl std::fmt::Debug for ReportContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportContext")
            .field("chat_id", &self.chat_id)
            .field("message_id", &self.message_id)
            .field("canceled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FlakyReporter {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Reporter for FlakyReporter {
        async fn update_message(
            &self,
            _chat: ChatId,
            _message: MessageId,
            text: &str,
        ) -> Result<(), ReportError> {
            self.calls.lock().unwrap().push(text.to_string());
            Err(ReportError("message not modified".into()))
        }
    }

    #[tokio::test]
    async fn update_failures_are_swallowed() {
        let reporter = Arc::new(FlakyReporter {
            calls: Mutex::new(Vec::new()),
        });
        let ctx = ReportContext::new(ChatId(1), MessageId(2), reporter.clone());

        ctx.update("hello").await;

        assert_eq!(*reporter.calls.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn shared_token_cancels_context() {
        let session = CancellationToken::new();
        let ctx = ReportContext::new(ChatId(1), MessageId(2), Arc::new(NoOpReporter))
            .with_cancel_token(session.child_token());

        assert!(!ctx.is_canceled());
        session.cancel();
        assert!(ctx.is_canceled());
    }
}

//! History-aware question reformulation.
//!
//! Follow-up questions often lean on earlier turns ("what about the second
//! one?"). Before retrieval, such a question is rewritten into a standalone
//! form that can be embedded on its own. With no history there is nothing
//! to resolve, so the question passes through without a generation call.

use crate::core::errors::ApiError;
use crate::llm::{ChatMessage, ChatRequest, GenerationProvider};

const CONTEXTUALIZE_SYSTEM_PROMPT: &str = "Given a chat history and the latest user question \
which might reference context in the chat history, \
formulate a standalone question which can be understood \
without the chat history. Do NOT answer the question, \
just reformulate it if needed and otherwise return it as is.";

/// Rewrite `question` into a standalone question using the conversation
/// history. Identity on empty history; otherwise exactly one generation
/// call.
pub async fn rewrite_standalone(
    llm: &dyn GenerationProvider,
    history: &[ChatMessage],
    question: &str,
) -> Result<String, ApiError> {
    if history.is_empty() {
        return Ok(question.to_string());
    }

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(CONTEXTUALIZE_SYSTEM_PROMPT));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(question));

    let rewritten = llm.chat(ChatRequest::new(messages)).await?;
    let rewritten = rewritten.trim();

    if rewritten.is_empty() {
        tracing::warn!("Rewriter returned an empty question; falling back to the original");
        return Ok(question.to_string());
    }

    Ok(rewritten.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLlm {
        reply: String,
        calls: AtomicUsize,
    }

    impl CountingLlm {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GenerationProvider for CountingLlm {
        fn name(&self) -> &str {
            "counting"
        }

        async fn chat(&self, _request: ChatRequest) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn empty_history_is_identity_without_a_call() {
        let llm = CountingLlm::new("should not be used");

        let out = rewrite_standalone(&llm, &[], "What is X?").await.unwrap();

        assert_eq!(out, "What is X?");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_empty_history_invokes_the_gateway_exactly_once() {
        let llm = CountingLlm::new("What is the capital of France?");
        let history = vec![
            ChatMessage::user("Tell me about France."),
            ChatMessage::assistant("France is a country in Europe."),
        ];

        let out = rewrite_standalone(&llm, &history, "What is its capital?")
            .await
            .unwrap();

        assert_eq!(out, "What is the capital of France?");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_rewrite_falls_back_to_the_original_question() {
        let llm = CountingLlm::new("   ");
        let history = vec![ChatMessage::user("earlier turn")];

        let out = rewrite_standalone(&llm, &history, "What is X?").await.unwrap();

        assert_eq!(out, "What is X?");
    }
}

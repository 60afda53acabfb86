use super::prompt::{PromptInput, render_prompt};
use super::types::{Answer, AnswerError};
use crate::completion::{CompletionClient, CompletionRequest};
use std::sync::Arc;

/// Default sampling temperature for answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Default upper bound on the rendered prompt, in characters.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 120_000;

/// Produces answers from retrieved context via a completion model.
pub struct AnswerEngine {
    completion_client: Arc<dyn CompletionClient>,
    temperature: f32,
    max_prompt_chars: usize,
}

impl AnswerEngine {
    /// Create an engine with the given sampling temperature and prompt bound.
    pub fn new(
        completion_client: Arc<dyn CompletionClient>,
        temperature: f32,
        max_prompt_chars: usize,
    ) -> Self {
        Self {
            completion_client,
            temperature,
            max_prompt_chars,
        }
    }

    /// Render the prompt for `question` over `context` and ask the model. No retries.
    pub async fn answer(&self, question: &str, context: &[String]) -> Result<Answer, AnswerError> {
        let prompt = render_prompt(&PromptInput { context, question });
        let prompt_chars = prompt.chars().count();
        if prompt_chars > self.max_prompt_chars {
            tracing::warn!(
                prompt_chars,
                limit = self.max_prompt_chars,
                "Prompt exceeds configured limit"
            );
            return Err(AnswerError::ContextTooLarge {
                actual: prompt_chars,
                limit: self.max_prompt_chars,
            });
        }

        tracing::debug!(
            prompt_chars,
            context_chunks = context.len(),
            temperature = self.temperature,
            "Requesting completion"
        );
        let text = self
            .completion_client
            .complete(CompletionRequest {
                prompt,
                temperature: self.temperature,
            })
            .await?;

        Ok(Answer {
            text: text.trim().to_string(),
            context_chunks: context.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionClientError;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        requests: Mutex<Vec<CompletionRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl CompletionClient for RecordingClient {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<String, CompletionClientError> {
            self.requests.lock().await.push(request);
            if self.fail {
                Err(CompletionClientError::GenerationFailed("quota".into()))
            } else {
                Ok("  Paris.\n".into())
            }
        }
    }

    #[tokio::test]
    async fn passes_prompt_and_temperature_and_trims_output() {
        let client = Arc::new(RecordingClient::default());
        let engine = AnswerEngine::new(client.clone(), 0.3, DEFAULT_MAX_PROMPT_CHARS);

        let answer = engine
            .answer(
                "What is the capital of France?",
                &["The capital of France is Paris.".to_string()],
            )
            .await
            .expect("answer");

        assert_eq!(answer.text, "Paris.");
        assert_eq!(answer.context_chunks, 1);
        let requests = client.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert!((requests[0].temperature - 0.3).abs() < f32::EPSILON);
        assert!(requests[0].prompt.contains("The capital of France is Paris."));
        assert!(requests[0].prompt.contains("What is the capital of France?"));
    }

    #[tokio::test]
    async fn oversized_prompt_never_reaches_the_model() {
        let client = Arc::new(RecordingClient::default());
        let engine = AnswerEngine::new(client.clone(), 0.3, 100);

        let error = engine
            .answer("question", &["x".repeat(500)])
            .await
            .unwrap_err();

        assert!(matches!(error, AnswerError::ContextTooLarge { limit: 100, .. }));
        assert!(client.requests.lock().await.is_empty());
    }

    #[tokio::test]
    async fn completion_failure_propagates_without_retry() {
        let client = Arc::new(RecordingClient {
            fail: true,
            ..Default::default()
        });
        let engine = AnswerEngine::new(client.clone(), 0.3, DEFAULT_MAX_PROMPT_CHARS);

        let error = engine.answer("question", &[]).await.unwrap_err();

        assert!(matches!(error, AnswerError::Completion(_)));
        assert_eq!(client.requests.lock().await.len(), 1);
    }
}

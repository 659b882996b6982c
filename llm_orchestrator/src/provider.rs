//! The pipeline-facing `LLMProvider` contract (SPEC_FULL §6), plus a
//! deterministic null provider and a closure-backed test double.

use async_trait::async_trait;
use std::time::Instant;

use crate::{LLMOrchestrator, ModelTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    ProviderUnavailable,
    Timeout,
    RateLimited,
}

#[derive(Debug, Clone)]
pub struct GenerateOutput {
    pub content: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct Availability {
    pub available: bool,
    pub provider_id: String,
}

/// One role-tagged chat message; mirrors the executor's system/user framing.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        messages: &[ChatTurn],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<GenerateOutput, ProviderFailure>;

    async fn check_availability(&self) -> Availability;
}

/// Concrete implementation backed by the OpenRouter/Ollama orchestrator.
pub struct OpenRouterProvider {
    orchestrator: LLMOrchestrator,
}

impl OpenRouterProvider {
    pub fn new(orchestrator: LLMOrchestrator) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        messages: &[ChatTurn],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<GenerateOutput, ProviderFailure> {
        let _ = (max_tokens, temperature); // orchestrator-level knobs are fixed at construction.
        let mut prompt = String::from(system_prompt);
        for turn in messages {
            prompt.push_str("\n\n");
            prompt.push_str(turn.role);
            prompt.push_str(": ");
            prompt.push_str(&turn.content);
        }

        let start = Instant::now();
        match self
            .orchestrator
            .speak(&prompt, Some(ModelTier::Floor))
            .await
        {
            Ok(content) => Ok(GenerateOutput {
                content,
                latency_ms: start.elapsed().as_millis() as u64,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "llm provider call failed");
                if e.to_ascii_lowercase().contains("timeout") {
                    Err(ProviderFailure::Timeout)
                } else if e.to_ascii_lowercase().contains("rate") {
                    Err(ProviderFailure::RateLimited)
                } else {
                    Err(ProviderFailure::ProviderUnavailable)
                }
            }
        }
    }

    async fn check_availability(&self) -> Availability {
        match self.orchestrator.speak("ping", Some(ModelTier::Floor)).await {
            Ok(_) => Availability {
                available: true,
                provider_id: "openrouter".to_string(),
            },
            Err(_) => Availability {
                available: false,
                provider_id: "openrouter".to_string(),
            },
        }
    }
}

/// Always-unavailable provider: used for surface-tier-only deployments and
/// as a safe default when no API key is configured.
pub struct NullLlmProvider;

#[async_trait]
impl LLMProvider for NullLlmProvider {
    async fn generate(
        &self,
        _system_prompt: &str,
        _messages: &[ChatTurn],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<GenerateOutput, ProviderFailure> {
        Err(ProviderFailure::ProviderUnavailable)
    }

    async fn check_availability(&self) -> Availability {
        Availability {
            available: false,
            provider_id: "null".to_string(),
        }
    }
}

/// Deterministic test double: a closure computes the response text.
pub struct FnLlmProvider<F>
where
    F: Fn(&str, &[ChatTurn]) -> String + Send + Sync,
{
    f: F,
}

impl<F> FnLlmProvider<F>
where
    F: Fn(&str, &[ChatTurn]) -> String + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> LLMProvider for FnLlmProvider<F>
where
    F: Fn(&str, &[ChatTurn]) -> String + Send + Sync,
{
    async fn generate(
        &self,
        system_prompt: &str,
        messages: &[ChatTurn],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<GenerateOutput, ProviderFailure> {
        Ok(GenerateOutput {
            content: (self.f)(system_prompt, messages),
            latency_ms: 0,
        })
    }

    async fn check_availability(&self) -> Availability {
        Availability {
            available: true,
            provider_id: "fn-test-double".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_provider_always_fails() {
        let provider = NullLlmProvider;
        let result = provider.generate("sys", &[], 100, 0.5).await;
        assert_eq!(result.unwrap_err(), ProviderFailure::ProviderUnavailable);
        assert!(!provider.check_availability().await.available);
    }

    #[tokio::test]
    async fn fn_provider_echoes_closure_output() {
        let provider = FnLlmProvider::new(|sys: &str, _msgs: &[ChatTurn]| format!("echo:{sys}"));
        let out = provider.generate("hello", &[], 100, 0.5).await.unwrap();
        assert_eq!(out.content, "echo:hello");
    }
}

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

pub use openai::OpenAIClient;

use crate::config::Config;
use crate::error::AssistantResult;
use crate::state::ChatMessage;

/// One chat-completion call
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Remote chat-completion endpoint.
///
/// Implementations return the first completion's message text.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> AssistantResult<String>;
}

/// Builds a client for a config that carries a credential
pub type ClientFactory =
    Arc<dyn Fn(&Config) -> AssistantResult<Arc<dyn CompletionClient>> + Send + Sync>;

/// Factory producing [`OpenAIClient`]s
pub fn openai_factory() -> ClientFactory {
    Arc::new(|config: &Config| {
        let client = OpenAIClient::from_config(config)?;
        Ok(Arc::new(client) as Arc<dyn CompletionClient>)
    })
}

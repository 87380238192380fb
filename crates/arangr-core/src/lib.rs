pub mod ai;
pub mod assistant;
pub mod config;
pub mod error;
pub mod extract;
pub mod prompts;
pub mod state;
pub mod task;

// Re-export main types for convenience
pub use ai::{openai_factory, ClientFactory, CompletionClient, CompletionRequest, OpenAIClient};
pub use assistant::AssistantService;
pub use config::{Config, ConfigStore, JsonFileStore};
pub use error::{AssistantError, AssistantResult, ExtractionError};
pub use extract::{ContentExtractor, Extractors};
pub use state::{ChatMessage, ChatRole, Entry, EntryId, Sender, Transcript};
pub use task::Task;

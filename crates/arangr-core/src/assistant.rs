//! Assistant service
//!
//! Owns the config and the completion client and exposes the three
//! network-bound operations: filename suggestions, questions, and file
//! analysis. Every operation is total: failures are logged and replaced
//! with a fixed local fallback instead of being returned to the caller.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info, warn};

use crate::ai::{openai_factory, ClientFactory, CompletionClient, CompletionRequest};
use crate::config::{is_valid_credential, Config, ConfigStore, JsonFileStore};
use crate::error::{AssistantError, AssistantResult};
use crate::extract::{file_name, truncate_content, Extractors, CONTENT_BUDGET};
use crate::prompts::{
    self, APOLOGY_REPLY, NOT_CONFIGURED_REPLY, SUGGESTION_COUNT, SUGGESTION_MAX_TOKENS,
    SUGGESTION_TEMPERATURE,
};
use crate::state::ChatMessage;
use crate::task::Task;

/// Immutable snapshot of everything a request needs.
///
/// Cloned into background tasks so they never share mutable state with
/// the service.
#[derive(Clone)]
struct Session {
    config: Config,
    client: Option<Arc<dyn CompletionClient>>,
    extractors: Arc<Extractors>,
}

pub struct AssistantService {
    store: Arc<dyn ConfigStore>,
    factory: ClientFactory,
    session: Session,
}

impl AssistantService {
    /// Service backed by the default config file and the OpenAI client
    pub fn open() -> Self {
        Self::load(Arc::new(JsonFileStore::default_location()), openai_factory())
    }

    /// Load config from `store`. A missing or corrupt config yields an
    /// unconfigured service rather than an error.
    pub fn load(store: Arc<dyn ConfigStore>, factory: ClientFactory) -> Self {
        let config = match store.load() {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(e) => {
                warn!(error = %e, "Error loading AI config, starting unconfigured");
                Config::default()
            }
        };
        Self::new(config, store, factory)
    }

    pub fn new(config: Config, store: Arc<dyn ConfigStore>, factory: ClientFactory) -> Self {
        let client = if config.credential().is_some() {
            match factory(&config) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "Error initializing completion client");
                    None
                }
            }
        } else {
            None
        };

        Self {
            store,
            factory,
            session: Session {
                config,
                client,
                extractors: Arc::new(Extractors::default()),
            },
        }
    }

    /// Replace the extractor table
    pub fn with_extractors(mut self, extractors: Extractors) -> Self {
        self.session.extractors = Arc::new(extractors);
        self
    }

    pub fn config(&self) -> &Config {
        &self.session.config
    }

    /// True when a credential is set and the client was constructed
    pub fn is_ready(&self) -> bool {
        self.session.config.credential().is_some() && self.session.client.is_some()
    }

    /// Store a new credential and build a client for it.
    ///
    /// A credential with the wrong prefix is rejected before anything is
    /// persisted. A client that fails to build leaves the service
    /// unconfigured even though the credential was saved.
    pub fn setup(&mut self, credential: &str) -> AssistantResult<()> {
        let credential = credential.trim();
        if !is_valid_credential(credential) {
            info!("Rejected API key with unexpected format");
            return Err(AssistantError::InvalidCredentialFormat);
        }

        let mut config = self.session.config.clone();
        config.api_key = Some(credential.to_string());

        if let Err(e) = self.store.save(&config) {
            warn!(error = %e, "Error saving AI config");
        }

        let client = (self.factory)(&config);
        self.session.config = config;

        match client {
            Ok(client) => {
                self.session.client = Some(client);
                info!("AI assistant configured");
                Ok(())
            }
            Err(e) => {
                self.session.client = None;
                warn!(error = %e, "Error initializing completion client");
                Err(match e {
                    AssistantError::ClientInit(_) => e,
                    other => AssistantError::ClientInit(other.to_string()),
                })
            }
        }
    }

    /// Readable text for a file; never fails
    pub async fn extract_content(&self, path: &Path) -> String {
        self.session.extract_content(path).await
    }

    /// Exactly three filename suggestions, or none if the service is not ready
    pub async fn suggest_names(&self, file_path: &Path, content: Option<&str>) -> Vec<String> {
        self.session.suggest_names(file_path, content).await
    }

    pub async fn ask(
        &self,
        question: &str,
        content: Option<&str>,
        file_path: Option<&Path>,
    ) -> String {
        self.session.ask(question, content, file_path).await
    }

    pub async fn analyze(&self, file_path: &Path, content: &str) -> String {
        self.session.analyze(file_path, content).await
    }

    pub fn spawn_suggest_names(&self, file_path: PathBuf, content: Option<String>) -> Task<Vec<String>> {
        let fallback = if self.is_ready() {
            fallback_names(&file_path)
        } else {
            Vec::new()
        };
        let session = self.session.clone();
        Task::spawn(
            async move { session.suggest_names(&file_path, content.as_deref()).await },
            fallback,
        )
    }

    pub fn spawn_ask(
        &self,
        question: String,
        content: Option<String>,
        file_path: Option<PathBuf>,
    ) -> Task<String> {
        let session = self.session.clone();
        Task::spawn(
            async move {
                session
                    .ask(&question, content.as_deref(), file_path.as_deref())
                    .await
            },
            self.session.fallback_reply().to_string(),
        )
    }

    pub fn spawn_analyze(&self, file_path: PathBuf, content: String) -> Task<String> {
        let session = self.session.clone();
        Task::spawn(
            async move { session.analyze(&file_path, &content).await },
            self.session.fallback_reply().to_string(),
        )
    }
}

impl Session {
    fn ready_client(&self) -> Option<&Arc<dyn CompletionClient>> {
        self.config.credential()?;
        self.client.as_ref()
    }

    fn fallback_reply(&self) -> &'static str {
        if self.ready_client().is_some() {
            APOLOGY_REPLY
        } else {
            NOT_CONFIGURED_REPLY
        }
    }

    async fn extract_content(&self, path: &Path) -> String {
        let extractors = Arc::clone(&self.extractors);
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || extractors.extract(&owned)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Content extraction task failed");
                format!("Filename: {}", file_name(path))
            }
        }
    }

    async fn suggest_names(&self, file_path: &Path, content: Option<&str>) -> Vec<String> {
        let Some(client) = self.ready_client() else {
            debug!("Name suggestions requested while unconfigured");
            return Vec::new();
        };

        let content = match content {
            Some(text) => text.to_string(),
            None => self.extract_content(file_path).await,
        };
        let content = if content.trim().is_empty() {
            format!("File: {}", file_name(file_path))
        } else {
            content
        };
        let excerpt = truncate_content(&content, CONTENT_BUDGET);

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: prompts::naming_messages(&excerpt),
            max_tokens: SUGGESTION_MAX_TOKENS,
            temperature: SUGGESTION_TEMPERATURE,
        };

        match client.complete(request).await {
            Ok(reply) => {
                let suggestions = parse_suggestions(&reply);
                debug!(parsed = suggestions.len(), "Received name suggestions");
                complete_suggestions(file_path, suggestions)
            }
            Err(e) => {
                warn!(path = %file_path.display(), error = %e, "Error getting AI suggestions");
                fallback_names(file_path)
            }
        }
    }

    async fn ask(&self, question: &str, content: Option<&str>, file_path: Option<&Path>) -> String {
        let excerpt = content
            .filter(|c| !c.trim().is_empty())
            .map(|c| truncate_content(c, CONTENT_BUDGET));
        let name = file_path.map(file_name);
        let messages = prompts::question_messages(question, excerpt.as_deref(), name.as_deref());
        self.reply(messages).await
    }

    async fn analyze(&self, file_path: &Path, content: &str) -> String {
        let excerpt = truncate_content(content, CONTENT_BUDGET);
        let messages = prompts::analysis_messages(&file_name(file_path), &excerpt);
        self.reply(messages).await
    }

    /// Completion with the configured sampling, or the fixed fallback text
    async fn reply(&self, messages: Vec<ChatMessage>) -> String {
        let Some(client) = self.ready_client() else {
            return NOT_CONFIGURED_REPLY.to_string();
        };

        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        match client.complete(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                warn!("Completion endpoint returned an empty reply");
                APOLOGY_REPLY.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Completion request failed");
                APOLOGY_REPLY.to_string()
            }
        }
    }
}

/// Non-empty reply lines with list markers and wrapping quotes removed
pub fn parse_suggestions(reply: &str) -> Vec<String> {
    static LIST_MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = LIST_MARKER
        .get_or_init(|| Regex::new(r"^(?:\d+[.)]|[-*•])\s+").expect("valid list marker regex"));

    reply
        .lines()
        .map(|line| {
            let line = marker.replace(line.trim(), "");
            line.trim()
                .trim_matches(|c| c == '"' || c == '\'' || c == '`')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Bring a parsed reply to exactly three names
fn complete_suggestions(file_path: &Path, mut suggestions: Vec<String>) -> Vec<String> {
    if suggestions.is_empty() {
        return fallback_names(file_path);
    }

    let base = base_name(file_path);
    while suggestions.len() < SUGGESTION_COUNT {
        suggestions.push(format!("{}_v{}", base, suggestions.len()));
    }
    suggestions.truncate(SUGGESTION_COUNT);
    suggestions
}

/// Deterministic names used when the model cannot be reached
pub fn fallback_names(file_path: &Path) -> Vec<String> {
    let base = base_name(file_path);
    vec![
        format!("{base}_renamed"),
        format!("{base}_organized"),
        format!("{base}_updated"),
    ]
}

fn base_name(file_path: &Path) -> String {
    file_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with a canned result and records every request
    struct FakeClient {
        reply: Result<String, fn() -> AssistantError>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeClient {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(|| AssistantError::CompletionRequest("connection refused".to_string())),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionClient for FakeClient {
        async fn complete(&self, request: CompletionRequest) -> AssistantResult<String> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn factory_for(client: Arc<FakeClient>) -> ClientFactory {
        Arc::new(move |_config: &Config| Ok(Arc::clone(&client) as Arc<dyn CompletionClient>))
    }

    fn failing_factory() -> ClientFactory {
        Arc::new(|_config: &Config| Err(AssistantError::ClientInit("TLS backend unavailable".to_string())))
    }

    struct Workspace {
        dir: tempfile::TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            Self {
                dir: tempfile::TempDir::new().unwrap(),
            }
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("ai_config.json")
        }

        fn store(&self) -> Arc<dyn ConfigStore> {
            Arc::new(JsonFileStore::new(self.config_path()))
        }

        fn file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }

        fn ready_service(&self, client: Arc<FakeClient>) -> AssistantService {
            let config = Config {
                api_key: Some("sk-test123".to_string()),
                ..Config::default()
            };
            AssistantService::new(config, self.store(), factory_for(client))
        }

        fn unconfigured_service(&self) -> AssistantService {
            AssistantService::load(self.store(), factory_for(FakeClient::replying("unused")))
        }
    }

    #[test]
    fn test_setup_valid_key_persists_and_configures() {
        let ws = Workspace::new();
        let mut service = ws.unconfigured_service();
        assert!(!service.is_ready());

        service.setup("sk-test123").unwrap();

        assert!(service.is_ready());
        let raw = std::fs::read_to_string(ws.config_path()).unwrap();
        assert!(raw.contains("\"api_key\": \"sk-test123\""));
    }

    #[test]
    fn test_setup_invalid_key_leaves_file_untouched() {
        let ws = Workspace::new();
        std::fs::write(ws.config_path(), "{\n  \"api_key\": null\n}").unwrap();
        let mut service = ws.unconfigured_service();

        let err = service.setup("abc").unwrap_err();

        assert!(matches!(err, AssistantError::InvalidCredentialFormat));
        assert!(err.user_message().contains("sk-"));
        assert!(!service.is_ready());
        assert_eq!(
            std::fs::read_to_string(ws.config_path()).unwrap(),
            "{\n  \"api_key\": null\n}"
        );
    }

    #[test]
    fn test_setup_invalid_key_creates_no_file() {
        let ws = Workspace::new();
        let mut service = ws.unconfigured_service();
        assert!(service.setup("pk-live-123").is_err());
        assert!(!ws.config_path().exists());
    }

    #[test]
    fn test_setup_client_failure_reports_unconfigured() {
        let ws = Workspace::new();
        let mut service = AssistantService::load(ws.store(), failing_factory());

        let err = service.setup("sk-test123").unwrap_err();

        assert!(matches!(err, AssistantError::ClientInit(_)));
        assert!(!service.is_ready());
        // Credential is still persisted
        assert!(ws.config_path().exists());
    }

    #[test]
    fn test_load_with_saved_key_is_ready() {
        let ws = Workspace::new();
        std::fs::write(ws.config_path(), r#"{"api_key": "sk-saved"}"#).unwrap();

        let service = AssistantService::load(ws.store(), factory_for(FakeClient::replying("x")));

        assert!(service.is_ready());
        assert_eq!(service.config().model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_corrupt_config_starts_unconfigured() {
        let ws = Workspace::new();
        std::fs::write(ws.config_path(), "not json at all").unwrap();

        let service = AssistantService::load(ws.store(), factory_for(FakeClient::replying("x")));

        assert!(!service.is_ready());
    }

    #[tokio::test]
    async fn test_suggestions_use_reply_lines_in_order() {
        let ws = Workspace::new();
        let path = ws.file("report.txt", "Q4 sales numbers...");
        let client =
            FakeClient::replying("Quarterly Sales Report\nQ4 Financial Summary\nSales Review 2024");
        let service = ws.ready_service(Arc::clone(&client));

        let names = service.suggest_names(&path, None).await;

        assert_eq!(
            names,
            vec!["Quarterly Sales Report", "Q4 Financial Summary", "Sales Review 2024"]
        );
        let request = client.last_request();
        assert_eq!(request.max_tokens, SUGGESTION_MAX_TOKENS);
        assert!(request.messages[1].content.contains("Q4 sales numbers..."));
    }

    #[tokio::test]
    async fn test_suggestions_fall_back_on_network_error() {
        let ws = Workspace::new();
        let path = ws.file("report.txt", "Q4 sales numbers...");
        let service = ws.ready_service(FakeClient::failing());

        let names = service.suggest_names(&path, None).await;

        assert_eq!(names, vec!["report_renamed", "report_organized", "report_updated"]);
    }

    #[tokio::test]
    async fn test_short_reply_is_padded() {
        let ws = Workspace::new();
        let service = ws.ready_service(FakeClient::replying("\n  Budget Overview  \n\n"));

        let names = service
            .suggest_names(Path::new("/docs/budget.xlsx"), Some("numbers"))
            .await;

        assert_eq!(names, vec!["Budget Overview", "budget_v1", "budget_v2"]);
    }

    #[tokio::test]
    async fn test_long_reply_keeps_first_three() {
        let ws = Workspace::new();
        let service = ws.ready_service(FakeClient::replying("1. One\n2. Two\n3. Three\n4. Four"));

        let names = service.suggest_names(Path::new("x.txt"), Some("text")).await;

        assert_eq!(names, vec!["One", "Two", "Three"]);
    }

    #[tokio::test]
    async fn test_blank_reply_uses_fallback_names() {
        let ws = Workspace::new();
        let service = ws.ready_service(FakeClient::replying("   \n \n"));

        let names = service.suggest_names(Path::new("notes.md"), Some("x")).await;

        assert_eq!(names, vec!["notes_renamed", "notes_organized", "notes_updated"]);
    }

    #[tokio::test]
    async fn test_suggestions_always_three_non_empty() {
        let ws = Workspace::new();
        let replies = ["", "only one", "a\nb", "a\nb\nc", "1.\n-\n\"\"", "a\nb\nc\nd\ne"];
        let paths = ["", "/", "report.txt", ".hidden", "dir/no_ext", "weird name.tar.gz"];

        for reply in replies {
            let service = ws.ready_service(FakeClient::replying(reply));
            for path in paths {
                let names = service.suggest_names(Path::new(path), None).await;
                assert_eq!(names.len(), 3, "reply {reply:?} path {path:?}");
                assert!(names.iter().all(|n| !n.is_empty()));
            }
        }

        let service = ws.ready_service(FakeClient::failing());
        for path in paths {
            let names = service.suggest_names(Path::new(path), None).await;
            assert_eq!(names.len(), 3);
            assert!(names.iter().all(|n| !n.is_empty()));
        }
    }

    #[tokio::test]
    async fn test_unconfigured_suggestions_are_empty() {
        let ws = Workspace::new();
        let service = ws.unconfigured_service();

        assert!(service.suggest_names(Path::new("report.txt"), None).await.is_empty());
        assert!(service
            .spawn_suggest_names(PathBuf::from("report.txt"), None)
            .join()
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_long_content_is_truncated_in_prompt() {
        let ws = Workspace::new();
        let client = FakeClient::replying("a\nb\nc");
        let service = ws.ready_service(Arc::clone(&client));
        let content = "z".repeat(CONTENT_BUDGET + 500);

        service.suggest_names(Path::new("big.txt"), Some(&content)).await;

        let prompt = &client.last_request().messages[1].content;
        let expected = format!("{}...", "z".repeat(CONTENT_BUDGET));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"z".repeat(CONTENT_BUDGET + 1)));
    }

    #[tokio::test]
    async fn test_empty_override_uses_filename() {
        let ws = Workspace::new();
        let client = FakeClient::replying("a\nb\nc");
        let service = ws.ready_service(Arc::clone(&client));

        service.suggest_names(Path::new("/tmp/invoice.pdf"), Some("  ")).await;

        assert!(client.last_request().messages[1].content.contains("File: invoice.pdf"));
    }

    #[tokio::test]
    async fn test_ask_returns_trimmed_reply_with_config_sampling() {
        let ws = Workspace::new();
        let client = FakeClient::replying("  It is a sales report.\n");
        let service = ws.ready_service(Arc::clone(&client));

        let answer = service
            .ask("What is this?", Some("Q4 sales"), Some(Path::new("report.txt")))
            .await;

        assert_eq!(answer, "It is a sales report.");
        let request = client.last_request();
        assert_eq!(request.max_tokens, 1000);
        assert!(request.messages[1].content.contains("Current file: report.txt"));
    }

    #[tokio::test]
    async fn test_ask_failure_returns_apology() {
        let ws = Workspace::new();
        let service = ws.ready_service(FakeClient::failing());

        assert_eq!(service.ask("hello?", None, None).await, APOLOGY_REPLY);
        assert_eq!(
            service.analyze(Path::new("a.txt"), "text").await,
            APOLOGY_REPLY
        );
    }

    #[tokio::test]
    async fn test_unconfigured_ask_and_analyze_return_fixed_text() {
        let ws = Workspace::new();
        let service = ws.unconfigured_service();

        assert_eq!(service.ask("hello?", None, None).await, NOT_CONFIGURED_REPLY);
        assert_eq!(
            service.analyze(Path::new("a.txt"), "text").await,
            NOT_CONFIGURED_REPLY
        );
        assert_eq!(
            service.spawn_ask("hello?".to_string(), None, None).join().await,
            NOT_CONFIGURED_REPLY
        );
    }

    #[tokio::test]
    async fn test_spawned_analyze_delivers_reply() {
        let ws = Workspace::new();
        let client = FakeClient::replying("Summary: a plan.");
        let service = ws.ready_service(Arc::clone(&client));

        let reply = service
            .spawn_analyze(PathBuf::from("plan.md"), "# Plan".to_string())
            .join()
            .await;

        assert_eq!(reply, "Summary: a plan.");
        assert!(client.last_request().messages[1].content.contains("Filename: plan.md"));
    }

    #[tokio::test]
    async fn test_extract_content_never_empty() {
        let ws = Workspace::new();
        let service = ws.unconfigured_service();
        let empty = ws.file("empty.txt", "");

        assert_eq!(service.extract_content(&empty).await, "Filename: empty.txt");
        assert!(!service
            .extract_content(Path::new("/definitely/missing.md"))
            .await
            .is_empty());
    }

    struct SlideDeckExtractor;

    impl crate::extract::ContentExtractor for SlideDeckExtractor {
        fn extract(&self, _path: &Path) -> Result<String, crate::error::ExtractionError> {
            Ok("Slide 1: Roadmap 2025".to_string())
        }
    }

    #[tokio::test]
    async fn test_custom_extractor_feeds_prompt() {
        let ws = Workspace::new();
        let client = FakeClient::replying("a\nb\nc");
        let mut extractors = Extractors::default();
        assert!(!extractors.supports("pptx"));
        extractors.register("pptx", Arc::new(SlideDeckExtractor));
        assert!(extractors.supports("pptx"));

        let service = ws.ready_service(Arc::clone(&client)).with_extractors(extractors);
        let path = Path::new("/decks/plan.pptx");

        assert_eq!(service.extract_content(path).await, "Slide 1: Roadmap 2025");
        service.suggest_names(path, None).await;
        assert!(client.last_request().messages[1]
            .content
            .contains("Slide 1: Roadmap 2025"));
    }

    #[test]
    fn test_parse_suggestions_strips_markers_and_quotes() {
        let parsed = parse_suggestions("1. \"Alpha Plan\"\n2) Beta\n- Gamma\n* `Delta`\n\n");
        assert_eq!(parsed, vec!["Alpha Plan", "Beta", "Gamma", "Delta"]);
    }

    #[test]
    fn test_parse_suggestions_keeps_leading_numbers_in_names() {
        let parsed = parse_suggestions("2024 Budget\nQ4 Financial Summary");
        assert_eq!(parsed, vec!["2024 Budget", "Q4 Financial Summary"]);
    }

    #[test]
    fn test_fallback_names_for_odd_paths() {
        assert_eq!(fallback_names(Path::new(""))[0], "document_renamed");
        assert_eq!(fallback_names(Path::new("archive.tar.gz"))[1], "archive.tar_organized");
    }
}

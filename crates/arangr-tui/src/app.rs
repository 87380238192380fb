use std::path::PathBuf;

use arangr_core::extract::file_name;
use arangr_core::prompts::{NOT_CONFIGURED_REPLY, SETUP_SUCCESS_MESSAGE};
use arangr_core::{AssistantService, EntryId, Sender, Transcript};
use ratatui::layout::Rect;
use ratatui::widgets::Paragraph;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::tui::AppEvent;
use crate::ui::{self, TRANSCRIPT_WRAP};

pub const READY_GREETING: &str =
    "AI Assistant ready! Ask me anything about your files or general questions.";
pub const UNCONFIGURED_GREETING: &str =
    "AI Assistant not configured. Press Ctrl+K to set up your API key.";

pub const THINKING_PLACEHOLDER: &str = "Thinking...";
pub const ANALYZING_PLACEHOLDER: &str = "Analyzing file...";
pub const SUGGESTING_PLACEHOLDER: &str = "Suggesting names...";

pub struct App {
    pub should_quit: bool,
    pub service: AssistantService,

    // File the dialog was opened for
    pub current_file: Option<PathBuf>,
    pub file_content: Option<String>,

    // Chat state
    pub transcript: Transcript,
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub scroll: u16,
    pub follow_tail: bool,
    pub chat_height: u16, // Inner height of the transcript pane
    pub chat_width: u16,  // Inner width of the transcript pane
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,

    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        service: AssistantService,
        events: mpsc::UnboundedSender<AppEvent>,
        current_file: Option<PathBuf>,
        file_content: Option<String>,
    ) -> Self {
        let mut transcript = Transcript::new();
        let greeting = if service.is_ready() {
            READY_GREETING
        } else {
            UNCONFIGURED_GREETING
        };
        transcript.push(Sender::System, greeting);

        Self {
            should_quit: false,
            service,
            current_file,
            file_content,
            transcript,
            input: String::new(),
            cursor: 0,
            scroll: 0,
            follow_tail: true,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,
            animation_frame: 0,
            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            events,
        }
    }

    /// Analysis needs a file with some readable content
    pub fn can_analyze(&self) -> bool {
        self.current_file.is_some()
            && self
                .file_content
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
    }

    pub fn current_file_name(&self) -> Option<String> {
        self.current_file.as_deref().map(file_name)
    }

    /// Send the input line as a question
    pub fn submit_question(&mut self) {
        let question = self.input.trim().to_string();
        if question.is_empty() {
            return;
        }

        self.input.clear();
        self.cursor = 0;

        self.transcript.push(Sender::User, question.clone());
        let entry = self.transcript.push_placeholder(THINKING_PLACEHOLDER);
        debug!(?entry, "Dispatching question");

        self.service
            .spawn_ask(question, self.file_content.clone(), self.current_file.clone())
            .then(self.reply_sink(entry));

        self.follow_tail = true;
        self.scroll_to_bottom();
    }

    pub fn analyze_file(&mut self) {
        if !self.can_analyze() {
            return;
        }
        let (Some(path), Some(content)) = (self.current_file.clone(), self.file_content.clone())
        else {
            return;
        };

        self.transcript
            .push(Sender::User, format!("Analyze file: {}", file_name(&path)));
        let entry = self.transcript.push_placeholder(ANALYZING_PLACEHOLDER);
        debug!(?entry, path = %path.display(), "Dispatching file analysis");

        self.service
            .spawn_analyze(path, content)
            .then(self.reply_sink(entry));

        self.follow_tail = true;
        self.scroll_to_bottom();
    }

    /// Ask for three new names for the current file
    pub fn suggest_names(&mut self) {
        let Some(path) = self.current_file.clone() else {
            return;
        };

        self.transcript
            .push(Sender::User, format!("Suggest names for: {}", file_name(&path)));
        let entry = self.transcript.push_placeholder(SUGGESTING_PLACEHOLDER);

        let sink = self.reply_sink(entry);
        self.service
            .spawn_suggest_names(path, self.file_content.clone())
            .then(move |names| sink(format_suggestions(&names)));

        self.follow_tail = true;
        self.scroll_to_bottom();
    }

    pub fn open_api_key_input(&mut self) {
        self.show_api_key_input = true;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    pub fn close_api_key_input(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    /// Hand the typed key to the service and report the outcome in the transcript
    pub fn submit_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        self.close_api_key_input();
        if key.is_empty() {
            return;
        }

        let message = match self.service.setup(&key) {
            Ok(()) => SETUP_SUCCESS_MESSAGE.to_string(),
            Err(e) => e.user_message(),
        };
        self.transcript.push(Sender::System, message);
        self.scroll_to_bottom();
    }

    /// Replace a placeholder with the reply that arrived for it
    pub fn apply_reply(&mut self, entry: EntryId, text: String) {
        if !self.transcript.resolve(entry, text) {
            debug!(?entry, "Reply for an entry that is not pending");
            return;
        }
        info!(?entry, pending = self.transcript.pending_count(), "Reply received");
        if self.follow_tail {
            self.scroll_to_bottom();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.transcript.pending_count() > 0 {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
        self.follow_tail = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.scroll = self.scroll.saturating_add(lines).min(max);
        self.follow_tail = self.scroll >= max;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    /// Page size for PageUp/PageDown
    pub fn page_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height.saturating_sub(1).max(1)
        } else {
            10
        }
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.transcript_height().saturating_sub(visible_height)
    }

    /// Rendered height of the transcript, wrapped exactly as the renderer wraps it
    fn transcript_height(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width } else { 50 };

        let text = ui::transcript_text(&self.transcript, self.animation_frame);
        let rows = Paragraph::new(text)
            .wrap(TRANSCRIPT_WRAP)
            .line_count(wrap_width);
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    /// Continuation that posts a finished reply back to the event loop
    fn reply_sink(&self, entry: EntryId) -> impl FnOnce(String) + Send + 'static {
        let tx = self.events.clone();
        move |text| {
            if tx.send(AppEvent::Reply { entry, text }).is_err() {
                debug!(?entry, "Dialog closed before reply arrived");
            }
        }
    }
}

/// Numbered list shown in the transcript for a suggestion reply
pub fn format_suggestions(names: &[String]) -> String {
    if names.is_empty() {
        return NOT_CONFIGURED_REPLY.to_string();
    }
    let mut text = String::from("Suggested names:");
    for (i, name) in names.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, name));
    }
    text
}

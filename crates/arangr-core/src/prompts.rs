//! Prompt templates and fixed replies

use crate::state::ChatMessage;

/// Output budget for name suggestions
pub const SUGGESTION_MAX_TOKENS: u32 = 200;

/// Sampling temperature for name suggestions
pub const SUGGESTION_TEMPERATURE: f32 = 0.7;

/// Number of names returned by a suggestion request
pub const SUGGESTION_COUNT: usize = 3;

pub const NAMING_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that suggests clear, professional filenames based on document content.";

pub const QUESTION_SYSTEM_PROMPT: &str = "You are a helpful AI assistant built into a file organizer. \
Answer questions about the user's files and general questions clearly and concisely. \
When file content is provided, base your answer on it.";

/// Reply when the service has no usable client
pub const NOT_CONFIGURED_REPLY: &str =
    "AI Assistant is not configured. Please set up your OpenAI API key first.";

/// Reply when a completion request fails for any reason
pub const APOLOGY_REPLY: &str = "Sorry, I couldn't get a response from the AI service right now. \
Please check your API key and internet connection, then try again.";

/// Confirmation shown after a successful key setup
pub const SETUP_SUCCESS_MESSAGE: &str =
    "OpenAI API key configured successfully! AI Assistant features are now available.";

pub fn naming_messages(content: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        "Analyze the following document content and suggest 3 clear, descriptive filenames.
The suggestions should be:
1. Professional and concise
2. Descriptive of the content
3. Suitable for file naming (no special characters)
4. Different from each other

Document content:
{content}

Respond with exactly 3 filename suggestions, one per line, without file extensions.
Example format:
Marketing Strategy Q4 2024
Customer Acquisition Plan
Sales Performance Analysis"
    );

    vec![ChatMessage::system(NAMING_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

pub fn question_messages(
    question: &str,
    excerpt: Option<&str>,
    file_name: Option<&str>,
) -> Vec<ChatMessage> {
    let mut prompt = String::new();

    if let Some(name) = file_name {
        prompt.push_str(&format!("Current file: {}\n\n", name));
    }
    if let Some(excerpt) = excerpt {
        prompt.push_str("File content:\n");
        prompt.push_str(excerpt);
        prompt.push_str("\n\n");
    }

    if prompt.is_empty() {
        prompt.push_str(question);
    } else {
        prompt.push_str("Question: ");
        prompt.push_str(question);
    }

    vec![ChatMessage::system(QUESTION_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

pub fn analysis_messages(file_name: &str, excerpt: &str) -> Vec<ChatMessage> {
    let prompt = format!(
        "Analyze this document and provide:
1. A brief summary of its content
2. Its apparent purpose and intended audience
3. Key points or notable details
4. Suggestions for how it could be organized or named

Filename: {file_name}

Document content:
{excerpt}"
    );

    vec![ChatMessage::system(QUESTION_SYSTEM_PROMPT), ChatMessage::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;

    #[test]
    fn test_naming_prompt_embeds_content() {
        let messages = naming_messages("Q4 sales numbers");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert!(messages[1].content.contains("Document content:\nQ4 sales numbers\n"));
        assert!(messages[1].content.contains("without file extensions"));
    }

    #[test]
    fn test_bare_question_is_sent_verbatim() {
        let messages = question_messages("What is Rust?", None, None);
        assert_eq!(messages[1].content, "What is Rust?");
    }

    #[test]
    fn test_question_with_file_context() {
        let messages = question_messages("Who wrote it?", Some("by Ada"), Some("memo.txt"));
        let prompt = &messages[1].content;
        assert!(prompt.starts_with("Current file: memo.txt"));
        assert!(prompt.contains("File content:\nby Ada"));
        assert!(prompt.ends_with("Question: Who wrote it?"));
    }

    #[test]
    fn test_analysis_prompt() {
        let messages = analysis_messages("plan.md", "# Plan");
        assert!(messages[1].content.contains("Filename: plan.md"));
        assert!(messages[1].content.ends_with("# Plan"));
    }
}

//! File content extraction
//!
//! A strategy table maps file extensions to extractors. Anything without
//! a registered extractor gets a short filename/type stub, and every
//! extraction failure degrades to a stub as well, so callers always get
//! some non-empty text to put in a prompt.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ExtractionError;

/// Maximum number of characters of file content sent to the model
pub const CONTENT_BUDGET: usize = 3000;

/// Appended to content that was cut at [`CONTENT_BUDGET`]
pub const TRUNCATION_MARKER: &str = "...";

/// PDF pages read before giving up on the rest of the document
pub const PDF_PAGE_LIMIT: usize = 3;

/// Word-processor paragraphs read from the start of the document
pub const DOCX_PARAGRAPH_LIMIT: usize = 10;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "js", "ts", "html", "css", "json", "xml", "csv", "yaml", "yml", "toml",
    "rs", "log",
];

/// Pulls readable text out of one kind of file
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Reads the file as UTF-8, replacing invalid sequences
pub struct TextExtractor;

impl ContentExtractor for TextExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let bytes = fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Text of the first [`PDF_PAGE_LIMIT`] pages
pub struct PdfExtractor;

impl ContentExtractor for PdfExtractor {
    #[cfg(feature = "pdf")]
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let doc = lopdf::Document::load(path)
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;
        let pages: Vec<u32> = doc
            .get_pages()
            .keys()
            .copied()
            .take(PDF_PAGE_LIMIT)
            .collect();
        doc.extract_text(&pages)
            .map_err(|e| ExtractionError::Malformed(e.to_string()))
    }

    #[cfg(not(feature = "pdf"))]
    fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
        Err(ExtractionError::ReaderUnavailable { format: "pdf" })
    }
}

/// Text of the first [`DOCX_PARAGRAPH_LIMIT`] paragraphs of a .docx
pub struct DocxExtractor;

impl ContentExtractor for DocxExtractor {
    #[cfg(feature = "docx")]
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        use std::io::Read;

        let file = fs::File::open(path)?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| ExtractionError::Malformed(e.to_string()))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?
            .read_to_string(&mut xml)?;

        let mut text = String::new();
        for paragraph in docx_paragraphs(&xml, DOCX_PARAGRAPH_LIMIT) {
            text.push_str(&paragraph);
            text.push('\n');
        }
        Ok(text)
    }

    #[cfg(not(feature = "docx"))]
    fn extract(&self, _path: &Path) -> Result<String, ExtractionError> {
        Err(ExtractionError::ReaderUnavailable { format: "docx" })
    }
}

/// Paragraph texts from a WordprocessingML body, in document order
#[cfg(feature = "docx")]
fn docx_paragraphs(xml: &str, limit: usize) -> Vec<String> {
    use regex::Regex;
    use std::sync::OnceLock;

    static PARAGRAPH: OnceLock<Regex> = OnceLock::new();
    static RUN_TEXT: OnceLock<Regex> = OnceLock::new();

    let paragraph = PARAGRAPH.get_or_init(|| {
        Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)").expect("valid paragraph regex")
    });
    let run_text = RUN_TEXT
        .get_or_init(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("valid run regex"));

    paragraph
        .captures_iter(xml)
        .take(limit)
        .map(|caps| {
            let body = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            run_text
                .captures_iter(body)
                .map(|run| unescape_xml(&run[1]))
                .collect::<String>()
        })
        .collect()
}

#[cfg(feature = "docx")]
fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Fallback for unknown kinds: filename and extension only
pub struct StubExtractor;

impl ContentExtractor for StubExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        Ok(describe_file(path))
    }
}

/// Extension → extractor table with a default stub strategy
pub struct Extractors {
    by_extension: HashMap<String, Arc<dyn ContentExtractor>>,
    fallback: Arc<dyn ContentExtractor>,
}

impl Default for Extractors {
    fn default() -> Self {
        let mut extractors = Self::empty();

        let text: Arc<dyn ContentExtractor> = Arc::new(TextExtractor);
        for ext in TEXT_EXTENSIONS {
            extractors.register(ext, Arc::clone(&text));
        }

        extractors.register("pdf", Arc::new(PdfExtractor));

        let docx: Arc<dyn ContentExtractor> = Arc::new(DocxExtractor);
        extractors.register("docx", Arc::clone(&docx));
        extractors.register("doc", docx);

        extractors
    }
}

impl Extractors {
    /// Table with only the stub strategy
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
            fallback: Arc::new(StubExtractor),
        }
    }

    /// Register (or replace) the extractor for an extension, given without the dot
    pub fn register(&mut self, extension: &str, extractor: Arc<dyn ContentExtractor>) {
        self.by_extension
            .insert(extension.trim_start_matches('.').to_lowercase(), extractor);
    }

    /// Whether `extension` has its own extractor rather than the stub
    pub fn supports(&self, extension: &str) -> bool {
        self.by_extension
            .contains_key(&extension.trim_start_matches('.').to_lowercase())
    }

    /// Readable content for `path`. Never fails and never returns blank text.
    pub fn extract(&self, path: &Path) -> String {
        let extension = extension_of(path);
        let extractor = self
            .by_extension
            .get(&extension)
            .unwrap_or(&self.fallback);

        match extractor.extract(path) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                debug!(path = %path.display(), "Extracted content is empty");
                filename_stub(path)
            }
            Err(ExtractionError::ReaderUnavailable { format }) => {
                debug!(path = %path.display(), format, "Document reader not available");
                describe_file(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Error extracting file content");
                filename_stub(path)
            }
        }
    }
}

/// Cut `content` to `budget` characters, appending [`TRUNCATION_MARKER`] if anything was dropped
pub fn truncate_content(content: &str, budget: usize) -> String {
    match content.char_indices().nth(budget) {
        Some((byte_idx, _)) => {
            let mut truncated = content[..byte_idx].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => content.to_string(),
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn filename_stub(path: &Path) -> String {
    format!("Filename: {}", file_name(path))
}

fn describe_file(path: &Path) -> String {
    let extension = extension_of(path);
    let file_type = if extension.is_empty() {
        "unknown".to_string()
    } else {
        format!(".{extension}")
    };
    format!("Filename: {}\nFile type: {}", file_name(path), file_type)
}

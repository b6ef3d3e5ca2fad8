//! Source document loading and unit splitting
//!
//! A source is an `http(s)://` URL or a local path. PDFs yield one unit per
//! page; plain text yields one unit per form-feed page, or paragraph groups
//! of at most `unit_size` characters when the text has no page breaks.

use std::path::Path;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::IndexingConfig;
use crate::error::{Error, Result};

const FORM_FEED: char = '\u{000C}';

/// Document format, decided by extension and then by content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Text,
}

impl SourceFormat {
    /// Detect the format from the source name, falling back to the bytes
    pub fn detect(source: &str, data: &[u8]) -> Option<Self> {
        let path = source
            .split(['?', '#'])
            .next()
            .unwrap_or(source)
            .to_lowercase();

        if path.ends_with(".pdf") {
            return Some(Self::Pdf);
        }
        if path.ends_with(".txt") || path.ends_with(".md") {
            return Some(Self::Text);
        }

        if data.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if std::str::from_utf8(data).is_ok() {
            Some(Self::Text)
        } else {
            None
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Fetches a source and splits it into text units
pub struct DocumentLoader {
    http: reqwest::Client,
    unit_size: usize,
    extract_timeout: Duration,
}

impl DocumentLoader {
    pub fn new(config: &IndexingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            unit_size: config.unit_size.max(1),
            extract_timeout: Duration::from_secs(config.extract_timeout_secs.max(1)),
        })
    }

    /// Non-empty text units of `source`, in document order
    pub async fn load_units(&self, source: &str) -> Result<Vec<String>> {
        let data = self.fetch(source).await?;

        let format = SourceFormat::detect(source, &data).ok_or_else(|| {
            Error::document_load(source, "unrecognized format (expected PDF or UTF-8 text)")
        })?;

        let units = match format {
            SourceFormat::Pdf => {
                let name = source.to_string();
                run_blocking(source, self.extract_timeout, move || split_pdf(&name, &data)).await?
            }
            SourceFormat::Text => {
                let text = String::from_utf8(data)
                    .map_err(|e| Error::document_load(source, e.to_string()))?;
                split_text(&text, self.unit_size)
            }
        };

        tracing::info!("Loaded {} units from {} ({:?})", units.len(), source, format);
        Ok(units)
    }

    async fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        if is_url(source) {
            tracing::info!("Downloading {}", source);
            let response = self
                .http
                .get(source)
                .send()
                .await
                .map_err(|e| Error::document_load(source, e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::document_load(source, format!("HTTP {}", status)));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::document_load(source, e.to_string()))?;
            Ok(bytes.to_vec())
        } else {
            tokio::fs::read(Path::new(source))
                .await
                .map_err(|e| Error::document_load(source, e.to_string()))
        }
    }
}

/// Run a blocking extraction off the async workers, bounded by `limit`
///
/// On timeout the worker thread is abandoned and keeps running until the
/// parser returns.
async fn run_blocking<T, F>(source: &str, limit: Duration, extract: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(extract)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(Error::document_load(source, format!("PDF parser crashed: {}", e))),
        Err(_) => {
            tracing::error!("PDF extraction of {} timed out after {:?}", source, limit);
            Err(Error::document_load(source, format!("PDF extraction timed out after {:?}", limit)))
        }
    }
}

/// One unit per PDF page, empty pages dropped
///
/// Pages are read with lopdf; when lopdf cannot extract any text the whole
/// document goes through pdf-extract and is split on its page breaks.
pub fn split_pdf(source: &str, data: &[u8]) -> Result<Vec<String>> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::document_load(source, format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => pages.push(clean_page(&text)),
            Err(e) => tracing::debug!("lopdf could not read page {}: {}", page_number, e),
        }
    }

    if pages.iter().any(|p| !p.is_empty()) {
        return Ok(pages.into_iter().filter(|p| !p.is_empty()).collect());
    }

    tracing::warn!("lopdf extracted no text from {}, trying pdf-extract", source);
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::document_load(source, format!("Failed to extract text: {}", e)))?;

    Ok(text
        .split(FORM_FEED)
        .map(clean_page)
        .filter(|p| !p.is_empty())
        .collect())
}

fn clean_page(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Split plain text into units
pub fn split_text(text: &str, unit_size: usize) -> Vec<String> {
    let text = text.replace("\r\n", "\n");

    if text.contains(FORM_FEED) {
        return text
            .split(FORM_FEED)
            .map(str::trim)
            .filter(|page| !page.is_empty())
            .map(str::to_string)
            .collect();
    }

    group_paragraphs(&text, unit_size.max(1))
}

fn char_len(text: &str) -> usize {
    text.graphemes(true).count()
}

fn group_paragraphs(text: &str, unit_size: usize) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    let pieces = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .flat_map(|p| fit_paragraph(p, unit_size));

    for piece in pieces {
        let piece_len = char_len(&piece);
        if !current.is_empty() && current_len + 2 + piece_len > unit_size {
            units.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(&piece);
        current_len += piece_len;
    }

    if !current.is_empty() {
        units.push(current);
    }
    units
}

/// Break an oversized paragraph on sentence bounds, then on graphemes
fn fit_paragraph(paragraph: &str, unit_size: usize) -> Vec<String> {
    if char_len(paragraph) <= unit_size {
        return vec![paragraph.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in paragraph.split_sentence_bounds() {
        for grapheme in sentence.graphemes(true) {
            if current_len == unit_size {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            current.push_str(grapheme);
            current_len += 1;
        }
        // flush at sentence ends once the unit is mostly full
        if current_len * 2 >= unit_size {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

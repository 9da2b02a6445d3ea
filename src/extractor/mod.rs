// Text extraction module
// Pulls plain text out of PDF, DOCX and TXT documents

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) mod test_support;

use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// Main document part inside a DOCX package
const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("Failed to extract PDF text from {path}: {message}")]
    Pdf { path: PathBuf, message: String },
    #[error("Failed to extract DOCX text from {path}: {message}")]
    Docx { path: PathBuf, message: String },
}

/// Document formats the indexer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
}

impl DocumentKind {
    /// Detect the format from the file extension, ignoring case
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }
}

/// Extract the text of a document.
///
/// Unsupported extensions yield an empty string so callers can skip them.
#[inline]
pub fn extract_text(path: &Path) -> Result<String, ExtractionError> {
    let Some(kind) = DocumentKind::from_path(path) else {
        debug!("Unsupported document type: {}", path.display());
        return Ok(String::new());
    };

    debug!("Extracting {:?} text from {}", kind, path.display());

    match kind {
        DocumentKind::Pdf => extract_pdf(path),
        DocumentKind::Docx => extract_docx(path),
        DocumentKind::Txt => extract_txt(path),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    fs::read(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn extract_txt(path: &Path) -> Result<String, ExtractionError> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes).map_err(|source| ExtractionError::InvalidUtf8 {
        path: path.to_path_buf(),
        source,
    })
}

fn extract_pdf(path: &Path) -> Result<String, ExtractionError> {
    let bytes = read_bytes(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractionError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(text.trim().to_string())
}

fn extract_docx(path: &Path) -> Result<String, ExtractionError> {
    let docx_error = |message: String| ExtractionError::Docx {
        path: path.to_path_buf(),
        message,
    };

    let file = File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| docx_error(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| docx_error(format!("missing {DOCX_BODY_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| docx_error(e.to_string()))?;

    let paragraphs = docx_paragraphs(&xml).map_err(docx_error)?;
    Ok(paragraphs.join("\n"))
}

/// Collect the text of every non-blank body-level `w:p` paragraph in document order.
///
/// Tables and text boxes are skipped, so their paragraphs neither appear on
/// their own nor leak into the paragraph that anchors them.
pub(crate) fn docx_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut in_text_run = false;
    // Depth inside `w:tbl` / `w:txbxContent` subtrees
    let mut skipped = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => skipped += 1,
                _ if skipped > 0 => {}
                b"w:p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"w:t" => in_text_run = in_paragraph,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if skipped == 0 && in_paragraph => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" | b"w:cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => skipped = skipped.saturating_sub(1),
                _ if skipped > 0 => {}
                b"w:p" => {
                    if !current.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    in_paragraph = false;
                }
                b"w:t" => in_text_run = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_run && skipped == 0 => {
                let text = e
                    .unescape()
                    .map_err(|e| format!("XML parse error: {e}"))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {e}")),
            _ => {}
        }
    }

    Ok(paragraphs)
}

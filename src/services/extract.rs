//! Text extraction for uploaded documents.
//! Plain-text types decode directly; Markdown is flattened to plain text via
//! a pulldown-cmark event walk. Binary formats are rejected up front.

use pulldown_cmark::{Event, Parser, TagEnd};

use crate::error::ApiError;

/// Cap on extracted text so generation prompts stay bounded.
const MAX_TEXT_LEN: usize = 102_400;

/// Extracts the plain-text content of an uploaded file.
pub fn extract_text(data: &[u8], mime_type: &str, filename: &str) -> Result<String, ApiError> {
    let text = match mime_type {
        "text/markdown" => markdown_to_text(&String::from_utf8_lossy(data)),
        "text/plain" | "text/csv" | "application/json" | "text/xml" | "application/xml" => {
            String::from_utf8_lossy(data).to_string()
        }
        _ => match std::str::from_utf8(data) {
            Ok(text) => {
                if filename.ends_with(".md") || filename.ends_with(".markdown") {
                    markdown_to_text(text)
                } else {
                    text.to_string()
                }
            }
            Err(_) => return Err(ApiError::UnsupportedFile(mime_type.to_string())),
        },
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::InvalidInput(
            "document contains no extractable text".to_string(),
        ));
    }
    Ok(truncate_text(text))
}

/// Guess a MIME type from the filename extension, for multipart parts that
/// arrive without one.
pub fn guess_mime_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

/// Flattens Markdown to plain text: headings, paragraphs and list items
/// become lines; inline markup is dropped.
fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new(markdown) {
        match event {
            Event::Text(chunk) | Event::Code(chunk) => text.push_str(&chunk),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::CodeBlock) => {
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }

    text
}

fn truncate_text(text: String) -> String {
    if text.len() <= MAX_TEXT_LEN {
        return text;
    }
    let mut cut = MAX_TEXT_LEN;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text[..cut].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text(b"hello world", "text/plain", "notes.txt").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_markdown_is_flattened() {
        let md = b"# Biology\n\nCells are the *basic* unit of life.\n\n- membrane\n- nucleus\n";
        let text = extract_text(md, "text/markdown", "bio.md").unwrap();
        assert!(text.contains("Biology"));
        assert!(text.contains("Cells are the basic unit of life."));
        assert!(text.contains("membrane"));
        assert!(!text.contains('#'));
        assert!(!text.contains('*'));
    }

    #[test]
    fn test_binary_is_rejected() {
        let err = extract_text(&[0xff, 0xfe, 0x00, 0x01], "application/pdf", "doc.pdf")
            .unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedFile(m) if m == "application/pdf"));
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let err = extract_text(b"   \n  ", "text/plain", "empty.txt").unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_long_text_is_truncated_on_a_char_boundary() {
        let text = "é".repeat(MAX_TEXT_LEN); // 2 bytes per char
        let extracted = extract_text(text.as_bytes(), "text/plain", "big.txt").unwrap();
        assert!(extracted.len() <= MAX_TEXT_LEN);
        assert!(extracted.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type("notes.txt"), "text/plain");
        assert_eq!(guess_mime_type("notes.MD"), "text/markdown");
        assert_eq!(guess_mime_type("archive.zip"), "application/octet-stream");
        assert_eq!(guess_mime_type("noext"), "application/octet-stream");
    }
}

// SPDX-License-Identifier: MIT

//! Plain-text extraction from fetched paste bodies

use super::error::{PastegoError, Result};

/// Wide enough that html2text never wraps a line of a normal paste, so
/// phrases stay contiguous for substring search.
const HTML_RENDER_WIDTH: usize = 4096;

/// Whether a `Content-Type` header value denotes an HTML document
pub fn is_html(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}

/// Turn a raw response body into the text that searches run against.
///
/// Raw paste endpoints answer `text/plain` and are used verbatim, markup and
/// all. HTML pages are rendered to their visible text.
pub fn extract_text(content_type: Option<&str>, bytes: &[u8]) -> Result<String> {
    if is_html(content_type) {
        html2text::from_read(bytes, HTML_RENDER_WIDTH)
            .map_err(|e| PastegoError::Extract(e.to_string()))
    } else {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_html() {
        assert!(is_html(Some("text/html")));
        assert!(is_html(Some("text/html; charset=utf-8")));
        assert!(is_html(Some("TEXT/HTML")));
        assert!(!is_html(Some("text/plain; charset=utf-8")));
        assert!(!is_html(None));
    }

    #[test]
    fn test_plain_text_kept_verbatim() {
        let raw = b"<?php echo '<body>'; ?>";
        let text = extract_text(Some("text/plain"), raw).unwrap();
        assert_eq!(text, "<?php echo '<body>'; ?>");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let text = extract_text(None, &[b'o', b'k', 0xff]).unwrap();
        assert!(text.starts_with("ok"));
    }

    #[test]
    fn test_html_rendered_to_text() {
        let html = b"<html><body><p>my password is: quake</p></body></html>";
        let text = extract_text(Some("text/html"), html).unwrap();
        assert!(text.contains("my password is: quake"));
        assert!(!text.contains("<p>"));
    }
}

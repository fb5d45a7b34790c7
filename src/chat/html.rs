//! HTML transcript export.
//!
//! Writes the chat log as a standalone HTML document, one entry per line with
//! the role label as a styled prefix. All message text passes through
//! [`escape_html`] before it is inserted into markup.

use std::fs;
use std::path::Path;

use super::log::{ChatLog, Role};

/// Escapes the five HTML-sensitive characters in message text.
///
/// `&` is replaced first so already-inserted entity ampersands are not
/// escaped twice.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Renders the chat log as a standalone HTML document.
pub fn render_transcript(log: &ChatLog) -> String {
    let mut body = String::new();

    for entry in log.entries() {
        let class = match entry.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        body.push_str(&format!(
            "    <div class=\"message\"><strong class=\"{}\">{}:</strong> {}</div>\n",
            class,
            entry.role.label(),
            escape_html(&entry.text)
        ));
    }

    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>parley conversation</title>\n\
         <style>\n\
         body {{ font-family: sans-serif; max-width: 48em; margin: 2em auto; }}\n\
         .message {{ margin-bottom: 10px; }}\n\
         .user {{ color: #b8860b; }}\n\
         .assistant {{ color: #2e8b57; }}\n\
         </style>\n\
         </head>\n\
         <body>\n{body}</body>\n\
         </html>\n"
    )
}

/// Writes the chat log as an HTML transcript to the given path.
///
/// # Errors
/// - If the file cannot be written
pub fn write_transcript(path: &Path, log: &ChatLog) -> anyhow::Result<()> {
    fs::write(path, render_transcript(log))
        .map_err(|e| anyhow::anyhow!("Failed to write transcript {}: {e}", path.display()))?;
    tracing::info!(
        "Exported {} chat entries to {}",
        log.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html_covers_all_five_characters() {
        assert_eq!(
            escape_html(r#"<b>"fish" & 'chips'</b>"#),
            "&lt;b&gt;&quot;fish&quot; &amp; &#039;chips&#039;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_escaped_output_has_no_raw_sensitive_characters() {
        let escaped = escape_html("a < b > c & d \" e ' f");
        // Only ampersands introduced by entities may remain
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(!escaped.contains('"'));
        assert!(!escaped.contains('\''));
        for (i, c) in escaped.char_indices() {
            if c == '&' {
                assert!(
                    escaped[i..].starts_with("&amp;")
                        || escaped[i..].starts_with("&lt;")
                        || escaped[i..].starts_with("&gt;")
                        || escaped[i..].starts_with("&quot;")
                        || escaped[i..].starts_with("&#039;")
                );
            }
        }
    }

    #[test]
    fn test_escape_html_leaves_plain_text_alone() {
        assert_eq!(escape_html("hello world"), "hello world");
    }

    #[test]
    fn test_render_transcript_prefixes_role_labels() {
        let mut log = ChatLog::new();
        log.push(Role::User, "hello");
        log.push(Role::Assistant, "<script>alert(1)</script>");

        let html = render_transcript(&log);
        assert!(html.contains("<strong class=\"user\">You:</strong> hello"));
        assert!(html.contains(
            "<strong class=\"assistant\">Assistant:</strong> &lt;script&gt;alert(1)&lt;/script&gt;"
        ));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_write_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.html");

        let mut log = ChatLog::new();
        log.push(Role::User, "hello");
        write_transcript(&path, &log).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
        assert!(written.contains("You:</strong> hello"));
    }
}

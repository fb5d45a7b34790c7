//! Chat session state and view updates.
//!
//! Owns the append-only chat log and translates agent results into view
//! updates. A successful reply updates every view surface; a failure only
//! raises an alert and leaves the views untouched.

use crate::client::AgentReply;

use super::log::{ChatLog, Role};
use super::view::ViewSink;

/// One conversation's client-side state.
pub struct ChatSession {
    log: ChatLog,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            log: ChatLog::new(),
        }
    }

    /// Returns the conversation log.
    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    /// Applies a successful agent reply to the log and the view.
    ///
    /// Updates the transcript and assistant panels, points the audio player at
    /// the synthesized reply, and appends the user's transcript followed by
    /// the assistant's reply to the chat log.
    pub fn apply_reply(&mut self, view: &mut dyn ViewSink, reply: &AgentReply, audio_url: &str) {
        view.set_loading(false);
        view.show_transcript(&reply.transcript);
        view.show_assistant_reply(&reply.assistant_text);
        view.set_audio_source(audio_url);

        self.log.push(Role::User, reply.transcript.clone());
        view.append_chat_entry(Role::User, &reply.transcript);

        self.log.push(Role::Assistant, reply.assistant_text.clone());
        view.append_chat_entry(Role::Assistant, &reply.assistant_text);
    }

    /// Surfaces a failed upload. The chat log and result views are unchanged;
    /// only the loading indicator is cleared and an alert is raised.
    pub fn apply_error(&mut self, view: &mut dyn ViewSink, message: &str) {
        view.set_loading(false);
        view.show_error(message);
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call made through the sink, in order.
    #[derive(Default)]
    struct RecordingSink {
        transcript: Option<String>,
        assistant: Option<String>,
        audio_source: Option<String>,
        chat_entries: Vec<(Role, String)>,
        errors: Vec<String>,
        loading: Option<bool>,
    }

    impl ViewSink for RecordingSink {
        fn show_transcript(&mut self, text: &str) {
            self.transcript = Some(text.to_string());
        }

        fn show_assistant_reply(&mut self, text: &str) {
            self.assistant = Some(text.to_string());
        }

        fn set_audio_source(&mut self, url: &str) {
            self.audio_source = Some(url.to_string());
        }

        fn append_chat_entry(&mut self, role: Role, text: &str) {
            self.chat_entries.push((role, text.to_string()));
        }

        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }

        fn set_loading(&mut self, loading: bool) {
            self.loading = Some(loading);
        }
    }

    fn reply() -> AgentReply {
        AgentReply {
            transcript: "hello".to_string(),
            assistant_text: "hi there".to_string(),
            audio_file: "a1.wav".to_string(),
        }
    }

    #[test]
    fn test_reply_updates_all_views_and_log_in_order() {
        let mut session = ChatSession::new();
        let mut sink = RecordingSink::default();

        session.apply_reply(&mut sink, &reply(), "http://localhost:8000/files/a1.wav");

        assert_eq!(sink.transcript.as_deref(), Some("hello"));
        assert_eq!(sink.assistant.as_deref(), Some("hi there"));
        assert_eq!(
            sink.audio_source.as_deref(),
            Some("http://localhost:8000/files/a1.wav")
        );
        assert_eq!(sink.loading, Some(false));
        assert_eq!(
            sink.chat_entries,
            vec![
                (Role::User, "hello".to_string()),
                (Role::Assistant, "hi there".to_string()),
            ]
        );
        assert_eq!(session.log().len(), 2);
        assert!(sink.errors.is_empty());
    }

    #[test]
    fn test_error_leaves_views_and_log_unchanged() {
        let mut session = ChatSession::new();
        let mut sink = RecordingSink::default();

        session.apply_error(&mut sink, "no audio detected");

        assert!(sink.transcript.is_none());
        assert!(sink.assistant.is_none());
        assert!(sink.audio_source.is_none());
        assert!(sink.chat_entries.is_empty());
        assert_eq!(session.log().len(), 0);
        assert_eq!(sink.loading, Some(false));
        assert_eq!(sink.errors, vec!["no audio detected".to_string()]);
    }
}

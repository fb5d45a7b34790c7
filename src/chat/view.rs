//! View abstraction for the chat controller.
//!
//! The controller never touches the terminal directly; it drives whatever
//! implements [`ViewSink`]. The ratatui TUI is the real implementation, tests
//! use a recording sink.

use super::log::Role;

/// Rendering capabilities the chat controller needs from a view.
pub trait ViewSink {
    /// Shows the latest transcription of what the user said.
    fn show_transcript(&mut self, text: &str);

    /// Shows the latest assistant text reply.
    fn show_assistant_reply(&mut self, text: &str);

    /// Points the audio player at the synthesized reply.
    fn set_audio_source(&mut self, url: &str);

    /// Appends one entry to the rendered chat log.
    fn append_chat_entry(&mut self, role: Role, text: &str);

    /// Surfaces a blocking, user-facing alert.
    fn show_error(&mut self, message: &str);

    /// Shows or clears the waiting-for-agent indicator.
    fn set_loading(&mut self, loading: bool);
}

//! In-memory chat log.
//!
//! An append-only sequence of user/assistant entries for the current run.
//! Nothing here is persisted; the log is rebuilt fresh each session.

/// Who said a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label shown as the styled prefix of a rendered entry.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// One rendered line of conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: Role,
    pub text: String,
}

/// Append-only conversation log for the current session.
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one entry to the log.
    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.entries.push(ChatEntry {
            role,
            text: text.into(),
        });
    }

    /// Returns all entries in insertion order.
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_insertion_order() {
        let mut log = ChatLog::new();
        log.push(Role::User, "hello");
        log.push(Role::Assistant, "hi there");

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].role, Role::User);
        assert_eq!(log.entries()[0].text, "hello");
        assert_eq!(log.entries()[1].role, Role::Assistant);
        assert_eq!(log.entries()[1].text, "hi there");
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::User.label(), "You");
        assert_eq!(Role::Assistant.label(), "Assistant");
    }
}

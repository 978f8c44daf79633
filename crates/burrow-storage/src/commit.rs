use serde::{Deserialize, Serialize};

/// Transfer encoding of a commit action's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Base64,
}

/// One file created by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAction {
    pub action: String,
    pub file_path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,
}

impl CommitAction {
    /// Creates `file_path` holding `content` verbatim.
    pub fn text(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action: "create".to_string(),
            file_path: file_path.into(),
            content: content.into(),
            encoding: None,
        }
    }

    /// Creates `file_path` from base64 text the store decodes on write.
    pub fn base64(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            encoding: Some(Encoding::Base64),
            ..Self::text(file_path, content)
        }
    }
}

/// An atomic write of one or more files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub message: String,
    pub actions: Vec<CommitAction>,
}

impl Commit {
    pub fn new(message: impl Into<String>, actions: Vec<CommitAction>) -> Self {
        Self {
            message: message.into(),
            actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_action_omits_encoding() {
        let action = CommitAction::text("a/B/cdef", "hello");
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "create", "file_path": "a/B/cdef", "content": "hello"})
        );
    }

    #[test]
    fn base64_action_declares_encoding() {
        let action = CommitAction::base64("a/B/cdef", "aGVsbG8=");
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "action": "create",
                "file_path": "a/B/cdef",
                "content": "aGVsbG8=",
                "encoding": "base64"
            })
        );
    }
}

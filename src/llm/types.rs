use serde::{Deserialize, Serialize};

/// Role of a conversation message (OpenAI terminology).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation, in the shape the endpoint expects.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One entry from the provider's model listing.
///
/// Only `id` is meaningful to this crate; the rest is provider-supplied
/// metadata passed through untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_chat_message_wire_shape() {
        let message = ChatMessage::user("Hello");
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hello"}"#);
    }

    #[test]
    fn test_chat_message_constructors() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::user("u").role, Role::User);
        assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn test_model_descriptor_tolerates_sparse_metadata() {
        let descriptor: ModelDescriptor = serde_json::from_str(r#"{"id":"gpt-4o-mini"}"#).unwrap();
        assert_eq!(descriptor.id, "gpt-4o-mini");
        assert_eq!(descriptor.created, None);
        assert_eq!(descriptor.owned_by, None);
    }

    #[test]
    fn test_model_descriptor_ignores_unknown_fields() {
        let descriptor: ModelDescriptor = serde_json::from_str(
            r#"{"id":"m1","object":"model","created":1700000000,"owned_by":"org","permission":[]}"#,
        )
        .unwrap();
        assert_eq!(descriptor.id, "m1");
        assert_eq!(descriptor.created, Some(1_700_000_000));
        assert_eq!(descriptor.owned_by.as_deref(), Some("org"));
    }
}

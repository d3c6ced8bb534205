//! Wire events for the real-time channels.
//!
//! Inbound events are a closed tagged enumeration with an explicit
//! unrecognized arm; anything that fails to decode is discarded by the
//! connection handler without dropping the socket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ChatInbound {
    #[serde(rename = "chat_message")]
    ChatMessage {
        message: String,
        #[serde(default)]
        image_url: Option<String>,
    },
    #[serde(rename = "mark_read")]
    MarkRead,
    #[serde(other)]
    Unrecognized,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ChatOutbound {
    #[serde(rename = "chat_message")]
    ChatMessage {
        message: String,
        message_id: Uuid,
        sender: String,
        sender_id: Uuid,
        sender_name: String,
        image_url: Option<String>,
        /// ISO-8601 persisted creation timestamp
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "messages_read")]
    MessagesRead {
        reader_id: Uuid,
        reader_name: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum UserOutbound {
    #[serde(rename = "notification")]
    Notification {
        title: String,
        message: String,
        notification_type: String,
        data: serde_json::Value,
        timestamp: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_chat_message_with_image() {
        let evt: ChatInbound = serde_json::from_str(
            r#"{"type":"chat_message","message":"On my way","image_url":"https://cdn/x.jpg"}"#,
        )
        .unwrap();
        match evt {
            ChatInbound::ChatMessage { message, image_url } => {
                assert_eq!(message, "On my way");
                assert_eq!(image_url.as_deref(), Some("https://cdn/x.jpg"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn image_url_is_optional() {
        let evt: ChatInbound =
            serde_json::from_str(r#"{"type":"chat_message","message":"hi"}"#).unwrap();
        assert!(matches!(
            evt,
            ChatInbound::ChatMessage { image_url: None, .. }
        ));
    }

    #[test]
    fn mark_read_carries_no_fields() {
        let evt: ChatInbound = serde_json::from_str(r#"{"type":"mark_read"}"#).unwrap();
        assert!(matches!(evt, ChatInbound::MarkRead));
    }

    #[test]
    fn unknown_type_hits_the_unrecognized_arm() {
        let evt: ChatInbound =
            serde_json::from_str(r#"{"type":"unknown_type","whatever":1}"#).unwrap();
        assert!(matches!(evt, ChatInbound::Unrecognized));
    }

    #[test]
    fn missing_required_field_fails_decode() {
        assert!(serde_json::from_str::<ChatInbound>(r#"{"type":"chat_message"}"#).is_err());
    }

    #[test]
    fn outbound_chat_message_has_the_full_field_set() {
        let out = ChatOutbound::ChatMessage {
            message: "On my way".into(),
            message_id: Uuid::nil(),
            sender: "handy_dan".into(),
            sender_id: Uuid::nil(),
            sender_name: "Dan Harper".into(),
            image_url: None,
            timestamp: Utc::now(),
        };
        let v: serde_json::Value = serde_json::to_value(&out).unwrap();
        assert_eq!(v["type"], "chat_message");
        for key in [
            "message",
            "message_id",
            "sender",
            "sender_id",
            "sender_name",
            "image_url",
            "timestamp",
        ] {
            assert!(v.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn read_receipt_is_conversation_wide() {
        let out = ChatOutbound::MessagesRead {
            reader_id: Uuid::nil(),
            reader_name: "Dan Harper".into(),
        };
        let v: serde_json::Value = serde_json::to_value(&out).unwrap();
        assert_eq!(v["type"], "messages_read");
        // no per-message granularity in the receipt
        assert!(v.get("message_id").is_none());
    }

    #[test]
    fn notification_event_defaults_data_to_an_object() {
        let out = UserOutbound::Notification {
            title: "New application".into(),
            message: "Someone applied to your job".into(),
            notification_type: "job_application".into(),
            data: serde_json::json!({}),
            timestamp: Utc::now(),
        };
        let v: serde_json::Value = serde_json::to_value(&out).unwrap();
        assert_eq!(v["type"], "notification");
        assert!(v["data"].is_object());
    }
}

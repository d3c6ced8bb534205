//! Redis pub/sub relay for multi-node group fan-out.
//!
//! Every local broadcast is also published to `group:<name>` wrapped in an
//! envelope carrying the origin instance id; a process-lifetime listener
//! re-broadcasts foreign-origin payloads into the local bus and drops its
//! own to avoid double delivery.

use axum::extract::ws::Message;
use futures_util::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::websocket::ChannelBus;

const CHANNEL_PREFIX: &str = "group:";

#[derive(Debug, Serialize, Deserialize)]
struct RelayEnvelope {
    origin: Uuid,
    payload: String,
}

fn channel_for_group(group: &str) -> String {
    format!("{CHANNEL_PREFIX}{group}")
}

pub async fn publish(
    client: &redis::Client,
    origin: Uuid,
    group: &str,
    payload: &str,
) -> redis::RedisResult<()> {
    let envelope = RelayEnvelope {
        origin,
        payload: payload.to_string(),
    };
    let body = serde_json::to_string(&envelope).map_err(|e| {
        redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "relay envelope serialization",
            e.to_string(),
        ))
    })?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    conn.publish::<_, _, ()>(channel_for_group(group), body)
        .await
}

/// Pattern-subscribe to all group channels and re-broadcast foreign payloads
/// into the local bus. Runs for the process lifetime.
pub async fn start_relay_listener(
    client: redis::Client,
    origin: Uuid,
    bus: ChannelBus,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not multiplexed
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe(format!("{CHANNEL_PREFIX}*")).await?;
    let mut stream = pubsub.on_message();

    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let Some(group) = channel.strip_prefix(CHANNEL_PREFIX) else {
            continue;
        };
        let body: String = match msg.get_payload() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "relay payload was not valid text");
                continue;
            }
        };
        match serde_json::from_str::<RelayEnvelope>(&body) {
            Ok(envelope) if envelope.origin != origin => {
                bus.broadcast(group, Message::Text(envelope.payload)).await;
            }
            Ok(_) => {} // our own publish, already delivered locally
            Err(e) => warn!(error = %e, "discarding malformed relay envelope"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_naming_is_prefixed_with_group() {
        assert_eq!(channel_for_group("chat_42"), "group:chat_42");
    }

    #[test]
    fn envelope_round_trips() {
        let origin = Uuid::new_v4();
        let envelope = RelayEnvelope {
            origin,
            payload: r#"{"type":"chat_message"}"#.into(),
        };
        let body = serde_json::to_string(&envelope).unwrap();
        let back: RelayEnvelope = serde_json::from_str(&body).unwrap();
        assert_eq!(back.origin, origin);
        assert_eq!(back.payload, envelope.payload);
    }
}

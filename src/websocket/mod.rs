use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod chat;
pub mod events;
pub mod notifications;
pub mod relay;

use crate::state::AppState;
use serde::Serialize;
use tracing::warn;

/// Serialize an event once, fan it out to the local group and relay it to
/// the other instances. Relay failures are logged, never surfaced.
pub async fn broadcast_json<E: Serialize>(state: &AppState, group: &str, event: &E) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(group, error = %e, "failed to serialize outbound event");
            return;
        }
    };
    state
        .bus
        .broadcast(group, Message::Text(payload.clone()))
        .await;
    if let Err(e) = relay::publish(&state.redis, state.instance_id, group, &payload).await {
        warn!(group, error = %e, "relay publish failed");
    }
}

pub fn chat_group(conversation_id: Uuid) -> String {
    format!("chat_{}", conversation_id)
}

pub fn user_group(user_id: Uuid) -> String {
    format!("user_{}", user_id)
}

/// Process-wide group registry: named groups of connection senders.
/// Owned by `AppState` and passed into handlers, never accessed as a global.
#[derive(Default, Clone)]
pub struct ChannelBus {
    // group name -> (subscription id, channel sender)
    inner: Arc<RwLock<HashMap<String, Vec<(Uuid, UnboundedSender<Message>)>>>>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a group, returning its subscription id and
    /// the receiving end of its outbound queue.
    pub async fn join(&self, group: &str) -> (Uuid, UnboundedReceiver<Message>) {
        let (tx, rx) = unbounded_channel();
        let id = Uuid::new_v4();
        let mut guard = self.inner.write().await;
        guard.entry(group.to_string()).or_default().push((id, tx));
        (id, rx)
    }

    /// Unregister a connection; drops the group entry once empty
    pub async fn leave(&self, group: &str, subscription_id: Uuid) {
        let mut guard = self.inner.write().await;
        if let Some(list) = guard.get_mut(group) {
            list.retain(|(id, _)| *id != subscription_id);
            if list.is_empty() {
                guard.remove(group);
            }
        }
    }

    /// Fan a message out to every current member of the group, pruning
    /// members whose receiving task has gone away
    pub async fn broadcast(&self, group: &str, msg: Message) {
        let mut guard = self.inner.write().await;
        if let Some(list) = guard.get_mut(group) {
            list.retain(|(_, sender)| sender.send(msg.clone()).is_ok());
        }
    }

    pub async fn member_count(&self, group: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(group).map(|l| l.len()).unwrap_or(0)
    }

    pub async fn group_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_member_including_sender() {
        let bus = ChannelBus::new();
        let group = chat_group(Uuid::new_v4());
        let (_id_a, mut rx_a) = bus.join(&group).await;
        let (_id_b, mut rx_b) = bus.join(&group).await;

        bus.broadcast(&group, Message::Text("hello".into())).await;

        assert_eq!(rx_a.recv().await, Some(Message::Text("hello".into())));
        assert_eq!(rx_b.recv().await, Some(Message::Text("hello".into())));
    }

    #[tokio::test]
    async fn leave_removes_membership_and_empty_groups() {
        let bus = ChannelBus::new();
        let group = user_group(Uuid::new_v4());
        let (id, mut rx) = bus.join(&group).await;
        assert_eq!(bus.member_count(&group).await, 1);

        bus.leave(&group, id).await;
        assert_eq!(bus.member_count(&group).await, 0);

        bus.broadcast(&group, Message::Text("gone".into())).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_to_unknown_group_is_a_no_op() {
        let bus = ChannelBus::new();
        bus.broadcast("chat_missing", Message::Text("x".into())).await;
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_broadcast() {
        let bus = ChannelBus::new();
        let group = chat_group(Uuid::new_v4());
        let (_id_a, rx_a) = bus.join(&group).await;
        let (_id_b, mut rx_b) = bus.join(&group).await;
        drop(rx_a);

        bus.broadcast(&group, Message::Text("ping".into())).await;

        assert_eq!(bus.member_count(&group).await, 1);
        assert_eq!(rx_b.recv().await, Some(Message::Text("ping".into())));
    }

    #[test]
    fn group_names_are_deterministic() {
        let id = Uuid::nil();
        assert_eq!(
            chat_group(id),
            "chat_00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            user_group(id),
            "user_00000000-0000-0000-0000-000000000000"
        );
    }
}

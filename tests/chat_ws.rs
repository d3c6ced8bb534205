//! WebSocket chat integration tests. They start Postgres and Redis through
//! Docker, so they are ignored by default; run with `cargo test -- --ignored`
//! when the daemon is available.

mod common;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use testcontainers::clients::Cli;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Read frames until one carries the wanted event type, skipping receipts and
/// other interleaved events.
async fn recv_event(ws: &mut WsStream, wanted: &str) -> serde_json::Value {
    timeout(RECV_TIMEOUT, async {
        loop {
            match ws.next().await {
                Some(Ok(WsMessage::Text(txt))) => {
                    let value: serde_json::Value =
                        serde_json::from_str(&txt).expect("frames are JSON");
                    if value["type"] == wanted {
                        return value;
                    }
                }
                Some(Ok(_)) => {}
                other => panic!("connection ended while waiting for {wanted}: {other:?}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"))
}

fn handshake_status(err: WsError) -> u16 {
    match err {
        WsError::Http(response) => response.status().as_u16(),
        other => panic!("expected an HTTP rejection, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn handshake_rejects_anonymous_and_third_party_clients() {
    let docker = Cli::default();
    let (_pg, pool) = common::start_postgres(&docker).await;
    let (_redis, redis_url) = common::start_redis(&docker).await;
    let app = common::spawn_app(pool, &redis_url).await;

    let fixture = common::seed_conversation(&app.db).await;
    let outsider = common::seed_user(&app.db, &format!("out_{}", common::short_id()), "customer").await;

    // no token
    let err = connect_async(app.chat_ws_url(fixture.conversation_id, None))
        .await
        .expect_err("anonymous connect must fail");
    assert_eq!(handshake_status(err), 401);

    // garbage token
    let err = connect_async(app.chat_ws_url(fixture.conversation_id, Some("not-a-jwt")))
        .await
        .expect_err("bad token must fail");
    assert_eq!(handshake_status(err), 401);

    // authenticated but not a participant
    let token = app.token_for(outsider);
    let err = connect_async(app.chat_ws_url(fixture.conversation_id, Some(&token)))
        .await
        .expect_err("third party must fail");
    assert_eq!(handshake_status(err), 403);

    // unknown conversation looks the same as a foreign one
    let token = app.token_for(fixture.customer_id);
    let err = connect_async(app.chat_ws_url(Uuid::new_v4(), Some(&token)))
        .await
        .expect_err("unknown conversation must fail");
    assert_eq!(handshake_status(err), 403);
}

#[tokio::test]
#[ignore]
async fn message_is_persisted_once_and_broadcast_to_both_parties() {
    let docker = Cli::default();
    let (_pg, pool) = common::start_postgres(&docker).await;
    let (_redis, redis_url) = common::start_redis(&docker).await;
    let app = common::spawn_app(pool, &redis_url).await;

    let fixture = common::seed_conversation(&app.db).await;
    let customer_token = app.token_for(fixture.customer_id);
    let provider_token = app.token_for(fixture.provider_user_id);

    let (mut customer_ws, _) =
        connect_async(app.chat_ws_url(fixture.conversation_id, Some(&customer_token)))
            .await
            .expect("customer connects");
    let (mut provider_ws, _) =
        connect_async(app.chat_ws_url(fixture.conversation_id, Some(&provider_token)))
            .await
            .expect("provider connects");

    let outbound = json!({ "type": "chat_message", "message": "when can you come by?" });
    customer_ws
        .send(WsMessage::Text(outbound.to_string()))
        .await
        .expect("send");

    let seen_by_customer = recv_event(&mut customer_ws, "chat_message").await;
    let seen_by_provider = recv_event(&mut provider_ws, "chat_message").await;

    assert_eq!(seen_by_customer["message"], "when can you come by?");
    assert_eq!(seen_by_customer["message_id"], seen_by_provider["message_id"]);
    assert_eq!(seen_by_customer["timestamp"], seen_by_provider["timestamp"]);
    assert_eq!(
        seen_by_provider["sender_id"],
        fixture.customer_id.to_string()
    );

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
        .bind(fixture.conversation_id)
        .fetch_one(&app.db)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test]
#[ignore]
async fn connecting_marks_counterpart_messages_read_idempotently() {
    let docker = Cli::default();
    let (_pg, pool) = common::start_postgres(&docker).await;
    let (_redis, redis_url) = common::start_redis(&docker).await;
    let app = common::spawn_app(pool, &redis_url).await;

    let fixture = common::seed_conversation(&app.db).await;
    for i in 0..3 {
        sqlx::query("INSERT INTO messages (conversation_id, sender_id, content) VALUES ($1, $2, $3)")
            .bind(fixture.conversation_id)
            .bind(fixture.customer_id)
            .bind(format!("ping {i}"))
            .execute(&app.db)
            .await
            .unwrap();
    }

    let provider_token = app.token_for(fixture.provider_user_id);
    let (mut provider_ws, _) =
        connect_async(app.chat_ws_url(fixture.conversation_id, Some(&provider_token)))
            .await
            .expect("provider connects");

    // the connect side effect produces a conversation-wide receipt
    let receipt = recv_event(&mut provider_ws, "messages_read").await;
    assert_eq!(receipt["reader_id"], fixture.provider_user_id.to_string());

    let unread: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM messages WHERE conversation_id = $1 AND is_read = FALSE",
    )
    .bind(fixture.conversation_id)
    .fetch_one(&app.db)
    .await
    .unwrap();
    assert_eq!(unread, 0);

    // an explicit mark_read after the fact must not duplicate status rows
    provider_ws
        .send(WsMessage::Text(json!({ "type": "mark_read" }).to_string()))
        .await
        .expect("send mark_read");
    recv_event(&mut provider_ws, "messages_read").await;

    let statuses: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM message_read_statuses s
         JOIN messages m ON m.id = s.message_id
         WHERE m.conversation_id = $1 AND s.user_id = $2",
    )
    .bind(fixture.conversation_id)
    .bind(fixture.provider_user_id)
    .fetch_one(&app.db)
    .await
    .unwrap();
    assert_eq!(statuses, 3);
}

#[tokio::test]
#[ignore]
async fn unrecognized_events_are_discarded_without_dropping_the_connection() {
    let docker = Cli::default();
    let (_pg, pool) = common::start_postgres(&docker).await;
    let (_redis, redis_url) = common::start_redis(&docker).await;
    let app = common::spawn_app(pool, &redis_url).await;

    let fixture = common::seed_conversation(&app.db).await;
    let token = app.token_for(fixture.customer_id);
    let (mut ws, _) = connect_async(app.chat_ws_url(fixture.conversation_id, Some(&token)))
        .await
        .expect("connect");

    ws.send(WsMessage::Text(json!({ "type": "self_destruct" }).to_string()))
        .await
        .expect("send unknown event");
    ws.send(WsMessage::Text("not json at all".into()))
        .await
        .expect("send malformed frame");

    // the connection survives both and still processes real traffic
    ws.send(WsMessage::Text(
        json!({ "type": "chat_message", "message": "still here" }).to_string(),
    ))
    .await
    .expect("send");
    let event = recv_event(&mut ws, "chat_message").await;
    assert_eq!(event["message"], "still here");
}

#[tokio::test]
#[ignore]
async fn notification_channel_rejects_anonymous_and_delivers_events() {
    let docker = Cli::default();
    let (_pg, pool) = common::start_postgres(&docker).await;
    let (_redis, redis_url) = common::start_redis(&docker).await;
    let app = common::spawn_app(pool, &redis_url).await;

    let fixture = common::seed_conversation(&app.db).await;

    let err = connect_async(format!("{}/ws/notifications", app.ws_url))
        .await
        .expect_err("anonymous connect must fail");
    assert_eq!(handshake_status(err), 401);

    let provider_token = app.token_for(fixture.provider_user_id);
    let (mut notifications_ws, _) = connect_async(format!(
        "{}/ws/notifications?token={}",
        app.ws_url, provider_token
    ))
    .await
    .expect("provider notification channel");

    // a chat message from the customer produces a push for the provider
    let customer_token = app.token_for(fixture.customer_id);
    let (mut chat_ws, _) =
        connect_async(app.chat_ws_url(fixture.conversation_id, Some(&customer_token)))
            .await
            .expect("customer connects");
    chat_ws
        .send(WsMessage::Text(
            json!({ "type": "chat_message", "message": "are you there?" }).to_string(),
        ))
        .await
        .expect("send");

    let push = recv_event(&mut notifications_ws, "notification").await;
    assert_eq!(push["notification_type"], "new_message");
    assert_eq!(
        push["data"]["conversation_id"],
        fixture.conversation_id.to_string()
    );
}

//! Gateway session integration tests
//!
//! Every test runs a real client against the in-memory gateway and drives the
//! server side packet by packet.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::sync::Arc;
use std::time::Duration;

use cord_core::{Game, Snowflake};
use cord_gateway::listener::EntityKind;
use cord_gateway::protocol::{GatewayMessage, OpCode, NORMAL_CLOSURE};
use cord_gateway::transport::Frame;
use cord_gateway::{Event, EventKind, GatewayError, SessionState};
use integration_tests::{
    compress, connect, dispatch, event_log, guild_create, message_create, ready,
    test_builder, test_builder_with, test_config, text_channel_id, wait_until, MockGateway,
    GATEWAY_URL, SELF_ID, SLOW_HEARTBEAT_MS,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::time::Instant;

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_identify_then_ready() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (ready_listener, mut readies) = event_log();
    let connecting = tokio::spawn(
        test_builder(connector)
            .listener(EventKind::Ready, ready_listener)
            .connect(),
    );

    let mut server = gateway.accept().await?;
    assert_eq!(server.url, format!("{GATEWAY_URL}?encoding=json&v=6"));

    server.hello(SLOW_HEARTBEAT_MS)?;
    let identify = server.recv_packet(OpCode::Identify).await?;
    assert_eq!(identify.d["token"], "test-token");
    assert_eq!(identify.d["compress"], false);
    assert_eq!(identify.d["large_threshold"], 250);
    assert!(identify.d.get("shard").is_none());

    server.send(&dispatch("READY", 1, ready("session-1", &[])))?;
    let client = tokio::time::timeout(integration_tests::WAIT, connecting).await???;

    assert!(matches!(readies.next().await?, Event::Ready));
    assert_eq!(client.state(), SessionState::Connected);
    assert_eq!(client.session().session_id().as_deref(), Some("session-1"));
    assert_eq!(client.session().heartbeat_interval(), Some(Duration::from_millis(SLOW_HEARTBEAT_MS)));
    let yourself = client.yourself().expect("own user cached");
    assert_eq!(yourself.read().id, Snowflake::new(SELF_ID));
    assert_eq!(yourself.read().name, "cord");

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_identify_carries_shard_when_sharded() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let mut config = test_config();
    config.shard = 1;
    config.total_shards = 2;
    let connecting = tokio::spawn(test_builder_with(config, connector).connect());

    let mut server = gateway.accept().await?;
    server.hello(SLOW_HEARTBEAT_MS)?;
    let identify = server.recv_packet(OpCode::Identify).await?;
    assert_eq!(identify.d["shard"], json!([1, 2]));

    drop(server);
    assert!(connecting.await?.is_err());
    Ok(())
}

#[tokio::test]
async fn test_connect_fails_when_transport_refuses() -> anyhow::Result<()> {
    let (connector, gateway) = MockGateway::new();
    gateway.refuse_connections();

    let result = test_builder(connector).connect().await;
    assert!(matches!(result, Err(GatewayError::HandshakeFailed(_))));
    Ok(())
}

#[tokio::test]
async fn test_connect_fails_when_dropped_before_ready() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let connecting = tokio::spawn(test_builder(connector).connect());

    let mut server = gateway.accept().await?;
    server.hello(SLOW_HEARTBEAT_MS)?;
    server.recv_packet(OpCode::Identify).await?;
    drop(server);

    assert!(connecting.await?.is_err());
    // no retry behind the caller's back
    gateway.assert_no_connection(Duration::from_millis(100)).await?;
    Ok(())
}

// ============================================================================
// Liveness
// ============================================================================

#[tokio::test]
async fn test_heartbeat_cadence() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (client, mut server) = connect(
        test_builder(connector),
        &mut gateway,
        ready("session-1", &[]),
        50,
    )
    .await?;

    let started = Instant::now();
    for _ in 0..4 {
        let heartbeat = server.recv_packet(OpCode::Heartbeat).await?;
        assert_eq!(heartbeat.d, json!(1));
        server.send(&GatewayMessage::heartbeat_ack())?;
    }
    // first beat is immediate, three more follow at the interval
    assert!(started.elapsed() >= Duration::from_millis(120));

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_dispatch_still_records_sequence() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (client, mut server) = connect(
        test_builder(connector),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    server.send(&dispatch("SOMETHING_NEW", 42, json!({"x": 1})))?;
    wait_until(|| client.session().sequence() == Some(42)).await?;

    // a heartbeat requested by the server carries the new sequence
    server.send(&GatewayMessage::heartbeat(None))?;
    server.recv_heartbeat_with(42).await?;
    assert_eq!(client.state(), SessionState::Connected);

    client.disconnect().await;
    Ok(())
}

// ============================================================================
// Reconnect and resume
// ============================================================================

#[tokio::test]
async fn test_resume_after_connection_drop() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let attempts = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&attempts);
    let (lost_listener, mut lost) = event_log();
    let (resume_listener, mut resumes) = event_log();
    let builder = test_builder(connector)
        .listener(EventKind::LostConnection, lost_listener)
        .listener(EventKind::Resume, resume_listener)
        .reconnect_delay(move |attempt| {
            recorded.lock().push(attempt);
            Duration::from_millis(10)
        });

    let (client, server) =
        connect(builder, &mut gateway, ready("session-1", &[]), SLOW_HEARTBEAT_MS).await?;
    server.send(&dispatch("SOMETHING_NEW", 5, json!({})))?;
    wait_until(|| client.session().sequence() == Some(5)).await?;
    drop(server);

    assert!(matches!(lost.next().await?, Event::LostConnection));
    let mut server = gateway.accept().await?;
    assert_eq!(*attempts.lock(), vec![1]);
    assert_eq!(client.session().reconnect_attempt(), 1);

    server.hello(SLOW_HEARTBEAT_MS)?;
    let resume = server.recv_packet(OpCode::Resume).await?;
    assert_eq!(resume.d["session_id"], "session-1");
    assert_eq!(resume.d["seq"], 5);
    assert_eq!(resume.d["token"], "test-token");

    server.send(&dispatch("RESUMED", 6, json!({})))?;
    assert!(matches!(resumes.next().await?, Event::Resume));
    assert_eq!(client.session().reconnect_attempt(), 0);
    assert_eq!(client.state(), SessionState::Connected);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_server_requested_reconnect() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (client, mut server) = connect(
        test_builder(connector),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    server.send(&GatewayMessage::reconnect())?;
    assert_eq!(server.recv_close().await?, NORMAL_CLOSURE);

    let mut server = gateway.accept().await?;
    assert_eq!(client.session().reconnect_attempt(), 1);
    server.hello(SLOW_HEARTBEAT_MS)?;
    server.recv_packet(OpCode::Resume).await?;
    server.send(&dispatch("RESUMED", 2, json!({})))?;
    wait_until(|| client.session().reconnect_attempt() == 0).await?;

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_server_requested_reconnect_respects_disabled_reconnect() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let mut config = test_config();
    config.reconnect = false;
    let (client, mut server) = connect(
        test_builder_with(config, connector),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    server.send(&GatewayMessage::reconnect())?;
    assert_eq!(server.recv_close().await?, NORMAL_CLOSURE);

    tokio::time::timeout(integration_tests::WAIT, client.session().join()).await?;
    gateway.assert_no_connection(Duration::from_millis(100)).await?;
    assert_eq!(client.state(), SessionState::Disconnected);
    assert_eq!(client.session().reconnect_attempt(), 0);
    Ok(())
}

#[tokio::test]
async fn test_invalid_session_identifies_again() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (ready_listener, mut readies) = event_log();
    let (client, mut server) = connect(
        test_builder(connector).listener(EventKind::Ready, ready_listener),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;
    assert!(matches!(readies.next().await?, Event::Ready));

    let invalidated = Instant::now();
    server.send(&GatewayMessage::invalid_session(false))?;
    let identify = server.recv_packet(OpCode::Identify).await?;
    assert!(invalidated.elapsed() >= Duration::from_millis(40));
    assert_eq!(identify.d["token"], "test-token");
    assert_eq!(client.session().session_id(), None);
    assert_eq!(client.session().sequence(), None);

    server.send(&dispatch("READY", 1, ready("session-2", &[])))?;
    assert!(matches!(readies.next().await?, Event::Ready));
    assert_eq!(client.session().session_id().as_deref(), Some("session-2"));

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_fatal_close_code_ends_session() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (lost_listener, mut lost) = event_log();
    let (client, server) = connect(
        test_builder(connector).listener(EventKind::LostConnection, lost_listener),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    server.send_frame(Frame::Close(Some((4004, "Authentication failed".to_string()))))?;
    assert!(matches!(lost.next().await?, Event::LostConnection));

    tokio::time::timeout(integration_tests::WAIT, client.session().join()).await?;
    assert_eq!(client.state(), SessionState::Disconnected);
    gateway.assert_no_connection(Duration::from_millis(100)).await?;
    Ok(())
}

#[tokio::test]
async fn test_drop_without_reconnect_stays_down() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let mut config = test_config();
    config.reconnect = false;
    let (client, server) = connect(
        test_builder_with(config, connector),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    drop(server);
    tokio::time::timeout(integration_tests::WAIT, client.session().join()).await?;
    assert_eq!(client.state(), SessionState::Disconnected);
    gateway.assert_no_connection(Duration::from_millis(100)).await?;
    Ok(())
}

#[tokio::test]
async fn test_disconnect_stops_reconnecting() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (lost_listener, mut lost) = event_log();
    let (client, mut server) = connect(
        test_builder(connector).listener(EventKind::LostConnection, lost_listener),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    client.disconnect().await;
    assert_eq!(server.recv_close().await?, NORMAL_CLOSURE);
    assert_eq!(client.state(), SessionState::Disconnected);
    assert!(!client.session().is_reconnect_enabled());

    gateway.assert_no_connection(Duration::from_millis(100)).await?;
    lost.assert_quiet(Duration::from_millis(50)).await?;
    Ok(())
}

#[tokio::test]
async fn test_disconnect_during_backoff_cancels_reconnect() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (lost_listener, mut lost) = event_log();
    let builder = test_builder(connector)
        .listener(EventKind::LostConnection, lost_listener)
        .reconnect_delay(|_| Duration::from_millis(300));
    let (client, server) =
        connect(builder, &mut gateway, ready("session-1", &[]), SLOW_HEARTBEAT_MS).await?;

    drop(server);
    assert!(matches!(lost.next().await?, Event::LostConnection));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    client.disconnect().await;
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(client.state(), SessionState::Disconnected);

    gateway.assert_no_connection(Duration::from_millis(500)).await?;
    Ok(())
}

// ============================================================================
// Hydration
// ============================================================================

#[tokio::test]
async fn test_connect_waits_for_every_server() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (available_listener, mut available) = event_log();
    let connecting = tokio::spawn(
        test_builder(connector)
            .listener(EventKind::ServerBecomesAvailable, available_listener)
            .connect(),
    );

    let mut server = gateway.accept().await?;
    server.hello(SLOW_HEARTBEAT_MS)?;
    server.recv_packet(OpCode::Identify).await?;
    server.send(&dispatch("READY", 1, ready("session-1", &[1, 2])))?;
    server.send(&dispatch("GUILD_CREATE", 2, guild_create(1, "One")))?;
    server.send(&dispatch("GUILD_CREATE", 3, guild_create(2, "Two")))?;

    let client = tokio::time::timeout(integration_tests::WAIT, connecting).await???;
    assert_eq!(client.cache().servers().len(), 2);
    assert_eq!(client.cache().unavailable_server_count(), 0);
    assert!(client.cache().channel(Snowflake::new(text_channel_id(2))).is_some());
    for _ in 0..2 {
        assert!(matches!(available.next().await?, Event::ServerBecomesAvailable { .. }));
    }

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_connect_gives_up_on_stalled_hydration() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let connecting = tokio::spawn(test_builder(connector).connect());

    let mut server = gateway.accept().await?;
    server.hello(SLOW_HEARTBEAT_MS)?;
    server.recv_packet(OpCode::Identify).await?;
    server.send(&dispatch("READY", 1, ready("session-1", &[1, 2])))?;
    server.send(&dispatch("GUILD_CREATE", 2, guild_create(1, "One")))?;

    let client = tokio::time::timeout(integration_tests::WAIT, connecting).await???;
    assert_eq!(client.state(), SessionState::Connected);
    assert_eq!(client.cache().unavailable_server_count(), 1);
    assert!(client.cache().is_server_unavailable(Snowflake::new(2)));

    // the missing server still joins the cache when it shows up
    server.send(&dispatch("GUILD_CREATE", 3, guild_create(2, "Two")))?;
    wait_until(|| client.cache().all_servers_loaded()).await?;

    client.disconnect().await;
    Ok(())
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_events_arrive_in_packet_order() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (message_listener, mut messages) = event_log();
    let (scoped_listener, mut scoped) = event_log();
    let channel_id = text_channel_id(7);
    let builder = test_builder(connector)
        .listener(EventKind::MessageCreate, message_listener)
        .scoped_listener(
            EntityKind::Channel,
            Snowflake::new(channel_id),
            EventKind::MessageCreate,
            scoped_listener,
        );
    let (client, server) =
        connect(builder, &mut gateway, ready("session-1", &[]), SLOW_HEARTBEAT_MS).await?;

    server.send(&dispatch("GUILD_CREATE", 2, guild_create(7, "Seven")))?;
    for i in 0..20u64 {
        server.send(&dispatch(
            "MESSAGE_CREATE",
            3 + i,
            message_create(channel_id, &format!("message {i}")),
        ))?;
    }

    for i in 0..20 {
        let Event::MessageCreate { message } = messages.next().await? else {
            anyhow::bail!("expected a message");
        };
        assert_eq!(message.read().content, format!("message {i}"));
        assert!(matches!(scoped.next().await?, Event::MessageCreate { .. }));
    }
    assert_eq!(client.cache().channel_messages(Snowflake::new(channel_id)).len(), 20);

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_compressed_dispatch() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (join_listener, mut joins) = event_log();
    let (client, server) = connect(
        test_builder(connector).listener(EventKind::ServerJoin, join_listener),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    server.send_frame(Frame::Binary(b"not zlib".to_vec()))?;
    let packet = dispatch("GUILD_CREATE", 2, guild_create(9, "Zipped"));
    server.send_frame(Frame::Binary(compress(&packet)?))?;

    let Event::ServerJoin { server: joined } = joins.next().await? else {
        anyhow::bail!("expected a server join");
    };
    assert_eq!(joined.read().name, "Zipped");
    assert_eq!(client.session().sequence(), Some(2));

    client.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn test_update_status() -> anyhow::Result<()> {
    let (connector, mut gateway) = MockGateway::new();
    let (client, mut server) = connect(
        test_builder(connector),
        &mut gateway,
        ready("session-1", &[]),
        SLOW_HEARTBEAT_MS,
    )
    .await?;

    client.update_status(Some(Game::playing("chess")))?;
    let status = server.recv_packet(OpCode::StatusUpdate).await?;
    assert_eq!(status.d["status"], "online");
    assert_eq!(status.d["afk"], false);
    assert_eq!(status.d["game"], json!({"name": "chess", "type": 0}));

    client.disconnect().await;
    Ok(())
}

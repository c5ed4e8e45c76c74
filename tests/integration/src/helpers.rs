//! Test helpers for integration tests
//!
//! [`MockConnector`] stands in for the WebSocket transport. Every connection the
//! client opens shows up on the paired [`MockGateway`] as a [`ServerConnection`]
//! the test drives: it pushes frames to the client and reads what the client sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use cord_gateway::listener::Listener;
use cord_gateway::protocol::{GatewayMessage, OpCode};
use cord_gateway::session::HydrationConfig;
use cord_gateway::transport::{Connection, Connector, Frame, OutboundFrame, TransportError};
use cord_gateway::{Client, ClientBuilder, Event, GatewayConfig};
use futures::channel::mpsc as duplex;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};

use crate::fixtures::dispatch;

/// Upper bound for every wait in a test
pub const WAIT: Duration = Duration::from_secs(5);

/// Heartbeat interval announced by default; long enough that only the first beat fires
pub const SLOW_HEARTBEAT_MS: u64 = 45_000;

/// Gateway URL handed to the client
pub const GATEWAY_URL: &str = "wss://gateway.test";

/// Settings with short timers so sessions settle quickly
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::new("test-token");
    config.compress = false;
    config.invalid_session_delay = Duration::from_millis(50);
    config.hydration = HydrationConfig {
        poll_interval: Duration::from_millis(10),
        stall_polls: 5,
        chunk_quiet: Duration::from_millis(20),
    };
    config
}

/// Builder wired to the in-memory transport with a short reconnect delay
pub fn test_builder(connector: MockConnector) -> ClientBuilder {
    test_builder_with(test_config(), connector)
}

pub fn test_builder_with(config: GatewayConfig, connector: MockConnector) -> ClientBuilder {
    Client::builder(config)
        .connector(connector)
        .gateway_url(GATEWAY_URL)
        .reconnect_delay(|_| Duration::from_millis(10))
}

// ============================================================================
// Transport
// ============================================================================

/// Client side of the in-memory transport
#[derive(Clone)]
pub struct MockConnector {
    accepted: mpsc::UnboundedSender<ServerConnection>,
    refuse: Arc<AtomicBool>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }

        let (client_tx, server_rx) = duplex::unbounded::<OutboundFrame>();
        let (server_tx, client_rx) = duplex::unbounded::<Result<Frame, TransportError>>();
        self.accepted
            .send(ServerConnection {
                url: url.to_string(),
                to_client: server_tx,
                from_client: server_rx,
            })
            .map_err(|_| TransportError::Closed)?;

        Ok(Connection {
            sink: Box::pin(client_tx.sink_map_err(|_| TransportError::Closed)),
            stream: Box::pin(client_rx),
        })
    }
}

/// Test side of the in-memory transport
pub struct MockGateway {
    accepted: mpsc::UnboundedReceiver<ServerConnection>,
    refuse: Arc<AtomicBool>,
}

impl MockGateway {
    pub fn new() -> (MockConnector, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let refuse = Arc::new(AtomicBool::new(false));
        let connector = MockConnector {
            accepted: tx,
            refuse: Arc::clone(&refuse),
        };
        (
            connector,
            Self {
                accepted: rx,
                refuse,
            },
        )
    }

    /// Fail every following connection attempt
    pub fn refuse_connections(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    /// Wait for the client to open a connection
    pub async fn accept(&mut self) -> Result<ServerConnection> {
        timeout(WAIT, self.accepted.recv())
            .await?
            .ok_or_else(|| anyhow!("connector dropped"))
    }

    /// Fail if the client opens a connection within `window`
    pub async fn assert_no_connection(&mut self, window: Duration) -> Result<()> {
        match timeout(window, self.accepted.recv()).await {
            Ok(Some(connection)) => bail!("unexpected connection to {}", connection.url),
            _ => Ok(()),
        }
    }
}

/// One open connection, seen from the server
pub struct ServerConnection {
    pub url: String,
    to_client: duplex::UnboundedSender<Result<Frame, TransportError>>,
    from_client: duplex::UnboundedReceiver<OutboundFrame>,
}

impl ServerConnection {
    /// Send a packet as a text frame
    pub fn send(&self, message: &GatewayMessage) -> Result<()> {
        self.send_frame(Frame::Text(message.to_json()?))
    }

    pub fn send_frame(&self, frame: Frame) -> Result<()> {
        self.to_client
            .unbounded_send(Ok(frame))
            .map_err(|_| anyhow!("client hung up"))
    }

    pub fn hello(&self, heartbeat_interval_ms: u64) -> Result<()> {
        self.send(&GatewayMessage::hello(heartbeat_interval_ms))
    }

    /// Next frame the client sent
    pub async fn recv(&mut self) -> Result<OutboundFrame> {
        timeout(WAIT, self.from_client.next())
            .await?
            .ok_or_else(|| anyhow!("client closed the connection"))
    }

    /// Next packet with `op`, skipping heartbeats unless they are asked for
    pub async fn recv_packet(&mut self, op: OpCode) -> Result<GatewayMessage> {
        let deadline = Instant::now() + WAIT;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.from_client.next())
                .await?
                .ok_or_else(|| anyhow!("client closed the connection"))?;
            match frame {
                OutboundFrame::Text(text) => {
                    let message = GatewayMessage::from_json(&text)?;
                    if message.op == op {
                        return Ok(message);
                    }
                    if message.op != OpCode::Heartbeat {
                        bail!("expected {op}, got {}", message.op);
                    }
                }
                OutboundFrame::Close { code, .. } => bail!("expected {op}, got close {code}"),
            }
        }
    }

    /// Heartbeats until one carries `sequence`
    pub async fn recv_heartbeat_with(&mut self, sequence: u64) -> Result<GatewayMessage> {
        loop {
            let heartbeat = self.recv_packet(OpCode::Heartbeat).await?;
            if heartbeat.d == Value::from(sequence) {
                return Ok(heartbeat);
            }
        }
    }

    /// Code of the close frame the client sends, skipping packets before it
    pub async fn recv_close(&mut self) -> Result<u16> {
        let deadline = Instant::now() + WAIT;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.from_client.next())
                .await?
                .ok_or_else(|| anyhow!("connection dropped without close frame"))?;
            if let OutboundFrame::Close { code, .. } = frame {
                return Ok(code);
            }
        }
    }
}

// ============================================================================
// Session helpers
// ============================================================================

/// Connect `builder`, answering Hello and Identify with `ready` as sequence 1
pub async fn connect(
    builder: ClientBuilder,
    gateway: &mut MockGateway,
    ready: Value,
    heartbeat_interval_ms: u64,
) -> Result<(Client, ServerConnection)> {
    let connecting = tokio::spawn(builder.connect());

    let mut server = gateway.accept().await?;
    server.hello(heartbeat_interval_ms)?;
    server.recv_packet(OpCode::Identify).await?;
    server.send(&dispatch("READY", 1, ready))?;

    let client = timeout(WAIT, connecting).await???;
    Ok((client, server))
}

/// Poll `condition` until it holds
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> Result<()> {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

/// Events delivered to a listener, in delivery order
pub struct EventLog {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventLog {
    pub async fn next(&mut self) -> Result<Event> {
        timeout(WAIT, self.rx.recv())
            .await?
            .ok_or_else(|| anyhow!("listener dropped"))
    }

    /// Fail if an event arrives within `window`
    pub async fn assert_quiet(&mut self, window: Duration) -> Result<()> {
        match timeout(window, self.rx.recv()).await {
            Ok(Some(event)) => bail!("unexpected event {:?}", event.kind()),
            _ => Ok(()),
        }
    }
}

/// A listener forwarding every event it receives to the returned log
pub fn event_log() -> (impl Listener, EventLog) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = move |event: &Event| -> anyhow::Result<()> {
        let _ = tx.send(event.clone());
        Ok(())
    };
    (listener, EventLog { rx })
}

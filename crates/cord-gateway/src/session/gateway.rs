//! Gateway session
//!
//! Owns the transport and every task tied to it. One supervising task runs
//! connections back to back: open, wait for Hello, identify or resume, read
//! until the connection ends, then decide whether and when to reconnect.
//! Everything spawned for a connection is aborted when it ends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::backoff::{default_reconnect_delay, ReconnectDelayFn};
use super::endpoint::connect_url;
use super::heartbeat::{HeartbeatController, SharedSequence};
use super::hydration::{wait_for_hydration, HydrationOutcome};
use super::{GatewayConfig, GatewayError, GatewayResult, SessionState};
use crate::events::DispatchType;
use crate::handlers::{HandlerContext, PacketRouter};
use crate::listener::Event;
use crate::protocol::{
    CloseCode, CloseDisposition, GatewayMessage, IdentifyPayload, OpCode, ResumePayload,
    NORMAL_CLOSURE,
};
use crate::transport::{inflate, Connection, Connector, Frame, FrameSink, OutboundFrame};

/// How long a finished connection's writer may take to flush its close frame
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a connection ended
#[derive(Debug)]
enum ConnectionEnd {
    /// The application disconnected
    Shutdown,
    /// The server asked for a reconnect (op 7)
    Requested,
    /// The transport dropped or failed
    Lost(String),
    /// The server closed with a code that must not be retried
    Fatal(String),
}

/// Mutable session bookkeeping, changed under one lock per transition
#[derive(Debug, Default)]
struct SessionData {
    state: SessionState,
    endpoint: String,
    session_id: Option<String>,
    heartbeat_interval: Option<Duration>,
    attempt: u32,
}

pub struct GatewaySession {
    config: GatewayConfig,
    connector: Arc<dyn Connector>,
    router: PacketRouter,
    ctx: HandlerContext,
    heartbeat: HeartbeatController,
    sequence: SharedSequence,
    data: Mutex<SessionData>,
    reconnect: AtomicBool,
    reconnect_delay: RwLock<ReconnectDelayFn>,
    shutdown: watch::Sender<bool>,
    /// Tasks that die with the current connection
    connection_tasks: Mutex<Vec<JoinHandle<()>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    ready: Mutex<Option<oneshot::Sender<GatewayResult<()>>>>,
    first_ready: AtomicBool,
}

impl GatewaySession {
    /// Start the session against `endpoint`.
    ///
    /// The receiver resolves once the first READY has hydrated, or with the
    /// error that ended the first connection.
    pub fn start(
        config: GatewayConfig,
        endpoint: String,
        connector: Arc<dyn Connector>,
        router: PacketRouter,
        ctx: HandlerContext,
    ) -> (Arc<Self>, oneshot::Receiver<GatewayResult<()>>) {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown, _) = watch::channel(false);

        let session = Arc::new(Self {
            reconnect: AtomicBool::new(config.reconnect),
            reconnect_delay: RwLock::new(default_reconnect_delay(config.total_shards)),
            config,
            connector,
            router,
            ctx,
            heartbeat: HeartbeatController::new(),
            sequence: Arc::new(Mutex::new(None)),
            data: Mutex::new(SessionData {
                endpoint,
                ..SessionData::default()
            }),
            shutdown,
            connection_tasks: Mutex::new(Vec::new()),
            supervisor: Mutex::new(None),
            ready: Mutex::new(Some(ready_tx)),
            first_ready: AtomicBool::new(false),
        });

        let supervisor = tokio::spawn(Arc::clone(&session).run());
        *session.supervisor.lock() = Some(supervisor);
        (session, ready_rx)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.data.lock().state
    }

    pub fn session_id(&self) -> Option<String> {
        self.data.lock().session_id.clone()
    }

    pub fn sequence(&self) -> Option<u64> {
        *self.sequence.lock()
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.data.lock().heartbeat_interval
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.data.lock().attempt
    }

    pub fn is_reconnect_enabled(&self) -> bool {
        self.reconnect.load(Ordering::SeqCst)
    }

    pub fn set_reconnect_delay(&self, delay: ReconnectDelayFn) {
        *self.reconnect_delay.write() = delay;
    }

    /// Delay before reconnect attempt `attempt`
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let delay = self.reconnect_delay.read().clone();
        delay(attempt)
    }

    pub fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    /// Send a packet on the open connection
    pub fn send(&self, message: &GatewayMessage) -> GatewayResult<()> {
        Ok(self.ctx.sender.send(message)?)
    }

    /// Close the connection and stop for good
    pub fn disconnect(&self) {
        self.reconnect.store(false, Ordering::SeqCst);
        self.shutdown.send_replace(true);
        tracing::info!("Disconnect requested");
    }

    /// Wait for the supervising task to finish
    pub async fn join(&self) {
        let supervisor = self.supervisor.lock().take();
        if let Some(supervisor) = supervisor {
            if let Err(e) = supervisor.await {
                tracing::error!(error = %e, "Gateway session task failed");
            }
        }
    }

    fn set_state(&self, state: SessionState) {
        let mut data = self.data.lock();
        if data.state != state {
            tracing::debug!(from = %data.state, to = %state, "Session state");
            data.state = state;
        }
    }

    fn complete_ready(&self, result: GatewayResult<()>) {
        if let Some(ready) = self.ready.lock().take() {
            let _ = ready.send(result);
        }
    }

    fn track(&self, task: JoinHandle<()>) {
        let mut tasks = self.connection_tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(task);
    }

    // ------------------------------------------------------------------
    // Supervisor
    // ------------------------------------------------------------------

    async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let end = self.run_connection(&mut shutdown).await;
            self.set_state(SessionState::Disconnected);
            if !matches!(end, ConnectionEnd::Shutdown) {
                self.ctx.emit(Event::LostConnection, &[]);
            }

            if !self.first_ready.load(Ordering::SeqCst) {
                let error = match end {
                    ConnectionEnd::Shutdown => GatewayError::Disconnected,
                    ConnectionEnd::Requested => {
                        GatewayError::HandshakeFailed("server requested a reconnect".to_string())
                    }
                    ConnectionEnd::Lost(reason) | ConnectionEnd::Fatal(reason) => {
                        GatewayError::HandshakeFailed(reason)
                    }
                };
                tracing::error!(error = %error, "Initial connection failed");
                self.complete_ready(Err(error));
                break;
            }

            match end {
                ConnectionEnd::Shutdown => break,
                ConnectionEnd::Fatal(reason) => {
                    tracing::error!(reason = %reason, "Connection closed for good");
                    break;
                }
                ConnectionEnd::Requested => {
                    if !self.is_reconnect_enabled() {
                        tracing::info!("Reconnect requested, reconnect disabled");
                        break;
                    }
                    let attempt = self.next_attempt();
                    tracing::info!(attempt, "Reconnecting on server request");
                }
                ConnectionEnd::Lost(reason) => {
                    if !self.is_reconnect_enabled() {
                        tracing::info!(reason = %reason, "Connection lost, reconnect disabled");
                        break;
                    }
                    let attempt = self.next_attempt();
                    let delay = self.reconnect_delay(attempt);
                    tracing::warn!(
                        reason = %reason,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "Connection lost, reconnecting"
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => break,
                    }
                    // disconnect may have happened while sleeping
                    if !self.is_reconnect_enabled() {
                        break;
                    }
                }
            }
        }

        self.set_state(SessionState::Disconnected);
        self.complete_ready(Err(GatewayError::Disconnected));
        tracing::info!("Gateway session ended");
    }

    fn next_attempt(&self) -> u32 {
        let mut data = self.data.lock();
        data.attempt = data.attempt.saturating_add(1);
        data.attempt
    }

    async fn run_connection(self: &Arc<Self>, shutdown: &mut watch::Receiver<bool>) -> ConnectionEnd {
        let url = {
            let mut data = self.data.lock();
            data.state = SessionState::Connecting;
            connect_url(&data.endpoint, self.config.gateway_version)
        };
        tracing::info!(url = %url, shard = self.config.shard, "Connecting to gateway");

        let connection = tokio::select! {
            result = self.connector.connect(&url) => match result {
                Ok(connection) => connection,
                Err(e) => return ConnectionEnd::Lost(e.to_string()),
            },
            _ = shutdown.changed() => return ConnectionEnd::Shutdown,
        };
        self.set_state(SessionState::AwaitingHello);

        let Connection { sink, mut stream } = connection;
        let mut writer = tokio::spawn(write_frames(sink, self.ctx.sender.attach()));

        let end = loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = self.ctx.sender.close(NORMAL_CLOSURE, "Client disconnect");
                    break ConnectionEnd::Shutdown;
                }
                frame = stream.next() => {
                    let text = match frame {
                        None => break ConnectionEnd::Lost("connection closed".to_string()),
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Transport error");
                            break ConnectionEnd::Lost(e.to_string());
                        }
                        Some(Ok(Frame::Close(close))) => break closed_by_server(close),
                        Some(Ok(Frame::Text(text))) => text,
                        Some(Ok(Frame::Binary(data))) => match inflate(&data) {
                            Ok(text) => text,
                            Err(e) => {
                                tracing::warn!(error = %e, "Dropping undecodable frame");
                                continue;
                            }
                        },
                    };
                    if let Some(end) = self.handle_packet(&text) {
                        break end;
                    }
                }
            }
        };

        self.heartbeat.stop();
        for task in self.connection_tasks.lock().drain(..) {
            task.abort();
        }
        self.ctx.sender.detach();
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            writer.abort();
        }
        end
    }

    // ------------------------------------------------------------------
    // Packets
    // ------------------------------------------------------------------

    /// Handle one inbound packet; `Some` ends the connection
    fn handle_packet(self: &Arc<Self>, text: &str) -> Option<ConnectionEnd> {
        let message = match GatewayMessage::from_json(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed packet");
                return None;
            }
        };

        match message.op {
            OpCode::Dispatch => self.on_dispatch(message),
            OpCode::Hello => match message.as_hello() {
                Some(hello) => self.on_hello(Duration::from_millis(hello.heartbeat_interval)),
                None => tracing::warn!("Hello without heartbeat interval"),
            },
            OpCode::HeartbeatAck => {
                tracing::trace!("Heartbeat acknowledged");
                self.heartbeat.ack();
            }
            OpCode::Heartbeat => {
                let last_sequence = self.sequence();
                if let Err(e) = self.ctx.sender.send(&GatewayMessage::heartbeat(last_sequence)) {
                    tracing::debug!(error = %e, "Requested heartbeat not sent");
                }
            }
            OpCode::Reconnect => {
                tracing::info!("Server requested a reconnect");
                let _ = self.ctx.sender.close(NORMAL_CLOSURE, "Reconnect requested");
                return Some(ConnectionEnd::Requested);
            }
            OpCode::InvalidSession => self.on_invalid_session(message.as_invalid_session()),
            op @ (OpCode::Identify
            | OpCode::StatusUpdate
            | OpCode::Resume
            | OpCode::RequestGuildMembers) => {
                tracing::warn!(op = %op, "Server sent a client-only op code");
            }
        }
        None
    }

    fn on_dispatch(self: &Arc<Self>, message: GatewayMessage) {
        if let Some(sequence) = message.s {
            *self.sequence.lock() = Some(sequence);
        }
        let Some(event_type) = message.t.as_deref() else {
            tracing::warn!("Dispatch without type");
            return;
        };

        match DispatchType::from_str(event_type) {
            Some(DispatchType::Ready) => self.on_ready(&message.d),
            Some(DispatchType::Resumed) => self.on_resumed(&message.d),
            _ => self.route(event_type, &message.d),
        }
    }

    fn route(&self, event_type: &str, data: &Value) {
        if let Err(e) = self.router.route(&self.ctx, event_type, data) {
            tracing::warn!(event_type, error = %e, "Dropping packet");
        }
    }

    fn on_hello(&self, interval: Duration) {
        let resume = {
            let mut data = self.data.lock();
            data.heartbeat_interval = Some(interval);
            match data.session_id.clone() {
                Some(session_id) => {
                    data.state = SessionState::Resuming;
                    Some(session_id)
                }
                None => {
                    data.state = SessionState::Identifying;
                    None
                }
            }
        };
        tracing::debug!(interval_ms = interval.as_millis(), "Hello received");

        let sent = match resume {
            Some(session_id) => {
                tracing::info!(session_id = %session_id, "Resuming session");
                self.send_resume(session_id)
            }
            None => self.send_identify(),
        };
        if let Err(e) = sent {
            tracing::warn!(error = %e, "Handshake packet not sent");
        }
    }

    fn send_identify(&self) -> GatewayResult<()> {
        let payload = IdentifyPayload::new(
            self.config.token.clone(),
            self.config.compress,
            self.config.large_threshold,
            self.config.shard,
            self.config.total_shards,
        );
        tracing::info!(
            shard = self.config.shard,
            total_shards = self.config.total_shards,
            "Identifying"
        );
        let message = GatewayMessage::identify(&payload)?;
        self.send(&message)
    }

    fn send_resume(&self, session_id: String) -> GatewayResult<()> {
        let payload = ResumePayload {
            token: self.config.token.clone(),
            session_id,
            seq: self.sequence(),
        };
        let message = GatewayMessage::resume(&payload)?;
        self.send(&message)
    }

    fn on_ready(self: &Arc<Self>, data: &Value) {
        let Some(session_id) = data.get("session_id").and_then(Value::as_str) else {
            tracing::warn!("READY without session id");
            return;
        };

        {
            let mut session = self.data.lock();
            session.session_id = Some(session_id.to_string());
            session.attempt = 0;
            session.state = SessionState::Ready;
            if let Some(interval) = session.heartbeat_interval {
                self.heartbeat
                    .start(interval, self.ctx.sender.clone(), Arc::clone(&self.sequence));
            }
            self.ctx.cache.begin_hydration();
        }
        tracing::info!(session_id = %session_id, "Session established");

        self.route(DispatchType::Ready.as_str(), data);

        let session = Arc::clone(self);
        self.track(tokio::spawn(async move {
            let outcome =
                wait_for_hydration(&session.ctx.cache, &session.config.hydration).await;
            session.ctx.cache.end_hydration();
            {
                let mut data = session.data.lock();
                if data.state == SessionState::Ready {
                    data.state = SessionState::Connected;
                }
            }
            match outcome {
                HydrationOutcome::Complete => tracing::info!(
                    servers = session.ctx.cache.servers().len(),
                    "Cache hydrated"
                ),
                HydrationOutcome::Stalled => tracing::info!(
                    servers = session.ctx.cache.servers().len(),
                    unavailable = session.ctx.cache.unavailable_server_count(),
                    "Connected with partially hydrated cache"
                ),
            }
            session.first_ready.store(true, Ordering::SeqCst);
            session.ctx.emit(Event::Ready, &[]);
            session.complete_ready(Ok(()));
        }));
    }

    fn on_resumed(&self, data: &Value) {
        {
            let mut session = self.data.lock();
            session.attempt = 0;
            session.state = SessionState::Connected;
            if let Some(interval) = session.heartbeat_interval {
                self.heartbeat
                    .start(interval, self.ctx.sender.clone(), Arc::clone(&self.sequence));
            }
            self.ctx.cache.end_hydration();
        }
        tracing::info!("Session resumed");
        self.route(DispatchType::Resumed.as_str(), data);
        self.ctx.emit(Event::Resume, &[]);
    }

    fn on_invalid_session(self: &Arc<Self>, resumable: Option<bool>) {
        {
            let mut data = self.data.lock();
            data.session_id = None;
            data.state = SessionState::Identifying;
            *self.sequence.lock() = None;
        }
        let delay = self.config.invalid_session_delay;
        tracing::warn!(?resumable, delay_ms = delay.as_millis(), "Session invalidated, identifying again");

        let session = Arc::clone(self);
        self.track(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if *session.shutdown.borrow() {
                return;
            }
            if let Err(e) = session.send_identify() {
                tracing::warn!(error = %e, "Identify not sent");
            }
        }));
    }
}

impl Drop for GatewaySession {
    fn drop(&mut self) {
        for task in self.connection_tasks.get_mut().drain(..) {
            task.abort();
        }
        if let Some(supervisor) = self.supervisor.get_mut().take() {
            supervisor.abort();
        }
    }
}

fn closed_by_server(close: Option<(u16, String)>) -> ConnectionEnd {
    let Some((code, reason)) = close else {
        return ConnectionEnd::Lost("closed without code".to_string());
    };
    match CloseCode::from_u16(code) {
        Some(known) => match known.disposition() {
            CloseDisposition::Fatal => ConnectionEnd::Fatal(known.to_string()),
            CloseDisposition::Retry => {
                tracing::warn!(code, description = known.description(), "Gateway closed the connection");
                ConnectionEnd::Lost(known.to_string())
            }
        },
        None => {
            tracing::warn!(code, reason = %reason, "Gateway closed the connection");
            ConnectionEnd::Lost(format!("closed with code {code}"))
        }
    }
}

/// Forward queued frames to the transport until the queue closes or a close frame goes out
async fn write_frames(mut sink: FrameSink, mut queue: mpsc::UnboundedReceiver<OutboundFrame>) {
    while let Some(frame) = queue.recv().await {
        let closing = matches!(frame, OutboundFrame::Close { .. });
        if let Err(e) = sink.send(frame).await {
            tracing::debug!(error = %e, "Writer stopped");
            return;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_classification() {
        assert!(matches!(
            closed_by_server(Some((4004, String::new()))),
            ConnectionEnd::Fatal(_)
        ));
        assert!(matches!(
            closed_by_server(Some((4000, String::new()))),
            ConnectionEnd::Lost(_)
        ));
        assert!(matches!(
            closed_by_server(Some((1001, "going away".to_string()))),
            ConnectionEnd::Lost(_)
        ));
        assert!(matches!(closed_by_server(None), ConnectionEnd::Lost(_)));
    }
}

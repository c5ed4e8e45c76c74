//! WebSocket transport backed by tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use super::{Connection, Connector, Frame, OutboundFrame, TransportError};

/// Opens real WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

fn to_message(frame: OutboundFrame) -> Message {
    match frame {
        OutboundFrame::Text(text) => Message::Text(text),
        OutboundFrame::Close { code, reason } => Message::Close(Some(CloseFrame {
            code: WsCloseCode::from(code),
            reason: reason.into(),
        })),
    }
}

fn to_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text)),
        Message::Binary(data) => Some(Frame::Binary(data)),
        Message::Close(frame) => Some(Frame::Close(
            frame.map(|f| (u16::from(f.code), f.reason.into_owned())),
        )),
        // Pings are answered by tungstenite itself
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let (socket, response) = tokio_tungstenite::connect_async(url).await?;
        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = socket.split();
        let sink = sink.with(|frame: OutboundFrame| async move {
            Ok::<_, TransportError>(to_message(frame))
        });
        let stream = stream.filter_map(|message| async move {
            match message {
                Ok(message) => to_frame(message).map(Ok),
                Err(e) => Some(Err(TransportError::from(e))),
            }
        });

        Ok(Connection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

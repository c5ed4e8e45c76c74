//! Test fixtures and packet generators
//!
//! Provides the gateway packets integration tests send to the client.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use cord_gateway::protocol::GatewayMessage;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::{json, Value};

/// Counter for unique message IDs
static COUNTER: AtomicU64 = AtomicU64::new(1000);

/// Get a unique snowflake for test data
pub fn unique_id() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// ID of the account the test client logs in as
pub const SELF_ID: u64 = 100;

/// Text channel every fixture server carries
pub fn text_channel_id(server_id: u64) -> u64 {
    server_id * 10
}

/// READY payload listing `servers` as unavailable stubs
pub fn ready(session_id: &str, servers: &[u64]) -> Value {
    let guilds: Vec<Value> = servers
        .iter()
        .map(|id| json!({"id": id.to_string(), "unavailable": true}))
        .collect();
    json!({
        "v": 6,
        "user": {
            "id": SELF_ID.to_string(),
            "username": "cord",
            "discriminator": "0001",
            "bot": true
        },
        "session_id": session_id,
        "guilds": guilds,
        "private_channels": []
    })
}

/// GUILD_CREATE payload with one text channel and one member
pub fn guild_create(server_id: u64, name: &str) -> Value {
    json!({
        "id": server_id.to_string(),
        "name": name,
        "owner_id": "1",
        "member_count": 1,
        "roles": [{"id": server_id.to_string(), "name": "@everyone"}],
        "channels": [{
            "id": text_channel_id(server_id).to_string(),
            "type": 0,
            "name": "general",
            "position": 0
        }],
        "members": [{"user": {"id": "1", "username": "owner", "discriminator": "0002"}, "roles": []}],
        "emojis": [],
        "presences": []
    })
}

/// MESSAGE_CREATE payload written by the server owner
pub fn message_create(channel_id: u64, content: &str) -> Value {
    json!({
        "id": unique_id().to_string(),
        "channel_id": channel_id.to_string(),
        "author": {"id": "1", "username": "owner", "discriminator": "0002"},
        "content": content,
        "timestamp": "2024-05-01T12:00:00+00:00"
    })
}

/// Dispatch packet (op 0)
pub fn dispatch(event_type: &str, sequence: u64, data: Value) -> GatewayMessage {
    GatewayMessage::dispatch(event_type, sequence, data)
}

/// zlib-compress a packet the way the gateway does for binary frames
pub fn compress(message: &GatewayMessage) -> anyhow::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(message.to_json()?.as_bytes())?;
    Ok(encoder.finish()?)
}

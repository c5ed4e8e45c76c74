//! Gateway wire protocol
//!
//! The packet envelope, op codes, close codes and the payloads the client sends.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::{CloseCode, CloseDisposition, NORMAL_CLOSURE};
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{
    ActivityPayload, HelloPayload, IdentifyPayload, IdentifyProperties,
    RequestGuildMembersPayload, ResumePayload, StatusUpdatePayload,
};

//! Integration test utilities for the gateway client
//!
//! This crate provides an in-memory gateway the tests drive packet by packet,
//! plus JSON fixtures for the packets they send.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;

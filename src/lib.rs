//! Marketplace Bot - conversational front end of a chat-based marketplace
//!
//! This crate implements the flow/step state machine that turns inbound chat
//! messages into marketplace actions: a per-user session, a router that
//! dispatches each message to the active flow's handler, and the flows
//! themselves (agreements, offers, product requests, flash deals).

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

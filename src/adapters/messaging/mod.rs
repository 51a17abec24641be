//! Messaging Adapters
//!
//! Implementations of the Messenger port.
//!
//! - **CloudApiMessenger** - WhatsApp Cloud API over HTTP (production)
//! - **RecordingMessenger** - Captures messages (testing/development)

mod cloud_api_messenger;
mod recording_messenger;

pub use cloud_api_messenger::{CloudApiConfig, CloudApiMessenger};
pub use recording_messenger::{RecordingMessenger, SentMessage};

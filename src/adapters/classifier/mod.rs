//! Input Classifier Adapters
//!
//! - **WhatsAppClassifier** - WhatsApp Cloud API webhook payloads

mod whatsapp_classifier;

pub use whatsapp_classifier::WhatsAppClassifier;

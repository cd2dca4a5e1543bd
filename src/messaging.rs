//! Outbound messaging adapters.

pub mod traits;
pub mod whatsapp;

pub use traits::Messaging;
pub use whatsapp::WhatsAppAdapter;

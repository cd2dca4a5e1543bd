//! HTTP surface: liveness route and the WhatsApp webhook.
//!
//! `GET /webhook` answers the subscription handshake, `POST /webhook` receives
//! message deliveries and drives a chat turn per text message.

mod payload;
mod server;
mod state;
mod webhook;

pub use payload::{WHATSAPP_OBJECT, parse_delivery};
pub use server::{router, start_http_server};
pub use state::ApiState;

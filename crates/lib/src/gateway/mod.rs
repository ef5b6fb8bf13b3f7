//! Gateway: the HTTP surface of the relay.
//!
//! `GET /` answers health checks; `POST /webhook` receives Telegram updates.

mod server;

pub use server::{
    router, run_gateway, run_gateway_until, telegram_channel, GatewayState, STATUS_MESSAGE,
};

//! Communication channels (Telegram).
//!
//! Inbound updates arrive on the gateway's webhook route and are parsed into
//! [`InboundEvent`]s; replies go back out through a [`ChannelHandle`].

mod handle;
mod inbound;
mod telegram;

pub use handle::{ChannelError, ChannelHandle};
pub use inbound::{ConversationId, InboundEvent};
pub use telegram::{TelegramChannel, TelegramChat, TelegramMessage, TelegramUpdate};

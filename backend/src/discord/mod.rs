//! Discord bot over the HTTP interactions endpoint.

pub mod commands;
pub mod embeds;
pub mod interaction;
pub mod signature;

pub use commands::{parse_command, BotCommand, CommandError, DiscordBot};
pub use interaction::{Interaction, InteractionResponse};
pub use signature::{SignatureError, SignatureVerifier};

//! # discord-smtpd
//!
//! An SMTP server that posts every message it receives into a Discord
//! channel.
//!
//! The first recipient selects the channel: `alerts@discord.localdomain`
//! looks up `alerts` in a JSON credential file and the message is posted
//! with that entry's bot token. Recipients outside the relay domain are
//! accepted and dropped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use discord_smtpd::relay::{ChannelResolver, DiscordClient, JsonFileLookup, RelayHandler};
//! use discord_smtpd::SmtpServer;
//!
//! let resolver = ChannelResolver::new(JsonFileLookup::new("discord.json"));
//! let notifier = DiscordClient::new().unwrap();
//! let server = SmtpServer::new("smtpd.local", RelayHandler::new(resolver, notifier));
//!
//! server.start("0.0.0.0:2525").unwrap();
//! ```
//!
//! with `discord.json` shaped like
//!
//! ```json
//! { "alerts": { "chid": "123456789012345678", "token": "bot-token" } }
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` / `EHLO` - Identify the sender
//! - `AUTH PLAIN` / `AUTH LOGIN` - Accepted with any credentials
//! - `MAIL FROM` - Specify the sender's address
//! - `RCPT TO` - Specify the destination (only the first one is relayed)
//! - `DATA` - Send the email body
//! - `RSET` - Reset the current transaction
//! - `NOOP` - Do nothing
//! - `QUIT` - Close connection
//!
//! ## What gets posted
//!
//! The subject in bold, then the `text/plain` content in a code block. HTML
//! parts and attachments are dropped. Messages are always answered with
//! `250` once DATA ends, even when the post to Discord fails; failures are
//! only logged.
//!
//! ## Notes
//!
//! - SSL/TLS connection is not supported.
//! - Nothing is queued or retried.
//!
//! ## Size Limits
//!
//! The server enforces RFC 821 size limits:
//! - User names: 64 characters max
//! - Domain names: 64 characters max
//! - Paths: 256 characters max
//! - Command lines: 512 characters max
//! - Text lines: 1000 characters max
//! - Recipients: 100 max per message

pub mod config;
pub mod logging;
pub mod relay;
pub mod smtp;

pub use config::{Config, ConfigError};
pub use smtp::{
    AuthAttempt, AuthMechanism, Envelope, MessageHandler, SmtpError, SmtpLimits, SmtpResponse,
    SmtpServer, SmtpSession, SmtpState,
};

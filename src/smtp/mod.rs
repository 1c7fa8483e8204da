//! Minimal SMTP engine that hands completed messages to a handler

pub mod commands;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod response;
pub mod server;
pub mod session;

pub use envelope::Envelope;
pub use error::{SmtpError, SmtpLimits};
pub use handler::{AuthAttempt, AuthMechanism, MessageHandler};
pub use response::SmtpResponse;
pub use server::SmtpServer;
pub use session::{SmtpSession, SmtpState};

//! Hooks the SMTP engine calls into once a protocol step needs a decision

use crate::smtp::envelope::Envelope;
use crate::smtp::response::SmtpResponse;

/// SASL mechanisms offered in the EHLO reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    Plain,
    Login,
}

impl AuthMechanism {
    /// Parse a mechanism name as given to `AUTH` (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain),
            "LOGIN" => Some(Self::Login),
            _ => None,
        }
    }

    /// Number of client responses the exchange needs before a verdict
    pub fn required_responses(self) -> usize {
        match self {
            Self::Plain => 1,
            Self::Login => 2,
        }
    }

    /// Base64 challenge sent before the client response at `index`
    pub fn challenge(self, index: usize) -> &'static str {
        match (self, index) {
            (Self::Login, 0) => "VXNlcm5hbWU6", // "Username:"
            (Self::Login, _) => "UGFzc3dvcmQ6", // "Password:"
            (Self::Plain, _) => "",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::Login => "LOGIN",
        }
    }
}

/// A completed AUTH exchange, with the client responses still base64-encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthAttempt {
    pub mechanism: AuthMechanism,
    pub responses: Vec<String>,
}

/// Decides what the server answers at the end of AUTH and DATA.
///
/// One handler is shared by every connection, so implementations must be
/// `Send + Sync`. A call blocks the session that triggered it until it
/// returns.
pub trait MessageHandler: Send + Sync {
    /// Called once per AUTH exchange after all client responses arrived
    fn handle_auth(&self, attempt: &AuthAttempt) -> SmtpResponse;

    /// Called once per message after the terminating `.` line
    fn handle_data(&self, envelope: &Envelope) -> SmtpResponse;
}

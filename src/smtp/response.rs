//! SMTP reply handling

use crate::smtp::error::SmtpLimits;

/// Represents an SMTP reply that can be sent to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The SMTP reply code (e.g., "250", "354", "500")
    pub code: String,
    /// The human-readable message
    pub message: String,
    /// Extra lines for multiline replies such as EHLO
    pub multiline: Option<Vec<String>>,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            multiline: None,
        }
    }

    /// Create a new multiline SMTP response
    pub fn new_multiline(code: &str, message: &str, lines: Vec<String>) -> Self {
        Self {
            code: code.to_owned(),
            message: message.to_owned(),
            multiline: Some(lines),
        }
    }

    /// Create a success response (250 OK)
    pub fn ok() -> Self {
        Self::new("250", "OK")
    }

    /// Create a greeting response (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new("220", &format!("{hostname} ESMTP discord-smtpd"))
    }

    /// Create a HELO response (250)
    pub fn helo(hostname: &str, client_domain: &str) -> Self {
        Self::new("250", &format!("{hostname} Hello {client_domain}"))
    }

    /// Create an EHLO response (250) with capabilities
    pub fn ehlo(hostname: &str, client_domain: &str) -> Self {
        let capabilities = vec![
            "PIPELINING".to_owned(),
            "8BITMIME".to_owned(),
            format!("SIZE {}", SmtpLimits::MAX_DATA_SIZE),
            "AUTH PLAIN LOGIN".to_owned(),
        ];
        Self::new_multiline(
            "250",
            &format!("{hostname} Hello {client_domain}"),
            capabilities,
        )
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new("354", "End data with <CR><LF>.<CR><LF>")
    }

    /// Create an AUTH continuation (334) carrying a base64 challenge
    pub fn auth_challenge(challenge: &str) -> Self {
        Self::new("334", challenge)
    }

    /// Successful authentication (235)
    pub fn auth_succeeded() -> Self {
        Self::new("235", "2.7.0 Authentication Succeeded")
    }

    /// A relayed (or skipped) message was accepted (250)
    pub fn message_accepted() -> Self {
        Self::new("250", "Message accepted for delivery")
    }

    /// DATA finished without any content (250)
    pub fn empty_message_accepted() -> Self {
        Self::new("250", "Empty message accepted")
    }

    /// Create a QUIT response (221)
    pub fn quit() -> Self {
        Self::new("221", "Bye")
    }

    /// Create an error response from an error
    pub fn error(code: &str, message: &str) -> Self {
        Self::new(code, message)
    }

    /// Format the response for sending over the wire
    pub fn format(&self) -> String {
        if let Some(ref lines) = self.multiline {
            let mut result = format!("{}-{}\r\n", self.code, self.message);
            for (i, line) in lines.iter().enumerate() {
                if i == lines.len() - 1 {
                    // Last line uses space instead of dash
                    result.push_str(&format!("{} {}\r\n", self.code, line));
                } else {
                    result.push_str(&format!("{}-{}\r\n", self.code, line));
                }
            }
            result
        } else {
            format!("{} {}\r\n", self.code, self.message)
        }
    }

    /// Check if this is a success response (2xx)
    pub fn is_success(&self) -> bool {
        self.code.starts_with('2')
    }

    /// Check if this is an error response (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        self.code.starts_with('4') || self.code.starts_with('5')
    }
}

impl std::fmt::Display for SmtpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

//! SMTP session state management

use crate::smtp::envelope::Envelope;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::handler::{AuthAttempt, AuthMechanism};

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, PartialEq)]
pub enum SmtpState {
    /// Initial state - waiting for HELO/EHLO
    Initial,
    /// HELO received - ready for MAIL or AUTH
    GreetingReceived,
    /// MAIL FROM received - ready for RCPT commands
    MailReceived,
    /// At least one RCPT TO received - ready for DATA or more RCPT commands
    RecipientsReceived,
    /// DATA command received - collecting message content
    DataMode,
}

/// An AUTH exchange waiting for more client responses
#[derive(Debug, Clone, PartialEq)]
pub struct AuthExchange {
    pub mechanism: AuthMechanism,
    pub responses: Vec<String>,
}

/// Manages the state and data for a single SMTP session
#[derive(Debug)]
pub struct SmtpSession {
    /// Current state of the session
    pub state: SmtpState,
    /// Sender address from MAIL FROM command
    pub from: Option<String>,
    /// List of recipients from RCPT TO commands
    pub to: Vec<String>,
    /// Content lines collected during DATA mode
    pub data: Vec<String>,
    /// Whether we're currently in data collection mode
    pub in_data_mode: bool,
    /// Total size of data collected so far
    pub data_size: usize,
    /// Client domain from HELO/EHLO command
    pub client_domain: Option<String>,
    /// Pending AUTH exchange, if the client is mid-way through one
    pub auth: Option<AuthExchange>,
    /// Whether an AUTH exchange already succeeded on this connection
    pub authenticated: bool,
}

impl SmtpSession {
    /// Create a new SMTP session
    pub fn new() -> Self {
        Self {
            state: SmtpState::Initial,
            from: None,
            to: Vec::new(),
            data: Vec::new(),
            in_data_mode: false,
            data_size: 0,
            client_domain: None,
            auth: None,
            authenticated: false,
        }
    }

    /// Reset the session to post-HELO state (clears transaction data)
    pub fn reset(&mut self) {
        self.state = SmtpState::GreetingReceived;
        self.from = None;
        self.to.clear();
        self.data.clear();
        self.in_data_mode = false;
        self.data_size = 0;
        self.auth = None;
        // client_domain and authenticated survive a transaction reset
    }

    /// Set the sender address
    pub fn set_sender(&mut self, sender: String) -> Result<(), SmtpError> {
        if sender.len() > SmtpLimits::PATH_MAX_LENGTH {
            return Err(SmtpError::PathTooLong {
                max: SmtpLimits::PATH_MAX_LENGTH,
            });
        }

        self.from = Some(sender);
        self.to.clear();
        self.data.clear();
        self.data_size = 0;
        self.state = SmtpState::MailReceived;
        Ok(())
    }

    /// Add a recipient address
    pub fn add_recipient(&mut self, recipient: String) -> Result<(), SmtpError> {
        if recipient.len() > SmtpLimits::PATH_MAX_LENGTH {
            return Err(SmtpError::PathTooLong {
                max: SmtpLimits::PATH_MAX_LENGTH,
            });
        }

        if self.to.len() >= SmtpLimits::MAX_RECIPIENTS {
            return Err(SmtpError::TooManyRecipients {
                max: SmtpLimits::MAX_RECIPIENTS,
            });
        }

        self.to.push(recipient);
        self.state = SmtpState::RecipientsReceived;
        Ok(())
    }

    /// Start data collection mode
    pub fn start_data_mode(&mut self) -> Result<(), SmtpError> {
        if self.state != SmtpState::RecipientsReceived {
            return Err(SmtpError::InvalidState(
                "DATA command requires RCPT first".to_string(),
            ));
        }

        self.in_data_mode = true;
        self.data.clear();
        self.data_size = 0;
        self.state = SmtpState::DataMode;
        Ok(())
    }

    /// Add a line of data during data collection
    pub fn add_data_line(&mut self, line: String) -> Result<(), SmtpError> {
        let line_size = line.len() + 2; // +2 for CRLF

        if line_size > SmtpLimits::TEXT_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::TEXT_LINE_MAX_LENGTH,
            });
        }

        if self.data_size + line_size > SmtpLimits::MAX_DATA_SIZE {
            return Err(SmtpError::TooMuchData {
                max: SmtpLimits::MAX_DATA_SIZE,
            });
        }

        self.data.push(line);
        self.data_size += line_size;
        Ok(())
    }

    /// Finish data collection and build the envelope for the handler
    pub fn finish_data_collection(&mut self) -> Result<Envelope, SmtpError> {
        if !self.in_data_mode {
            return Err(SmtpError::InvalidState(
                "Not in data collection mode".to_string(),
            ));
        }

        let from = self
            .from
            .as_ref()
            .ok_or_else(|| SmtpError::InvalidState("No sender specified".to_string()))?;

        if self.to.is_empty() {
            return Err(SmtpError::InvalidState(
                "No recipients specified".to_string(),
            ));
        }

        let content = if self.data.is_empty() {
            None
        } else {
            Some(self.data.join("\n"))
        };
        let envelope = Envelope::new(from.clone(), self.to.clone(), content);

        self.in_data_mode = false;
        self.state = SmtpState::GreetingReceived;
        Ok(envelope)
    }

    /// Set the client domain from HELO/EHLO command
    pub fn set_client_domain(&mut self, domain: String) -> Result<(), SmtpError> {
        if domain.len() > SmtpLimits::DOMAIN_MAX_LENGTH {
            return Err(SmtpError::DomainTooLong {
                max: SmtpLimits::DOMAIN_MAX_LENGTH,
            });
        }

        self.client_domain = Some(domain);
        self.state = SmtpState::GreetingReceived;
        self.reset(); // Clear any existing transaction
        Ok(())
    }

    /// Open an AUTH exchange
    pub fn begin_auth(&mut self, mechanism: AuthMechanism) -> Result<(), SmtpError> {
        if self.authenticated {
            return Err(SmtpError::InvalidState("Already authenticated".to_string()));
        }

        if self.state != SmtpState::GreetingReceived {
            return Err(SmtpError::InvalidState(
                "AUTH is only allowed after HELO and outside a mail transaction".to_string(),
            ));
        }

        self.auth = Some(AuthExchange {
            mechanism,
            responses: Vec::new(),
        });
        Ok(())
    }

    /// Record one client response of the open exchange.
    ///
    /// Returns the completed attempt once the mechanism has all the
    /// responses it needs; the exchange is closed at that point.
    pub fn push_auth_response(&mut self, response: String) -> Result<Option<AuthAttempt>, SmtpError> {
        let exchange = self
            .auth
            .as_mut()
            .ok_or_else(|| SmtpError::InvalidState("No AUTH exchange in progress".to_string()))?;

        if response == "*" {
            self.auth = None;
            return Err(SmtpError::AuthCancelled);
        }

        exchange.responses.push(response);
        if exchange.responses.len() < exchange.mechanism.required_responses() {
            return Ok(None);
        }

        Ok(self.auth.take().map(|exchange| AuthAttempt {
            mechanism: exchange.mechanism,
            responses: exchange.responses,
        }))
    }

    /// Index of the next response the open exchange waits for
    pub fn pending_auth_step(&self) -> Option<(AuthMechanism, usize)> {
        self.auth
            .as_ref()
            .map(|exchange| (exchange.mechanism, exchange.responses.len()))
    }

    /// Check if the session is ready for a specific command
    pub fn can_execute_command(&self, command: &str) -> bool {
        match command.to_uppercase().as_str() {
            "EHLO" | "HELO" => true, // Greeting can be sent at any time
            "AUTH" => self.state == SmtpState::GreetingReceived && !self.authenticated,
            "MAIL" => self.state == SmtpState::GreetingReceived,
            "RCPT" => {
                self.state == SmtpState::MailReceived || self.state == SmtpState::RecipientsReceived
            }
            "DATA" => self.state == SmtpState::RecipientsReceived,
            "RSET" => self.state != SmtpState::Initial,
            "NOOP" => true, // NOOP can be sent at any time
            "QUIT" => true, // QUIT can be sent at any time
            _ => false,
        }
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new()
    }
}

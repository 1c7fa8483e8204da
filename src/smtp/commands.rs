//! Implementation of SMTP commands

use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::handler::{AuthMechanism, MessageHandler};
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

/// Handles SMTP commands and returns appropriate responses
#[derive(Debug)]
pub struct SmtpCommandHandler<'a, H: ?Sized> {
    hostname: &'a str,
    handler: &'a H,
}

impl<'a, H: MessageHandler + ?Sized> SmtpCommandHandler<'a, H> {
    /// Create a new command handler
    pub fn new(hostname: &'a str, handler: &'a H) -> Self {
        Self { hostname, handler }
    }

    /// Process a command line and return a response
    pub fn process_command(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        // Check command line length
        if command_line.len() > SmtpLimits::COMMAND_LINE_MAX_LENGTH {
            return Err(SmtpError::LineTooLong {
                max: SmtpLimits::COMMAND_LINE_MAX_LENGTH,
            });
        }

        let parts: Vec<&str> = command_line.split_whitespace().collect();
        if parts.is_empty() {
            return Err(SmtpError::InvalidCommand);
        }

        let cmd = parts[0].to_uppercase();

        match cmd.as_str() {
            "HELO" => self.handle_helo(parts, session),
            "EHLO" => self.handle_ehlo(parts, session),
            "AUTH" => self.handle_auth(parts, session),
            "MAIL" => self.handle_mail(parts, session),
            "RCPT" => self.handle_rcpt(parts, session),
            "DATA" => self.handle_data(parts, session),
            "RSET" => self.handle_rset(session),
            "NOOP" => self.handle_noop(),
            "QUIT" => self.handle_quit(),
            _ => Err(SmtpError::InvalidCommand),
        }
    }

    /// Feed one client line into the open AUTH exchange
    pub fn continue_auth(
        &self,
        line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        match session.push_auth_response(line.to_string())? {
            Some(attempt) => {
                let response = self.handler.handle_auth(&attempt);
                if response.is_success() {
                    session.authenticated = true;
                }
                Ok(response)
            }
            None => {
                let (mechanism, step) = session.pending_auth_step().ok_or_else(|| {
                    SmtpError::InvalidState("No AUTH exchange in progress".to_string())
                })?;
                Ok(SmtpResponse::auth_challenge(mechanism.challenge(step)))
            }
        }
    }

    /// Close the DATA phase and let the message handler answer it
    pub fn finish_data(&self, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        let envelope = session.finish_data_collection()?;
        Ok(self.handler.handle_data(&envelope))
    }

    /// Handle HELO command
    fn handle_helo(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        let client_domain = self.greet(&parts, session)?;
        Ok(SmtpResponse::helo(self.hostname, &client_domain))
    }

    /// Handle EHLO command
    fn handle_ehlo(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        let client_domain = self.greet(&parts, session)?;
        Ok(SmtpResponse::ehlo(self.hostname, &client_domain))
    }

    fn greet(&self, parts: &[&str], session: &mut SmtpSession) -> Result<String, SmtpError> {
        if parts.len() < 2 {
            return Err(SmtpError::InvalidSyntax(format!(
                "{} requires domain argument",
                parts[0].to_uppercase()
            )));
        }

        let client_domain = parts[1].to_string();
        session.set_client_domain(client_domain.clone())?;
        Ok(client_domain)
    }

    /// Handle AUTH command
    fn handle_auth(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("AUTH") {
            return Err(SmtpError::InvalidState(
                "AUTH requires HELO first and is allowed once per session".to_string(),
            ));
        }

        if parts.len() < 2 {
            return Err(SmtpError::InvalidSyntax(
                "AUTH requires mechanism argument".to_string(),
            ));
        }

        let mechanism = AuthMechanism::parse(parts[1])
            .ok_or_else(|| SmtpError::UnsupportedAuthMechanism(parts[1].to_string()))?;
        session.begin_auth(mechanism)?;

        match parts.get(2) {
            // RFC 4954: a lone "=" is an empty initial response
            Some(&"=") => self.continue_auth("", session),
            Some(initial) => self.continue_auth(initial, session),
            None => Ok(SmtpResponse::auth_challenge(mechanism.challenge(0))),
        }
    }

    /// Handle MAIL command
    fn handle_mail(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("MAIL") {
            return Err(SmtpError::InvalidState(
                "MAIL command requires HELO first".to_string(),
            ));
        }

        if parts.len() < 2 {
            return Err(SmtpError::InvalidSyntax(
                "MAIL requires FROM argument".to_string(),
            ));
        }

        let addr = self.parse_path(&parts[1..].join(" "), "FROM:", "MAIL FROM:<address>")?;
        session.set_sender(addr)?;

        Ok(SmtpResponse::ok())
    }

    /// Handle RCPT command
    fn handle_rcpt(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("RCPT") {
            return Err(SmtpError::InvalidState(
                "RCPT command requires MAIL first".to_string(),
            ));
        }

        if parts.len() < 2 {
            return Err(SmtpError::InvalidSyntax(
                "RCPT requires TO argument".to_string(),
            ));
        }

        let addr = self.parse_path(&parts[1..].join(" "), "TO:", "RCPT TO:<address>")?;
        session.add_recipient(addr)?;

        Ok(SmtpResponse::ok())
    }

    /// Handle DATA command
    fn handle_data(
        &self,
        parts: Vec<&str>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("DATA") {
            return Err(SmtpError::InvalidState(
                "DATA command requires RCPT first".to_string(),
            ));
        }

        if parts.len() > 1 {
            return Err(SmtpError::InvalidSyntax(
                "DATA command takes no arguments".to_string(),
            ));
        }

        session.start_data_mode()?;

        Ok(SmtpResponse::data_start())
    }

    /// Handle RSET command
    fn handle_rset(&self, session: &mut SmtpSession) -> Result<SmtpResponse, SmtpError> {
        if !session.can_execute_command("RSET") {
            return Err(SmtpError::InvalidState(
                "RSET command requires HELO first".to_string(),
            ));
        }

        session.reset();
        Ok(SmtpResponse::ok())
    }

    /// Handle NOOP command
    fn handle_noop(&self) -> Result<SmtpResponse, SmtpError> {
        Ok(SmtpResponse::ok())
    }

    /// Handle QUIT command
    fn handle_quit(&self) -> Result<SmtpResponse, SmtpError> {
        Ok(SmtpResponse::quit())
    }

    /// Extract the address from `FROM:<addr> [params]` or `TO:<addr> [params]`.
    ///
    /// ESMTP parameters after the closing bracket (`BODY=8BITMIME`, `SIZE=`)
    /// are accepted and ignored.
    fn parse_path(&self, argument: &str, keyword: &str, usage: &str) -> Result<String, SmtpError> {
        let has_keyword = argument
            .get(..keyword.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword));
        if !has_keyword {
            return Err(SmtpError::InvalidSyntax(format!(
                "command must be '{usage}'"
            )));
        }

        let path = argument[keyword.len()..].trim_start();
        let close = path.find('>');
        let addr = match (path.starts_with('<'), close) {
            (true, Some(end)) => &path[1..end],
            _ => {
                return Err(SmtpError::InvalidSyntax(
                    "address must be enclosed in angle brackets".to_string(),
                ));
            }
        };

        if addr.is_empty() {
            return Err(SmtpError::InvalidSyntax(
                "address cannot be empty".to_string(),
            ));
        }

        self.validate_email_address(addr)?;
        Ok(addr.to_string())
    }

    /// Validate email address format and size limits
    fn validate_email_address(&self, addr: &str) -> Result<(), SmtpError> {
        let Some((user_part, domain_part)) = addr.split_once('@') else {
            return Err(SmtpError::InvalidSyntax(
                "Email address must contain @ symbol".to_string(),
            ));
        };

        if user_part.len() > SmtpLimits::USER_MAX_LENGTH {
            return Err(SmtpError::UserTooLong {
                max: SmtpLimits::USER_MAX_LENGTH,
            });
        }

        if domain_part.len() > SmtpLimits::DOMAIN_MAX_LENGTH {
            return Err(SmtpError::DomainTooLong {
                max: SmtpLimits::DOMAIN_MAX_LENGTH,
            });
        }

        if user_part.is_empty() || domain_part.is_empty() {
            return Err(SmtpError::InvalidSyntax(
                "Invalid email address format".to_string(),
            ));
        }

        Ok(())
    }
}

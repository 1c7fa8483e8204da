//! The relay side of the SMTP engine: decode, resolve, compose, deliver

use thiserror::Error;
use tracing::{Span, debug, info, info_span, warn};

use crate::relay::composer::compose;
use crate::relay::credentials::CredentialLookup;
use crate::relay::decoder::{self, DecodeError};
use crate::relay::delivery::{DeliveryError, Notifier};
use crate::relay::resolver::{ChannelResolver, Resolution, ResolveError};
use crate::smtp::{AuthAttempt, Envelope, MessageHandler, SmtpResponse};

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("could not decode message: {0}")]
    Decode(#[from] DecodeError),

    #[error("could not resolve channel: {0}")]
    Resolve(#[from] ResolveError),

    #[error("could not deliver message: {0}")]
    Delivery(#[from] DeliveryError),
}

/// How far a message got through the relay
#[derive(Debug)]
pub enum RelayOutcome {
    /// DATA carried no content
    Empty,
    Delivered,
    /// First recipient is outside the relay domain
    Skipped,
    Failed(RelayError),
}

pub struct RelayHandler<L, N> {
    resolver: ChannelResolver<L>,
    notifier: N,
    span: Span,
}

impl<L: CredentialLookup, N: Notifier> RelayHandler<L, N> {
    pub fn new(resolver: ChannelResolver<L>, notifier: N) -> Self {
        Self {
            resolver,
            notifier,
            span: info_span!("smtpd"),
        }
    }

    /// Log under `span` instead of the default `smtpd` span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run one envelope through the relay. Never panics on bad input;
    /// failures come back as [`RelayOutcome::Failed`].
    pub fn relay(&self, envelope: &Envelope) -> RelayOutcome {
        let _entered = self.span.enter();
        let Some(content) = envelope.content.as_deref() else {
            return RelayOutcome::Empty;
        };
        self.relay_content(envelope, content)
            .unwrap_or_else(RelayOutcome::Failed)
    }

    fn relay_content(
        &self,
        envelope: &Envelope,
        content: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let message = decoder::decode(content)?;

        info!("FROM: {}", envelope.from);
        info!("TO: {}", envelope.to.join(", "));
        info!("Subject: {}", message.subject.as_deref().unwrap_or("None"));
        info!("Length: {}", content.len());
        for line in message.body.lines() {
            info!("> {line}");
        }

        let credential = match self.resolver.resolve(&envelope.to)? {
            Resolution::Relay(credential) => credential,
            Resolution::DomainMismatch { domain } => {
                debug!(%domain, "recipient outside relay domain");
                return Ok(RelayOutcome::Skipped);
            }
        };

        self.notifier.deliver(&credential, &compose(&message))?;
        debug!(channel_id = %credential.channel_id, "posted to Discord");
        Ok(RelayOutcome::Delivered)
    }
}

impl<L: CredentialLookup, N: Notifier> MessageHandler for RelayHandler<L, N> {
    fn handle_auth(&self, attempt: &AuthAttempt) -> SmtpResponse {
        let _entered = self.span.enter();
        debug!(mechanism = attempt.mechanism.as_str(), "accepting AUTH");
        SmtpResponse::auth_succeeded()
    }

    fn handle_data(&self, envelope: &Envelope) -> SmtpResponse {
        match self.relay(envelope) {
            RelayOutcome::Empty => {
                self.span.in_scope(|| warn!("No content in message"));
                SmtpResponse::empty_message_accepted()
            }
            RelayOutcome::Failed(error) => {
                self.span.in_scope(|| warn!("{error}"));
                SmtpResponse::message_accepted()
            }
            RelayOutcome::Delivered | RelayOutcome::Skipped => SmtpResponse::message_accepted(),
        }
    }
}

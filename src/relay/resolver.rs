//! Maps the first recipient of a message to the channel it relays into

use thiserror::Error;

use crate::relay::credentials::{ChannelCredential, CredentialLookup, LookupError};

/// Only recipients in this domain are relayed
pub const DEFAULT_RELAY_DOMAIN: &str = "discord.localdomain";

/// What to do with a message, judged by its first recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Post into this channel
    Relay(ChannelCredential),
    /// Recipient is outside the relay domain; accept without posting
    DomainMismatch { domain: String },
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("envelope has no recipients")]
    NoRecipients,

    #[error("recipient {0} has no @")]
    MalformedAddress(String),

    #[error("no channel credential for mailbox {0}")]
    CredentialNotFound(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

#[derive(Debug, Clone)]
pub struct ChannelResolver<L> {
    lookup: L,
    relay_domain: String,
}

impl<L: CredentialLookup> ChannelResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            relay_domain: DEFAULT_RELAY_DOMAIN.to_string(),
        }
    }

    pub fn with_relay_domain(mut self, relay_domain: impl Into<String>) -> Self {
        self.relay_domain = relay_domain.into();
        self
    }

    pub fn relay_domain(&self) -> &str {
        &self.relay_domain
    }

    /// Resolve `recipients[0]`; later recipients are ignored.
    ///
    /// The lookup is consulted only for addresses in the relay domain, so a
    /// mismatching domain never fails even when the mapping is unreadable.
    pub fn resolve(&self, recipients: &[String]) -> Result<Resolution, ResolveError> {
        let recipient = recipients.first().ok_or(ResolveError::NoRecipients)?;
        let (local_part, domain) = recipient
            .split_once('@')
            .ok_or_else(|| ResolveError::MalformedAddress(recipient.clone()))?;

        if domain != self.relay_domain {
            return Ok(Resolution::DomainMismatch {
                domain: domain.to_string(),
            });
        }

        self.lookup
            .get(local_part)?
            .map(Resolution::Relay)
            .ok_or_else(|| ResolveError::CredentialNotFound(local_part.to_string()))
    }
}

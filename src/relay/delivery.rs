//! Posting composed messages into Discord channels

use serde::Serialize;
use thiserror::Error;

use crate::relay::credentials::ChannelCredential;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api";

const USER_AGENT: &str = "Discord SMTP Bot";

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to Discord failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Discord answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sends one text payload into the channel a credential points at
pub trait Notifier: Send + Sync {
    fn deliver(&self, credential: &ChannelCredential, payload: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Discord REST API client: one POST per message, no retries.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: reqwest::blocking::Client,
    api_base: String,
}

impl DiscordClient {
    pub fn new() -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the client somewhere other than discord.com
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn messages_url(&self, channel_id: &str) -> String {
        format!("{}/channels/{channel_id}/messages", self.api_base)
    }
}

impl Notifier for DiscordClient {
    fn deliver(&self, credential: &ChannelCredential, payload: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.messages_url(&credential.channel_id))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Bot {}", credential.token),
            )
            .json(&CreateMessage { content: payload })
            .send()
            .map_err(DeliveryError::Transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().unwrap_or_default();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

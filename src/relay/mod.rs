//! Mail to Discord relay: everything that happens after DATA completes

pub mod composer;
pub mod credentials;
pub mod decoder;
pub mod delivery;
pub mod encoded_word;
pub mod handler;
pub mod resolver;

pub use composer::compose;
pub use credentials::{
    ChannelCredential, CredentialLookup, JsonFileLookup, LookupError, StaticLookup,
};
pub use decoder::{DecodeError, DecodedMessage, Payload};
pub use delivery::{DeliveryError, DiscordClient, Notifier};
pub use handler::{RelayError, RelayHandler, RelayOutcome};
pub use resolver::{ChannelResolver, Resolution, ResolveError};

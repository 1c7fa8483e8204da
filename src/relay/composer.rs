//! Discord message text for a decoded mail

use crate::relay::decoder::DecodedMessage;

/// Bold subject line followed by the body in a code block.
///
/// Nothing is escaped or truncated; a body containing ``` ends the block
/// early.
pub fn compose(message: &DecodedMessage) -> String {
    let subject = message.subject.as_deref().unwrap_or_default();
    format!("**{subject}**\n```{}```", message.body)
}

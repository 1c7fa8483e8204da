//! Turns raw DATA content into the plain-text body and subject to relay

use std::borrow::Cow;

use mail_parser::{HeaderName, Message, MessageParser, MessagePart, MimeHeaders, PartType};
use thiserror::Error;

use crate::relay::encoded_word;

/// Marker that makes the subject go through encoded-word decoding
const UTF8_ENCODED_WORD_MARKER: &str = "=?utf-8?";

/// Body and subject extracted from one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub body: String,
    pub subject: Option<String>,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("content is not a parseable MIME message")]
    Malformed,

    #[error("part {part} carries neither text nor bytes")]
    UnsupportedPayload { part: usize },

    #[error("part {part} is not valid UTF-8")]
    InvalidUtf8 {
        part: usize,
        #[source]
        source: std::str::Utf8Error,
    },
}

/// Transfer-decoded content of one MIME part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl<'a> Payload<'a> {
    /// Classify the decoded body of the part at `index`
    pub fn of(part: &'a MessagePart<'_>, index: usize) -> Result<Self, DecodeError> {
        match &part.body {
            PartType::Text(text) | PartType::Html(text) => Ok(Payload::Text(text.as_ref())),
            PartType::Binary(bytes) | PartType::InlineBinary(bytes) => {
                Ok(Payload::Bytes(bytes.as_ref()))
            }
            _ => Err(DecodeError::UnsupportedPayload { part: index }),
        }
    }

    pub fn into_text(self, index: usize) -> Result<&'a str, DecodeError> {
        match self {
            Payload::Text(text) => Ok(text),
            Payload::Bytes(bytes) => std::str::from_utf8(bytes)
                .map_err(|source| DecodeError::InvalidUtf8 { part: index, source }),
        }
    }
}

/// Decode a raw message into its relayable body and subject.
///
/// Multipart messages contribute every `text/plain` part, newline-joined in
/// order, including those of attached `message/rfc822` parts; everything
/// else is dropped. A single-part message contributes its only payload
/// whatever its type. The body comes back trimmed.
pub fn decode(raw: &str) -> Result<DecodedMessage, DecodeError> {
    let Some(raw) = close_header_block(raw) else {
        return Ok(DecodedMessage {
            body: raw.trim().to_string(),
            subject: None,
        });
    };
    let message = MessageParser::default()
        .parse(raw.as_bytes())
        .ok_or(DecodeError::Malformed)?;
    let root = message.parts.first().ok_or(DecodeError::Malformed)?;

    let body = if matches!(root.body, PartType::Multipart(_) | PartType::Message(_)) {
        let mut texts = Vec::new();
        collect_plain_text(&message, &mut texts)?;
        texts.join("\n")
    } else {
        Payload::of(root, 0)?.into_text(0)?.to_string()
    };

    Ok(DecodedMessage {
        body: body.trim().to_string(),
        subject: subject(&message),
    })
}

/// Walk `message` depth-first, descending into attached messages
fn collect_plain_text<'a>(
    message: &'a Message<'_>,
    texts: &mut Vec<&'a str>,
) -> Result<(), DecodeError> {
    for (index, part) in message.parts.iter().enumerate() {
        if let PartType::Message(attached) = &part.body {
            collect_plain_text(attached, texts)?;
        } else if is_plain_text(part) {
            texts.push(Payload::of(part, index)?.into_text(index)?);
        }
    }
    Ok(())
}

/// End the header block at the first line that is not a header field.
///
/// A header block running straight into text without a blank line stops at
/// that text. `None` when the content opens without any header; all of it
/// is body then.
fn close_header_block(raw: &str) -> Option<Cow<'_, str>> {
    let mut offset = 0;
    for line in raw.split_inclusive('\n') {
        let content = line.trim_end_matches(['\r', '\n']);
        if content.is_empty() || !is_header_line(content) {
            break;
        }
        offset += line.len();
    }

    if offset == 0 {
        return None;
    }
    let (headers, rest) = raw.split_at(offset);
    if rest.is_empty() || rest.starts_with(['\r', '\n']) {
        Some(Cow::Borrowed(raw))
    } else {
        Some(Cow::Owned(format!("{headers}\n{rest}")))
    }
}

/// `field-name ":"`, or a folded continuation
fn is_header_line(line: &str) -> bool {
    if line.starts_with([' ', '\t']) {
        return true;
    }
    line.split_once(':').is_some_and(|(name, _)| {
        name.bytes()
            .all(|byte| (33..=126).contains(&byte) && byte != b':')
    })
}

/// `text/plain` exactly; parts without a Content-Type default to it
fn is_plain_text(part: &MessagePart<'_>) -> bool {
    match part.content_type() {
        Some(content_type) => {
            content_type.ctype().eq_ignore_ascii_case("text")
                && content_type
                    .subtype()
                    .is_some_and(|subtype| subtype.eq_ignore_ascii_case("plain"))
        }
        None => matches!(part.body, PartType::Text(_)),
    }
}

/// Subject header value, decoded only when it carries a UTF-8 encoded-word
fn subject(message: &Message<'_>) -> Option<String> {
    let value = unfold(message.header_raw(HeaderName::Subject)?);
    if value
        .to_ascii_lowercase()
        .contains(UTF8_ENCODED_WORD_MARKER)
    {
        Some(encoded_word::decode_first_segment(&value))
    } else {
        Some(value)
    }
}

fn unfold(value: &str) -> String {
    value.replace(['\r', '\n'], "").trim().to_string()
}

//! RFC 2047 encoded-word decoding for header values.
//!
//! A header value is split into segments: runs of plain text and runs of
//! encoded words. Whitespace between two encoded words is dropped and
//! adjacent encoded words sharing a charset are merged, so
//! `=?utf-8?B?SGVs?= =?utf-8?B?bG8=?=` is a single segment `Hello`.

use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};

/// Mail user agents are not consistent about `=` padding in `B` words
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Plain(String),
    Encoded { charset: String, bytes: Vec<u8> },
}

impl Segment {
    fn into_text(self) -> String {
        match self {
            Segment::Plain(text) => text,
            Segment::Encoded { charset, bytes } => bytes_to_text(&charset, &bytes),
        }
    }
}

/// Decode `value` and return only its first segment.
///
/// `"Re: =?utf-8?B?SGk=?="` yields `"Re: "`, `"=?utf-8?B?SGk=?= there"`
/// yields `"Hi"`. Malformed encoded words are kept verbatim as plain text.
pub fn decode_first_segment(value: &str) -> String {
    segments(value)
        .into_iter()
        .next()
        .map(Segment::into_text)
        .unwrap_or_default()
}

fn segments(value: &str) -> Vec<Segment> {
    let value = value.trim_start();
    let mut raw: Vec<Segment> = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(offset) = value[cursor..].find("=?") {
        let start = cursor + offset;
        match parse_encoded_word(&value[start..]) {
            Some((charset, bytes, consumed)) => {
                if start > plain_start {
                    raw.push(Segment::Plain(value[plain_start..start].to_string()));
                }
                raw.push(Segment::Encoded { charset, bytes });
                cursor = start + consumed;
                plain_start = cursor;
            }
            None => cursor = start + 2,
        }
    }
    if plain_start < value.len() {
        raw.push(Segment::Plain(value[plain_start..].to_string()));
    }

    collapse(raw)
}

/// Drop whitespace between encoded words, then merge neighbours that share
/// a charset.
fn collapse(raw: Vec<Segment>) -> Vec<Segment> {
    let mut kept: Vec<Segment> = Vec::with_capacity(raw.len());
    for (i, segment) in raw.iter().enumerate() {
        let between_encoded = matches!(segment, Segment::Plain(text) if text.trim().is_empty())
            && i > 0
            && matches!(raw[i - 1], Segment::Encoded { .. })
            && matches!(raw.get(i + 1), Some(Segment::Encoded { .. }));
        if !between_encoded {
            kept.push(segment.clone());
        }
    }

    let mut merged: Vec<Segment> = Vec::with_capacity(kept.len());
    for segment in kept {
        if let (
            Some(Segment::Encoded { charset, bytes }),
            Segment::Encoded {
                charset: next_charset,
                bytes: next_bytes,
            },
        ) = (merged.last_mut(), &segment)
            && *charset == *next_charset
        {
            bytes.extend_from_slice(next_bytes);
            continue;
        }
        merged.push(segment);
    }
    merged
}

/// Parse `=?charset?encoding?text?=` at the start of `input`.
///
/// Returns the charset, the decoded bytes and how many bytes of `input`
/// the word spans.
fn parse_encoded_word(input: &str) -> Option<(String, Vec<u8>, usize)> {
    let rest = input.strip_prefix("=?")?;
    let (raw_charset, rest) = rest.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let text = &rest[..end];

    // RFC 2231 language suffix: =?utf-8*en?...
    let charset = raw_charset.split('*').next().unwrap_or(raw_charset);

    let bytes = match encoding {
        "B" | "b" => LENIENT_BASE64.decode(text).ok()?,
        "Q" | "q" => decode_q(text),
        _ => return None,
    };

    let consumed = 2 + raw_charset.len() + 1 + encoding.len() + 1 + end + 2;
    Some((charset.to_ascii_lowercase(), bytes, consumed))
}

/// `Q` encoding: quoted-printable with `_` standing for a space
fn decode_q(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                if let Some(byte) = bytes.get(i + 1..i + 3).and_then(hex_byte) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
                out.push(b'=');
            }
            byte => out.push(byte),
        }
        i += 1;
    }
    out
}

fn hex_byte(pair: &[u8]) -> Option<u8> {
    let [hi, lo] = pair else {
        return None;
    };
    let hi = char::from(*hi).to_digit(16)?;
    let lo = char::from(*lo).to_digit(16)?;
    u8::try_from(hi * 16 + lo).ok()
}

fn bytes_to_text(charset: &str, bytes: &[u8]) -> String {
    match charset {
        "iso-8859-1" | "latin1" | "latin-1" => bytes.iter().map(|&b| char::from(b)).collect(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(value: &str) -> String {
        segments(value).into_iter().map(Segment::into_text).collect()
    }

    #[test]
    fn test_single_base64_word() {
        assert_eq!(decode_first_segment("=?utf-8?B?SGVsbG8=?="), "Hello");
    }

    #[test]
    fn test_missing_padding_is_tolerated() {
        assert_eq!(decode_first_segment("=?UTF-8?b?SGVsbG8?="), "Hello");
    }

    #[test]
    fn test_q_encoding() {
        assert_eq!(
            decode_first_segment("=?utf-8?Q?H=C3=A9llo_World?="),
            "Héllo World"
        );
    }

    #[test]
    fn test_adjacent_words_are_merged() {
        assert_eq!(
            decode_first_segment("=?utf-8?B?5Lu2?=\r\n =?utf-8?B?5ZCN?="),
            "件名"
        );
        assert_eq!(decode("=?utf-8?B?SGVs?= =?utf-8?B?bG8=?="), "Hello");
    }

    #[test]
    fn test_first_segment_is_leading_plain_text() {
        assert_eq!(decode_first_segment("Re: =?utf-8?B?SGk=?="), "Re: ");
        assert_eq!(decode("Re: =?utf-8?B?SGk=?="), "Re: Hi");
    }

    #[test]
    fn test_trailing_plain_text_is_its_own_segment() {
        assert_eq!(decode_first_segment("=?utf-8?B?SGk=?= there"), "Hi");
        assert_eq!(decode("=?utf-8?B?SGk=?= there"), "Hi there");
    }

    #[test]
    fn test_malformed_word_is_plain_text() {
        assert_eq!(
            decode_first_segment("=?utf-8?X?abc?= tail"),
            "=?utf-8?X?abc?= tail"
        );
        assert_eq!(decode_first_segment("=?utf-8?B?"), "=?utf-8?B?");
    }

    #[test]
    fn test_latin1_charset() {
        assert_eq!(decode("=?iso-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_bad_q_escape_is_kept() {
        assert_eq!(decode_q("a=ZZb"), b"a=ZZb".to_vec());
        assert_eq!(decode_q("end="), b"end=".to_vec());
    }
}

//! Envelope handed to the message handler at the end of a DATA phase

/// Sender, recipients and raw content of one accepted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Reverse-path from `MAIL FROM`
    pub from: String,

    /// Forward-paths from `RCPT TO`, in the order they were given
    pub to: Vec<String>,

    /// Raw message content (headers and body), `None` when DATA carried no lines
    pub content: Option<String>,
}

impl Envelope {
    pub fn new(from: String, to: Vec<String>, content: Option<String>) -> Self {
        Self { from, to, content }
    }
}

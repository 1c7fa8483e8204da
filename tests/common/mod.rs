//! Shared fixtures: a mock Discord API and a line oriented SMTP client.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use discord_smtpd::SmtpServer;
use discord_smtpd::relay::{
    ChannelCredential, ChannelResolver, CredentialLookup, DiscordClient, RelayHandler,
    StaticLookup,
};
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Discord API stand-in: answers every message POST with a fixed status and
/// keeps the requests it received.
///
/// The relay posts with a blocking client, so the tests stay synchronous and
/// drive the mock server through a runtime of their own.
pub struct FakeDiscord {
    server: MockServer,
    runtime: Runtime,
}

impl FakeDiscord {
    pub fn start() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            let body = if (200..300).contains(&status) {
                json!({ "id": "1" })
            } else {
                json!({ "message": "Missing Access", "code": 50001 })
            };
            Mock::given(method("POST"))
                .and(path_regex(r"^/api/channels/[^/]+/messages$"))
                .respond_with(ResponseTemplate::new(status).set_body_json(body))
                .mount(&server)
                .await;
            server
        });

        Self { server, runtime }
    }

    pub fn api_base(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    pub fn requests(&self) -> Vec<Request> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
    }
}

pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|value| value.to_str().ok())
}

pub fn json_body(request: &Request) -> serde_json::Value {
    request.body_json().unwrap()
}

/// Relay server on an ephemeral port, posting to `api_base`
pub fn start_relay_server<L>(lookup: L, api_base: &str) -> String
where
    L: CredentialLookup + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    let notifier = DiscordClient::new().unwrap().with_api_base(api_base);
    let handler = RelayHandler::new(ChannelResolver::new(lookup), notifier);
    let server = SmtpServer::new("relay.test", handler);

    thread::spawn(move || {
        if let Err(e) = server.start_with_listener(listener) {
            eprintln!("Error starting server: {e}");
        }
    });

    addr
}

pub fn credentials(entries: &[(&str, &str, &str)]) -> StaticLookup {
    entries
        .iter()
        .map(|(local_part, channel_id, token)| {
            (
                local_part.to_string(),
                ChannelCredential::new(*channel_id, *token),
            )
        })
        .collect()
}

pub struct SmtpClient {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl SmtpClient {
    /// Connect and consume the greeting
    pub fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        let mut client = Self { stream, reader };
        let greeting = client.read_reply();
        assert!(greeting.starts_with("220"), "unexpected greeting {greeting}");
        client
    }

    /// Send one line and return the final line of the reply
    pub fn command(&mut self, line: &str) -> String {
        write!(self.stream, "{line}\r\n").unwrap();
        self.stream.flush().unwrap();
        self.read_reply()
    }

    /// Send message content after DATA, dot-stuffed, and return the reply
    pub fn send_content(&mut self, content: &str) -> String {
        for line in content.lines() {
            if line.starts_with('.') {
                write!(self.stream, ".").unwrap();
            }
            write!(self.stream, "{line}\r\n").unwrap();
        }
        self.command(".")
    }

    /// Full transaction from HELO to the reply after the final dot
    pub fn send_mail(&mut self, from: &str, to: &[&str], content: &str) -> String {
        assert!(self.command("HELO client.test").starts_with("250"));
        assert!(self.command(&format!("MAIL FROM:<{from}>")).starts_with("250"));
        for rcpt in to {
            assert!(self.command(&format!("RCPT TO:<{rcpt}>")).starts_with("250"));
        }
        assert!(self.command("DATA").starts_with("354"));
        self.send_content(content)
    }

    /// Write bytes as-is, without reading a reply
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
        self.stream.flush().unwrap();
    }

    /// Read one reply, skipping continuation lines, and return its final line
    pub fn read_reply(&mut self) -> String {
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            if line.as_bytes().get(3) != Some(&b'-') {
                return line;
            }
        }
    }
}

//! SMTP server implementation

use crate::smtp::commands::SmtpCommandHandler;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::handler::MessageHandler;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, warn};

/// SMTP server that hands every completed message to a [`MessageHandler`]
#[derive(Debug)]
pub struct SmtpServer<H> {
    /// Server hostname
    hostname: String,
    /// Shared by all connection threads
    handler: Arc<H>,
}

impl<H> Clone for SmtpServer<H> {
    fn clone(&self) -> Self {
        Self {
            hostname: self.hostname.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H: MessageHandler + 'static> SmtpServer<H> {
    /// Create a new SMTP server
    pub fn new(hostname: &str, handler: H) -> Self {
        Self {
            hostname: hostname.to_owned(),
            handler: Arc::new(handler),
        }
    }

    /// Bind to the specified address and serve connections (blocking)
    pub fn start(&self, addr: &str) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener)
    }

    /// Serve connections from an existing listener (blocking).
    ///
    /// Each connection runs on its own thread, so a slow delivery only
    /// holds up the session that produced it.
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<(), SmtpError> {
        info!("SMTP server listening on {}", listener.local_addr()?);

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || {
                        let peer = stream.peer_addr().ok();
                        debug!(?peer, "connection accepted");
                        if let Err(e) = server.handle_client(stream) {
                            error!(?peer, "Error handling client: {e}");
                        }
                    });
                }
                Err(e) => {
                    warn!("Error accepting connection: {e}");
                }
            }
        }

        Ok(())
    }

    /// Handle a client connection
    fn handle_client(&self, mut stream: TcpStream) -> Result<(), SmtpError> {
        let command_handler = SmtpCommandHandler::new(&self.hostname, self.handler.as_ref());
        let mut session = SmtpSession::new();
        let mut reader = BufReader::new(stream.try_clone()?);
        // First error hit while collecting DATA; reported once the client sends "."
        let mut data_error: Option<SmtpError> = None;

        self.send_response(&mut stream, &SmtpResponse::greeting(&self.hostname))?;

        let mut line_buffer = Vec::new();
        loop {
            line_buffer.clear();

            match reader.read_until(b'\n', &mut line_buffer) {
                Ok(0) => break, // Connection closed
                Ok(_) => {
                    // Invalid UTF-8 becomes replacement characters instead of an error
                    let line = String::from_utf8_lossy(&line_buffer);

                    if session.in_data_mode {
                        let line = line.trim_end_matches('\n').trim_end_matches('\r');
                        if line != "." {
                            if data_error.is_none()
                                && let Err(e) = self.handle_data_line(line, &mut session)
                            {
                                data_error = Some(e);
                            }
                            continue;
                        }

                        let response = match data_error.take() {
                            Some(e) => SmtpResponse::error(
                                e.to_response_code(),
                                &e.to_response_message(),
                            ),
                            None => command_handler.finish_data(&mut session).unwrap_or_else(|e| {
                                SmtpResponse::error(e.to_response_code(), &e.to_response_message())
                            }),
                        };
                        self.send_response(&mut stream, &response)?;
                        session.reset();
                        continue;
                    }

                    let command = line.trim();
                    if command.is_empty() && session.auth.is_none() {
                        continue;
                    }

                    let result = if session.auth.is_some() {
                        command_handler.continue_auth(command, &mut session)
                    } else {
                        command_handler.process_command(command, &mut session)
                    };

                    match result {
                        Ok(response) => {
                            self.send_response(&mut stream, &response)?;
                            if response.code == "221" {
                                break; // QUIT command
                            }
                        }
                        Err(e) => {
                            let response =
                                SmtpResponse::error(e.to_response_code(), &e.to_response_message());
                            self.send_response(&mut stream, &response)?;

                            // The command handler manages session state for
                            // ordinary errors, so only AUTH is cleared here
                            session.auth = None;
                        }
                    }
                }
                Err(e) => {
                    warn!("Error reading from client: {e}");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Store one line of DATA content, undoing dot-stuffing (RFC 5321 4.5.2)
    fn handle_data_line(&self, line: &str, session: &mut SmtpSession) -> Result<(), SmtpError> {
        let line = line.strip_prefix('.').unwrap_or(line);
        session.add_data_line(line.to_string())
    }

    /// Send a response to the client
    fn send_response(
        &self,
        stream: &mut TcpStream,
        response: &SmtpResponse,
    ) -> Result<(), SmtpError> {
        // Ensure response doesn't exceed maximum line length
        let formatted = response.format();
        if formatted.len() > SmtpLimits::REPLY_LINE_MAX_LENGTH {
            let truncated_response =
                SmtpResponse::new(&response.code, "Response too long (truncated)");
            stream.write_all(truncated_response.format().as_bytes())?;
        } else {
            stream.write_all(formatted.as_bytes())?;
        }
        stream.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::envelope::Envelope;
    use crate::smtp::handler::AuthAttempt;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Forwards envelopes to a channel so tests can inspect them
    struct ChannelHandler {
        tx: Mutex<mpsc::Sender<Envelope>>,
    }

    impl MessageHandler for ChannelHandler {
        fn handle_auth(&self, _attempt: &AuthAttempt) -> SmtpResponse {
            SmtpResponse::auth_succeeded()
        }

        fn handle_data(&self, envelope: &Envelope) -> SmtpResponse {
            let _ = self.tx.lock().unwrap().send(envelope.clone());
            SmtpResponse::message_accepted()
        }
    }

    fn start_test_server() -> (String, mpsc::Receiver<Envelope>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = mpsc::channel();
        let server = SmtpServer::new("test.local", ChannelHandler { tx: Mutex::new(tx) });

        thread::spawn(move || {
            let _ = server.start_with_listener(listener);
        });

        (addr, rx)
    }

    fn send_command(stream: &mut TcpStream, command: &str) -> Result<String, std::io::Error> {
        writeln!(stream, "{command}")?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut response = String::new();
        reader.read_line(&mut response)?;
        Ok(response.trim().to_string())
    }

    fn connect(addr: &str) -> (TcpStream, BufReader<TcpStream>) {
        let stream = TcpStream::connect(addr).unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut greeting = String::new();
        reader.read_line(&mut greeting).unwrap();
        assert!(greeting.starts_with("220 test.local"));
        (stream, reader)
    }

    #[test]
    fn test_server_creation() {
        let (tx, _rx) = mpsc::channel();
        let server = SmtpServer::new("test.local", ChannelHandler { tx: Mutex::new(tx) });
        assert_eq!(server.hostname, "test.local");
    }

    #[test]
    fn test_complete_smtp_session() {
        let (addr, rx) = start_test_server();
        let (mut stream, mut reader) = connect(&addr);

        assert!(send_command(&mut stream, "HELO client.local").unwrap().starts_with("250"));
        assert!(send_command(&mut stream, "MAIL FROM:<test@example.com>").unwrap().starts_with("250"));
        assert!(send_command(&mut stream, "RCPT TO:<alice@discord.localdomain>").unwrap().starts_with("250"));
        assert!(send_command(&mut stream, "DATA").unwrap().starts_with("354"));

        write!(stream, "Subject: Test Email\r\n\r\nThis is a test email.\r\n.\r\n").unwrap();
        stream.flush().unwrap();

        let mut final_response = String::new();
        reader.read_line(&mut final_response).unwrap();
        assert_eq!(final_response, "250 Message accepted for delivery\r\n");

        assert!(send_command(&mut stream, "QUIT").unwrap().starts_with("221"));

        let envelope = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(envelope.from, "test@example.com");
        assert_eq!(envelope.to, vec!["alice@discord.localdomain"]);
        assert_eq!(
            envelope.content.as_deref(),
            Some("Subject: Test Email\n\nThis is a test email.")
        );
    }

    #[test]
    fn test_data_keeps_blank_lines_and_unstuffs_dots() {
        let (addr, rx) = start_test_server();
        let (mut stream, mut reader) = connect(&addr);

        send_command(&mut stream, "HELO client.local").unwrap();
        send_command(&mut stream, "MAIL FROM:<test@example.com>").unwrap();
        send_command(&mut stream, "RCPT TO:<alice@discord.localdomain>").unwrap();
        send_command(&mut stream, "DATA").unwrap();

        write!(
            stream,
            "Subject: folded\r\n  header\r\n\r\n..leading dot\r\n\r\n  indented\r\n.\r\n"
        )
        .unwrap();
        stream.flush().unwrap();

        let mut response = String::new();
        reader.read_line(&mut response).unwrap();
        assert!(response.starts_with("250"));

        let envelope = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(
            envelope.content.as_deref(),
            Some("Subject: folded\n  header\n\n.leading dot\n\n  indented")
        );
    }

    #[test]
    fn test_auth_dialogue() {
        let (addr, _rx) = start_test_server();
        let (mut stream, _reader) = connect(&addr);

        send_command(&mut stream, "HELO client.local").unwrap();

        let response = send_command(&mut stream, "AUTH LOGIN").unwrap();
        assert_eq!(response, "334 VXNlcm5hbWU6");
        let response = send_command(&mut stream, "dXNlcg==").unwrap();
        assert_eq!(response, "334 UGFzc3dvcmQ6");
        let response = send_command(&mut stream, "cGFzcw==").unwrap();
        assert_eq!(response, "235 2.7.0 Authentication Succeeded");

        // A second AUTH on the same connection is a sequence error
        let response = send_command(&mut stream, "AUTH PLAIN AHVzZXIAcGFzcw==").unwrap();
        assert!(response.starts_with("503"));
    }

    #[test]
    fn test_auth_cancelled() {
        let (addr, _rx) = start_test_server();
        let (mut stream, _reader) = connect(&addr);

        send_command(&mut stream, "HELO client.local").unwrap();
        assert_eq!(send_command(&mut stream, "AUTH PLAIN").unwrap(), "334");
        assert!(send_command(&mut stream, "*").unwrap().starts_with("501"));

        // Back in command mode
        assert!(send_command(&mut stream, "NOOP").unwrap().starts_with("250"));
    }

    #[test]
    fn test_error_handling() {
        let (addr, _rx) = start_test_server();
        let (mut stream, _reader) = connect(&addr);

        let response = send_command(&mut stream, "INVALID").unwrap();
        assert!(response.starts_with("500"));

        let response = send_command(&mut stream, "MAIL FROM:<test@example.com>").unwrap();
        assert!(response.starts_with("503"));

        let response = send_command(&mut stream, "QUIT").unwrap();
        assert!(response.starts_with("221"));
    }

    #[test]
    fn test_multiple_recipients() {
        let (addr, rx) = start_test_server();
        let (mut stream, mut reader) = connect(&addr);

        send_command(&mut stream, "HELO client.local").unwrap();
        send_command(&mut stream, "MAIL FROM:<sender@example.com>").unwrap();
        send_command(&mut stream, "RCPT TO:<recipient1@example.com>").unwrap();
        send_command(&mut stream, "RCPT TO:<recipient2@example.com>").unwrap();
        send_command(&mut stream, "DATA").unwrap();

        write!(stream, "Subject: Multiple Recipients\r\n\r\nHello\r\n.\r\n").unwrap();
        stream.flush().unwrap();

        let mut response = String::new();
        reader.read_line(&mut response).unwrap();
        assert!(response.starts_with("250"));

        send_command(&mut stream, "QUIT").unwrap();

        let envelope = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(envelope.to.len(), 2);
        assert_eq!(envelope.to[0], "recipient1@example.com");
    }
}

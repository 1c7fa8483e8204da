use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use tracing::{error, info};

use discord_smtpd::config::Config;
use discord_smtpd::logging;
use discord_smtpd::relay::{ChannelResolver, DiscordClient, JsonFileLookup, RelayHandler};
use discord_smtpd::smtp::SmtpServer;

enum Shutdown {
    Interrupted,
    ServerFailed(discord_smtpd::SmtpError),
}

fn main() -> Result<()> {
    logging::init();

    let config = Config::from_env()?;
    let resolver = ChannelResolver::new(JsonFileLookup::new(&config.tokens_path))
        .with_relay_domain(&config.relay_domain);
    let notifier = DiscordClient::new()?.with_api_base(&config.api_base);
    let server = SmtpServer::new(&config.hostname, RelayHandler::new(resolver, notifier));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).with_context(|| format!("failed to bind {addr}"))?;
    info!(
        %addr,
        hostname = %config.hostname,
        tokens = %config.tokens_path.display(),
        "SMTP server started"
    );

    let (tx, rx) = mpsc::channel();
    let interrupt = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Shutdown::Interrupted);
    })?;

    thread::spawn(move || {
        if let Err(e) = server.start_with_listener(listener) {
            let _ = tx.send(Shutdown::ServerFailed(e));
        }
    });

    match rx.recv() {
        Ok(Shutdown::ServerFailed(e)) => {
            error!("SMTP server failed: {e}");
            Err(e.into())
        }
        Ok(Shutdown::Interrupted) | Err(_) => {
            info!("SMTP server stopped");
            Ok(())
        }
    }
}

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zeromq::{Socket, SocketRecv, SubSocket};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Subscribe to the signal daemon's PUB socket and forward every text
/// message to the event loop. Returns when the receiver is dropped.
pub async fn subscribe(endpoint: String, tx: mpsc::UnboundedSender<String>) -> Result<()> {
    loop {
        match forward(&endpoint, &tx).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "event feed error, reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// `Ok` only when the event loop has gone away.
async fn forward(endpoint: &str, tx: &mpsc::UnboundedSender<String>) -> Result<()> {
    let mut socket = SubSocket::new();
    socket
        .connect(endpoint)
        .await
        .with_context(|| format!("connecting to {endpoint}"))?;
    socket.subscribe("").await.context("subscribing")?;
    info!(endpoint = %endpoint, "listening for events from signal daemon");

    loop {
        let message = socket.recv().await.context("receiving event")?;
        let Some(text) = decode(message.into_vec().concat()) else {
            warn!("dropping non-UTF-8 event message");
            continue;
        };
        debug!(message = %text, "feed message");
        if tx.send(text).is_err() {
            return Ok(());
        }
    }
}

fn decode(frame: Vec<u8>) -> Option<String> {
    String::from_utf8(frame).ok()
}

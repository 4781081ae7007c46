use crate::sinks::{shifted_volume, Player, SinkError};
use carhmi_core::config::PlayerConfig;
use mpd::status::{State, Status};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info, warn};

type MpdResult<T> = Result<T, mpd::error::Error>;

/// Music Player Daemon client. The status query reconnects once on
/// connection loss; state-changing commands are never resent.
pub struct MpdPlayer {
    address: String,
    timeout: Duration,
    client: Option<mpd::Client>,
}

impl MpdPlayer {
    /// Connects lazily on first use.
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            address: config.address(),
            timeout: Duration::from_millis(config.timeout_ms),
            client: None,
        }
    }

    fn connect(&self) -> Result<mpd::Client, SinkError> {
        let addr = self
            .address
            .to_socket_addrs()
            .map_err(|e| SinkError::Connection(format!("resolving {}: {e}", self.address)))?
            .next()
            .ok_or_else(|| SinkError::Connection(format!("no address for {}", self.address)))?;

        let stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| SinkError::Connection(format!("connecting to {addr}: {e}")))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|e| SinkError::Connection(e.to_string()))?;

        let client = mpd::Client::new(stream).map_err(classify)?;
        info!(address = %self.address, "connected to MPD");
        Ok(client)
    }

    fn attempt<T>(&mut self, op: impl FnOnce(&mut mpd::Client) -> MpdResult<T>) -> Result<T, SinkError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => self.connect()?,
        };
        let client = self.client.insert(client);
        op(client).map_err(|e| {
            let err = classify(e);
            if matches!(err, SinkError::Connection(_)) {
                self.client = None;
            }
            err
        })
    }

    /// Query player status, reconnecting and retrying once if the
    /// connection dropped. Every command checks status first.
    fn status(&mut self) -> Result<Status, SinkError> {
        match self.attempt(|c| c.status()) {
            Err(SinkError::Connection(reason)) => {
                warn!(%reason, "MPD connection lost, reconnecting");
                self.attempt(|c| c.status())
            }
            other => other,
        }
    }

    /// Send a state-changing command exactly once. A failure after the
    /// write may mean MPD already applied it, so it is never resent.
    fn send(&mut self, op: impl FnOnce(&mut mpd::Client) -> MpdResult<()>) -> Result<(), SinkError> {
        self.attempt(op)
    }
}

fn classify(e: mpd::error::Error) -> SinkError {
    match e {
        mpd::error::Error::Server(e) => SinkError::Rejected(e.to_string()),
        other => SinkError::Connection(other.to_string()),
    }
}

impl Player for MpdPlayer {
    fn previous(&mut self) -> Result<(), SinkError> {
        self.status()?;
        self.send(|c| c.prev())
    }

    fn next(&mut self) -> Result<(), SinkError> {
        self.status()?;
        self.send(|c| c.next())
    }

    fn play_or_pause(&mut self) -> Result<(), SinkError> {
        if matches!(self.status()?.state, State::Stop) {
            info!("starting to play music");
            self.send(|c| c.play())
        } else {
            info!("toggling play/pause state");
            self.send(|c| c.toggle_pause())
        }
    }

    fn volume_shift(&mut self, delta: i8) -> Result<u8, SinkError> {
        let current = self.status()?.volume;
        let volume = shifted_volume(i32::from(current), delta);
        debug!(current, delta, volume, "shifting volume");
        self.send(|c| c.volume(volume as i8))?;
        Ok(volume)
    }
}

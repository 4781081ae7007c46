use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    /// Transport to the sink failed; worth one reconnect.
    #[error("connection error: {0}")]
    Connection(String),
    #[error("command rejected: {0}")]
    Rejected(String),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{program} did not finish within {timeout_ms}ms")]
    CommandTimeout { program: String, timeout_ms: u64 },
}

/// Media player capabilities the dispatcher drives.
pub trait Player {
    fn previous(&mut self) -> Result<(), SinkError>;
    fn next(&mut self) -> Result<(), SinkError>;
    /// Play if stopped, otherwise toggle pause.
    fn play_or_pause(&mut self) -> Result<(), SinkError>;
    /// Shift volume by `delta`, clamped to 0..=100. Returns the new volume.
    fn volume_shift(&mut self, delta: i8) -> Result<u8, SinkError>;
}

/// Host system capabilities. Async because they run external commands.
pub trait System {
    /// Power off the whole system. Terminal.
    async fn shutdown(&mut self) -> Result<(), SinkError>;
    async fn toggle_screen(&mut self) -> Result<(), SinkError>;
}

/// Apply a volume delta, clamping to the valid 0..=100 range.
pub fn shifted_volume(current: i32, delta: i8) -> u8 {
    (current + i32::from(delta)).clamp(0, 100) as u8
}

use thiserror::Error;

/// Errors that can occur while parsing CLI configuration into a [`crate::config::ServerConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("--players must be between 2 and 4, got {0}")]
    PlayerCountOutOfRange(u8),

    #[error("--port must be between 1 and 65535, got {0}")]
    PortOutOfRange(u32),

    #[error("--save-replay requires --replay-filepath")]
    MissingReplayPath,

    #[error("replay file {0} already exists; pass --overwrite-replay-file to replace it")]
    ReplayFileExists(String),
}

/// Rejections that occur during the HTTP upgrade handshake, before a participant
/// ever reaches the game loop. These map 1:1 onto the HTTP statuses in spec §6.
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("join code mismatch")]
    JoinCodeMismatch,

    #[error("player slots are full")]
    SlotsFull,

    #[error("malformed handshake: {0}")]
    Malformed(String),
}

impl HandshakeError {
    pub fn status_code(&self) -> u16 {
        match self {
            HandshakeError::JoinCodeMismatch => 401,
            HandshakeError::SlotsFull => 429,
            HandshakeError::Malformed(_) => 400,
        }
    }
}

/// Errors surfaced from the action dispatcher (§4.F, §7). Decode/semantic errors
/// are turned into an `InvalidPacketUsageError` reply; they never mutate world state.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("could not parse packet: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("unknown enum value for field {field}: {value}")]
    UnknownEnumValue { field: &'static str, value: String },

    #[error("sender is not a player or the game is not running")]
    NotEligible,
}

/// Fatal errors that abort the match (spec §7, "fatal internal error").
#[derive(Error, Debug)]
pub enum FatalError {
    #[error("simulation phase '{phase}' panicked or returned an inconsistent state: {detail}")]
    PhaseFailure { phase: &'static str, detail: String },

    #[error("replay journal write failed: {0}")]
    ReplayIo(#[from] std::io::Error),
}

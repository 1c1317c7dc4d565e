//! Compile-time tunables plus the CLI-parsed [`ServerConfig`].
//!
//! The constants below are not exposed on the CLI surface in spec §6; they
//! are implementation choices for the Open Questions flagged there (see
//! `DESIGN.md`).

use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

/// Grid side length for a generated match.
pub const GRID_DIM: u8 = 20;
/// Ticks a single capturing player must hold a zone to flip it to `Captured`.
pub const CAPTURE_TICKS: u32 = 5;
/// Chebyshev-distance radius of a mine's blast.
pub const MINE_BLAST_RADIUS: i32 = 1;
/// Maximum bullets a turret can hold.
pub const MAX_BULLETS: u32 = 3;
/// Ticks of `bulletRegenProgress` needed to gain one bullet.
pub const BULLET_REGEN_TICKS: u32 = 40;
/// Ticks a dead tank waits before respawning.
pub const RESPAWN_TICKS: u32 = 30;
/// Ticks a laser persists once fired.
pub const LASER_LIFETIME_TICKS: u32 = 8;
/// Ticks a mine stays in its "exploding" visual state before removal.
pub const MINE_FADE_TICKS: u32 = 3;
/// Ticks the owner of a freshly dropped mine is immune to its own blast.
pub const MINE_ARMING_GRACE_TICKS: u32 = 2;
/// Forward-facing fog-of-war cone range, in tiles.
pub const VISIBILITY_RANGE: i32 = 7;
/// Default bullet speed, tiles/tick.
pub const BULLET_SPEED: f64 = 1.0;
/// Damage dealt by a standard bullet.
pub const BULLET_DAMAGE: u32 = 20;
/// Damage dealt by a double bullet.
pub const DOUBLE_BULLET_DAMAGE: u32 = 35;
/// Damage dealt by a laser per tick of existence on an occupied tile.
pub const LASER_DAMAGE: u32 = 15;
/// Damage dealt by a mine explosion.
pub const MINE_DAMAGE: u32 = 40;
/// Health restored to an attacker on a kill.
pub const KILL_HEAL: u32 = 40;
/// Maximum bounded concurrency for the per-tick broadcast fan-out.
pub const BROADCAST_FANOUT_LIMIT: usize = 64;

/// Runtime configuration, parsed from the CLI surface defined in spec §6.
#[derive(Parser, Debug, Clone)]
#[command(name = "monotanks-server", version, about = "MonoTanks authoritative game server")]
pub struct ServerConfig {
    /// Bind address: an IP, `*` for all interfaces, or `localhost`.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// TCP port to listen on.
    #[arg(long, default_value_t = 8080)]
    pub port: u32,

    /// Number of players required before the match starts (2..=4).
    #[arg(long, default_value_t = 2)]
    pub players: u8,

    /// Target wall-clock period between broadcasts, in milliseconds.
    #[arg(long = "broadcast-interval", default_value_t = 100)]
    pub broadcast_interval_ms: u64,

    /// Total ticks the match runs for before a forced end.
    #[arg(long, default_value_t = 2000)]
    pub ticks: u64,

    /// PRNG seed; defaults to a value derived from the current time if unset.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Join code required by connecting clients.
    #[arg(long = "join-code", default_value = "")]
    pub join_code: String,

    /// Disable wall generation (open arena).
    #[arg(long)]
    pub sandbox: bool,

    /// Write a replay journal (requires `--replay-filepath`).
    #[arg(long = "save-replay")]
    pub save_replay: bool,

    /// Path to write the replay journal to.
    #[arg(long = "replay-filepath")]
    pub replay_filepath: Option<PathBuf>,

    /// Overwrite an existing replay file instead of refusing to start.
    #[arg(long = "overwrite-replay-file")]
    pub overwrite_replay_file: bool,

    /// Begin the next tick as soon as all bots have submitted, instead of waiting
    /// for the full broadcast interval.
    #[arg(long = "eager-broadcast")]
    pub eager_broadcast: bool,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=4).contains(&self.players) {
            return Err(ConfigError::PlayerCountOutOfRange(self.players));
        }
        if self.port == 0 || self.port > 65535 {
            return Err(ConfigError::PortOutOfRange(self.port));
        }
        if self.save_replay && self.replay_filepath.is_none() {
            return Err(ConfigError::MissingReplayPath);
        }
        if let Some(path) = &self.replay_filepath {
            if self.save_replay && path.exists() && !self.overwrite_replay_file {
                return Err(ConfigError::ReplayFileExists(path.display().to_string()));
            }
        }
        Ok(())
    }

    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ServerConfig {
        ServerConfig {
            host: "localhost".into(),
            port: 8080,
            players: 2,
            broadcast_interval_ms: 100,
            ticks: 2000,
            seed: Some(1),
            join_code: String::new(),
            sandbox: false,
            save_replay: false,
            replay_filepath: None,
            overwrite_replay_file: false,
            eager_broadcast: false,
        }
    }

    #[test]
    fn rejects_out_of_range_player_count() {
        let mut cfg = base_config();
        cfg.players = 5;
        assert!(matches!(cfg.validate(), Err(ConfigError::PlayerCountOutOfRange(5))));
    }

    #[test]
    fn rejects_save_replay_without_path() {
        let mut cfg = base_config();
        cfg.save_replay = true;
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingReplayPath)));
    }

    #[test]
    fn accepts_sane_defaults() {
        assert!(base_config().validate().is_ok());
    }
}

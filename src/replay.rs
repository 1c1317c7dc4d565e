//! Replay journal (spec §4.H): one composite JSON document per match, plus a
//! sibling `_results` file in competitive mode (join-code configured).

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::error::FatalError;
use crate::msg::types::{GameEndPayload, LobbyDataPayload};

#[derive(Serialize)]
struct ReplayDocument<'a> {
    lobby_data: &'a LobbyDataPayload,
    game_states: &'a [Value],
    game_end: &'a GameEndPayload,
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    players: &'a [crate::msg::types::GameEndPlayerResult],
    valid: bool,
}

/// Accumulates every tick's spectator-view snapshot in memory, then writes
/// the whole document at match end. Matches match lengths are bounded by
/// `--ticks`, so this never grows unboundedly.
pub struct ReplayJournal {
    path: PathBuf,
    lobby_data: LobbyDataPayload,
    game_states: Vec<Value>,
    competitive: bool,
}

impl ReplayJournal {
    pub fn new(path: PathBuf, lobby_data: LobbyDataPayload, competitive: bool) -> Self {
        Self { path, lobby_data, game_states: Vec::new(), competitive }
    }

    pub fn record_tick(&mut self, spectator_view: Value) {
        self.game_states.push(spectator_view);
    }

    pub fn finalize(&self, game_end: &GameEndPayload, any_disconnected: bool) -> Result<(), FatalError> {
        let document = ReplayDocument { lobby_data: &self.lobby_data, game_states: &self.game_states, game_end };
        let file = File::create(&self.path)?;
        write_json(file, &document)?;

        if self.competitive {
            let results = ResultsDocument { players: &game_end.players, valid: !any_disconnected };
            let results_path = results_sibling_path(&self.path);
            let file = File::create(&results_path)?;
            write_json(file, &results)?;
        }
        Ok(())
    }
}

fn write_json<T: Serialize>(file: File, value: &T) -> Result<(), FatalError> {
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .map_err(|e| FatalError::ReplayIo(std::io::Error::new(std::io::ErrorKind::Other, e)))
}

fn results_sibling_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("replay");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("json");
    path.with_file_name(format!("{stem}_results.{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_sibling_keeps_extension() {
        let p = PathBuf::from("/tmp/match.json");
        assert_eq!(results_sibling_path(&p), PathBuf::from("/tmp/match_results.json"));
    }
}

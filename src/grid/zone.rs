//! Zone capture accounting (spec §3, §4.C phase 9).

use std::collections::HashSet;

use serde::Serialize;

use crate::config::CAPTURE_TICKS;
use crate::entities::player::PlayerId;

/// Capture state of a single zone. `progress` is always in `[0, CAPTURE_TICKS]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CaptureState {
    Neutral,
    BeingCaptured { player: PlayerId, progress: u32 },
    Captured { player: PlayerId },
    BeingContested { progress: u32 },
    BeingRetaken { attacker: PlayerId, defender: PlayerId, progress: u32 },
}

pub struct Zone {
    pub id: String,
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
    pub state: CaptureState,
}

impl Zone {
    pub fn new(id: String, x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self { id, x_min, y_min, x_max, y_max, state: CaptureState::Neutral }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Count overlapping tanks per owning player. `tanks` is `(owner, x, y)` for
    /// every living tank on the grid.
    pub fn occupants<'a>(&self, tanks: impl Iterator<Item = (&'a PlayerId, i32, i32)>) -> HashSet<PlayerId> {
        tanks
            .filter(|&(_, x, y)| self.contains(x, y))
            .map(|(owner, _, _)| owner.clone())
            .collect()
    }

    /// Apply one tick of the phase-9 state machine given this tick's occupants.
    /// Returns the player (if any) who should gain a score point this tick.
    pub fn tick(&mut self, occupants: &HashSet<PlayerId>) -> Option<PlayerId> {
        let sole = if occupants.len() == 1 { occupants.iter().next().cloned() } else { None };

        self.state = match std::mem::replace(&mut self.state, CaptureState::Neutral) {
            CaptureState::Neutral => match occupants.len() {
                0 => CaptureState::Neutral,
                1 => CaptureState::BeingCaptured { player: sole.unwrap(), progress: 1 },
                _ => CaptureState::BeingContested { progress: 1 },
            },
            CaptureState::BeingCaptured { player, progress } => {
                if sole.as_ref() == Some(&player) {
                    if progress + 1 >= CAPTURE_TICKS {
                        CaptureState::Captured { player }
                    } else {
                        CaptureState::BeingCaptured { player, progress: progress + 1 }
                    }
                } else if occupants.is_empty() {
                    if progress <= 1 {
                        CaptureState::Neutral
                    } else {
                        CaptureState::BeingCaptured { player, progress: progress - 1 }
                    }
                } else {
                    CaptureState::BeingContested { progress }
                }
            }
            CaptureState::Captured { player } => {
                if occupants.is_empty() || sole.as_ref() == Some(&player) {
                    CaptureState::Captured { player }
                } else if let Some(challenger) = sole.filter(|p| *p != player) {
                    CaptureState::BeingRetaken { attacker: challenger, defender: player, progress: 1 }
                } else {
                    CaptureState::BeingContested { progress: 0 }
                }
            }
            CaptureState::BeingContested { progress } => match occupants.len() {
                0 => CaptureState::Neutral,
                1 => CaptureState::BeingCaptured { player: sole.unwrap(), progress: progress.max(1) },
                _ => CaptureState::BeingContested { progress },
            },
            CaptureState::BeingRetaken { attacker, defender, progress } => {
                if sole.as_ref() == Some(&attacker) {
                    if progress + 1 >= CAPTURE_TICKS {
                        CaptureState::Captured { player: attacker }
                    } else {
                        CaptureState::BeingRetaken { attacker, defender, progress: progress + 1 }
                    }
                } else if sole.as_ref() == Some(&defender) {
                    if progress <= 1 {
                        CaptureState::Captured { player: defender }
                    } else {
                        CaptureState::BeingRetaken { attacker, defender, progress: progress - 1 }
                    }
                } else {
                    CaptureState::BeingContested { progress }
                }
            }
        };

        match &self.state {
            CaptureState::Captured { player } => Some(player.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn zone() -> Zone {
        Zone::new("A".into(), 0, 0, 2, 2)
    }

    fn set(players: &[&str]) -> HashSet<PlayerId> {
        players.iter().map(|p| pid(p)).collect()
    }

    #[test]
    fn neutral_with_no_occupants_stays_neutral() {
        let mut z = zone();
        assert!(z.tick(&set(&[])).is_none());
        assert_eq!(z.state, CaptureState::Neutral);
    }

    #[test]
    fn single_player_progresses_to_capture() {
        let mut z = zone();
        for i in 1..CAPTURE_TICKS {
            z.tick(&set(&["p1"]));
            assert_eq!(z.state, CaptureState::BeingCaptured { player: pid("p1"), progress: i });
        }
        let scorer = z.tick(&set(&["p1"]));
        assert_eq!(z.state, CaptureState::Captured { player: pid("p1") });
        assert_eq!(scorer, Some(pid("p1")));
    }

    #[test]
    fn captured_zone_keeps_scoring_while_held() {
        let mut z = Zone { state: CaptureState::Captured { player: pid("p1") }, ..zone() };
        assert_eq!(z.tick(&set(&["p1"])), Some(pid("p1")));
        assert_eq!(z.tick(&set(&[])), Some(pid("p1")));
    }

    #[test]
    fn contested_when_two_players_overlap() {
        let mut z = zone();
        z.tick(&set(&["p1", "p2"]));
        assert_eq!(z.state, CaptureState::BeingContested { progress: 1 });
    }

    #[test]
    fn retake_flips_after_enough_ticks() {
        let mut z = Zone { state: CaptureState::Captured { player: pid("p1") }, ..zone() };
        z.tick(&set(&["p2"]));
        assert_eq!(z.state, CaptureState::BeingRetaken { attacker: pid("p2"), defender: pid("p1"), progress: 1 });
        for _ in 1..CAPTURE_TICKS {
            z.tick(&set(&["p2"]));
        }
        assert_eq!(z.state, CaptureState::Captured { player: pid("p2") });
    }

    #[test]
    fn defender_retaking_back_before_flip_restores_capture() {
        let mut z = Zone {
            state: CaptureState::BeingRetaken { attacker: pid("p2"), defender: pid("p1"), progress: 1 },
            ..zone()
        };
        z.tick(&set(&["p1"]));
        assert_eq!(z.state, CaptureState::Captured { player: pid("p1") });
    }

    #[test]
    fn progress_never_goes_negative() {
        let mut z = Zone { state: CaptureState::BeingCaptured { player: pid("p1"), progress: 1 }, ..zone() };
        z.tick(&set(&[]));
        assert_eq!(z.state, CaptureState::Neutral);
    }
}

//! The single authoritative world shared by every simulation phase
//! (spec §3, §5 "shared resources").

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::action::PlayerAction;
use crate::entities::{Bullet, Laser, MapItem, Mine, Player, PlayerId};
use crate::grid::Grid;

pub struct World {
    pub grid: Grid,
    pub players: HashMap<PlayerId, Player>,
    pub bullets: Vec<Bullet>,
    pub lasers: Vec<Laser>,
    pub mines: Vec<Mine>,
    pub items: Vec<MapItem>,
    pub tick: u64,
    pub rng: StdRng,
    /// Actions admitted by the dispatcher this tick, drained by simulation
    /// phase 1 in deterministic shuffled order.
    pub pending_actions: HashMap<PlayerId, PlayerAction>,
    /// The token clients must echo in `gameStateId` to avoid a stale-reply drop.
    pub current_game_state_id: u64,
    next_bullet_id: u64,
}

impl World {
    pub fn new(seed: u64, dim: u8, sandbox: bool) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = Grid::generate(&mut rng, dim, sandbox);
        let items = grid.item_spawns.iter().map(|&((x, y), kind)| MapItem::new(x, y, kind)).collect();
        Self {
            grid,
            players: HashMap::new(),
            bullets: Vec::new(),
            lasers: Vec::new(),
            mines: Vec::new(),
            items,
            tick: 0,
            rng,
            pending_actions: HashMap::new(),
            current_game_state_id: 0,
            next_bullet_id: 1,
        }
    }

    pub fn next_bullet_id(&mut self) -> u64 {
        let id = self.next_bullet_id;
        self.next_bullet_id += 1;
        id
    }

    /// `(owner, x, y)` for every living tank, used by zone occupancy accounting.
    pub fn living_tank_positions(&self) -> Vec<(&PlayerId, i32, i32)> {
        self.players
            .values()
            .filter_map(|p| p.tank.as_ref().filter(|t| !t.is_dead()).map(|t| (&p.id, t.x, t.y)))
            .collect()
    }

    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| p.is_alive())
    }

    pub fn connected_players(&self) -> impl Iterator<Item = &Player> {
        self.players.values().filter(|p| !p.is_disconnected)
    }

    /// Scheduler step 4: clear per-tick admission flags and issue a fresh
    /// game-state id for the tick about to be broadcast.
    pub fn begin_next_game_state(&mut self, id: u64) {
        self.current_game_state_id = id;
        for p in self.players.values_mut() {
            p.has_acted_this_tick = false;
        }
    }
}

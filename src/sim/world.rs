/// WorldState: everything the game loop owns.
///
/// Entity lists are only ever replaced wholesale by the level decoder
/// (`sim::level::load_level`); per-frame code mutates entities in place
/// but never adds or removes walls, hazards or borders.
///
/// ## Screen space
///
/// The playfield is a fixed 660×390 surface. The backdrop image is drawn
/// at `backdrop` and nudged 20 units each time the player wraps across a
/// screen edge, which gives the illusion of a larger scrolling world.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::PhysicsConfig;
use crate::domain::entity::{Barrier, Border, Feather, Hazard, Player};

pub const SCREEN_W: i32 = 660;
pub const SCREEN_H: i32 = 390;

pub const PLAYER_SPAWN: (f64, f64) = (50.0, 50.0);
pub const BACKDROP_ORIGIN: (i32, i32) = (-50, -50);
pub const FIRST_LEVEL: i32 = 1;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Menu,
    Playing,
}

/// Background scroll offset.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Backdrop {
    pub x: i32,
    pub y: i32,
}

impl Default for Backdrop {
    fn default() -> Self {
        Backdrop { x: BACKDROP_ORIGIN.0, y: BACKDROP_ORIGIN.1 }
    }
}

pub struct WorldState {
    // ── Entities (rebuilt per decode) ──
    pub walls: Vec<Barrier>,
    pub hazards: Vec<Hazard>,
    pub borders: Vec<Border>,
    pub feathers: Vec<Feather>,

    pub player: Player,

    // ── Progress ──
    pub level: i32,
    pub final_level: i32,
    pub mode: Mode,
    /// Set once the player passes the final level; the menu then shows
    /// the finish screen and starting again resets the run.
    pub won: bool,

    pub backdrop: Backdrop,
    pub invincible: bool,
    pub physics: PhysicsConfig,

    // ── Bookkeeping ──
    pub frame: u64,
    /// Number of decode passes so far.
    pub decodes: u64,
    seed: u64,
    rng: StdRng,
}

impl WorldState {
    pub fn new(seed: u64) -> Self {
        WorldState {
            walls: vec![],
            hazards: vec![],
            borders: vec![],
            feathers: vec![],
            player: Player::new(PLAYER_SPAWN.0, PLAYER_SPAWN.1),
            level: FIRST_LEVEL,
            final_level: 20,
            mode: Mode::Menu,
            won: false,
            backdrop: Backdrop::default(),
            invincible: false,
            physics: PhysicsConfig::default(),
            frame: 0,
            decodes: 0,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed for decoding the current level. Fixed per (run, level) so that
    /// re-decoding a level reproduces it exactly.
    pub fn level_seed(&self) -> u64 {
        self.seed ^ (self.level as i64 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Back to the very start of a run: level 1, fresh player, original
    /// backdrop. Entity lists are left for the caller to re-decode.
    pub fn reset_run(&mut self) {
        self.level = FIRST_LEVEL;
        self.player = Player::new(PLAYER_SPAWN.0, PLAYER_SPAWN.1);
        self.backdrop = Backdrop::default();
        self.won = false;
    }

    pub fn finished(&self) -> bool {
        self.level > self.final_level
    }
}

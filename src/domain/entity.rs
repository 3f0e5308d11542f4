/// Entities: one shared `Body` plus a small sum type per role.
///
/// Walls and buttons block movement, borders carry a level delta, hazards
/// reset the player on contact, feathers are decoration. The player is a
/// singleton owned by the world.

use rand::Rng;

use super::geometry::Rect;

/// Position, velocity, rotation and the derived bounding rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub x: f64,
    pub y: f64,
    pub dx: f64,
    pub dy: f64,
    /// Counter-clockwise sprite rotation. Cosmetic only.
    pub degrees: f64,
    pub rect: Rect,
}

impl Body {
    pub fn new(x: f64, y: f64) -> Self {
        Body { x, y, dx: 0.0, dy: 0.0, degrees: 0.0, rect: Rect::block_at(x, y) }
    }

    /// Re-derive the rectangle origin from the float position.
    #[inline]
    pub fn update_rect(&mut self) {
        self.rect.x = self.x as i32;
        self.rect.y = self.y as i32;
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// Which canary sprite is showing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Wings {
    Down,
    Up,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub body: Body,
    /// Last safe position, restored when a hazard is touched.
    pub checkpoint: (f64, f64),
    pub facing: Facing,
    pub wings: Wings,
}

impl Player {
    pub fn new(x: f64, y: f64) -> Self {
        Player {
            body: Body::new(x, y),
            checkpoint: (x, y),
            facing: Facing::Right,
            wings: Wings::Down,
        }
    }

    pub fn return_to_checkpoint(&mut self) {
        let (x, y) = self.checkpoint;
        self.body.x = x;
        self.body.y = y;
        self.body.update_rect();
    }
}

// ── Static level geometry ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BarrierKind {
    Wall,
    Button,
}

/// Anything the player and saw blades cannot pass through.
#[derive(Clone, Debug, PartialEq)]
pub struct Barrier {
    pub body: Body,
    pub kind: BarrierKind,
}

impl Barrier {
    pub fn new(kind: BarrierKind, x: f64, y: f64) -> Self {
        Barrier { body: Body::new(x, y), kind }
    }
}

/// Invisible trigger tile: touching it moves `delta` levels.
#[derive(Clone, Debug, PartialEq)]
pub struct Border {
    pub body: Body,
    pub delta: i32,
}

impl Border {
    pub fn new(x: f64, y: f64, delta: i32) -> Self {
        Border { body: Body::new(x, y), delta }
    }
}

// ── Hazards ──

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HazardKind {
    /// Ping-pongs between walls; `body.dx` carries speed and direction.
    SawBlade { frame: u8 },
    /// 9-tick sprite cycle; `charged` is what is currently drawn.
    ElectricBox { phase: u8, charged: bool },
    /// Hangs until the player comes within `trigger` units, then drops for good.
    FallingBlock { trigger: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hazard {
    pub body: Body,
    pub kind: HazardKind,
}

impl Hazard {
    pub fn saw_blade(x: f64, y: f64, dx: f64) -> Self {
        let mut body = Body::new(x, y);
        body.dx = dx;
        Hazard { body, kind: HazardKind::SawBlade { frame: 0 } }
    }

    pub fn electric_box(x: f64, y: f64) -> Self {
        Hazard { body: Body::new(x, y), kind: HazardKind::ElectricBox { phase: 0, charged: false } }
    }

    pub fn falling_block(x: f64, y: f64, trigger: f64) -> Self {
        Hazard { body: Body::new(x, y), kind: HazardKind::FallingBlock { trigger } }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            HazardKind::SawBlade { .. } => "saw blade",
            HazardKind::ElectricBox { .. } => "electric box",
            HazardKind::FallingBlock { .. } => "falling block",
        }
    }
}

// ── Feathers ──

/// A feather shaken loose by a flap. Drifts down while swaying around
/// the column it was dropped in, then disappears.
#[derive(Clone, Debug, PartialEq)]
pub struct Feather {
    pub body: Body,
    pub origin_x: f64,
    /// -1 swaying left, +1 swaying right.
    pub direction: i8,
    pub max_dist: f64,
    /// Frames left before removal.
    pub time: u32,
}

impl Feather {
    pub fn spawn(x: f64, y: f64, lifetime: u32, rng: &mut impl Rng) -> Self {
        let mut body = Body::new(x, y);
        body.dy = rng.gen_range(2..=5) as f64 * 0.2;
        body.dx = rng.gen_range(2..=4) as f64 * 0.3;
        Feather {
            body,
            origin_x: x,
            direction: if rng.gen_bool(0.5) { 1 } else { -1 },
            max_dist: rng.gen_range(10..=45) as f64,
            time: lifetime,
        }
    }

    pub fn expired(&self) -> bool {
        self.time == 0
    }
}

// ── Frame input ──

/// Logical actions, independent of keyboard or gamepad.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Left,
    Right,
    Flap,
    Start,
    Reload,
    Pause,
    ToggleInvincible,
}

/// Discrete input, edge-triggered. Queued by the front end once per frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputEvent {
    Pressed(Action),
    Released(Action),
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn body_rect_follows_position() {
        let mut b = Body::new(50.0, 50.0);
        assert_eq!(b.rect, Rect::new(50, 50, 28, 28));
        b.x = 61.7;
        b.y = 12.2;
        b.update_rect();
        assert_eq!((b.rect.x, b.rect.y), (61, 12));
    }

    #[test]
    fn checkpoint_restores_position_and_rect() {
        let mut p = Player::new(50.0, 50.0);
        p.body.x = 300.0;
        p.body.y = 200.0;
        p.body.update_rect();
        p.return_to_checkpoint();
        assert_eq!((p.body.x, p.body.y), (50.0, 50.0));
        assert_eq!(p.body.rect, Rect::new(50, 50, 28, 28));
    }

    #[test]
    fn feather_rolls_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let f = Feather::spawn(10.0, 20.0, 250, &mut rng);
            assert!(f.body.dy >= 0.4 - 1e-9 && f.body.dy <= 1.0 + 1e-9);
            assert!(f.body.dx >= 0.6 - 1e-9 && f.body.dx <= 1.2 + 1e-9);
            assert!(f.max_dist >= 10.0 && f.max_dist <= 45.0);
            assert!(f.direction == 1 || f.direction == -1);
            assert_eq!(f.time, 250);
            assert_eq!(f.origin_x, 10.0);
        }
    }

    #[test]
    fn new_electric_box_starts_idle() {
        let h = Hazard::electric_box(0.0, 0.0);
        assert_eq!(h.kind, HazardKind::ElectricBox { phase: 0, charged: false });
        assert_eq!(h.name(), "electric box");
    }
}

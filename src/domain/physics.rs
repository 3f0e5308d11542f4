/// Per-frame motion rules.
///
/// ## Player
///
/// Two passes, each resolved against every wall before the next begins:
///   1. Horizontal — move by `dx`, then push the leading edge flush
///      against any wall it entered.
///   2. Vertical — add gravity to `dy`, move, then clamp the top (rising)
///      or the bottom (falling) against any wall it entered and stop.
///
/// Sprite choice and tilt are derived here because they depend on the
/// same rising/falling split, but they never feed back into motion.
///
/// ## Hazards
///
/// Saw blades bounce between walls, electric boxes only animate, falling
/// blocks wait for the player and then drop forever.

use crate::config::PhysicsConfig;
use super::entity::{Barrier, Facing, Feather, Hazard, HazardKind, Player, Wings};

/// Tilt applied each falling frame, in degrees.
const FALL_TILT: f64 = 0.7;
/// Spin applied to a swaying feather each frame, in degrees.
const FEATHER_SPIN: f64 = 0.5;
/// Electric boxes cycle through this many phases.
const ELECTRIC_CYCLE: u8 = 9;
/// Phases below this show the charged sprite.
const ELECTRIC_CHARGED_PHASES: u8 = 4;

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

pub fn move_player(player: &mut Player, walls: &[Barrier], physics: &PhysicsConfig) {
    move_horizontal(player, walls);
    apply_gravity(player, walls, physics.gravity);
}

fn move_horizontal(player: &mut Player, walls: &[Barrier]) {
    let body = &mut player.body;
    body.x += body.dx;
    body.update_rect();

    for wall in walls {
        if wall.body.rect.collides(&body.rect) {
            if body.dx > 0.0 {
                body.rect.set_right(wall.body.rect.left());
            } else if body.dx < 0.0 {
                body.rect.set_left(wall.body.rect.right());
            }
            body.x = body.rect.x as f64;
            body.update_rect();
        }
    }
}

fn apply_gravity(player: &mut Player, walls: &[Barrier], gravity: f64) {
    let body = &mut player.body;
    body.dy += gravity;
    body.y += body.dy;
    body.update_rect();

    player.facing = if body.dx > 0.0 { Facing::Right } else { Facing::Left };

    if body.dy < 0.0 {
        body.degrees = 0.0;
        player.wings = Wings::Down;

        for wall in walls {
            if wall.body.rect.collides(&body.rect) {
                body.dy = 0.0;
                body.rect.set_top(wall.body.rect.bottom());
                body.y = body.rect.y as f64;
                body.update_rect();
            }
        }
    } else {
        player.wings = Wings::Up;
        match player.facing {
            Facing::Right => body.degrees -= FALL_TILT,
            Facing::Left => body.degrees += FALL_TILT,
        }

        for wall in walls {
            if wall.body.rect.collides(&body.rect) {
                body.rect.set_bottom(wall.body.rect.top());
                body.y = body.rect.y as f64;
                body.update_rect();
                body.dy = 0.0;
                body.degrees = 0.0;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Hazards
// ══════════════════════════════════════════════════════════════

/// Advance one hazard by a frame. `player_x` is the player's position
/// before the player itself moves this frame.
pub fn advance_hazard(hazard: &mut Hazard, walls: &[Barrier], player_x: f64, physics: &PhysicsConfig) {
    let body = &mut hazard.body;
    match &mut hazard.kind {
        HazardKind::SawBlade { frame } => {
            body.x += body.dx;
            *frame ^= 1;
            body.update_rect();

            // One reversal per contact, even when touching two walls at once.
            if walls.iter().any(|w| w.body.rect.collides(&body.rect)) {
                body.dx = -body.dx;
                body.x += body.dx;
                body.update_rect();
            }
        }
        HazardKind::ElectricBox { phase, charged } => {
            *charged = *phase < ELECTRIC_CHARGED_PHASES;
            *phase = (*phase + 1) % ELECTRIC_CYCLE;
        }
        HazardKind::FallingBlock { trigger } => {
            body.y += body.dy;
            body.update_rect();
            // Signed: the player approaches from the left, and anything
            // already behind the player drops as well.
            if body.x - player_x < *trigger {
                body.dy = physics.fall_speed;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Feathers
// ══════════════════════════════════════════════════════════════

pub fn advance_feather(feather: &mut Feather) {
    let body = &mut feather.body;
    if feather.direction < 0 {
        body.x -= body.dx;
        body.degrees += FEATHER_SPIN;
        if body.x < feather.origin_x - feather.max_dist {
            feather.direction = 1;
        }
    } else {
        body.x += body.dx;
        body.degrees -= FEATHER_SPIN;
        if body.x > feather.origin_x + feather.max_dist {
            feather.direction = -1;
        }
    }
    body.y += body.dy;
    body.update_rect();
    feather.time = feather.time.saturating_sub(1);
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

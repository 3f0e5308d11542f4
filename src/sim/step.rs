/// The step function: advances the world by one frame.
///
/// Menu frames only look for a start or quit. Playing frames run, in order:
///   1. Input (movement, flap, reload, pause, cheats)
///   2. Feathers (drift, then expire)
///   3. Hazards, each checked against the player right after it moves
///   4. Player movement against walls
///   5. Border crossing (level change, screen wrap, checkpoint)
///   6. Finish check
///
/// Touching a hazard or a border re-decodes the level, which is the only
/// place entity lists change.

use rand::Rng;

use crate::domain::entity::{Action, Feather, InputEvent};
use crate::domain::physics;
use crate::error::GameError;
use super::event::GameEvent;
use super::level::{load_level, LevelLibrary};
use super::world::{Mode, WorldState};

/// Backdrop shift per screen wrap.
const BACKDROP_SHIFT: i32 = 20;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(
    world: &mut WorldState,
    input: &[InputEvent],
    library: &mut LevelLibrary,
) -> Result<Vec<GameEvent>, GameError> {
    let mut events = Vec::new();

    match world.mode {
        Mode::Menu => resolve_menu(world, input, library, &mut events)?,
        Mode::Playing => {
            if resolve_input(world, input, library, &mut events)? {
                return Ok(events);
            }
            resolve_feathers(world);
            resolve_hazards(world, library, &mut events)?;
            physics::move_player(&mut world.player, &world.walls, &world.physics);
            resolve_borders(world, library, &mut events)?;
            resolve_finish(world, &mut events);
            world.frame += 1;
        }
    }

    Ok(events)
}

// ══════════════════════════════════════════════════════════════
// Menu
// ══════════════════════════════════════════════════════════════

fn resolve_menu(
    world: &mut WorldState,
    input: &[InputEvent],
    library: &mut LevelLibrary,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    for ev in input {
        match ev {
            InputEvent::Quit => {
                events.push(GameEvent::QuitRequested);
                return Ok(());
            }
            InputEvent::Pressed(Action::Flap | Action::Start) => {
                if world.won {
                    world.reset_run();
                    load_level(world, library)?;
                }
                world.mode = Mode::Playing;
                events.push(GameEvent::GameStarted { level: world.level });
                return Ok(());
            }
            _ => {}
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Playing: input
// ══════════════════════════════════════════════════════════════

/// Apply this frame's input. Returns true when the rest of the frame
/// must be skipped (quit or pause).
fn resolve_input(
    world: &mut WorldState,
    input: &[InputEvent],
    library: &mut LevelLibrary,
    events: &mut Vec<GameEvent>,
) -> Result<bool, GameError> {
    for ev in input {
        match *ev {
            InputEvent::Quit => {
                events.push(GameEvent::QuitRequested);
                return Ok(true);
            }
            InputEvent::Pressed(Action::Left) => world.player.body.dx = -world.physics.walk_speed,
            InputEvent::Pressed(Action::Right) => world.player.body.dx = world.physics.walk_speed,
            InputEvent::Released(Action::Left | Action::Right) => {
                world.player.body.dx *= world.physics.release_damping;
            }
            InputEvent::Pressed(Action::Flap) => {
                flap(world);
                events.push(GameEvent::Flapped);
            }
            InputEvent::Pressed(Action::Reload) => {
                load_level(world, library)?;
                events.push(GameEvent::LevelReloaded { level: world.level });
            }
            InputEvent::Pressed(Action::Pause) => {
                world.mode = Mode::Menu;
                events.push(GameEvent::ReturnedToMenu);
                return Ok(true);
            }
            InputEvent::Pressed(Action::ToggleInvincible) => {
                world.invincible = !world.invincible;
                events.push(GameEvent::InvincibilityToggled { on: world.invincible });
            }
            InputEvent::Pressed(Action::Start) | InputEvent::Released(_) => {}
        }
    }
    Ok(false)
}

/// Jump and shake loose a few feathers.
fn flap(world: &mut WorldState) {
    world.player.body.dy = world.physics.flap_impulse;

    let (px, py) = (world.player.body.x, world.player.body.y);
    let lifetime = world.physics.feather_lifetime;
    let rng = world.rng();
    let count = rng.gen_range(2..=4);
    let fresh: Vec<Feather> = (0..count)
        .map(|_| {
            let x = px + rng.gen_range(-5..=5) as f64;
            let y = py + rng.gen_range(0..=7) as f64;
            Feather::spawn(x, y, lifetime, rng)
        })
        .collect();
    world.feathers.extend(fresh);
}

// ══════════════════════════════════════════════════════════════
// Playing: entities
// ══════════════════════════════════════════════════════════════

fn resolve_feathers(world: &mut WorldState) {
    for feather in &mut world.feathers {
        physics::advance_feather(feather);
    }
    world.feathers.retain(|f| !f.expired());
}

fn resolve_hazards(
    world: &mut WorldState,
    library: &mut LevelLibrary,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let player_x = world.player.body.x;
    let mut killer = None;

    for hazard in &mut world.hazards {
        physics::advance_hazard(hazard, &world.walls, player_x, &world.physics);
        if !world.invincible && hazard.body.rect.collides(&world.player.body.rect) {
            killer = Some(hazard.name());
            break;
        }
    }

    if let Some(by) = killer {
        world.player.return_to_checkpoint();
        world.player.body.dy = 0.0;
        load_level(world, library)?;
        events.push(GameEvent::PlayerKilled { by });
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Playing: level progress
// ══════════════════════════════════════════════════════════════

fn resolve_borders(
    world: &mut WorldState,
    library: &mut LevelLibrary,
    events: &mut Vec<GameEvent>,
) -> Result<(), GameError> {
    let player_rect = world.player.body.rect;
    let Some(delta) = world
        .borders
        .iter()
        .find(|b| b.body.rect.collides(&player_rect))
        .map(|b| b.delta)
    else {
        return Ok(());
    };

    let from = world.level;
    world.level += delta;
    wrap_player(world);

    let body = &mut world.player.body;
    world.player.checkpoint = (body.x, body.y);
    body.update_rect();

    events.push(GameEvent::BorderCrossed { from, to: world.level });

    // Past the last level there is nothing to decode; the finish check
    // takes it from here.
    if !world.finished() {
        load_level(world, library)?;
    }
    Ok(())
}

/// Move the player to the opposite screen edge and scroll the backdrop.
/// Only the first matching edge applies; a crossing away from every edge
/// leaves the position alone.
fn wrap_player(world: &mut WorldState) {
    let body = &mut world.player.body;
    let backdrop = &mut world.backdrop;

    if body.x > 630.0 {
        body.x = 5.0;
        backdrop.x -= BACKDROP_SHIFT;
    } else if body.x < 10.0 {
        body.x = 610.0;
        backdrop.x += BACKDROP_SHIFT;
    } else if body.y > 350.0 {
        body.y = 5.0;
        backdrop.y -= BACKDROP_SHIFT;
    } else if body.y < 10.0 {
        body.y = 360.0;
        backdrop.y += BACKDROP_SHIFT;
    }
}

fn resolve_finish(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.finished() {
        world.won = true;
        world.mode = Mode::Menu;
        events.push(GameEvent::GameFinished);
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::HazardKind;
    use crate::domain::tile::TileColor;
    use crate::sim::world::Backdrop;
    use image::{Rgba, RgbaImage};

    fn bitmap(tiles: &[(u32, u32, TileColor)]) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(23, 14, Rgba([0, 0, 0, 255]));
        for &(x, y, t) in tiles {
            img.put_pixel(x, y, Rgba(t.rgba()));
        }
        img
    }

    /// A world already playing on `level`, decoded from `levels`.
    fn playing(level: i32, levels: Vec<(i32, RgbaImage)>) -> (WorldState, LevelLibrary) {
        let mut lib = LevelLibrary::from_images("no/such/dir", levels);
        let mut w = WorldState::new(7);
        w.level = level;
        load_level(&mut w, &mut lib).unwrap();
        w.mode = Mode::Playing;
        (w, lib)
    }

    fn place_player(w: &mut WorldState, x: f64, y: f64) {
        w.player.body.x = x;
        w.player.body.y = y;
        w.player.body.update_rect();
    }

    fn press(a: Action) -> InputEvent {
        InputEvent::Pressed(a)
    }

    #[test]
    fn plus_border_advances_and_redecodes() {
        let level1 = bitmap(&[(3, 3, TileColor::BorderAhead), (5, 7, TileColor::Wall)]);
        let level2 = bitmap(&[(1, 12, TileColor::Wall), (2, 12, TileColor::Wall)]);
        let (mut w, mut lib) = playing(1, vec![(1, level1), (2, level2.clone())]);
        assert_eq!(w.decodes, 1);

        // Player at (50, 50) already overlaps the border at (60, 60).
        let events = step(&mut w, &[], &mut lib).unwrap();

        assert_eq!(w.level, 2);
        assert_eq!(w.decodes, 2);
        assert!(events.contains(&GameEvent::BorderCrossed { from: 1, to: 2 }));
        let expected = crate::sim::level::decode(&level2, w.level_seed(), &w.physics);
        assert_eq!(w.walls, expected.walls);
        assert!(w.borders.is_empty());
    }

    #[test]
    fn mid_screen_crossing_keeps_position() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(3, 3, TileColor::BorderAhead)])), (2, bitmap(&[]))]);
        step(&mut w, &[], &mut lib).unwrap();
        assert_eq!(w.player.body.x, 50.0);
        assert!((w.player.body.y - 50.08).abs() < 1e-9);
        assert_eq!(w.player.checkpoint, (w.player.body.x, w.player.body.y));
        assert_eq!(w.backdrop, Backdrop::default());
    }

    #[test]
    fn right_edge_crossing_wraps_left() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(22, 4, TileColor::BorderAhead)])), (2, bitmap(&[]))]);
        place_player(&mut w, 640.0, 100.0);

        step(&mut w, &[], &mut lib).unwrap();

        assert_eq!(w.level, 2);
        assert_eq!(w.player.body.x, 5.0);
        assert_eq!(w.player.body.rect.x, 5);
        assert_eq!(w.backdrop, Backdrop { x: -70, y: -50 });
        assert_eq!(w.player.checkpoint.0, 5.0);
    }

    #[test]
    fn bottom_edge_crossing_wraps_to_top() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(4, 13, TileColor::BorderAhead)])), (2, bitmap(&[]))]);
        place_player(&mut w, 100.0, 355.0);

        step(&mut w, &[], &mut lib).unwrap();

        assert_eq!(w.level, 2);
        assert_eq!((w.player.body.x, w.player.body.y), (100.0, 5.0));
        assert_eq!(w.backdrop, Backdrop { x: -50, y: -70 });
        assert_eq!(w.player.checkpoint, (100.0, 5.0));
    }

    #[test]
    fn top_edge_crossing_wraps_to_bottom() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(4, 1, TileColor::BorderAhead)])), (2, bitmap(&[]))]);
        place_player(&mut w, 100.0, 5.0);

        step(&mut w, &[], &mut lib).unwrap();

        assert_eq!(w.level, 2);
        assert_eq!((w.player.body.x, w.player.body.y), (100.0, 360.0));
        assert_eq!(w.backdrop, Backdrop { x: -50, y: -30 });
        assert_eq!(w.player.checkpoint, (100.0, 360.0));
    }

    #[test]
    fn horizontal_wrap_wins_in_a_corner() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(1, 13, TileColor::BorderAhead)])), (2, bitmap(&[]))]);
        place_player(&mut w, 5.0, 355.0);

        step(&mut w, &[], &mut lib).unwrap();

        assert_eq!(w.player.body.x, 610.0);
        assert!(w.player.body.y > 350.0);
        assert_eq!(w.backdrop, Backdrop { x: -30, y: -50 });
    }

    #[test]
    fn back_border_returns_a_level() {
        let (mut w, mut lib) = playing(3, vec![(3, bitmap(&[(1, 4, TileColor::BorderBack)])), (2, bitmap(&[]))]);
        place_player(&mut w, 5.0, 100.0);
        step(&mut w, &[], &mut lib).unwrap();
        assert_eq!(w.level, 2);
        assert_eq!(w.player.body.x, 610.0);
        assert_eq!(w.backdrop, Backdrop { x: -30, y: -50 });
    }

    fn assert_hazard_resets(color: TileColor) {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(5, 5, color)]))]);
        let spawned = w.hazards.clone();
        place_player(&mut w, 100.0, 100.0);
        w.player.body.dy = 3.0;

        let events = step(&mut w, &[], &mut lib).unwrap();

        assert!(matches!(events.as_slice(), [GameEvent::PlayerKilled { .. }]), "{color:?}: {events:?}");
        assert_eq!(w.player.body.x, 50.0);
        // Zeroed, then one frame of gravity.
        assert!((w.player.body.dy - w.physics.gravity).abs() < 1e-9, "{color:?}");
        assert_eq!(w.decodes, 2);
        assert_eq!(w.hazards, spawned);
    }

    #[test]
    fn every_hazard_resets_to_checkpoint() {
        assert_hazard_resets(TileColor::SawBlade);
        assert_hazard_resets(TileColor::ElectricBox);
        assert_hazard_resets(TileColor::FallingBlock);
    }

    #[test]
    fn invincible_player_ignores_hazards() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(5, 5, TileColor::ElectricBox)]))]);
        w.invincible = true;
        place_player(&mut w, 100.0, 100.0);

        let events = step(&mut w, &[], &mut lib).unwrap();

        assert!(events.is_empty());
        assert_eq!(w.player.body.x, 100.0);
        assert_eq!(w.decodes, 1);
    }

    #[test]
    fn falling_block_keeps_falling_once_triggered() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(20, 1, TileColor::FallingBlock)]))]);
        w.invincible = true;
        place_player(&mut w, 560.0, 200.0);
        for _ in 0..5 {
            step(&mut w, &[], &mut lib).unwrap();
            assert!(matches!(w.hazards[0].kind, HazardKind::FallingBlock { .. }));
            assert_eq!(w.hazards[0].body.dy, 9.0);
            place_player(&mut w, 0.0, 200.0);
        }
    }

    #[test]
    fn passing_final_level_finishes_and_menu_restarts() {
        let (mut w, mut lib) = playing(20, vec![(20, bitmap(&[(3, 3, TileColor::BorderAhead)])), (1, bitmap(&[]))]);
        w.backdrop = Backdrop { x: -90, y: -50 };

        let events = step(&mut w, &[], &mut lib).unwrap();
        assert_eq!(w.level, 21);
        assert!(w.won);
        assert_eq!(w.mode, Mode::Menu);
        assert_eq!(events.last(), Some(&GameEvent::GameFinished));
        assert_eq!(w.decodes, 1);

        let events = step(&mut w, &[press(Action::Flap)], &mut lib).unwrap();
        assert_eq!(events, vec![GameEvent::GameStarted { level: 1 }]);
        assert_eq!(w.level, 1);
        assert!(!w.won);
        assert_eq!(w.mode, Mode::Playing);
        assert_eq!((w.player.body.x, w.player.body.y), (50.0, 50.0));
        assert_eq!(w.backdrop, Backdrop::default());
        assert_eq!(w.decodes, 2);
    }

    #[test]
    fn menu_start_before_winning_keeps_level() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        w.mode = Mode::Menu;
        step(&mut w, &[InputEvent::Released(Action::Left), press(Action::Start)], &mut lib).unwrap();
        assert_eq!(w.mode, Mode::Playing);
        assert_eq!(w.decodes, 1);
    }

    #[test]
    fn menu_ignores_movement() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        w.mode = Mode::Menu;
        let events = step(&mut w, &[press(Action::Left)], &mut lib).unwrap();
        assert!(events.is_empty());
        assert_eq!(w.mode, Mode::Menu);
        assert_eq!(w.player.body.dx, 0.0);
    }

    #[test]
    fn feathers_expire_exactly_at_zero() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        w.physics.feather_lifetime = 3;

        let events = step(&mut w, &[press(Action::Flap)], &mut lib).unwrap();
        assert_eq!(events, vec![GameEvent::Flapped]);
        let n = w.feathers.len();
        assert!((2..=4).contains(&n));
        assert!(w.feathers.iter().all(|f| f.time == 2));
        for f in &w.feathers {
            assert!(f.origin_x >= 45.0 && f.origin_x <= 55.0);
            assert!(f.body.y >= 50.0 && f.body.y <= 57.0 + 1.0);
        }

        step(&mut w, &[], &mut lib).unwrap();
        assert_eq!(w.feathers.len(), n);
        step(&mut w, &[], &mut lib).unwrap();
        assert!(w.feathers.is_empty());
    }

    #[test]
    fn flap_sets_upward_speed() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        step(&mut w, &[press(Action::Flap)], &mut lib).unwrap();
        assert!((w.player.body.dy - (-2.5 + 0.08)).abs() < 1e-9);
    }

    #[test]
    fn release_halves_walk_speed() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        step(&mut w, &[press(Action::Right)], &mut lib).unwrap();
        assert_eq!(w.player.body.dx, 2.0);
        assert_eq!(w.player.body.x, 52.0);

        step(&mut w, &[InputEvent::Released(Action::Right)], &mut lib).unwrap();
        assert_eq!(w.player.body.dx, 1.0);

        step(&mut w, &[press(Action::Left)], &mut lib).unwrap();
        assert_eq!(w.player.body.dx, -2.0);
    }

    #[test]
    fn reload_redecodes_current_level() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(4, 4, TileColor::Wall)]))]);
        let events = step(&mut w, &[press(Action::Reload)], &mut lib).unwrap();
        assert_eq!(events, vec![GameEvent::LevelReloaded { level: 1 }]);
        assert_eq!(w.decodes, 2);
        assert_eq!(w.walls.len(), 1);
    }

    #[test]
    fn pause_returns_to_menu_without_moving() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        let events = step(&mut w, &[press(Action::Pause), press(Action::Flap)], &mut lib).unwrap();
        assert_eq!(events, vec![GameEvent::ReturnedToMenu]);
        assert_eq!(w.mode, Mode::Menu);
        assert_eq!(w.player.body.y, 50.0);
        assert_eq!(w.frame, 0);
    }

    #[test]
    fn backspace_toggles_invincibility() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        let events = step(&mut w, &[press(Action::ToggleInvincible)], &mut lib).unwrap();
        assert!(w.invincible);
        assert_eq!(events, vec![GameEvent::InvincibilityToggled { on: true }]);
        step(&mut w, &[press(Action::ToggleInvincible)], &mut lib).unwrap();
        assert!(!w.invincible);
    }

    #[test]
    fn quit_works_in_both_modes() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[]))]);
        assert_eq!(step(&mut w, &[InputEvent::Quit], &mut lib).unwrap(), vec![GameEvent::QuitRequested]);
        w.mode = Mode::Menu;
        assert_eq!(step(&mut w, &[InputEvent::Quit], &mut lib).unwrap(), vec![GameEvent::QuitRequested]);
    }

    #[test]
    fn walking_off_the_first_level_backwards_is_fatal() {
        let (mut w, mut lib) = playing(1, vec![(1, bitmap(&[(3, 3, TileColor::BorderBack)]))]);
        assert!(matches!(step(&mut w, &[], &mut lib), Err(GameError::Image { .. })));
        assert_eq!(w.level, 0);
    }
}

/// Level decoder: turns a level bitmap into entity lists.
///
/// ## Source
///   `Level<N>.png` in the assets directory, one file per level, loaded
///   on first use and cached for the rest of the run.
///
/// ## Grid
///   Each pixel is one 30-unit tile. Pixel (px, py) spawns at
///   (px·30 − 30, py·30 − 30), so column 0 and row 0 sit just off screen.
///   Pixels are visited column by column (x outer, y inner); that order
///   is the order entities appear in their lists.
///
/// ## Legend:
///   yellow  = saw blade          blue    = electric box
///   cyan    = falling block      white   = wall
///   magenta = button (wall)      red     = border, level − 1
///   green   = border, level + 1  other   = scenery, nothing spawned

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PhysicsConfig;
use crate::domain::entity::{Barrier, BarrierKind, Border, Hazard};
use crate::domain::tile::TileColor;
use crate::error::GameError;
use super::world::WorldState;

pub const TILE_SIZE: f64 = 30.0;

/// Back-off applied when the player spawns above the screen.
const UNSTICK_Y: f64 = 28.0;

/// Everything one bitmap spawns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelLayout {
    pub walls: Vec<Barrier>,
    pub hazards: Vec<Hazard>,
    pub borders: Vec<Border>,
}

// ══════════════════════════════════════════════════════════════
// Decoding
// ══════════════════════════════════════════════════════════════

pub fn tile_origin(px: u32, py: u32) -> (f64, f64) {
    (px as f64 * TILE_SIZE - TILE_SIZE, py as f64 * TILE_SIZE - TILE_SIZE)
}

/// Decode a bitmap. Saw blade directions are drawn from `seed`, so the
/// same bitmap and seed always give the same layout.
pub fn decode(bitmap: &RgbaImage, seed: u64, physics: &PhysicsConfig) -> LevelLayout {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut layout = LevelLayout::default();

    for px in 0..bitmap.width() {
        for py in 0..bitmap.height() {
            let Some(color) = TileColor::from_rgba(bitmap.get_pixel(px, py).0) else {
                continue;
            };
            let (x, y) = tile_origin(px, py);
            match color {
                TileColor::SawBlade => {
                    let dx = if rng.gen_bool(0.5) { physics.saw_speed } else { -physics.saw_speed };
                    layout.hazards.push(Hazard::saw_blade(x, y, dx));
                }
                TileColor::ElectricBox => layout.hazards.push(Hazard::electric_box(x, y)),
                TileColor::FallingBlock => {
                    layout.hazards.push(Hazard::falling_block(x, y, physics.fall_trigger))
                }
                TileColor::Wall => layout.walls.push(Barrier::new(BarrierKind::Wall, x, y)),
                TileColor::Button => layout.walls.push(Barrier::new(BarrierKind::Button, x, y)),
                TileColor::BorderBack => layout.borders.push(Border::new(x, y, -1)),
                TileColor::BorderAhead => layout.borders.push(Border::new(x, y, 1)),
            }
        }
    }

    layout
}

// ══════════════════════════════════════════════════════════════
// Bitmap library
// ══════════════════════════════════════════════════════════════

/// Level bitmaps by index, read lazily from disk.
pub struct LevelLibrary {
    dir: PathBuf,
    cache: HashMap<i32, RgbaImage>,
}

impl LevelLibrary {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        LevelLibrary { dir: dir.into(), cache: HashMap::new() }
    }

    /// Pre-filled library; indices not given still fall back to `dir`.
    #[cfg(test)]
    pub fn from_images(dir: impl Into<PathBuf>, images: impl IntoIterator<Item = (i32, RgbaImage)>) -> Self {
        LevelLibrary { dir: dir.into(), cache: images.into_iter().collect() }
    }

    pub fn bitmap(&mut self, index: i32) -> Result<&RgbaImage, GameError> {
        let path = level_path(&self.dir, index);
        match self.cache.entry(index) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(v) => {
                let image = image::open(&path)
                    .map_err(|source| GameError::Image { path: path.clone(), source })?
                    .to_rgba8();
                log::debug!("read {} ({}x{})", path.display(), image.width(), image.height());
                Ok(v.insert(image))
            }
        }
    }
}

pub fn level_path(dir: &Path, index: i32) -> PathBuf {
    dir.join(format!("Level{index}.png"))
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Decode the current level into the world, replacing every entity list.
/// Feathers belong to the old screen and are dropped.
pub fn load_level(world: &mut WorldState, library: &mut LevelLibrary) -> Result<(), GameError> {
    let seed = world.level_seed();
    let layout = decode(library.bitmap(world.level)?, seed, &world.physics);

    log::info!(
        "level {}: {} walls, {} hazards, {} borders",
        world.level,
        layout.walls.len(),
        layout.hazards.len(),
        layout.borders.len()
    );

    world.walls = layout.walls;
    world.hazards = layout.hazards;
    world.borders = layout.borders;
    world.feathers.clear();
    world.decodes += 1;

    unstick_player(world);
    Ok(())
}

/// Nudge a freshly placed player out of the ceiling and out of walls it
/// spawned inside. Skipped while the player still stands on a border,
/// where the next frame's crossing takes precedence.
fn unstick_player(world: &mut WorldState) {
    let player = &mut world.player.body;
    if world.borders.iter().any(|b| b.body.rect.collides(&player.rect)) {
        return;
    }

    if player.y < 0.0 {
        player.y = UNSTICK_Y;
        player.update_rect();
    }

    for wall in &world.walls {
        let rect = wall.body.rect;
        if rect.collides(&player.rect) && player.y >= rect.y as f64 {
            player.y = rect.bottom() as f64;
            player.update_rect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::HazardKind;
    use image::Rgba;

    fn bitmap(w: u32, h: u32, tiles: &[(u32, u32, TileColor)]) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));
        for &(x, y, t) in tiles {
            img.put_pixel(x, y, Rgba(t.rgba()));
        }
        img
    }

    fn physics() -> PhysicsConfig {
        PhysicsConfig::default()
    }

    #[test]
    fn pixels_map_to_tile_origins() {
        let img = bitmap(4, 4, &[(0, 0, TileColor::Wall), (1, 1, TileColor::Wall), (3, 2, TileColor::Wall)]);
        let layout = decode(&img, 0, &physics());
        let at: Vec<(f64, f64)> = layout.walls.iter().map(|w| (w.body.x, w.body.y)).collect();
        assert_eq!(at, vec![(-30.0, -30.0), (0.0, 0.0), (60.0, 30.0)]);
        assert_eq!(layout.walls[2].body.rect.w, 28);
    }

    #[test]
    fn columns_are_visited_before_rows() {
        let img = bitmap(2, 2, &[(1, 0, TileColor::Wall), (0, 1, TileColor::Wall)]);
        let layout = decode(&img, 0, &physics());
        assert_eq!((layout.walls[0].body.x, layout.walls[0].body.y), (-30.0, 0.0));
        assert_eq!((layout.walls[1].body.x, layout.walls[1].body.y), (0.0, -30.0));
    }

    #[test]
    fn each_color_spawns_its_entity() {
        let img = bitmap(
            7,
            1,
            &[
                (0, 0, TileColor::SawBlade),
                (1, 0, TileColor::ElectricBox),
                (2, 0, TileColor::FallingBlock),
                (3, 0, TileColor::Wall),
                (4, 0, TileColor::Button),
                (5, 0, TileColor::BorderBack),
                (6, 0, TileColor::BorderAhead),
            ],
        );
        let layout = decode(&img, 5, &physics());

        assert_eq!(layout.walls.len(), 2);
        assert_eq!(layout.walls[0].kind, BarrierKind::Wall);
        assert_eq!(layout.walls[1].kind, BarrierKind::Button);

        assert_eq!(layout.hazards.len(), 3);
        assert!(matches!(layout.hazards[0].kind, HazardKind::SawBlade { frame: 0 }));
        assert_eq!(layout.hazards[0].body.dx.abs(), 2.0);
        assert_eq!(layout.hazards[1].kind, HazardKind::ElectricBox { phase: 0, charged: false });
        assert_eq!(layout.hazards[2].kind, HazardKind::FallingBlock { trigger: 40.0 });
        assert_eq!(layout.hazards[2].body.dy, 0.0);

        let deltas: Vec<i32> = layout.borders.iter().map(|b| b.delta).collect();
        assert_eq!(deltas, vec![-1, 1]);
    }

    #[test]
    fn scenery_spawns_nothing() {
        let mut img = bitmap(3, 3, &[]);
        img.put_pixel(1, 1, Rgba([128, 64, 32, 255]));
        img.put_pixel(2, 2, Rgba([255, 255, 255, 0]));
        assert_eq!(decode(&img, 0, &physics()), LevelLayout::default());
    }

    #[test]
    fn saw_blades_roll_both_directions() {
        let tiles: Vec<_> = (0..32).map(|x| (x, 0, TileColor::SawBlade)).collect();
        let img = bitmap(32, 1, &tiles);
        let layout = decode(&img, 11, &physics());
        assert!(layout.hazards.iter().any(|h| h.body.dx > 0.0));
        assert!(layout.hazards.iter().any(|h| h.body.dx < 0.0));
    }

    #[test]
    fn decoding_twice_is_identical() {
        let img = bitmap(6, 3, &[(0, 0, TileColor::SawBlade), (2, 1, TileColor::SawBlade), (5, 2, TileColor::Wall)]);
        assert_eq!(decode(&img, 77, &physics()), decode(&img, 77, &physics()));
    }

    #[test]
    fn load_level_replaces_lists_and_drops_feathers() {
        let mut lib = LevelLibrary::from_images("missing", [(1, bitmap(3, 3, &[(2, 2, TileColor::SawBlade)]))]);
        let mut w = WorldState::new(9);
        let feather = crate::domain::entity::Feather::spawn(0.0, 0.0, 250, w.rng());
        w.feathers.push(feather);

        load_level(&mut w, &mut lib).unwrap();
        let first = w.hazards.clone();
        assert_eq!(w.decodes, 1);
        assert!(w.feathers.is_empty());
        assert!(w.walls.is_empty());

        load_level(&mut w, &mut lib).unwrap();
        assert_eq!(w.hazards, first);
        assert_eq!(w.decodes, 2);
    }

    #[test]
    fn missing_level_is_an_image_error() {
        let mut lib = LevelLibrary::from_dir("no/such/dir");
        let mut w = WorldState::new(0);
        w.level = 4;
        match load_level(&mut w, &mut lib) {
            Err(GameError::Image { path, .. }) => assert!(path.ends_with("Level4.png")),
            other => panic!("expected image error, got {other:?}"),
        }
        assert_eq!(w.decodes, 0);
    }

    #[test]
    fn player_above_screen_drops_to_first_row() {
        let mut lib = LevelLibrary::from_images("missing", [(1, bitmap(1, 1, &[]))]);
        let mut w = WorldState::new(0);
        w.player.body.y = -12.0;
        w.player.body.update_rect();
        load_level(&mut w, &mut lib).unwrap();
        assert_eq!(w.player.body.y, 28.0);
    }

    #[test]
    fn player_inside_wall_is_pushed_below_it() {
        // Wall at (30, 30); player at (50, 40) overlaps it from below its top.
        let mut lib = LevelLibrary::from_images("missing", [(1, bitmap(3, 3, &[(2, 2, TileColor::Wall)]))]);
        let mut w = WorldState::new(0);
        w.player.body.y = 40.0;
        w.player.body.update_rect();
        load_level(&mut w, &mut lib).unwrap();
        assert_eq!(w.player.body.y, 58.0);
    }

    #[test]
    fn player_on_border_is_left_alone() {
        let mut lib = LevelLibrary::from_images(
            "missing",
            [(1, bitmap(3, 3, &[(2, 2, TileColor::Wall), (1, 2, TileColor::BorderAhead)]))],
        );
        let mut w = WorldState::new(0);
        w.player.body.x = 10.0;
        w.player.body.y = 40.0;
        w.player.body.update_rect();
        load_level(&mut w, &mut lib).unwrap();
        assert_eq!(w.player.body.y, 40.0);
    }
}

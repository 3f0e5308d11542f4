/// Sprite and sound file lookup in the assets directory.
///
/// Every asset has an ordered list of accepted file names; the first one
/// that exists wins. Images are decoded once at startup and kept as RGBA.

use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::domain::entity::{BarrierKind, Hazard, HazardKind, Player, Wings};
use crate::error::GameError;

pub const CANARY: [&[&str]; 2] = [&["Canary0.png"], &["Canary1.png"]];
pub const SAW_BLADE: [&[&str]; 2] = [&["Sawblade0.png"], &["Sawblade1.png"]];
pub const ELECTRIC: [&[&str]; 2] = [&["Electric0.png"], &["Electric1.png"]];
pub const CRATE: &[&str] = &["Crate.png"];
pub const BUTTON: &[&str] = &["Button.png"];
pub const FEATHER: &[&str] = &["Feather.png"];
pub const BACKDROP: &[&str] = &["BG.jpg", "BG.png"];
pub const INTRO: &[&str] = &["Intro.png"];
pub const FINISH: &[&str] = &["Finish.jpg", "Finish.png"];
pub const FLAP_SOUND: &[&str] = &["Flap.wav"];
pub const MUSIC: &[&str] = &["Music.ogg", "Music.mp3"];

pub struct Sprites {
    /// Wings down, wings up.
    pub canary: [RgbaImage; 2],
    pub saw_blade: [RgbaImage; 2],
    /// Idle, charged.
    pub electric: [RgbaImage; 2],
    /// Walls and falling blocks share the crate.
    pub crate_box: RgbaImage,
    pub button: RgbaImage,
    pub feather: RgbaImage,
    pub backdrop: RgbaImage,
    pub intro: RgbaImage,
    pub finish: RgbaImage,
}

impl Sprites {
    pub fn load(dir: &Path) -> Result<Self, GameError> {
        let sprites = Sprites {
            canary: [load_image(dir, CANARY[0])?, load_image(dir, CANARY[1])?],
            saw_blade: [load_image(dir, SAW_BLADE[0])?, load_image(dir, SAW_BLADE[1])?],
            electric: [load_image(dir, ELECTRIC[0])?, load_image(dir, ELECTRIC[1])?],
            crate_box: load_image(dir, CRATE)?,
            button: load_image(dir, BUTTON)?,
            feather: load_image(dir, FEATHER)?,
            backdrop: load_image(dir, BACKDROP)?,
            intro: load_image(dir, INTRO)?,
            finish: load_image(dir, FINISH)?,
        };
        log::info!("sprites loaded from {}", dir.display());
        Ok(sprites)
    }

    pub fn player(&self, player: &Player) -> &RgbaImage {
        match player.wings {
            Wings::Down => &self.canary[0],
            Wings::Up => &self.canary[1],
        }
    }

    pub fn barrier(&self, kind: BarrierKind) -> &RgbaImage {
        match kind {
            BarrierKind::Wall => &self.crate_box,
            BarrierKind::Button => &self.button,
        }
    }

    pub fn hazard(&self, hazard: &Hazard) -> &RgbaImage {
        match hazard.kind {
            HazardKind::SawBlade { frame } => &self.saw_blade[usize::from(frame & 1)],
            HazardKind::ElectricBox { charged, .. } => &self.electric[usize::from(charged)],
            HazardKind::FallingBlock { .. } => &self.crate_box,
        }
    }
}

/// First existing file among `names` in `dir`.
pub fn find_asset(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|n| dir.join(n)).find(|p| p.is_file())
}

pub fn load_image(dir: &Path, names: &[&str]) -> Result<RgbaImage, GameError> {
    let path = find_asset(dir, names).ok_or_else(|| GameError::MissingAsset {
        dir: dir.to_path_buf(),
        names: names.iter().map(|n| n.to_string()).collect(),
    })?;
    let image = image::open(&path)
        .map_err(|source| GameError::Image { path: path.clone(), source })?
        .to_rgba8();
    log::debug!("loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

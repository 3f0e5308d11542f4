/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD), or from the
/// path given with `--config`. Missing file or missing keys fall back to the
/// tuned defaults; command-line flags override whatever the file says.

use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Command line ──

#[derive(Parser, Debug, Default)]
#[command(name = "kukaroo", version, about = "Kukaroo! — flap a canary through twenty rooms")]
pub struct Args {
    /// Explicit config file (skips the search path)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding sprites, sounds and Level<N>.png bitmaps
    #[arg(long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Disable sound effects
    #[arg(long)]
    pub no_sound: bool,

    /// Disable background music
    #[arg(long)]
    pub no_music: bool,

    /// Hazards no longer reset the player
    #[arg(long)]
    pub invincible: bool,
}

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub assets_dir: PathBuf,
    pub fps: u32,
    pub final_level: i32,
    pub log_file: PathBuf,
    pub invincible: bool,
    pub physics: PhysicsConfig,
    pub audio: AudioConfig,
    pub gamepad: GamepadConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub gravity: f64,
    pub flap_impulse: f64,
    pub walk_speed: f64,
    pub release_damping: f64,
    pub saw_speed: f64,
    pub fall_speed: f64,
    pub fall_trigger: f64,
    pub feather_lifetime: u32,
}

#[derive(Clone, Debug)]
pub struct AudioConfig {
    pub sound: bool,
    pub music: bool,
    pub flap_volume: f32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub flap: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub reload: Vec<String>,
    pub pause: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    physics: TomlPhysics,
    #[serde(default)]
    audio: TomlAudio,
    #[serde(default)]
    cheats: TomlCheats,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_assets_dir")]
    assets_dir: String,
    #[serde(default = "default_fps")]
    fps: u32,
    #[serde(default = "default_final_level")]
    final_level: i32,
    #[serde(default = "default_log_file")]
    log_file: String,
}

#[derive(Deserialize, Debug)]
struct TomlPhysics {
    #[serde(default = "default_gravity")]
    gravity: f64,
    #[serde(default = "default_flap_impulse")]
    flap_impulse: f64,
    #[serde(default = "default_walk_speed")]
    walk_speed: f64,
    #[serde(default = "default_release_damping")]
    release_damping: f64,
    #[serde(default = "default_saw_speed")]
    saw_speed: f64,
    #[serde(default = "default_fall_speed")]
    fall_speed: f64,
    #[serde(default = "default_fall_trigger")]
    fall_trigger: f64,
    #[serde(default = "default_feather_lifetime")]
    feather_lifetime: u32,
}

#[derive(Deserialize, Debug)]
struct TomlAudio {
    #[serde(default = "default_true")]
    sound: bool,
    #[serde(default = "default_true")]
    music: bool,
    #[serde(default = "default_flap_volume")]
    flap_volume: f32,
}

#[derive(Deserialize, Debug, Default)]
struct TomlCheats {
    #[serde(default)]
    invincible: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_flap")]
    flap: Vec<String>,
    #[serde(default = "default_pad_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_pad_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pad_reload")]
    reload: Vec<String>,
    #[serde(default = "default_pad_pause")]
    pause: Vec<String>,
}

// ── Defaults ──

fn default_assets_dir() -> String { "Content".into() }
fn default_fps() -> u32 { 60 }
fn default_final_level() -> i32 { 20 }
fn default_log_file() -> String { "kukaroo.log".into() }

fn default_gravity() -> f64 { 0.08 }
fn default_flap_impulse() -> f64 { -2.5 }
fn default_walk_speed() -> f64 { 2.0 }
fn default_release_damping() -> f64 { 0.5 }
fn default_saw_speed() -> f64 { 2.0 }
fn default_fall_speed() -> f64 { 9.0 }
fn default_fall_trigger() -> f64 { 40.0 }
fn default_feather_lifetime() -> u32 { 250 }

fn default_true() -> bool { true }
fn default_flap_volume() -> f32 { 0.2 }

fn default_pad_flap() -> Vec<String> { vec!["A".into(), "X".into()] }
fn default_pad_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_pad_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_pad_reload() -> Vec<String> { vec!["Y".into()] }
fn default_pad_pause() -> Vec<String> { vec!["B".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            assets_dir: default_assets_dir(),
            fps: default_fps(),
            final_level: default_final_level(),
            log_file: default_log_file(),
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        TomlPhysics {
            gravity: default_gravity(),
            flap_impulse: default_flap_impulse(),
            walk_speed: default_walk_speed(),
            release_damping: default_release_damping(),
            saw_speed: default_saw_speed(),
            fall_speed: default_fall_speed(),
            fall_trigger: default_fall_trigger(),
            feather_lifetime: default_feather_lifetime(),
        }
    }
}

impl Default for TomlAudio {
    fn default() -> Self {
        TomlAudio {
            sound: true,
            music: true,
            flap_volume: default_flap_volume(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            flap: default_pad_flap(),
            confirm: default_pad_confirm(),
            cancel: default_pad_cancel(),
            reload: default_pad_reload(),
            pause: default_pad_pause(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        physics_from(TomlPhysics::default())
    }
}

fn physics_from(p: TomlPhysics) -> PhysicsConfig {
    PhysicsConfig {
        gravity: p.gravity,
        flap_impulse: p.flap_impulse,
        walk_speed: p.walk_speed,
        release_damping: p.release_damping,
        saw_speed: p.saw_speed,
        fall_speed: p.fall_speed,
        fall_trigger: p.fall_trigger,
        feather_lifetime: p.feather_lifetime,
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config, then apply command-line overrides.
    /// Search order: (1) `--config`, (2) exe directory, (3) current working directory.
    pub fn load(args: &Args) -> Self {
        let search_dirs = candidate_dirs();

        let toml_cfg = match &args.config {
            Some(path) => read_toml(path).unwrap_or_default(),
            None => load_toml(&search_dirs),
        };

        let mut config = Self::from_toml(toml_cfg, &search_dirs);

        if let Some(dir) = &args.assets {
            config.assets_dir = dir.clone();
        }
        if args.no_sound {
            config.audio.sound = false;
        }
        if args.no_music {
            config.audio.music = false;
        }
        if args.invincible {
            config.invincible = true;
        }
        config
    }

    /// Parse a config document directly. Unknown keys are ignored.
    #[cfg(test)]
    fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::from_toml(cfg, &[]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        GameConfig {
            assets_dir: resolve_dir(&cfg.general.assets_dir, search_dirs),
            fps: cfg.general.fps.max(1),
            final_level: cfg.general.final_level,
            log_file: PathBuf::from(cfg.general.log_file),
            invincible: cfg.cheats.invincible,
            physics: physics_from(cfg.physics),
            audio: AudioConfig {
                sound: cfg.audio.sound,
                music: cfg.audio.music,
                flap_volume: cfg.audio.flap_volume.clamp(0.0, 1.0),
            },
            gamepad: GamepadConfig {
                flap: cfg.gamepad.flap,
                confirm: cfg.gamepad.confirm,
                cancel: cfg.gamepad.cancel,
                reload: cfg.gamepad.reload,
                pause: cfg.gamepad.pause,
            },
        }
    }
}

/// Absolute paths are taken as-is; relative ones are looked up next to the
/// executable first, then in the CWD.
fn resolve_dir(dir: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        return path;
    }
    search_dirs.iter()
        .map(|d| d.join(dir))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            if let Some(cfg) = read_toml(&path) {
                return cfg;
            }
        }
    }
    TomlConfig::default()
}

// Runs before the terminal switches to raw mode, so warnings go to stderr.
fn read_toml(path: &Path) -> Option<TomlConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str::<TomlConfig>(&text) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                eprintln!("Warning: {} parse error: {e}", path.display());
                eprintln!("Using default settings.");
                Some(TomlConfig::default())
            }
        },
        Err(e) => {
            eprintln!("Warning: could not read {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_tuned_defaults() {
        let cfg = GameConfig::parse("").unwrap();
        assert_eq!(cfg.fps, 60);
        assert_eq!(cfg.final_level, 20);
        assert_eq!(cfg.physics, PhysicsConfig::default());
        assert!((cfg.physics.gravity - 0.08).abs() < 1e-12);
        assert!((cfg.physics.flap_impulse + 2.5).abs() < 1e-12);
        assert_eq!(cfg.physics.feather_lifetime, 250);
        assert!(cfg.audio.sound && cfg.audio.music);
        assert!(!cfg.invincible);
        assert_eq!(cfg.assets_dir, PathBuf::from("Content"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = GameConfig::parse(
            "[physics]\ngravity = 0.1\n\n[audio]\nmusic = false\nflap_volume = 3.0\n\n[cheats]\ninvincible = true\n",
        )
        .unwrap();
        assert!((cfg.physics.gravity - 0.1).abs() < 1e-12);
        assert!((cfg.physics.walk_speed - 2.0).abs() < 1e-12);
        assert!(cfg.audio.sound);
        assert!(!cfg.audio.music);
        assert_eq!(cfg.audio.flap_volume, 1.0);
        assert!(cfg.invincible);
    }

    #[test]
    fn zero_fps_is_clamped() {
        let cfg = GameConfig::parse("[general]\nfps = 0\n").unwrap();
        assert_eq!(cfg.fps, 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::parse("[physics]\ngravity = \"fast\"\n").is_err());
    }

    #[test]
    fn cli_flags_override_file() {
        let args = Args {
            config: Some(PathBuf::from("/nonexistent/kukaroo/config.toml")),
            assets: Some(PathBuf::from("/tmp/kukaroo-assets")),
            no_sound: true,
            no_music: true,
            invincible: true,
        };
        let cfg = GameConfig::load(&args);
        assert_eq!(cfg.assets_dir, PathBuf::from("/tmp/kukaroo-assets"));
        assert!(!cfg.audio.sound);
        assert!(!cfg.audio.music);
        assert!(cfg.invincible);
    }
}

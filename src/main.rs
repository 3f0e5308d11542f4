/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::io;
use std::time::{Duration, Instant};

use clap::Parser;
use env_logger::{Builder, Env, Target};

use config::{Args, GameConfig};
use error::GameError;
use sim::event::GameEvent;
use sim::level::{load_level, LevelLibrary};
use sim::step;
use sim::world::WorldState;
use ui::assets::Sprites;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

fn main() {
    let args = Args::parse();
    let config = GameConfig::load(&args);
    init_logging(&config);
    log::info!("starting with {config:?}");

    if let Err(e) = run(&config) {
        log::error!("{e}");
        eprintln!("kukaroo: {e}");
        std::process::exit(1);
    }
}

/// The terminal belongs to the game while it runs, so log lines go to a file.
fn init_logging(config: &GameConfig) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    match File::create(&config.log_file) {
        Ok(file) => builder.target(Target::Pipe(Box::new(file))),
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {e}", config.log_file.display());
            builder.target(Target::Pipe(Box::new(io::sink())))
        }
    };
    builder.init();
}

fn run(config: &GameConfig) -> Result<(), GameError> {
    let sprites = Sprites::load(&config.assets_dir)?;
    let mut library = LevelLibrary::from_dir(config.assets_dir.clone());

    let mut world = WorldState::new(rand::random());
    world.final_level = config.final_level;
    world.invincible = config.invincible;
    world.physics = config.physics.clone();
    load_level(&mut world, &mut library)?;

    let sound = SoundEngine::new(&config.assets_dir, &config.audio);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        let _ = renderer.cleanup();
        return Err(e.into());
    }

    let result = game_loop(&mut world, &mut library, &sprites, &mut renderer, sound.as_ref(), config);

    // Restore the terminal before any error reaches the user.
    let cleanup = renderer.cleanup();
    result?;
    cleanup?;

    log::info!("quit at level {} after {} frames", world.level, world.frame);
    Ok(())
}

fn game_loop(
    world: &mut WorldState,
    library: &mut LevelLibrary,
    sprites: &Sprites,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), GameError> {
    let mut kb = InputState::new();
    kb.honor_release = renderer.keyboard_enhanced();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        log::info!("gamepad detected");
    }

    let frame_time = Duration::from_secs_f64(1.0 / config.fps as f64);
    let mut input = Vec::with_capacity(16);

    loop {
        let frame_start = Instant::now();

        input.clear();
        kb.drain_events(&mut input);
        gp.update(&mut input);

        let events = step::step(world, &input, library)?;
        process_events(world, sound, &events);
        if events.contains(&GameEvent::QuitRequested) {
            break;
        }

        renderer.render(world, sprites)?;

        if let Some(rest) = frame_time.checked_sub(frame_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    Ok(())
}

fn process_events(world: &WorldState, sound: Option<&SoundEngine>, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Flapped => {
                if let Some(sfx) = sound {
                    sfx.play_flap();
                }
            }
            GameEvent::GameStarted { level } => log::info!("playing from level {level}"),
            GameEvent::ReturnedToMenu => log::info!("back to menu"),
            GameEvent::PlayerKilled { by } => log::info!("level {}: killed by {by}", world.level),
            GameEvent::BorderCrossed { from, to } => log::info!("border crossed: level {from} -> {to}"),
            GameEvent::LevelReloaded { level } => log::info!("level {level} reloaded"),
            GameEvent::InvincibilityToggled { on } => {
                log::info!("invincibility {}", if *on { "on" } else { "off" })
            }
            GameEvent::GameFinished => log::info!("run finished after {} frames", world.frame),
            GameEvent::QuitRequested => {}
        }
    }
}

/// Events emitted during a frame.
/// The presentation layer consumes these for sound and logging.

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    GameStarted { level: i32 },
    ReturnedToMenu,
    Flapped,
    PlayerKilled { by: &'static str },
    BorderCrossed { from: i32, to: i32 },
    LevelReloaded { level: i32 },
    InvincibilityToggled { on: bool },
    GameFinished,
    QuitRequested,
}

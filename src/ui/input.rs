/// Keyboard input tracker.
///
/// Turns raw terminal key events into edge-triggered `InputEvent`s:
///   - `Pressed` once when a move key goes from "not held" to "held"
///   - `Released` on an explicit release, or after a hold timeout
///   - `Pressed` on every key-down for one-shot actions (flap, reload, ...)
///   - `Quit` on Escape or Ctrl+C
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::{Action, InputEvent};

/// After this duration without a Press/Repeat event, consider the key released.
/// Long enough to bridge the autorepeat delay of a typical terminal.
const HOLD_TIMEOUT: Duration = Duration::from_millis(550);

pub fn action_for(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Char('a' | 'A') | KeyCode::Left => Some(Action::Left),
        KeyCode::Char('d' | 'D') | KeyCode::Right => Some(Action::Right),
        KeyCode::Char(' ') | KeyCode::Up => Some(Action::Flap),
        KeyCode::Enter => Some(Action::Start),
        KeyCode::Char('n' | 'N') => Some(Action::Reload),
        KeyCode::Char('p' | 'P') => Some(Action::Pause),
        KeyCode::Backspace => Some(Action::ToggleInvincible),
        _ => None,
    }
}

/// Only movement is tracked as held; everything else fires per key-down.
fn is_held(action: Action) -> bool {
    matches!(action, Action::Left | Action::Right)
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each held action.
    last_active: HashMap<Action, Instant>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events into `out`.
    /// Call this once per frame, before the simulation step.
    pub fn drain_events(&mut self, out: &mut Vec<InputEvent>) {
        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.handle_key(key, Instant::now(), out);
            }
        }
        self.expire(Instant::now(), out);
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant, out: &mut Vec<InputEvent>) {
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c' | 'C'));
        if key.kind != KeyEventKind::Release && (ctrl_c || key.code == KeyCode::Esc) {
            out.push(InputEvent::Quit);
            return;
        }

        let Some(action) = action_for(key.code) else { return };

        if !is_held(action) {
            if key.kind == KeyEventKind::Press {
                out.push(InputEvent::Pressed(action));
            }
            return;
        }

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                if self.last_active.remove(&action).is_some() {
                    out.push(InputEvent::Released(action));
                }
            }
            KeyEventKind::Release => {
                // Ignore release when enhancement not confirmed;
                // rely on timeout-based expiry instead
            }
            _ => {
                if self.last_active.insert(action, now).is_none() {
                    out.push(InputEvent::Pressed(action));
                }
            }
        }
    }

    /// Release actions that have timed out (fallback for terminals without Release).
    fn expire(&mut self, now: Instant, out: &mut Vec<InputEvent>) {
        let stale: Vec<Action> = self
            .last_active
            .iter()
            .filter(|(_, t)| now.duration_since(**t) >= HOLD_TIMEOUT)
            .map(|(a, _)| *a)
            .collect();
        for action in stale {
            self.last_active.remove(&action);
            out.push(InputEvent::Released(action));
        }
    }
}

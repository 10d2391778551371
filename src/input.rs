//! Keyboard input with DAS (Delayed Auto Shift) and ARR (Auto Repeat Rate)
//!
//! Terminals rarely report key releases, so a held key is considered released
//! once its repeat events stop arriving.

use crate::game::Action;
use crate::settings::Settings;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, ModifierKeyCode};
use std::time::{Duration, Instant};

/// Time after which we consider a key "released" if no repeat received
const KEY_TIMEOUT: Duration = Duration::from_millis(100);

/// Actions that auto-repeat while held
const REPEATING: [Action; 3] = [Action::MoveLeft, Action::MoveRight, Action::SoftDrop];

#[derive(Debug, Clone)]
struct Held {
    first_press: Instant,
    last_seen: Instant,
    last_fire: Option<Instant>,
}

impl Held {
    fn new(now: Instant) -> Self {
        Self {
            first_press: now,
            last_seen: now,
            last_fire: None,
        }
    }

    /// True when the key should fire again at `now`
    fn repeat_due(&mut self, now: Instant, das: Duration, arr: Duration) -> bool {
        if now.duration_since(self.first_press) < das {
            return false;
        }
        let due = match self.last_fire {
            None => true,
            Some(last) => now.duration_since(last) >= arr,
        };
        if due {
            self.last_fire = Some(now);
        }
        due
    }
}

/// Key bindings resolved to key codes - several keys per action
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: Vec<(Action, Vec<KeyCode>)>,
}

impl KeyBindings {
    /// Parse a key name into a KeyCode
    fn parse_key(name: &str) -> Option<KeyCode> {
        let lower = name.to_lowercase();
        let code = match lower.as_str() {
            "left" => KeyCode::Left,
            "right" => KeyCode::Right,
            "up" => KeyCode::Up,
            "down" => KeyCode::Down,
            "space" => KeyCode::Char(' '),
            "enter" => KeyCode::Enter,
            "tab" => KeyCode::Tab,
            "backspace" => KeyCode::Backspace,
            "esc" | "escape" => KeyCode::Esc,
            "shift" => KeyCode::Modifier(ModifierKeyCode::LeftShift),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => return None,
                }
            }
        };
        Some(code)
    }

    /// Parse a list of key names, skipping ones we don't recognise
    fn parse_keys(names: &[String]) -> Vec<KeyCode> {
        names
            .iter()
            .filter_map(|name| {
                let code = Self::parse_key(name);
                if code.is_none() {
                    tracing::warn!("Unknown key name {:?} in settings", name);
                }
                code
            })
            .collect()
    }

    /// Create keybindings from settings
    pub fn from_settings(settings: &Settings) -> Self {
        let keys = &settings.keys;
        Self {
            bindings: vec![
                (Action::MoveLeft, Self::parse_keys(&keys.move_left)),
                (Action::MoveRight, Self::parse_keys(&keys.move_right)),
                (Action::SoftDrop, Self::parse_keys(&keys.soft_drop)),
                (Action::HardDrop, Self::parse_keys(&keys.hard_drop)),
                (Action::Rotate, Self::parse_keys(&keys.rotate)),
                (Action::Pause, Self::parse_keys(&keys.pause)),
                (Action::Restart, Self::parse_keys(&keys.restart)),
                (Action::Quit, Self::parse_keys(&keys.quit)),
            ],
        }
    }

    /// Action bound to a key, first binding wins
    pub fn action_for(&self, code: KeyCode) -> Option<Action> {
        self.bindings
            .iter()
            .find(|(_, codes)| codes.contains(&code))
            .map(|(action, _)| *action)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Input handler with DAS/ARR support
pub struct InputHandler {
    /// One slot per entry in `REPEATING`
    held: [Option<Held>; 3],
    bindings: KeyBindings,
    das: Duration,
    arr: Duration,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::from_settings(&Settings::default())
    }

    /// Create input handler from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            held: [None, None, None],
            bindings: KeyBindings::from_settings(settings),
            das: Duration::from_millis(settings.gameplay.das_ms),
            arr: Duration::from_millis(settings.gameplay.arr_ms),
        }
    }

    /// Handle a key press event - returns immediate actions
    pub fn key_down(&mut self, key: KeyEvent) -> Vec<Action> {
        self.key_down_at(key, Instant::now())
    }

    fn key_down_at(&mut self, key: KeyEvent, now: Instant) -> Vec<Action> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Action::Quit];
        }

        let Some(action) = self.bindings.action_for(normalize_key(key.code)) else {
            return Vec::new();
        };

        let Some(slot) = REPEATING.iter().position(|&a| a == action) else {
            return vec![action];
        };

        // Left and right cancel each other
        match action {
            Action::MoveLeft => self.held[1] = None,
            Action::MoveRight => self.held[0] = None,
            _ => {}
        }

        match &mut self.held[slot] {
            Some(held) => {
                // Terminal key repeat; DAS/ARR in `update` decides when to fire
                held.last_seen = now;
                Vec::new()
            }
            empty => {
                *empty = Some(Held::new(now));
                vec![action]
            }
        }
    }

    /// Handle a key release event (only some terminals send these)
    pub fn key_up(&mut self, key: KeyEvent) {
        if let Some(action) = self.bindings.action_for(normalize_key(key.code)) {
            if let Some(slot) = REPEATING.iter().position(|&a| a == action) {
                self.held[slot] = None;
            }
        }
    }

    /// Update held keys and return repeat actions (call every frame)
    pub fn update(&mut self) -> Vec<Action> {
        self.update_at(Instant::now())
    }

    fn update_at(&mut self, now: Instant) -> Vec<Action> {
        let (das, arr) = (self.das, self.arr);
        let mut actions = Vec::new();

        for (slot, action) in REPEATING.iter().enumerate() {
            let timed_out = self.held[slot]
                .as_ref()
                .is_some_and(|held| now.duration_since(held.last_seen) > KEY_TIMEOUT);
            if timed_out {
                self.held[slot] = None;
            }

            if let Some(held) = &mut self.held[slot] {
                if held.repeat_due(now, das, arr) {
                    actions.push(*action);
                }
            }
        }

        actions
    }

    /// Clear all held keys (useful for pause/resume)
    pub fn clear(&mut self) {
        self.held = [None, None, None];
    }
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize key codes for consistent handling
fn normalize_key(code: KeyCode) -> KeyCode {
    match code {
        KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
        other => other,
    }
}

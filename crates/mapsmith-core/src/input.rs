//! Pointer and keyboard events delivered by the host UI.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    Scroll { position: Point, delta: Vec2 },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Scroll { position, .. } => position,
        }
    }
}

/// Keyboard event, keyed by the host's key name (`"Escape"`, `"Enter"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME_MS: u128 = 500;
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Pointer and keyboard state between events.
#[derive(Debug, Clone)]
pub struct InputState {
    /// Current pointer position in screen coordinates.
    pub pointer_position: Point,
    /// Pointer position before the last event.
    pub previous_pointer_position: Point,
    pressed_buttons: HashSet<MouseButton>,
    pressed_keys: HashSet<String>,
    pub modifiers: Modifiers,
    /// Screen position where the current left-button drag started.
    pub drag_start: Option<Point>,
    last_click: Option<(Instant, Point)>,
    double_click: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            pointer_position: Point::ZERO,
            previous_pointer_position: Point::ZERO,
            pressed_buttons: HashSet::new(),
            pressed_keys: HashSet::new(),
            modifiers: Modifiers::default(),
            drag_start: None,
            last_click: None,
            double_click: false,
        }
    }
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        self.previous_pointer_position = self.pointer_position;
        self.pointer_position = event.position();
        self.double_click = false;

        match event {
            PointerEvent::Down { position, button } => {
                self.pressed_buttons.insert(button);
                if button == MouseButton::Left {
                    self.track_click(position, Instant::now());
                    self.drag_start = Some(position);
                }
            }
            PointerEvent::Up { button, .. } => {
                self.pressed_buttons.remove(&button);
                if button == MouseButton::Left {
                    self.drag_start = None;
                }
            }
            PointerEvent::Move { .. } | PointerEvent::Scroll { .. } => {}
        }
    }

    fn track_click(&mut self, position: Point, now: Instant) {
        let is_double = self.last_click.is_some_and(|(time, last)| {
            now.duration_since(time).as_millis() < DOUBLE_CLICK_TIME_MS
                && (position - last).hypot() < DOUBLE_CLICK_DISTANCE
        });
        if is_double {
            self.double_click = true;
            // A third click starts over.
            self.last_click = None;
        } else {
            self.last_click = Some((now, position));
        }
    }

    /// Record a key event.
    pub fn handle_key_event(&mut self, event: &KeyEvent) {
        match event {
            KeyEvent::Pressed(key) => {
                self.pressed_keys.insert(key.clone());
            }
            KeyEvent::Released(key) => {
                self.pressed_keys.remove(key);
            }
        }
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    /// Whether the last pointer-down completed a double click.
    pub fn is_double_click(&self) -> bool {
        self.double_click
    }

    /// Pointer movement caused by the last event.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_position - self.previous_pointer_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(x: f64, y: f64) -> PointerEvent {
        PointerEvent::Down {
            position: Point::new(x, y),
            button: MouseButton::Left,
        }
    }

    #[test]
    fn test_button_tracking() {
        let mut input = InputState::new();
        input.handle_pointer_event(down(10.0, 20.0));
        assert!(input.is_button_pressed(MouseButton::Left));
        assert_eq!(input.drag_start, Some(Point::new(10.0, 20.0)));

        input.handle_pointer_event(PointerEvent::Move {
            position: Point::new(15.0, 22.0),
        });
        assert_eq!(input.pointer_delta(), Vec2::new(5.0, 2.0));

        input.handle_pointer_event(PointerEvent::Up {
            position: Point::new(15.0, 22.0),
            button: MouseButton::Left,
        });
        assert!(!input.is_button_pressed(MouseButton::Left));
        assert_eq!(input.drag_start, None);
    }

    #[test]
    fn test_double_click_detection() {
        let mut input = InputState::new();
        input.handle_pointer_event(down(100.0, 100.0));
        assert!(!input.is_double_click());
        input.handle_pointer_event(down(101.0, 101.0));
        assert!(input.is_double_click());
        // Cleared by the next event.
        input.handle_pointer_event(PointerEvent::Move {
            position: Point::new(101.0, 101.0),
        });
        assert!(!input.is_double_click());
    }

    #[test]
    fn test_double_click_too_far() {
        let mut input = InputState::new();
        input.handle_pointer_event(down(100.0, 100.0));
        input.handle_pointer_event(down(200.0, 200.0));
        assert!(!input.is_double_click());
    }

    #[test]
    fn test_key_tracking() {
        let mut input = InputState::new();
        input.handle_key_event(&KeyEvent::Pressed("Shift".into()));
        assert!(input.is_key_pressed("Shift"));
        input.handle_key_event(&KeyEvent::Released("Shift".into()));
        assert!(!input.is_key_pressed("Shift"));
    }
}

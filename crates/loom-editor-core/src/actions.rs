//! Key events and editor actions.
//!
//! Platform-agnostic definitions for keyboard input. Hosts convert native key
//! events into [`KeyEvent`]s; [`EditorAction::from_key`] maps them onto the
//! semantic operations the handlers understand.

use smol_str::SmolStr;

/// Key values for keyboard input.
///
/// Only keys the engine reacts to are named; everything else arrives as
/// `Character` or `Unidentified` and passes through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key.
    Character(SmolStr),

    /// Unknown/unidentified key.
    Unidentified,

    Backspace,
    Enter,
    Tab,

    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

impl Key {
    /// Create a character key.
    pub fn character(s: impl Into<SmolStr>) -> Self {
        Self::Character(s.into())
    }

    /// Arrow direction, if this is an arrow key.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Self::ArrowLeft => Some(Direction::Left),
            Self::ArrowRight => Some(Direction::Right),
            Self::ArrowUp => Some(Direction::Up),
            Self::ArrowDown => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Arrow key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

/// Modifier key state for a key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self::held(false, false, false, false);
    pub const CTRL: Self = Self::held(true, false, false, false);
    pub const SHIFT: Self = Self::held(false, false, true, false);
    pub const META: Self = Self::held(false, false, false, true);

    const fn held(ctrl: bool, alt: bool, shift: bool, meta: bool) -> Self {
        Self {
            ctrl,
            alt,
            shift,
            meta,
        }
    }

    /// Get the primary modifier for the platform (Cmd on Mac, Ctrl elsewhere).
    pub fn primary(is_mac: bool) -> Self {
        if is_mac { Self::META } else { Self::CTRL }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Ctrl or Meta held, regardless of platform.
    pub fn has_primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    pub fn ctrl(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::CTRL)
    }

    pub fn shift(key: Key) -> Self {
        Self::with_modifiers(key, Modifiers::SHIFT)
    }

    pub fn primary(key: Key, is_mac: bool) -> Self {
        Self::with_modifiers(key, Modifiers::primary(is_mac))
    }
}

/// A keydown as delivered by the host.
pub type KeyEvent = KeyCombo;

/// Result of handling a keydown event.
#[derive(Debug, Clone, PartialEq)]
pub enum KeydownResult {
    /// Event was handled, prevent default.
    Handled,
    /// Event was not a keybinding, let platform handle it.
    NotHandled,
    /// Event should be passed through (navigation, etc.).
    PassThrough,
}

/// Semantic editing operations a key can trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    /// Enter: split the current block.
    InsertBreak,
    /// Shift+Enter: a line break inside the current block.
    InsertLineBreak,
    /// Ctrl/Cmd+Enter: structural break (new table row, exit a list).
    ForceBreak,
    /// Backspace.
    DeleteBackward,
    Move(Direction),
    Indent,
    Outdent,
    Insert(SmolStr),
}

impl EditorAction {
    /// Map a key event onto an action. Keys the engine does not own yield
    /// `None` and pass through to the host.
    pub fn from_key(event: &KeyEvent) -> Option<Self> {
        let mods = event.modifiers;
        match &event.key {
            Key::Enter if mods.has_primary() => Some(Self::ForceBreak),
            Key::Enter if mods.shift => Some(Self::InsertLineBreak),
            Key::Enter => Some(Self::InsertBreak),
            Key::Backspace if mods.is_none() || mods == Modifiers::SHIFT => {
                Some(Self::DeleteBackward)
            }
            Key::Tab if mods == Modifiers::SHIFT => Some(Self::Outdent),
            Key::Tab if mods.is_none() => Some(Self::Indent),
            key if key.direction().is_some() && !mods.shift && !mods.alt && !mods.has_primary() => {
                key.direction().map(Self::Move)
            }
            Key::Character(text) if !mods.has_primary() && !mods.alt => {
                Some(Self::Insert(text.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_variants() {
        assert_eq!(
            EditorAction::from_key(&KeyCombo::new(Key::Enter)),
            Some(EditorAction::InsertBreak)
        );
        assert_eq!(
            EditorAction::from_key(&KeyCombo::shift(Key::Enter)),
            Some(EditorAction::InsertLineBreak)
        );
        assert_eq!(
            EditorAction::from_key(&KeyCombo::primary(Key::Enter, true)),
            Some(EditorAction::ForceBreak)
        );
    }

    #[test]
    fn test_shift_arrow_is_not_ours() {
        assert_eq!(EditorAction::from_key(&KeyCombo::shift(Key::ArrowLeft)), None);
        assert_eq!(
            EditorAction::from_key(&KeyCombo::new(Key::ArrowUp)),
            Some(EditorAction::Move(Direction::Up))
        );
    }

    #[test]
    fn test_primary_character_passes_through() {
        assert_eq!(EditorAction::from_key(&KeyCombo::ctrl(Key::character("b"))), None);
        assert_eq!(
            EditorAction::from_key(&KeyCombo::new(Key::character("x"))),
            Some(EditorAction::Insert("x".into()))
        );
    }
}

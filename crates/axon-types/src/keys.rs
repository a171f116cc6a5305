//! Canonical keyboard key codes and symbolic-name translation.
//!
//! Every keyboard backend maps its native scancodes onto this enum. Keybind
//! files store keys by symbolic name; movies store them by numeric code.
//! Codes follow the classic SDL1-style keysym values, so the numeric forms
//! stay stable across backends.

use serde::{Deserialize, Serialize};

/// A platform-agnostic keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum Key {
    #[default]
    None = 0,
    Backspace = 8,
    Tab = 9,
    Return = 13,
    Pause = 19,
    Escape = 27,
    Space = 32,
    Quote = 39,
    Comma = 44,
    Minus = 45,
    Period = 46,
    Slash = 47,
    Num0 = 48,
    Num1 = 49,
    Num2 = 50,
    Num3 = 51,
    Num4 = 52,
    Num5 = 53,
    Num6 = 54,
    Num7 = 55,
    Num8 = 56,
    Num9 = 57,
    Semicolon = 59,
    Equals = 61,
    LeftBracket = 91,
    Backslash = 92,
    RightBracket = 93,
    Backquote = 96,
    A = 97,
    B = 98,
    C = 99,
    D = 100,
    E = 101,
    F = 102,
    G = 103,
    H = 104,
    I = 105,
    J = 106,
    K = 107,
    L = 108,
    M = 109,
    N = 110,
    O = 111,
    P = 112,
    Q = 113,
    R = 114,
    S = 115,
    T = 116,
    U = 117,
    V = 118,
    W = 119,
    X = 120,
    Y = 121,
    Z = 122,
    Delete = 127,
    Kp0 = 256,
    Kp1 = 257,
    Kp2 = 258,
    Kp3 = 259,
    Kp4 = 260,
    Kp5 = 261,
    Kp6 = 262,
    Kp7 = 263,
    Kp8 = 264,
    Kp9 = 265,
    KpPeriod = 266,
    KpDivide = 267,
    KpMultiply = 268,
    KpMinus = 269,
    KpPlus = 270,
    KpEnter = 271,
    Up = 273,
    Down = 274,
    Right = 275,
    Left = 276,
    Insert = 277,
    Home = 278,
    End = 279,
    PageUp = 280,
    PageDown = 281,
    F1 = 282,
    F2 = 283,
    F3 = 284,
    F4 = 285,
    F5 = 286,
    F6 = 287,
    F7 = 288,
    F8 = 289,
    F9 = 290,
    F10 = 291,
    F11 = 292,
    F12 = 293,
    RShift = 303,
    LShift = 304,
    RCtrl = 305,
    LCtrl = 306,
    RAlt = 307,
    LAlt = 308,
}

/// Symbolic names used by the keybind/remap text form, in code order.
static KEY_NAMES: &[(Key, &str)] = &[
    (Key::None, "nul"),
    (Key::Backspace, "backspace"),
    (Key::Tab, "tab"),
    (Key::Return, "enter"),
    (Key::Pause, "pause"),
    (Key::Escape, "escape"),
    (Key::Space, "space"),
    (Key::Quote, "quote"),
    (Key::Comma, "comma"),
    (Key::Minus, "minus"),
    (Key::Period, "period"),
    (Key::Slash, "slash"),
    (Key::Num0, "num0"),
    (Key::Num1, "num1"),
    (Key::Num2, "num2"),
    (Key::Num3, "num3"),
    (Key::Num4, "num4"),
    (Key::Num5, "num5"),
    (Key::Num6, "num6"),
    (Key::Num7, "num7"),
    (Key::Num8, "num8"),
    (Key::Num9, "num9"),
    (Key::Semicolon, "semicolon"),
    (Key::Equals, "equals"),
    (Key::LeftBracket, "leftbracket"),
    (Key::Backslash, "backslash"),
    (Key::RightBracket, "rightbracket"),
    (Key::Backquote, "backquote"),
    (Key::A, "a"),
    (Key::B, "b"),
    (Key::C, "c"),
    (Key::D, "d"),
    (Key::E, "e"),
    (Key::F, "f"),
    (Key::G, "g"),
    (Key::H, "h"),
    (Key::I, "i"),
    (Key::J, "j"),
    (Key::K, "k"),
    (Key::L, "l"),
    (Key::M, "m"),
    (Key::N, "n"),
    (Key::O, "o"),
    (Key::P, "p"),
    (Key::Q, "q"),
    (Key::R, "r"),
    (Key::S, "s"),
    (Key::T, "t"),
    (Key::U, "u"),
    (Key::V, "v"),
    (Key::W, "w"),
    (Key::X, "x"),
    (Key::Y, "y"),
    (Key::Z, "z"),
    (Key::Delete, "del"),
    (Key::Kp0, "keypad0"),
    (Key::Kp1, "keypad1"),
    (Key::Kp2, "keypad2"),
    (Key::Kp3, "keypad3"),
    (Key::Kp4, "keypad4"),
    (Key::Kp5, "keypad5"),
    (Key::Kp6, "keypad6"),
    (Key::Kp7, "keypad7"),
    (Key::Kp8, "keypad8"),
    (Key::Kp9, "keypad9"),
    (Key::KpPeriod, "kp_period"),
    (Key::KpDivide, "kp_divide"),
    (Key::KpMultiply, "kp_multiply"),
    (Key::KpMinus, "kp_minus"),
    (Key::KpPlus, "kp_plus"),
    (Key::KpEnter, "kp_enter"),
    (Key::Up, "up"),
    (Key::Down, "down"),
    (Key::Right, "right"),
    (Key::Left, "left"),
    (Key::Insert, "insert"),
    (Key::Home, "home"),
    (Key::End, "end"),
    (Key::PageUp, "pageup"),
    (Key::PageDown, "pagedown"),
    (Key::F1, "f1"),
    (Key::F2, "f2"),
    (Key::F3, "f3"),
    (Key::F4, "f4"),
    (Key::F5, "f5"),
    (Key::F6, "f6"),
    (Key::F7, "f7"),
    (Key::F8, "f8"),
    (Key::F9, "f9"),
    (Key::F10, "f10"),
    (Key::F11, "f11"),
    (Key::F12, "f12"),
    (Key::RShift, "shift_r"),
    (Key::LShift, "shift"),
    (Key::RCtrl, "ctrl_r"),
    (Key::LCtrl, "ctrl"),
    (Key::RAlt, "alt_r"),
    (Key::LAlt, "alt"),
];

impl Key {
    /// Numeric code written into movie streams.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Look a key up by its numeric code. Unknown codes map to `None`.
    pub fn from_code(code: u32) -> Key {
        KEY_NAMES
            .iter()
            .find(|(k, _)| k.code() == code)
            .map(|(k, _)| *k)
            .unwrap_or(Key::None)
    }

    /// Symbolic name used by the keybind text form.
    pub fn name(self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, n)| *n)
            .unwrap_or("nul")
    }

    /// Translate a symbolic name to a key. Unknown names map to `None`.
    pub fn from_name(name: &str) -> Key {
        KEY_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(k, _)| *k)
            .unwrap_or(Key::None)
    }
}

/// Modifier key state, packed for the movie wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyMods(u16);

impl KeyMods {
    pub const NONE: KeyMods = KeyMods(0);
    pub const SHIFT: KeyMods = KeyMods(1 << 0);
    pub const CTRL: KeyMods = KeyMods(1 << 1);
    pub const ALT: KeyMods = KeyMods(1 << 2);
    pub const META: KeyMods = KeyMods(1 << 3);

    /// Raw bits as stored in a movie stream.
    pub fn bits(self) -> u16 {
        self.0
    }

    /// Reconstruct from raw movie bits.
    pub fn from_bits(bits: u16) -> KeyMods {
        KeyMods(bits)
    }

    pub fn contains(self, other: KeyMods) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: KeyMods) -> KeyMods {
        KeyMods(self.0 | other.0)
    }
}

/// A discrete keyboard transition, as delivered by a platform event source
/// and as serialized into movie streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// `true` for press, `false` for release.
    pub down: bool,
    /// Canonical key.
    pub key: Key,
    /// Unicode codepoint produced by the press, 0 if none.
    pub character: u32,
    /// Modifier state at the time of the event.
    pub mods: KeyMods,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        for (key, name) in KEY_NAMES {
            assert_eq!(Key::from_name(name), *key, "name {name}");
            assert_eq!(key.name(), *name);
        }
    }

    #[test]
    fn code_round_trip() {
        for (key, _) in KEY_NAMES {
            assert_eq!(Key::from_code(key.code()), *key);
        }
    }

    #[test]
    fn unknown_name_is_none() {
        assert_eq!(Key::from_name("hyper_mega_key"), Key::None);
    }

    #[test]
    fn unknown_code_is_none() {
        assert_eq!(Key::from_code(0xFFFF_FFFF), Key::None);
    }

    #[test]
    fn letter_codes_are_ascii() {
        assert_eq!(Key::A.code(), 'a' as u32);
        assert_eq!(Key::Z.code(), 'z' as u32);
        assert_eq!(Key::Num0.code(), '0' as u32);
    }

    #[test]
    fn mods_contain_and_combine() {
        let m = KeyMods::SHIFT.with(KeyMods::CTRL);
        assert!(m.contains(KeyMods::SHIFT));
        assert!(m.contains(KeyMods::CTRL));
        assert!(!m.contains(KeyMods::ALT));
        assert_eq!(KeyMods::from_bits(m.bits()), m);
    }

    #[test]
    fn key_event_equality() {
        let e = KeyEvent {
            down: true,
            key: Key::Return,
            character: '\r' as u32,
            mods: KeyMods::NONE,
        };
        assert_eq!(e, e);
    }
}

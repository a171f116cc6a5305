//! Bind identifiers, the static bind table, and keybind types.
//!
//! A *bind* is one logical action a player can trigger: a pad button, one
//! half of an analog axis, or a frontend hotkey. Binds are identified by
//! [`BindId`] and described by the static [`BIND_TABLE`], which carries the
//! config key stem and human label for each entry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::device::PointerButton;
use crate::error::AxonError;
use crate::keys::Key;

// ---- bind identifiers ----

/// Every bindable action, in wire order.
///
/// The first 16 discriminants match the classic pad button layout used by
/// the movie format and the port-level digital mask. Analog half-axes and
/// frontend hotkeys follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BindId {
    B = 0,
    Y = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
    A = 8,
    X = 9,
    L = 10,
    R = 11,
    L2 = 12,
    R2 = 13,
    L3 = 14,
    R3 = 15,
    LeftXPlus = 16,
    LeftXMinus = 17,
    LeftYPlus = 18,
    LeftYMinus = 19,
    RightXPlus = 20,
    RightXMinus = 21,
    RightYPlus = 22,
    RightYMinus = 23,
    TurboEnable = 24,
    EnableHotkey = 25,
    FastForwardToggle = 26,
    FastForwardHold = 27,
    LoadState = 28,
    SaveState = 29,
    Quit = 30,
    StateSlotPlus = 31,
    StateSlotMinus = 32,
    Rewind = 33,
    MovieRecordToggle = 34,
    PauseToggle = 35,
    FrameAdvance = 36,
    Reset = 37,
    Screenshot = 38,
    Mute = 39,
    GameFocusToggle = 40,
    OverlayNext = 41,
    MenuToggle = 42,
}

/// First hotkey entry; everything below it is a standard (core-visible) bind.
pub const FIRST_META: BindId = BindId::EnableHotkey;

impl BindId {
    /// Total number of bind entries.
    pub const COUNT: usize = 43;

    /// Number of digital pad buttons (the movie/digital-mask prefix).
    pub const PAD_BUTTONS: usize = 16;

    /// Index into [`BIND_TABLE`] and per-port bind arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`BindId::index`]. Out-of-range indices yield `None`.
    pub fn from_index(index: usize) -> Option<BindId> {
        BIND_TABLE.get(index).map(|d| d.id)
    }

    /// Directional pad entries. These never participate in turbo.
    pub fn is_dpad(self) -> bool {
        matches!(self, BindId::Up | BindId::Down | BindId::Left | BindId::Right)
    }

    /// Half-axis entries of the two analog sticks.
    pub fn is_analog(self) -> bool {
        self.index() >= BindId::LeftXPlus.index() && self.index() <= BindId::RightYMinus.index()
    }

    /// Frontend hotkeys, gated by the hotkey arbitrator.
    pub fn is_hotkey(self) -> bool {
        self.index() >= FIRST_META.index()
    }

    /// Digital pad buttons that a turbo modulator may pulse.
    pub fn is_turbo_eligible(self) -> bool {
        self.index() < Self::PAD_BUTTONS && !self.is_dpad()
    }
}

// ---- the bind table ----

/// Static description of one bind: config stem, label, and hotkey level.
#[derive(Debug, Clone, Copy)]
pub struct BindDescriptor {
    /// Config key stem, e.g. `"b"` yields `input_player1_b` style keys.
    pub base: &'static str,
    /// Human-readable label for logs and UIs.
    pub desc: &'static str,
    /// 0 = standard bind, 1 = hotkey, 2 = hotkey that acts while held.
    pub hotkey_level: u8,
    /// The identifier this row describes.
    pub id: BindId,
}

/// One row per [`BindId`], in `BindId` order.
pub static BIND_TABLE: &[BindDescriptor] = &[
    BindDescriptor { base: "b", desc: "B button (down)", hotkey_level: 0, id: BindId::B },
    BindDescriptor { base: "y", desc: "Y button (left)", hotkey_level: 0, id: BindId::Y },
    BindDescriptor { base: "select", desc: "Select button", hotkey_level: 0, id: BindId::Select },
    BindDescriptor { base: "start", desc: "Start button", hotkey_level: 0, id: BindId::Start },
    BindDescriptor { base: "up", desc: "D-pad up", hotkey_level: 0, id: BindId::Up },
    BindDescriptor { base: "down", desc: "D-pad down", hotkey_level: 0, id: BindId::Down },
    BindDescriptor { base: "left", desc: "D-pad left", hotkey_level: 0, id: BindId::Left },
    BindDescriptor { base: "right", desc: "D-pad right", hotkey_level: 0, id: BindId::Right },
    BindDescriptor { base: "a", desc: "A button (right)", hotkey_level: 0, id: BindId::A },
    BindDescriptor { base: "x", desc: "X button (top)", hotkey_level: 0, id: BindId::X },
    BindDescriptor { base: "l", desc: "L button (shoulder)", hotkey_level: 0, id: BindId::L },
    BindDescriptor { base: "r", desc: "R button (shoulder)", hotkey_level: 0, id: BindId::R },
    BindDescriptor { base: "l2", desc: "L2 button (trigger)", hotkey_level: 0, id: BindId::L2 },
    BindDescriptor { base: "r2", desc: "R2 button (trigger)", hotkey_level: 0, id: BindId::R2 },
    BindDescriptor { base: "l3", desc: "L3 button (thumb)", hotkey_level: 0, id: BindId::L3 },
    BindDescriptor { base: "r3", desc: "R3 button (thumb)", hotkey_level: 0, id: BindId::R3 },
    BindDescriptor { base: "l_x_plus", desc: "Left analog X+ (right)", hotkey_level: 0, id: BindId::LeftXPlus },
    BindDescriptor { base: "l_x_minus", desc: "Left analog X- (left)", hotkey_level: 0, id: BindId::LeftXMinus },
    BindDescriptor { base: "l_y_plus", desc: "Left analog Y+ (down)", hotkey_level: 0, id: BindId::LeftYPlus },
    BindDescriptor { base: "l_y_minus", desc: "Left analog Y- (up)", hotkey_level: 0, id: BindId::LeftYMinus },
    BindDescriptor { base: "r_x_plus", desc: "Right analog X+ (right)", hotkey_level: 0, id: BindId::RightXPlus },
    BindDescriptor { base: "r_x_minus", desc: "Right analog X- (left)", hotkey_level: 0, id: BindId::RightXMinus },
    BindDescriptor { base: "r_y_plus", desc: "Right analog Y+ (down)", hotkey_level: 0, id: BindId::RightYPlus },
    BindDescriptor { base: "r_y_minus", desc: "Right analog Y- (up)", hotkey_level: 0, id: BindId::RightYMinus },
    BindDescriptor { base: "turbo", desc: "Turbo enable", hotkey_level: 0, id: BindId::TurboEnable },
    BindDescriptor { base: "enable_hotkey", desc: "Hotkey enable", hotkey_level: 1, id: BindId::EnableHotkey },
    BindDescriptor { base: "toggle_fast_forward", desc: "Fast-forward (toggle)", hotkey_level: 1, id: BindId::FastForwardToggle },
    BindDescriptor { base: "hold_fast_forward", desc: "Fast-forward (hold)", hotkey_level: 2, id: BindId::FastForwardHold },
    BindDescriptor { base: "load_state", desc: "Load state", hotkey_level: 1, id: BindId::LoadState },
    BindDescriptor { base: "save_state", desc: "Save state", hotkey_level: 1, id: BindId::SaveState },
    BindDescriptor { base: "exit_emulator", desc: "Quit", hotkey_level: 1, id: BindId::Quit },
    BindDescriptor { base: "state_slot_increase", desc: "Next state slot", hotkey_level: 1, id: BindId::StateSlotPlus },
    BindDescriptor { base: "state_slot_decrease", desc: "Previous state slot", hotkey_level: 1, id: BindId::StateSlotMinus },
    BindDescriptor { base: "rewind", desc: "Rewind (hold)", hotkey_level: 2, id: BindId::Rewind },
    BindDescriptor { base: "movie_record_toggle", desc: "Movie record toggle", hotkey_level: 1, id: BindId::MovieRecordToggle },
    BindDescriptor { base: "pause_toggle", desc: "Pause (toggle)", hotkey_level: 1, id: BindId::PauseToggle },
    BindDescriptor { base: "frame_advance", desc: "Frame advance", hotkey_level: 1, id: BindId::FrameAdvance },
    BindDescriptor { base: "reset", desc: "Reset content", hotkey_level: 1, id: BindId::Reset },
    BindDescriptor { base: "screenshot", desc: "Take screenshot", hotkey_level: 1, id: BindId::Screenshot },
    BindDescriptor { base: "audio_mute", desc: "Mute audio (toggle)", hotkey_level: 1, id: BindId::Mute },
    BindDescriptor { base: "game_focus_toggle", desc: "Game focus (toggle)", hotkey_level: 1, id: BindId::GameFocusToggle },
    BindDescriptor { base: "overlay_next", desc: "Next overlay page", hotkey_level: 1, id: BindId::OverlayNext },
    BindDescriptor { base: "menu_toggle", desc: "Menu (toggle)", hotkey_level: 1, id: BindId::MenuToggle },
];

// ---- bind masks ----

/// A set of binds, one bit per [`BindId`] index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindMask(u64);

impl BindMask {
    pub const EMPTY: BindMask = BindMask(0);

    pub fn set(&mut self, id: BindId) {
        self.0 |= 1 << id.index();
    }

    pub fn clear(&mut self, id: BindId) {
        self.0 &= !(1 << id.index());
    }

    pub fn contains(self, id: BindId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: BindMask) -> BindMask {
        BindMask(self.0 | other.0)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn from_bits(bits: u64) -> BindMask {
        BindMask(bits)
    }

    /// Iterate the contained bind ids in index order.
    pub fn iter(self) -> impl Iterator<Item = BindId> {
        BIND_TABLE
            .iter()
            .map(|d| d.id)
            .filter(move |id| self.contains(*id))
    }
}

// ---- joystick bind targets and their text forms ----

/// One of the four directions of a joystick hat switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HatDirection {
    Up,
    Down,
    Left,
    Right,
}

impl HatDirection {
    fn name(self) -> &'static str {
        match self {
            HatDirection::Up => "up",
            HatDirection::Down => "down",
            HatDirection::Left => "left",
            HatDirection::Right => "right",
        }
    }
}

/// A joystick digital input a bind can point at.
///
/// Text form: `nul` (unbound), a plain button number, or `h<hat><dir>`
/// for a hat direction, e.g. `h0up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoyButton {
    #[default]
    None,
    Button(u16),
    Hat(u8, HatDirection),
}

impl fmt::Display for JoyButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoyButton::None => write!(f, "nul"),
            JoyButton::Button(n) => write!(f, "{n}"),
            JoyButton::Hat(hat, dir) => write!(f, "h{hat}{}", dir.name()),
        }
    }
}

impl FromStr for JoyButton {
    type Err = AxonError;

    fn from_str(s: &str) -> Result<JoyButton, AxonError> {
        if s == "nul" {
            return Ok(JoyButton::None);
        }
        if let Some(rest) = s.strip_prefix('h') {
            let split = rest
                .find(|c: char| !c.is_ascii_digit())
                .ok_or_else(|| AxonError::Config(format!("hat bind missing direction: {s}")))?;
            let (num, dir) = rest.split_at(split);
            let hat: u8 = num
                .parse()
                .map_err(|_| AxonError::Config(format!("bad hat index: {s}")))?;
            let dir = match dir {
                "up" => HatDirection::Up,
                "down" => HatDirection::Down,
                "left" => HatDirection::Left,
                "right" => HatDirection::Right,
                _ => return Err(AxonError::Config(format!("bad hat direction: {s}"))),
            };
            return Ok(JoyButton::Hat(hat, dir));
        }
        let n: u16 = s
            .parse()
            .map_err(|_| AxonError::Config(format!("bad button bind: {s}")))?;
        Ok(JoyButton::Button(n))
    }
}

/// A signed half of a joystick axis a bind can point at.
///
/// Text form: `nul` (unbound), `+<axis>` or `-<axis>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoyAxis {
    #[default]
    None,
    Pos(u16),
    Neg(u16),
}

impl fmt::Display for JoyAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoyAxis::None => write!(f, "nul"),
            JoyAxis::Pos(n) => write!(f, "+{n}"),
            JoyAxis::Neg(n) => write!(f, "-{n}"),
        }
    }
}

impl FromStr for JoyAxis {
    type Err = AxonError;

    fn from_str(s: &str) -> Result<JoyAxis, AxonError> {
        if s == "nul" {
            return Ok(JoyAxis::None);
        }
        let (sign, num) = s
            .split_at_checked(1)
            .ok_or_else(|| AxonError::Config(format!("bad axis bind: {s}")))?;
        let n: u16 = num
            .parse()
            .map_err(|_| AxonError::Config(format!("bad axis bind: {s}")))?;
        match sign {
            "+" => Ok(JoyAxis::Pos(n)),
            "-" => Ok(JoyAxis::Neg(n)),
            _ => Err(AxonError::Config(format!("bad axis bind: {s}"))),
        }
    }
}

// ---- keybinds ----

/// The concrete sources one bind may fire from.
///
/// A bind can carry a keyboard key, a joystick button, a joystick axis and
/// a pointer button at the same time; the aggregator ORs them together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keybind {
    pub key: Key,
    pub joy_button: JoyButton,
    pub joy_axis: JoyAxis,
    pub pointer_button: Option<PointerButton>,
    /// Display label for the joystick button, from an autoconfig profile.
    pub label_button: Option<String>,
    /// Display label for the joystick axis, from an autoconfig profile.
    pub label_axis: Option<String>,
    /// `false` marks a slot that holds no usable bind at all.
    pub valid: bool,
}

impl Keybind {
    /// An empty, invalid bind slot.
    pub fn unbound() -> Keybind {
        Keybind { key: Key::None, ..Keybind::default() }
    }

    /// Whether any source is attached.
    pub fn is_bound(&self) -> bool {
        self.valid
            && (self.key != Key::None
                || self.joy_button != JoyButton::None
                || self.joy_axis != JoyAxis::None
                || self.pointer_button.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_in_id_order() {
        assert_eq!(BIND_TABLE.len(), BindId::COUNT);
        for (i, row) in BIND_TABLE.iter().enumerate() {
            assert_eq!(row.id.index(), i, "row {} ({})", i, row.base);
        }
    }

    #[test]
    fn from_index_round_trips() {
        for i in 0..BindId::COUNT {
            let id = BindId::from_index(i).unwrap();
            assert_eq!(id.index(), i);
        }
        assert!(BindId::from_index(BindId::COUNT).is_none());
    }

    #[test]
    fn hotkeys_start_at_first_meta() {
        for row in BIND_TABLE {
            assert_eq!(
                row.id.is_hotkey(),
                row.hotkey_level > 0,
                "bind {}",
                row.base
            );
        }
        assert!(!BindId::TurboEnable.is_hotkey());
        assert!(FIRST_META.is_hotkey());
    }

    #[test]
    fn dpad_is_never_turbo_eligible() {
        assert!(!BindId::Up.is_turbo_eligible());
        assert!(!BindId::Left.is_turbo_eligible());
        assert!(BindId::B.is_turbo_eligible());
        assert!(BindId::R3.is_turbo_eligible());
        assert!(!BindId::LeftXPlus.is_turbo_eligible());
        assert!(!BindId::MenuToggle.is_turbo_eligible());
    }

    #[test]
    fn mask_set_clear_iter() {
        let mut m = BindMask::EMPTY;
        m.set(BindId::B);
        m.set(BindId::MenuToggle);
        assert!(m.contains(BindId::B));
        assert!(!m.contains(BindId::A));
        let ids: Vec<BindId> = m.iter().collect();
        assert_eq!(ids, vec![BindId::B, BindId::MenuToggle]);
        m.clear(BindId::B);
        assert!(!m.contains(BindId::B));
        assert!(!m.is_empty());
    }

    #[test]
    fn joy_button_text_round_trip() {
        for b in [
            JoyButton::None,
            JoyButton::Button(0),
            JoyButton::Button(14),
            JoyButton::Hat(0, HatDirection::Up),
            JoyButton::Hat(2, HatDirection::Right),
        ] {
            let text = b.to_string();
            assert_eq!(text.parse::<JoyButton>().unwrap(), b, "text {text}");
        }
    }

    #[test]
    fn joy_button_rejects_garbage() {
        assert!("h0diagonal".parse::<JoyButton>().is_err());
        assert!("h".parse::<JoyButton>().is_err());
        assert!("button7".parse::<JoyButton>().is_err());
    }

    #[test]
    fn joy_axis_text_round_trip() {
        for a in [JoyAxis::None, JoyAxis::Pos(0), JoyAxis::Neg(3), JoyAxis::Pos(11)] {
            let text = a.to_string();
            assert_eq!(text.parse::<JoyAxis>().unwrap(), a, "text {text}");
        }
    }

    #[test]
    fn joy_axis_rejects_garbage() {
        assert!("3".parse::<JoyAxis>().is_err());
        assert!("+x".parse::<JoyAxis>().is_err());
        assert!("".parse::<JoyAxis>().is_err());
    }

    #[test]
    fn unbound_keybind_is_not_bound() {
        let mut bind = Keybind::unbound();
        assert!(!bind.is_bound());
        bind.valid = true;
        assert!(!bind.is_bound());
        bind.key = Key::Z;
        assert!(bind.is_bound());
    }
}

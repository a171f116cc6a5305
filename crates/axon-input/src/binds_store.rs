//! Per-port keybind storage with autoconfig fallback.
//!
//! Two parallel tables are kept per port: the *configured* binds a user
//! edited and saved, and the *autoconfigured* binds applied when a known
//! controller is plugged in. Readers go through [`KeybindStore::resolved`],
//! which falls back field by field from configured to autoconfigured so a
//! user override of one source never hides the profile's other sources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use axon_types::binds::{BindId, JoyAxis, JoyButton, Keybind, BIND_TABLE};
use axon_types::error::{AxonError, Result};
use axon_types::keys::Key;
use axon_types::MAX_PORTS;

/// One full bind table for a port.
pub type BindSet = [Keybind; BindId::COUNT];

fn empty_set() -> BindSet {
    std::array::from_fn(|_| Keybind::unbound())
}

// ---- autoconfig profiles ----

/// One bind entry of an autoconfig profile.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoconfBind {
    /// Config stem from the bind table, e.g. `"a"` or `"l_x_plus"`.
    pub bind: String,
    #[serde(default)]
    pub button: Option<String>,
    #[serde(default)]
    pub axis: Option<String>,
    /// Display label for the physical control, e.g. `"Cross"`.
    #[serde(default)]
    pub label: Option<String>,
}

/// A controller profile shipped for a known device.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoconfProfile {
    /// Device name reported by the joypad backend.
    pub device_name: String,
    #[serde(default)]
    pub binds: Vec<AutoconfBind>,
}

impl AutoconfProfile {
    /// Parse a profile from its TOML text.
    pub fn from_toml(text: &str) -> Result<AutoconfProfile> {
        toml::from_str(text).map_err(|e| AxonError::Config(format!("bad autoconfig profile: {e}")))
    }

    /// Whether this profile describes the named device.
    pub fn matches(&self, device_name: &str) -> bool {
        self.device_name.eq_ignore_ascii_case(device_name)
    }
}

/// Pick the profile matching a device name, if any.
pub fn find_profile<'a>(
    profiles: &'a [AutoconfProfile],
    device_name: &str,
) -> Option<&'a AutoconfProfile> {
    profiles.iter().find(|p| p.matches(device_name))
}

// ---- keybind text form ----

/// Text form of one bind, as stored in keybind files.
///
/// Each field uses the same notation the bind types print: `nul` for
/// unbound, symbolic key names, button numbers or `h<N><dir>`, `+N`/`-N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeybindRecord {
    #[serde(default = "unbound_field")]
    pub key: String,
    #[serde(default = "unbound_field")]
    pub button: String,
    #[serde(default = "unbound_field")]
    pub axis: String,
}

fn unbound_field() -> String {
    "nul".to_owned()
}

// ---- the store ----

/// Configured and autoconfigured binds for every port.
pub struct KeybindStore {
    configured: Vec<BindSet>,
    autoconf: Vec<BindSet>,
}

impl Default for KeybindStore {
    fn default() -> KeybindStore {
        KeybindStore::new()
    }
}

impl KeybindStore {
    /// A store with the default keyboard layout on port 0 and every other
    /// port unbound.
    pub fn new() -> KeybindStore {
        let mut store = KeybindStore {
            configured: (0..MAX_PORTS).map(|_| empty_set()).collect(),
            autoconf: (0..MAX_PORTS).map(|_| empty_set()).collect(),
        };
        for row in &mut store.configured {
            for bind in row.iter_mut() {
                bind.valid = true;
            }
        }
        for (id, key) in DEFAULT_KEYS {
            store.configured[0][id.index()].key = *key;
        }
        store
    }

    /// The configured bind for one slot, untouched by autoconfig.
    pub fn configured(&self, port: usize, id: BindId) -> Option<&Keybind> {
        self.configured.get(port).map(|row| &row[id.index()])
    }

    /// Mutable access for bind editors. Out-of-range ports yield `None`.
    pub fn configured_mut(&mut self, port: usize, id: BindId) -> Option<&mut Keybind> {
        self.configured.get_mut(port).map(|row| &mut row[id.index()])
    }

    /// The bind actually in effect for a slot.
    ///
    /// Starts from the configured bind; any joystick source left unbound
    /// there is taken from the autoconfigured table together with its
    /// label. An invalid configured slot defers to autoconfig wholesale.
    pub fn resolved(&self, port: usize, id: BindId) -> Keybind {
        let Some(conf_row) = self.configured.get(port) else {
            return Keybind::unbound();
        };
        let conf = &conf_row[id.index()];
        let auto = &self.autoconf[port][id.index()];
        if !conf.valid {
            return auto.clone();
        }
        let mut out = conf.clone();
        if auto.valid {
            if out.joy_button == JoyButton::None && auto.joy_button != JoyButton::None {
                out.joy_button = auto.joy_button;
                out.label_button = auto.label_button.clone();
            }
            if out.joy_axis == JoyAxis::None && auto.joy_axis != JoyAxis::None {
                out.joy_axis = auto.joy_axis;
                out.label_axis = auto.label_axis.clone();
            }
        }
        out
    }

    /// A full resolved bind table for a port, in bind-id order.
    pub fn resolved_set(&self, port: usize) -> Vec<Keybind> {
        BIND_TABLE.iter().map(|d| self.resolved(port, d.id)).collect()
    }

    /// Whether a slot has a joystick source in either table.
    pub fn pad_bound(&self, port: usize, id: BindId) -> bool {
        let Some(conf_row) = self.configured.get(port) else {
            return false;
        };
        let has_joy = |b: &Keybind| {
            b.valid && (b.joy_button != JoyButton::None || b.joy_axis != JoyAxis::None)
        };
        has_joy(&conf_row[id.index()]) || has_joy(&self.autoconf[port][id.index()])
    }

    /// Whether a slot has a keyboard key in the configured table.
    pub fn key_bound(&self, port: usize, id: BindId) -> bool {
        self.configured
            .get(port)
            .map(|row| {
                let b = &row[id.index()];
                b.valid && b.key != Key::None
            })
            .unwrap_or(false)
    }

    /// Replace a port's autoconfigured binds with a controller profile.
    ///
    /// Entries naming unknown binds or carrying unparsable sources are
    /// skipped with a warning; the rest of the profile still applies.
    pub fn apply_autoconf(&mut self, port: usize, profile: &AutoconfProfile) {
        let Some(row) = self.autoconf.get_mut(port) else {
            log::warn!("autoconfig for out-of-range port {port} ignored");
            return;
        };
        *row = empty_set();
        for entry in &profile.binds {
            let Some(desc) = BIND_TABLE.iter().find(|d| d.base == entry.bind) else {
                log::warn!(
                    "autoconfig profile {}: unknown bind {:?} skipped",
                    profile.device_name,
                    entry.bind
                );
                continue;
            };
            let slot = &mut row[desc.id.index()];
            if let Some(text) = &entry.button {
                match text.parse::<JoyButton>() {
                    Ok(button) => slot.joy_button = button,
                    Err(e) => {
                        log::warn!("autoconfig profile {}: {e}", profile.device_name);
                        continue;
                    }
                }
            }
            if let Some(text) = &entry.axis {
                match text.parse::<JoyAxis>() {
                    Ok(axis) => slot.joy_axis = axis,
                    Err(e) => {
                        log::warn!("autoconfig profile {}: {e}", profile.device_name);
                        continue;
                    }
                }
            }
            if slot.joy_button != JoyButton::None {
                slot.label_button = entry.label.clone();
            }
            if slot.joy_axis != JoyAxis::None {
                slot.label_axis = entry.label.clone();
            }
            slot.valid = true;
        }
        log::info!("autoconfigured port {port} as {}", profile.device_name);
    }

    /// Drop a port's autoconfigured binds, e.g. on device unplug.
    pub fn clear_autoconf(&mut self, port: usize) {
        if let Some(row) = self.autoconf.get_mut(port) {
            *row = empty_set();
        }
    }

    /// Export a port's configured binds in the keybind text form.
    pub fn export_port(&self, port: usize) -> BTreeMap<String, KeybindRecord> {
        let mut out = BTreeMap::new();
        let Some(row) = self.configured.get(port) else {
            return out;
        };
        for desc in BIND_TABLE {
            let bind = &row[desc.id.index()];
            out.insert(
                desc.base.to_owned(),
                KeybindRecord {
                    key: bind.key.name().to_owned(),
                    button: bind.joy_button.to_string(),
                    axis: bind.joy_axis.to_string(),
                },
            );
        }
        out
    }

    /// Import configured binds from the keybind text form.
    ///
    /// Binds absent from the map keep their current value, as does any
    /// field that fails to parse. Unknown map keys are reported and
    /// ignored so a file from a newer build still loads.
    pub fn import_port(&mut self, port: usize, records: &BTreeMap<String, KeybindRecord>) {
        let Some(row) = self.configured.get_mut(port) else {
            log::warn!("keybind import for out-of-range port {port} ignored");
            return;
        };
        for (base, record) in records {
            let Some(desc) = BIND_TABLE.iter().find(|d| d.base == *base) else {
                log::warn!("keybind file names unknown bind {base:?}, ignored");
                continue;
            };
            let slot = &mut row[desc.id.index()];
            let key = Key::from_name(&record.key);
            if key == Key::None && record.key != "nul" {
                log::warn!("bind {base}: unknown key {:?} kept as-is", record.key);
            } else {
                slot.key = key;
            }
            match record.button.parse::<JoyButton>() {
                Ok(button) => slot.joy_button = button,
                Err(e) => log::warn!("bind {base}: {e}, kept as-is"),
            }
            match record.axis.parse::<JoyAxis>() {
                Ok(axis) => slot.joy_axis = axis,
                Err(e) => log::warn!("bind {base}: {e}, kept as-is"),
            }
            slot.valid = true;
        }
    }
}

/// Default keyboard layout for port 0.
static DEFAULT_KEYS: &[(BindId, Key)] = &[
    (BindId::B, Key::Z),
    (BindId::Y, Key::A),
    (BindId::Select, Key::RShift),
    (BindId::Start, Key::Return),
    (BindId::Up, Key::Up),
    (BindId::Down, Key::Down),
    (BindId::Left, Key::Left),
    (BindId::Right, Key::Right),
    (BindId::A, Key::X),
    (BindId::X, Key::S),
    (BindId::L, Key::Q),
    (BindId::R, Key::W),
    (BindId::FastForwardToggle, Key::Space),
    (BindId::FastForwardHold, Key::L),
    (BindId::LoadState, Key::F4),
    (BindId::SaveState, Key::F2),
    (BindId::Quit, Key::Escape),
    (BindId::StateSlotPlus, Key::F7),
    (BindId::StateSlotMinus, Key::F6),
    (BindId::Rewind, Key::R),
    (BindId::MovieRecordToggle, Key::O),
    (BindId::PauseToggle, Key::P),
    (BindId::FrameAdvance, Key::K),
    (BindId::Reset, Key::H),
    (BindId::Screenshot, Key::F8),
    (BindId::Mute, Key::F9),
    (BindId::MenuToggle, Key::F1),
];

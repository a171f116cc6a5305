//! The input aggregator.
//!
//! [`InputContext`] owns the devices, the keybind store, the remap tables and
//! every per-frame processor, and exposes the two calls the frontend loop
//! makes: [`InputContext::poll`] once per frame and [`InputContext::query`]
//! for every core read. Queries merge, in a fixed order, the physical devices
//! of every port mapped to the queried virtual port, the poll-time mapper,
//! the overlay (port 0 only), the remote and command feeds, and finally the
//! turbo modulator and the hotkey arbitration gate. During movie playback,
//! recorded samples substitute for the whole chain; during recording, final
//! values are tapped after every other stage has run.

use axon_movie::{CoreState, MovieHandle, MovieMode, MovieStream, StateLoadOutcome};
use axon_types::binds::{BindId, BindMask, FIRST_META};
use axon_types::device::{
    DeviceClass, JoypadSource, KeyboardSource, NullJoypad, NullKeyboard, NullPointer,
    PointerSource, RumbleEffect, ID_ANALOG_X, ID_ANALOG_Y, ID_JOYPAD_MASK, ID_POINTER_PRESSED,
    ID_POINTER_X, ID_POINTER_Y, INDEX_ANALOG_BUTTON, INDEX_ANALOG_LEFT, INDEX_ANALOG_RIGHT,
};
use axon_types::error::Result;
use axon_types::keys::{Key, KeyEvent, KeyMods};
use axon_types::settings::{AnalogDpadMode, InputSettings};
use axon_types::{AXIS_RANGE, MAX_PORTS, MAX_TOUCHES};
use log::{error, info, warn};

use crate::analog::{combine_halves, linear_magnitude, radial_magnitude, scale_axis};
use crate::binds_store::{AutoconfProfile, KeybindStore, find_profile};
use crate::command::CommandFeed;
use crate::hotkey::{HotkeyArbitrator, HotkeyInputs};
use crate::keyboard::{KeyCallback, KeyboardState};
use crate::mapper::{InputMapper, analog_slot};
use crate::overlay::{OverlayOutput, OverlaySet, TouchPoint};
use crate::remap::RemapTables;
use crate::remote::RemoteFeed;
use crate::turbo::TurboBank;

/// Bind ids for the two halves of one stick axis, `(plus, minus)`.
fn stick_ids(stick: u32, axis: u32) -> (BindId, BindId) {
    match (stick, axis) {
        (0, ID_ANALOG_X) => (BindId::LeftXPlus, BindId::LeftXMinus),
        (0, _) => (BindId::LeftYPlus, BindId::LeftYMinus),
        (_, ID_ANALOG_X) => (BindId::RightXPlus, BindId::RightXMinus),
        _ => (BindId::RightYPlus, BindId::RightYMinus),
    }
}

// ---- the context ----

/// Everything the input pipeline needs for one running session.
pub struct InputContext {
    binds: KeybindStore,
    remap: RemapTables,
    mapper: InputMapper,
    turbo: TurboBank,
    hotkeys: HotkeyArbitrator,
    keyboard_state: KeyboardState,
    remote: RemoteFeed,
    commands: CommandFeed,
    overlay: Option<OverlaySet>,
    overlay_out: OverlayOutput,
    pads: Vec<Box<dyn JoypadSource>>,
    keyboard: Box<dyn KeyboardSource>,
    pointer: Box<dyn PointerSource>,
    device_class: [DeviceClass; MAX_PORTS],
    analog_dpad: [AnalogDpadMode; MAX_PORTS],
    /// Ports whose sticks the core read this frame / last frame.
    analog_requested: [bool; MAX_PORTS],
    analog_requested_prev: [bool; MAX_PORTS],
    /// Set once the first poll has run; gates the frame-edge work so a fresh
    /// context does not close a frame that never opened.
    frame_open: bool,
    movie: Option<MovieHandle>,
    /// Handle waiting for the next poll to take over from `movie`.
    movie_next: Option<MovieHandle>,
    settings: InputSettings,
}

impl Default for InputContext {
    fn default() -> Self {
        Self::new(InputSettings::default())
    }
}

impl InputContext {
    pub fn new(settings: InputSettings) -> InputContext {
        let turbo = TurboBank::new(settings.turbo.default_bind);
        InputContext {
            binds: KeybindStore::new(),
            remap: RemapTables::new(),
            mapper: InputMapper::new(),
            turbo,
            hotkeys: HotkeyArbitrator::new(),
            keyboard_state: KeyboardState::new(),
            remote: RemoteFeed::new(),
            commands: CommandFeed::new(),
            overlay: None,
            overlay_out: OverlayOutput::default(),
            pads: (0..MAX_PORTS)
                .map(|_| Box::new(NullJoypad) as Box<dyn JoypadSource>)
                .collect(),
            keyboard: Box::new(NullKeyboard),
            pointer: Box::new(NullPointer),
            device_class: [DeviceClass::Joypad; MAX_PORTS],
            analog_dpad: [AnalogDpadMode::None; MAX_PORTS],
            analog_requested: [false; MAX_PORTS],
            analog_requested_prev: [false; MAX_PORTS],
            frame_open: false,
            movie: None,
            movie_next: None,
            settings,
        }
    }

    // ---- devices ----

    pub fn set_joypad(&mut self, port: usize, pad: Box<dyn JoypadSource>) {
        if port >= MAX_PORTS {
            warn!("joypad port {port} out of range, device dropped");
            return;
        }
        info!("port {port} joypad: {}", pad.name());
        self.pads[port] = pad;
    }

    pub fn set_keyboard(&mut self, keyboard: Box<dyn KeyboardSource>) {
        self.keyboard = keyboard;
    }

    pub fn set_pointer(&mut self, pointer: Box<dyn PointerSource>) {
        self.pointer = pointer;
    }

    /// Fill the autoconfig bind tables of every port whose device name
    /// matches one of `profiles`.
    pub fn autoconfigure(&mut self, profiles: &[AutoconfProfile]) {
        for port in 0..MAX_PORTS {
            let Some(profile) = find_profile(profiles, self.pads[port].name()) else {
                continue;
            };
            info!(
                "autoconfig profile '{}' applied to port {port}",
                profile.device_name
            );
            self.binds.apply_autoconf(port, profile);
        }
    }

    /// Emulated device class the core sees on `port`. `DeviceClass::None`
    /// silences the port entirely.
    pub fn set_device_class(&mut self, port: usize, class: DeviceClass) {
        if let Some(slot) = self.device_class.get_mut(port) {
            *slot = class;
        }
    }

    pub fn set_analog_dpad(&mut self, port: usize, mode: AnalogDpadMode) {
        if let Some(slot) = self.analog_dpad.get_mut(port) {
            *slot = mode;
        }
    }

    // ---- component access ----

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut InputSettings {
        &mut self.settings
    }

    pub fn binds(&self) -> &KeybindStore {
        &self.binds
    }

    pub fn binds_mut(&mut self) -> &mut KeybindStore {
        &mut self.binds
    }

    pub fn remap(&self) -> &RemapTables {
        &self.remap
    }

    pub fn remap_mut(&mut self) -> &mut RemapTables {
        &mut self.remap
    }

    pub fn turbo(&self) -> &TurboBank {
        &self.turbo
    }

    pub fn turbo_mut(&mut self) -> &mut TurboBank {
        &mut self.turbo
    }

    /// Command feed for the current frame. Cleared by every poll, so inject
    /// after polling and before the core runs.
    pub fn commands_mut(&mut self) -> &mut CommandFeed {
        &mut self.commands
    }

    /// Remote feed for the current frame. Cleared by every poll.
    pub fn remote_mut(&mut self) -> &mut RemoteFeed {
        &mut self.remote
    }

    pub fn set_overlay(&mut self, overlay: Option<OverlaySet>) {
        self.overlay = overlay;
        self.overlay_out = OverlayOutput::default();
    }

    pub fn overlay(&self) -> Option<&OverlaySet> {
        self.overlay.as_ref()
    }

    pub fn overlay_next_page(&mut self) {
        if let Some(set) = &mut self.overlay {
            set.next_page();
        }
    }

    // ---- the per-frame poll ----

    /// Advance the pipeline by one frame.
    ///
    /// Closes the previous frame (movie boundary, turbo counter), swaps in a
    /// queued movie handle, snapshots every device, rebuilds the mapper and
    /// overlay state and re-arbitrates hotkeys. `core` is only needed while
    /// a recording writes checkpoints.
    pub fn poll(&mut self, core: Option<&mut dyn CoreState>) -> Result<()> {
        if self.frame_open {
            self.analog_requested_prev = self.analog_requested;
            self.analog_requested = [false; MAX_PORTS];
            self.finish_frame(core)?;
        }
        if let Some(next) = self.movie_next.take() {
            if self.movie.is_some() {
                info!("active movie replaced by the queued handle");
            }
            self.movie = Some(next);
        }

        for pad in &mut self.pads {
            pad.poll();
        }
        let transitions = self.keyboard.poll();
        for event in transitions {
            self.route_key_event(event);
        }
        self.pointer.poll();

        self.commands.clear();
        self.remote.clear();

        self.build_mapper();

        let touches = Self::gather_touches(self.pointer.as_ref());
        self.overlay_out = match &mut self.overlay {
            Some(set) => set.poll(&touches, &self.settings.overlay),
            None => OverlayOutput::default(),
        };

        for port in 0..self.active_ports() {
            let held = self.bind_held(port, BindId::TurboEnable);
            self.turbo.set_frame_enable(port, held, &self.settings.turbo);
        }

        let inputs = self.hotkey_inputs();
        self.hotkeys.update(inputs, self.settings.hotkey_block_delay);

        self.frame_open = true;
        Ok(())
    }

    /// Frame-edge work for the frame the previous poll opened.
    fn finish_frame(&mut self, core: Option<&mut dyn CoreState>) -> Result<()> {
        self.turbo.advance();
        let mut replayed = Vec::new();
        let mut playback_done = false;
        if let Some(movie) = &mut self.movie {
            replayed = movie.frame_boundary(core)?;
            playback_done = movie.mode() == MovieMode::Playback && movie.ended();
        }
        for event in replayed {
            self.route_key_event(event);
        }
        if playback_done {
            info!("movie playback ended");
            self.movie = None;
        }
        Ok(())
    }

    fn active_ports(&self) -> usize {
        self.settings.max_users.min(MAX_PORTS)
    }

    fn gather_touches(pointer: &dyn PointerSource) -> Vec<TouchPoint> {
        let count = pointer.count().min(MAX_TOUCHES);
        let span = 2.0 * f32::from(AXIS_RANGE);
        let mut touches = Vec::with_capacity(count);
        for index in 0..count {
            if !pointer.pressed(index) {
                continue;
            }
            let (x, y) = pointer.position(index);
            touches.push(TouchPoint {
                x: (f32::from(x) + f32::from(AXIS_RANGE)) / span,
                y: (f32::from(y) + f32::from(AXIS_RANGE)) / span,
            });
        }
        touches
    }

    // ---- keyboard events ----

    /// Feed one keyboard transition from the platform layer.
    ///
    /// The event updates level state, may be eaten by a pending subscription,
    /// and is otherwise queued for the core and appended to an active
    /// recording.
    pub fn keyboard_event(&mut self, down: bool, key: Key, character: u32, mods: KeyMods) {
        self.route_key_event(KeyEvent { down, key, character, mods });
    }

    fn route_key_event(&mut self, event: KeyEvent) {
        if self.keyboard_state.event(event) {
            return;
        }
        if let Some(movie) = &mut self.movie {
            movie.push_key_event(event);
        }
    }

    /// Hand the next unconsumed keyboard event to `callback` instead of the
    /// core. The callback returning `true` keeps the subscription alive.
    pub fn subscribe_key(&mut self, callback: KeyCallback) {
        self.keyboard_state.subscribe(callback);
    }

    pub fn cancel_key_subscription(&mut self) {
        self.keyboard_state.cancel_subscription();
    }

    /// Keyboard transitions queued for the core since the last call.
    pub fn take_key_events(&mut self) -> Vec<KeyEvent> {
        self.keyboard_state.drain_events()
    }

    // ---- core queries ----

    /// One core read. `port` is the virtual port; `device`, `index` and `id`
    /// follow the classed-device addressing scheme.
    pub fn query(&mut self, port: usize, device: DeviceClass, index: u32, id: u32) -> i16 {
        if port >= self.active_ports() {
            return 0;
        }

        if let Some(movie) = &mut self.movie {
            if movie.mode() == MovieMode::Playback {
                if let Some(sample) = movie.next_sample() {
                    return sample;
                }
            }
        }

        let value = self.query_live(port, device, index, id);

        let mut write_failed = false;
        if let Some(movie) = &mut self.movie {
            if movie.mode() == MovieMode::Recording {
                if let Err(e) = movie.push_sample(value) {
                    error!("movie write failed, recording stopped: {e}");
                    write_failed = true;
                }
            }
        }
        if write_failed {
            self.movie = None;
        }
        value
    }

    fn query_live(&mut self, port: usize, device: DeviceClass, index: u32, id: u32) -> i16 {
        if self.device_class[port] == DeviceClass::None {
            return 0;
        }
        if self.hotkeys.standard_blocked() {
            return 0;
        }
        match device {
            DeviceClass::Joypad => {
                if id == ID_JOYPAD_MASK {
                    let mut mask = 0u16;
                    for bit in 0..BindId::PAD_BUTTONS {
                        let Some(bind_id) = BindId::from_index(bit) else {
                            continue;
                        };
                        if self.digital(port, bind_id) {
                            mask |= 1 << bit;
                        }
                    }
                    mask as i16
                } else if (id as usize) < BindId::PAD_BUTTONS {
                    match BindId::from_index(id as usize) {
                        Some(bind_id) => i16::from(self.digital(port, bind_id)),
                        None => 0,
                    }
                } else {
                    0
                }
            }
            DeviceClass::Analog => self.analog_value(port, index, id),
            DeviceClass::Keyboard => {
                let key = Key::from_code(id);
                let pressed = key != Key::None
                    && (self.key_level(key)
                        || self.mapper.key_pressed(key)
                        || self.overlay_out.keys.contains(&key));
                i16::from(pressed)
            }
            DeviceClass::Pointer => {
                let index = index as usize;
                match id {
                    ID_POINTER_X => self.pointer.position(index).0,
                    ID_POINTER_Y => self.pointer.position(index).1,
                    ID_POINTER_PRESSED => i16::from(self.pointer.pressed(index)),
                    _ => 0,
                }
            }
            DeviceClass::None => 0,
        }
    }

    /// Final digital state of one pad button on a virtual port.
    fn digital(&mut self, port: usize, id: BindId) -> bool {
        let mut pressed = false;

        // Keyboard and pointer-button sources evaluate against the virtual
        // port's own bind table, independent of the joypad assignment.
        if self.remap.resolve(port, id) == Some(id) {
            let bind = self.binds.resolved(port, id);
            if bind.valid {
                if bind.key != Key::None && self.key_level(bind.key) {
                    pressed = true;
                }
                if !pressed {
                    if let Some(button) = bind.pointer_button {
                        pressed = self.pointer.button(button);
                    }
                }
            }
        }

        if !pressed {
            let (ports, len) = self.contributors(port);
            for &phys in &ports[..len] {
                if self.remap.resolve(phys, id) != Some(id) {
                    continue;
                }
                let bind = self.binds.resolved(phys, id);
                if self.pads[phys].bind_pressed(&bind, self.settings.axis_threshold) {
                    pressed = true;
                    break;
                }
            }
        }

        pressed = pressed
            || self.mapper.button_pressed(port, id)
            || self.commands.pressed(id)
            || self.remote.button_pressed(port, id)
            || (port == 0 && self.overlay_out.buttons.contains(id));

        if !pressed && id.is_dpad() {
            pressed = self.dpad_from_stick(port, id);
        }

        self.turbo.apply(port, id, pressed, &self.settings.turbo)
    }

    fn analog_value(&mut self, port: usize, index: u32, id: u32) -> i16 {
        match index {
            INDEX_ANALOG_LEFT | INDEX_ANALOG_RIGHT => {
                if id > ID_ANALOG_Y {
                    return 0;
                }
                self.analog_requested[port] = true;
                let (stick, axis) = (index, id);

                let mut best: i16 = 0;
                let (ports, len) = self.contributors(port);
                for &phys in &ports[..len] {
                    let value = self.stick_shaped(phys, stick, axis);
                    if value.unsigned_abs() > best.unsigned_abs() {
                        best = value;
                    }
                }
                if best == 0 {
                    best = self.stick_digital_fallback(port, stick, axis);
                }

                let (plus, minus) = stick_ids(stick, axis);
                if let (Some(plus_slot), Some(minus_slot)) =
                    (analog_slot(plus), analog_slot(minus))
                {
                    let mapped = combine_halves(
                        self.mapper.analog(port, plus_slot),
                        self.mapper.analog(port, minus_slot),
                    );
                    if mapped.unsigned_abs() > best.unsigned_abs() {
                        best = mapped;
                    }
                }

                let remote = self.remote.analog(port, stick, axis);
                if remote.unsigned_abs() > best.unsigned_abs() {
                    best = remote;
                }

                if port == 0 {
                    let from_overlay = self.overlay_out.analog[(stick * 2 + axis) as usize];
                    if from_overlay.unsigned_abs() > best.unsigned_abs() {
                        best = from_overlay;
                    }
                }
                best
            }
            INDEX_ANALOG_BUTTON => self.analog_button(port, id),
            _ => 0,
        }
    }

    /// Pressure of one pad button read through its bound axis.
    fn analog_button(&self, port: usize, id: u32) -> i16 {
        if id as usize >= BindId::PAD_BUTTONS {
            return 0;
        }
        let Some(bind_id) = BindId::from_index(id as usize) else {
            return 0;
        };
        let mut best: i16 = 0;
        let (ports, len) = self.contributors(port);
        for &phys in &ports[..len] {
            if self.remap.resolve(phys, bind_id) != Some(bind_id) {
                continue;
            }
            let bind = self.binds.resolved(phys, bind_id);
            if !bind.valid {
                continue;
            }
            let raw = self.pads[phys].axis(bind.joy_axis).unsigned_abs();
            let raw = raw.min(AXIS_RANGE as u16) as i16;
            let value = scale_axis(
                raw,
                linear_magnitude(raw),
                self.settings.axis_deadzone,
                self.settings.axis_sensitivity,
            );
            if value > best {
                best = value;
            }
        }
        if best == 0 && self.digital_sources_pressed(port, bind_id) {
            best = AXIS_RANGE;
        }
        best
    }

    /// Full-scale substitute when a stick axis reads zero but a digital
    /// source for one of its halves is down. Plus wins over minus.
    fn stick_digital_fallback(&self, port: usize, stick: u32, axis: u32) -> i16 {
        let (plus, minus) = stick_ids(stick, axis);
        let mut value = 0i16;
        if self.digital_sources_pressed(port, minus) {
            value = -AXIS_RANGE;
        }
        if self.digital_sources_pressed(port, plus) {
            value = AXIS_RANGE;
        }
        value
    }

    /// Whether any digital source is down for `id`: the virtual port's key
    /// or pointer button, or a joypad button on a contributing port.
    fn digital_sources_pressed(&self, port: usize, id: BindId) -> bool {
        if self.remap.resolve(port, id) == Some(id) {
            let bind = self.binds.resolved(port, id);
            if bind.valid {
                if bind.key != Key::None && self.key_level(bind.key) {
                    return true;
                }
                if let Some(button) = bind.pointer_button {
                    if self.pointer.button(button) {
                        return true;
                    }
                }
            }
        }
        let (ports, len) = self.contributors(port);
        for &phys in &ports[..len] {
            if self.remap.resolve(phys, id) != Some(id) {
                continue;
            }
            let bind = self.binds.resolved(phys, id);
            if bind.valid && self.pads[phys].button(bind.joy_button) {
                return true;
            }
        }
        false
    }

    /// D-pad substitute from the configured stick, when the mode allows it.
    fn dpad_from_stick(&self, port: usize, id: BindId) -> bool {
        let mode = self.analog_dpad[port];
        let Some(stick) = mode.stick() else {
            return false;
        };
        if !mode.forced() && self.analog_requested_prev[port] {
            return false;
        }
        let (axis, positive) = match id {
            BindId::Right => (ID_ANALOG_X, true),
            BindId::Left => (ID_ANALOG_X, false),
            BindId::Down => (ID_ANALOG_Y, true),
            _ => (ID_ANALOG_Y, false),
        };
        let mut value: i16 = 0;
        let (ports, len) = self.contributors(port);
        for &phys in &ports[..len] {
            let shaped = self.stick_shaped(phys, stick, axis);
            if shaped.unsigned_abs() > value.unsigned_abs() {
                value = shaped;
            }
        }
        let threshold = self.settings.axis_threshold * f32::from(AXIS_RANGE);
        if positive {
            f32::from(value) > threshold
        } else {
            f32::from(value) < -threshold
        }
    }

    // ---- raw device reads ----

    /// Physical ports feeding a virtual port, as a stack copy.
    fn contributors(&self, port: usize) -> ([usize; MAX_PORTS], usize) {
        let mut out = [0usize; MAX_PORTS];
        let slice = self.remap.physical_ports(port);
        out[..slice.len()].copy_from_slice(slice);
        (out, slice.len())
    }

    /// Level state of a key across the event-fed tracker and the device.
    fn key_level(&self, key: Key) -> bool {
        self.keyboard_state.pressed(key) || self.keyboard.pressed(key)
    }

    /// Whether all sources of one physical port's bind are active. Used for
    /// mapper sources, where redirected slots read pre-remap state.
    fn raw_bind_pressed(&self, phys: usize, id: BindId) -> bool {
        let bind = self.binds.resolved(phys, id);
        if !bind.valid {
            return false;
        }
        if self.pads[phys].bind_pressed(&bind, self.settings.axis_threshold) {
            return true;
        }
        if bind.key != Key::None && self.key_level(bind.key) {
            return true;
        }
        if let Some(button) = bind.pointer_button {
            if self.pointer.button(button) {
                return true;
            }
        }
        false
    }

    /// Whether a bind is active on a virtual port: key and pointer sources
    /// from its own table, joypad sources from every contributor.
    fn bind_held(&self, port: usize, id: BindId) -> bool {
        let bind = self.binds.resolved(port, id);
        if bind.valid {
            if bind.key != Key::None && self.key_level(bind.key) {
                return true;
            }
            if let Some(button) = bind.pointer_button {
                if self.pointer.button(button) {
                    return true;
                }
            }
        }
        let (ports, len) = self.contributors(port);
        for &phys in &ports[..len] {
            let bind = self.binds.resolved(phys, id);
            if self.pads[phys].bind_pressed(&bind, self.settings.axis_threshold) {
                return true;
            }
        }
        false
    }

    /// Signed device value of one half-axis. `gated` skips halves whose
    /// remap target is not identity.
    fn half_axis(&self, phys: usize, half: BindId, gated: bool) -> i16 {
        if gated && self.remap.resolve(phys, half) != Some(half) {
            return 0;
        }
        let bind = self.binds.resolved(phys, half);
        if !bind.valid {
            return 0;
        }
        self.pads[phys].axis(bind.joy_axis)
    }

    fn half_pair(&self, phys: usize, stick: u32, axis: u32, gated: bool) -> i16 {
        let (plus, minus) = stick_ids(stick, axis);
        combine_halves(
            self.half_axis(phys, plus, gated),
            self.half_axis(phys, minus, gated),
        )
    }

    /// Deadzone- and sensitivity-shaped stick axis of one physical port,
    /// using the radial magnitude of the paired axes.
    fn stick_shaped(&self, phys: usize, stick: u32, axis: u32) -> i16 {
        let x = self.half_pair(phys, stick, ID_ANALOG_X, true);
        let y = self.half_pair(phys, stick, ID_ANALOG_Y, true);
        let raw = if axis == ID_ANALOG_X { x } else { y };
        if raw == 0 {
            return 0;
        }
        scale_axis(
            raw,
            radial_magnitude(x, y),
            self.settings.axis_deadzone,
            self.settings.axis_sensitivity,
        )
    }

    /// Shaped magnitude of one half-axis, pre-remap, for mapper sourcing.
    fn half_magnitude(&self, phys: usize, half: BindId) -> i16 {
        let Some(slot) = analog_slot(half) else {
            return 0;
        };
        let stick = (slot / 4) as u32;
        let axis = ((slot % 4) / 2) as u32;
        let positive = slot % 2 == 0;
        let x = self.half_pair(phys, stick, ID_ANALOG_X, false);
        let y = self.half_pair(phys, stick, ID_ANALOG_Y, false);
        let raw = if axis == ID_ANALOG_X { x } else { y };
        if raw == 0 {
            return 0;
        }
        let value = scale_axis(
            raw,
            radial_magnitude(x, y),
            self.settings.axis_deadzone,
            self.settings.axis_sensitivity,
        );
        if positive {
            value.max(0)
        } else {
            value.min(0).saturating_neg()
        }
    }

    /// Rebuild the poll-time mapper: every redirected slot deposits onto its
    /// target on the virtual port, and key-remapped slots inject key state.
    fn build_mapper(&mut self) {
        self.mapper.clear();
        let threshold = self.settings.axis_threshold * f32::from(AXIS_RANGE);
        for phys in 0..MAX_PORTS {
            let port = self.remap.remap_ports()[phys];
            if port >= MAX_PORTS {
                continue;
            }
            for slot in 0..BindId::PAD_BUTTONS + crate::mapper::ANALOG_SLOTS {
                let Some(slot_id) = BindId::from_index(slot) else {
                    break;
                };
                let target = self.remap.resolve(phys, slot_id);
                let inject = self.remap.key_for(phys, slot_id);

                if slot < BindId::PAD_BUTTONS {
                    if !self.raw_bind_pressed(phys, slot_id) {
                        continue;
                    }
                    if let Some(target) = target {
                        if target != slot_id {
                            if target.index() < BindId::PAD_BUTTONS {
                                self.mapper.set_button(port, target);
                            } else if let Some(analog) = analog_slot(target) {
                                self.mapper.set_analog(port, analog, AXIS_RANGE);
                            }
                        }
                    }
                    if inject != Key::None {
                        self.mapper.set_key(inject);
                    }
                } else {
                    let magnitude = self.half_magnitude(phys, slot_id);
                    if magnitude == 0 {
                        continue;
                    }
                    if let Some(target) = target {
                        if target != slot_id {
                            if let Some(analog) = analog_slot(target) {
                                self.mapper.set_analog(port, analog, magnitude);
                            } else if target.index() < BindId::PAD_BUTTONS
                                && f32::from(magnitude) > threshold
                            {
                                self.mapper.set_button(port, target);
                            }
                        }
                    }
                    if inject != Key::None && f32::from(magnitude) > threshold {
                        self.mapper.set_key(inject);
                    }
                }
            }
        }
    }

    // ---- hotkeys ----

    fn hotkey_inputs(&self) -> HotkeyInputs {
        let modifier = BindId::EnableHotkey;
        let (ports, len) = self.contributors(0);
        let mut pad_bound = false;
        let mut pad_held = false;
        for &phys in &ports[..len] {
            if self.binds.pad_bound(phys, modifier) {
                pad_bound = true;
            }
            let bind = self.binds.resolved(phys, modifier);
            if self.pads[phys].bind_pressed(&bind, self.settings.axis_threshold) {
                pad_held = true;
            }
        }
        let keyboard_bound = self.binds.key_bound(0, modifier);
        let bind = self.binds.resolved(0, modifier);
        let keyboard_held = keyboard_bound && bind.key != Key::None && self.key_level(bind.key);
        HotkeyInputs { pad_bound, keyboard_bound, pad_held, keyboard_held }
    }

    /// Whether standard core-facing input is currently muted by a held
    /// hotkey modifier.
    pub fn standard_blocked(&self) -> bool {
        self.hotkeys.standard_blocked()
    }

    /// Arbitrated state of one frontend hotkey. Hotkeys always evaluate on
    /// port 0; command-feed injections bypass device arbitration.
    pub fn hotkey_pressed(&self, id: BindId) -> bool {
        if !id.is_hotkey() {
            return false;
        }
        if self.commands.pressed(id) {
            return true;
        }
        let bind = self.binds.resolved(0, id);
        if bind.valid
            && bind.key != Key::None
            && self.key_level(bind.key)
            && self.hotkeys.allows(id, true)
        {
            return true;
        }
        if !self.hotkeys.allows(id, false) {
            return false;
        }
        let (ports, len) = self.contributors(0);
        for &phys in &ports[..len] {
            let bind = self.binds.resolved(phys, id);
            if self.pads[phys].bind_pressed(&bind, self.settings.axis_threshold) {
                return true;
            }
        }
        false
    }

    /// All hotkeys pressed this frame, packed into one mask.
    pub fn hotkey_mask(&self) -> BindMask {
        let mut mask = BindMask::EMPTY;
        for index in FIRST_META.index()..BindId::COUNT {
            let Some(id) = BindId::from_index(index) else {
                continue;
            };
            if self.hotkey_pressed(id) {
                mask.set(id);
            }
        }
        mask
    }

    // ---- rumble ----

    /// Drive the rumble motors of every pad feeding `port`.
    pub fn set_rumble(&mut self, port: usize, effect: RumbleEffect, strength: u16) -> bool {
        let (ports, len) = self.contributors(port);
        let mut any = false;
        for &phys in &ports[..len] {
            any |= self.pads[phys].set_rumble(effect, strength);
        }
        any
    }

    // ---- movies ----

    /// Queue a recording; it takes over at the next poll.
    pub fn start_recording(&mut self, stream: Box<dyn MovieStream>, identifier: i64) -> Result<()> {
        let handle = MovieHandle::record(stream, identifier, &self.settings.movie)?;
        if self.movie_next.replace(handle).is_some() {
            warn!("queued movie replaced before it started");
        }
        Ok(())
    }

    /// Queue a playback; it takes over at the next poll.
    pub fn start_playback(&mut self, stream: Box<dyn MovieStream>) -> Result<()> {
        let handle = MovieHandle::playback(stream, &self.settings.movie)?;
        if self.movie_next.replace(handle).is_some() {
            warn!("queued movie replaced before it started");
        }
        Ok(())
    }

    /// Stop the active movie, flushing the in-progress frame of a recording.
    pub fn stop_movie(&mut self) -> Result<()> {
        self.movie_next = None;
        if let Some(mut movie) = self.movie.take() {
            if self.frame_open && movie.mode() == MovieMode::Recording {
                movie.frame_boundary(None)?;
            }
            info!("movie stopped after {} frames", movie.frame_counter());
        }
        Ok(())
    }

    pub fn movie_mode(&self) -> Option<MovieMode> {
        self.movie.as_ref().map(MovieHandle::mode)
    }

    pub fn movie_frame(&self) -> Option<u64> {
        self.movie.as_ref().map(MovieHandle::frame_counter)
    }

    /// Step the active movie back one frame, if its window still covers it.
    pub fn rewind_frame(&mut self) -> Result<()> {
        match &mut self.movie {
            Some(movie) => movie.frame_rewind(),
            None => Ok(()),
        }
    }

    /// Movie section for a save state, `None` without an active movie.
    pub fn movie_serialize(&mut self) -> Result<Option<Vec<u8>>> {
        match &mut self.movie {
            Some(movie) => movie.serialize_embed().map(Some),
            None => Ok(None),
        }
    }

    /// Re-align the active movie with a loaded save state's movie section.
    pub fn movie_load_state(&mut self, embed: &[u8]) -> Result<StateLoadOutcome> {
        let Some(movie) = &mut self.movie else {
            return Ok(StateLoadOutcome::Resumed);
        };
        let outcome = movie.load_embed(embed)?;
        if outcome == StateLoadOutcome::Halted {
            info!("movie halted by state load");
            self.movie = None;
        }
        Ok(outcome)
    }
}

// ---- tests ----

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{ElementKind, OverlayElement, OverlayPage};
    use crate::remap::RemapTarget;
    use axon_types::binds::{JoyAxis, JoyButton};
    use axon_types::device::PointerButton;
    use axon_types::settings::TurboSettings;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::io::{Cursor, Read, Seek, SeekFrom, Write};
    use std::rc::Rc;

    #[derive(Default)]
    struct PadModel {
        buttons: HashSet<u16>,
        axes: HashMap<u16, i16>,
        rumble: Vec<(RumbleEffect, u16)>,
    }

    struct ScriptedPad {
        name: &'static str,
        model: Rc<RefCell<PadModel>>,
    }

    impl ScriptedPad {
        fn new(name: &'static str) -> (ScriptedPad, Rc<RefCell<PadModel>>) {
            let model = Rc::new(RefCell::new(PadModel::default()));
            (ScriptedPad { name, model: Rc::clone(&model) }, model)
        }
    }

    impl JoypadSource for ScriptedPad {
        fn poll(&mut self) {}

        fn name(&self) -> &str {
            self.name
        }

        fn button(&self, button: JoyButton) -> bool {
            match button {
                JoyButton::Button(n) => self.model.borrow().buttons.contains(&n),
                _ => false,
            }
        }

        fn axis(&self, axis: JoyAxis) -> i16 {
            let model = self.model.borrow();
            match axis {
                JoyAxis::Pos(n) => model.axes.get(&n).copied().unwrap_or(0).max(0),
                JoyAxis::Neg(n) => model.axes.get(&n).copied().unwrap_or(0).min(0),
                JoyAxis::None => 0,
            }
        }

        fn set_rumble(&mut self, effect: RumbleEffect, strength: u16) -> bool {
            self.model.borrow_mut().rumble.push((effect, strength));
            true
        }
    }

    struct ScriptedPointer {
        touches: Rc<RefCell<Vec<(i16, i16)>>>,
    }

    impl ScriptedPointer {
        fn new() -> (ScriptedPointer, Rc<RefCell<Vec<(i16, i16)>>>)  {
            let touches = Rc::new(RefCell::new(Vec::new()));
            (ScriptedPointer { touches: Rc::clone(&touches) }, touches)
        }
    }

    impl PointerSource for ScriptedPointer {
        fn poll(&mut self) {}

        fn count(&self) -> usize {
            self.touches.borrow().len()
        }

        fn position(&self, index: usize) -> (i16, i16) {
            self.touches.borrow().get(index).copied().unwrap_or((0, 0))
        }

        fn pressed(&self, index: usize) -> bool {
            index < self.touches.borrow().len()
        }

        fn button(&self, _button: PointerButton) -> bool {
            false
        }
    }

    /// Movie stream over shared bytes, so tests can read what a dropped
    /// recording handle wrote.
    #[derive(Clone, Default)]
    struct SharedStream(Rc<RefCell<Cursor<Vec<u8>>>>);

    impl SharedStream {
        fn from_bytes(bytes: Vec<u8>) -> SharedStream {
            SharedStream(Rc::new(RefCell::new(Cursor::new(bytes))))
        }

        fn bytes(&self) -> Vec<u8> {
            self.0.borrow().get_ref().clone()
        }
    }

    impl Read for SharedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().read(buf)
        }
    }

    impl Write for SharedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for SharedStream {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.0.borrow_mut().seek(pos)
        }
    }

    impl MovieStream for SharedStream {
        fn truncate(&mut self, len: u64) -> std::io::Result<()> {
            self.0.borrow_mut().get_mut().truncate(len as usize);
            Ok(())
        }
    }

    fn joypad(ctx: &mut InputContext, port: usize, id: BindId) -> i16 {
        ctx.query(port, DeviceClass::Joypad, 0, id.index() as u32)
    }

    fn press_key(ctx: &mut InputContext, key: Key) {
        ctx.keyboard_event(true, key, 0, KeyMods::NONE);
    }

    fn release_key(ctx: &mut InputContext, key: Key) {
        ctx.keyboard_event(false, key, 0, KeyMods::NONE);
    }

    #[test]
    fn default_keyboard_binds_drive_port_zero() {
        let mut ctx = InputContext::default();
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);

        press_key(&mut ctx, Key::Z);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 1);
        assert_eq!(joypad(&mut ctx, 1, BindId::B), 0);

        release_key(&mut ctx, Key::Z);
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);
    }

    #[test]
    fn pad_button_drives_bound_slot() {
        let mut ctx = InputContext::default();
        let (pad, model) = ScriptedPad::new("scripted");
        ctx.set_joypad(0, Box::new(pad));
        ctx.binds_mut().configured_mut(0, BindId::A).unwrap().joy_button = JoyButton::Button(3);

        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::A), 0);

        model.borrow_mut().buttons.insert(3);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::A), 1);
    }

    #[test]
    fn port_map_merges_contributors() {
        let mut ctx = InputContext::default();
        let (pad0, model0) = ScriptedPad::new("first");
        let (pad1, model1) = ScriptedPad::new("second");
        ctx.set_joypad(0, Box::new(pad0));
        ctx.set_joypad(1, Box::new(pad1));
        ctx.binds_mut().configured_mut(0, BindId::Start).unwrap().joy_button =
            JoyButton::Button(9);
        ctx.binds_mut().configured_mut(1, BindId::Start).unwrap().joy_button =
            JoyButton::Button(9);
        ctx.remap_mut().set_remap_port(1, 0);

        model1.borrow_mut().buttons.insert(9);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::Start), 1);
        // Physical port 1 no longer feeds virtual port 1.
        assert_eq!(joypad(&mut ctx, 1, BindId::Start), 0);

        model1.borrow_mut().buttons.clear();
        model0.borrow_mut().buttons.insert(9);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::Start), 1);
    }

    #[test]
    fn detached_port_keeps_keyboard_sources() {
        let mut ctx = InputContext::default();
        let (pad, model) = ScriptedPad::new("scripted");
        ctx.set_joypad(0, Box::new(pad));
        ctx.binds_mut().configured_mut(0, BindId::B).unwrap().joy_button = JoyButton::Button(0);
        ctx.remap_mut().set_remap_port(0, MAX_PORTS);

        model.borrow_mut().buttons.insert(0);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);

        press_key(&mut ctx, Key::Z);
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 1);
    }

    #[test]
    fn remap_redirect_moves_button() {
        let mut ctx = InputContext::default();
        ctx.remap_mut().set_button(0, BindId::B, RemapTarget::Bind(BindId::A));

        press_key(&mut ctx, Key::Z);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::A), 1);
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);
    }

    #[test]
    fn remap_unmapped_suppresses_slot() {
        let mut ctx = InputContext::default();
        ctx.remap_mut().set_button(0, BindId::B, RemapTarget::Unmapped);

        press_key(&mut ctx, Key::Z);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);
    }

    #[test]
    fn key_remap_injects_keyboard_state() {
        let mut ctx = InputContext::default();
        ctx.remap_mut().set_key(0, BindId::B, Key::Q);

        press_key(&mut ctx, Key::Z);
        ctx.poll(None).unwrap();
        assert_eq!(
            ctx.query(0, DeviceClass::Keyboard, 0, Key::Q.code()),
            1
        );
        release_key(&mut ctx, Key::Z);
        ctx.poll(None).unwrap();
        assert_eq!(
            ctx.query(0, DeviceClass::Keyboard, 0, Key::Q.code()),
            0
        );
    }

    #[test]
    fn digital_to_analog_remap_reports_full_scale() {
        let mut ctx = InputContext::default();
        ctx.remap_mut()
            .set_button(0, BindId::B, RemapTarget::Bind(BindId::LeftXPlus));

        press_key(&mut ctx, Key::Z);
        ctx.poll(None).unwrap();
        assert_eq!(
            ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X),
            AXIS_RANGE
        );
    }

    #[test]
    fn stick_deadzone_zeroes_small_deflections() {
        let settings = InputSettings { axis_deadzone: 0.2, ..InputSettings::default() };
        let mut ctx = InputContext::new(settings);
        let (pad, model) = ScriptedPad::new("scripted");
        ctx.set_joypad(0, Box::new(pad));
        for (id, axis) in [
            (BindId::LeftXPlus, JoyAxis::Pos(0)),
            (BindId::LeftXMinus, JoyAxis::Neg(0)),
            (BindId::LeftYPlus, JoyAxis::Pos(1)),
            (BindId::LeftYMinus, JoyAxis::Neg(1)),
        ] {
            ctx.binds_mut().configured_mut(0, id).unwrap().joy_axis = axis;
        }

        model.borrow_mut().axes.insert(0, AXIS_RANGE);
        ctx.poll(None).unwrap();
        assert_eq!(
            ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X),
            AXIS_RANGE
        );

        model.borrow_mut().axes.insert(0, 4915);
        ctx.poll(None).unwrap();
        assert_eq!(
            ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X),
            0
        );
    }

    #[test]
    fn turbo_pulses_follow_duty_cycle() {
        let settings = InputSettings {
            turbo: TurboSettings { period: 4, duty_cycle: 2, ..TurboSettings::default() },
            ..InputSettings::default()
        };
        let mut ctx = InputContext::new(settings);
        ctx.binds_mut().configured_mut(0, BindId::TurboEnable).unwrap().key = Key::T;

        press_key(&mut ctx, Key::T);
        press_key(&mut ctx, Key::Z);
        let mut seen = Vec::new();
        for _ in 0..8 {
            ctx.poll(None).unwrap();
            seen.push(joypad(&mut ctx, 0, BindId::B));
        }
        assert_eq!(seen, vec![1, 1, 0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn unheld_keyboard_modifier_gates_keyboard_hotkeys() {
        let mut ctx = InputContext::default();
        ctx.binds_mut().configured_mut(0, BindId::EnableHotkey).unwrap().key = Key::LCtrl;

        // LoadState has a default key of F4; without the modifier held, the
        // keyboard trigger must stay silent.
        press_key(&mut ctx, Key::F4);
        ctx.poll(None).unwrap();
        assert!(!ctx.hotkey_pressed(BindId::LoadState));

        press_key(&mut ctx, Key::LCtrl);
        ctx.poll(None).unwrap();
        assert!(ctx.hotkey_pressed(BindId::LoadState));
    }

    #[test]
    fn held_modifier_blocks_standard_input_after_delay() {
        let settings = InputSettings { hotkey_block_delay: 2, ..InputSettings::default() };
        let mut ctx = InputContext::new(settings);
        ctx.binds_mut().configured_mut(0, BindId::EnableHotkey).unwrap().key = Key::LCtrl;

        press_key(&mut ctx, Key::Z);
        press_key(&mut ctx, Key::LCtrl);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 1);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 1);
        ctx.poll(None).unwrap();
        assert!(ctx.standard_blocked());
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);

        release_key(&mut ctx, Key::LCtrl);
        ctx.poll(None).unwrap();
        assert!(!ctx.standard_blocked());
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 1);
    }

    #[test]
    fn game_focus_toggle_ignores_missing_modifier() {
        let mut ctx = InputContext::default();
        ctx.binds_mut().configured_mut(0, BindId::EnableHotkey).unwrap().key = Key::LCtrl;
        ctx.binds_mut().configured_mut(0, BindId::GameFocusToggle).unwrap().key = Key::F10;

        press_key(&mut ctx, Key::F10);
        ctx.poll(None).unwrap();
        assert!(ctx.hotkey_pressed(BindId::GameFocusToggle));
        assert!(!ctx.hotkey_pressed(BindId::LoadState));
    }

    #[test]
    fn movie_records_and_replays_one_hundred_frames() {
        let mut ctx = InputContext::default();
        let (pad, model) = ScriptedPad::new("recorder");
        ctx.set_joypad(0, Box::new(pad));
        ctx.binds_mut().configured_mut(0, BindId::B).unwrap().joy_button = JoyButton::Button(0);
        ctx.binds_mut().configured_mut(0, BindId::A).unwrap().joy_button = JoyButton::Button(1);
        ctx.binds_mut().configured_mut(0, BindId::LeftXPlus).unwrap().joy_axis = JoyAxis::Pos(0);
        ctx.binds_mut().configured_mut(0, BindId::LeftXMinus).unwrap().joy_axis = JoyAxis::Neg(0);

        let stream = SharedStream::default();
        ctx.start_recording(Box::new(stream.clone()), 77).unwrap();

        let mut recorded = Vec::new();
        for frame in 0..100u16 {
            {
                let mut model = model.borrow_mut();
                model.buttons.clear();
                if frame % 3 == 0 {
                    model.buttons.insert(0);
                }
                if frame % 5 == 0 {
                    model.buttons.insert(1);
                }
                model.axes.insert(0, (frame * 37) as i16);
            }
            ctx.poll(None).unwrap();
            let b = joypad(&mut ctx, 0, BindId::B);
            let a = joypad(&mut ctx, 0, BindId::A);
            let x = ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X);
            recorded.push([b, a, x]);
        }
        ctx.stop_movie().unwrap();
        assert!(ctx.movie_mode().is_none());

        let bytes = SharedStream::bytes(&stream);
        assert!(!bytes.is_empty());

        let mut replay = InputContext::default();
        replay
            .start_playback(Box::new(SharedStream::from_bytes(bytes)))
            .unwrap();
        for row in &recorded {
            replay.poll(None).unwrap();
            assert_eq!(joypad(&mut replay, 0, BindId::B), row[0]);
            assert_eq!(joypad(&mut replay, 0, BindId::A), row[1]);
            assert_eq!(
                replay.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X),
                row[2]
            );
        }
        replay.poll(None).unwrap();
        replay.poll(None).unwrap();
        assert!(replay.movie_mode().is_none());
    }

    #[test]
    fn replayed_key_events_reach_the_core_queue() {
        let mut ctx = InputContext::default();
        let stream = SharedStream::default();
        ctx.start_recording(Box::new(stream.clone()), 5).unwrap();

        ctx.poll(None).unwrap();
        press_key(&mut ctx, Key::G);
        ctx.poll(None).unwrap();
        release_key(&mut ctx, Key::G);
        ctx.poll(None).unwrap();
        ctx.stop_movie().unwrap();

        let mut replay = InputContext::default();
        replay
            .start_playback(Box::new(SharedStream::from_bytes(SharedStream::bytes(&stream))))
            .unwrap();
        replay.poll(None).unwrap();
        replay.take_key_events();
        replay.poll(None).unwrap();
        let events = replay.take_key_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].down);
        assert_eq!(events[0].key, Key::G);
    }

    #[test]
    fn overlay_buttons_feed_port_zero_only() {
        let mut ctx = InputContext::default();
        let (pointer, touches) = ScriptedPointer::new();
        ctx.set_pointer(Box::new(pointer));
        let mut mask = BindMask::EMPTY;
        mask.set(BindId::B);
        let page = OverlayPage {
            name: "main".into(),
            elements: vec![OverlayElement::new(0.5, 0.5, 0.2, 0.2, ElementKind::Buttons(mask))],
        };
        ctx.set_overlay(Some(OverlaySet::new(vec![page])));

        touches.borrow_mut().push((0, 0));
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 1);
        assert_eq!(joypad(&mut ctx, 1, BindId::B), 0);

        touches.borrow_mut().clear();
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);
    }

    #[test]
    fn analog_dpad_mode_follows_core_analog_reads() {
        let mut ctx = InputContext::default();
        let (pad, model) = ScriptedPad::new("scripted");
        ctx.set_joypad(0, Box::new(pad));
        for (id, axis) in [
            (BindId::LeftXPlus, JoyAxis::Pos(0)),
            (BindId::LeftXMinus, JoyAxis::Neg(0)),
            (BindId::LeftYPlus, JoyAxis::Pos(1)),
            (BindId::LeftYMinus, JoyAxis::Neg(1)),
        ] {
            ctx.binds_mut().configured_mut(0, id).unwrap().joy_axis = axis;
        }
        model.borrow_mut().axes.insert(0, 30000);

        ctx.set_analog_dpad(0, AnalogDpadMode::LeftStick);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::Right), 1);
        assert_eq!(joypad(&mut ctx, 0, BindId::Left), 0);

        // The core read the stick, so the next frame leaves the d-pad alone.
        let _ = ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::Right), 0);

        ctx.set_analog_dpad(0, AnalogDpadMode::LeftStickForced);
        let _ = ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_X);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::Right), 1);
    }

    #[test]
    fn rumble_reaches_every_contributor() {
        let mut ctx = InputContext::default();
        let (pad0, model0) = ScriptedPad::new("first");
        let (pad1, model1) = ScriptedPad::new("second");
        ctx.set_joypad(0, Box::new(pad0));
        ctx.set_joypad(1, Box::new(pad1));
        ctx.remap_mut().set_remap_port(1, 0);

        assert!(ctx.set_rumble(0, RumbleEffect::Strong, 1000));
        assert_eq!(model0.borrow().rumble, vec![(RumbleEffect::Strong, 1000)]);
        assert_eq!(model1.borrow().rumble, vec![(RumbleEffect::Strong, 1000)]);
    }

    #[test]
    fn command_feed_is_port_agnostic_and_transient() {
        let mut ctx = InputContext::default();
        ctx.poll(None).unwrap();
        ctx.commands_mut().press(BindId::Start);
        assert_eq!(joypad(&mut ctx, 0, BindId::Start), 1);
        assert_eq!(joypad(&mut ctx, 3, BindId::Start), 1);

        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 0, BindId::Start), 0);
    }

    #[test]
    fn remote_feed_is_per_port() {
        let mut ctx = InputContext::default();
        ctx.poll(None).unwrap();
        ctx.remote_mut().set_button(1, BindId::A);
        ctx.remote_mut().set_analog(0, 0, 1, -5000);

        assert_eq!(joypad(&mut ctx, 1, BindId::A), 1);
        assert_eq!(joypad(&mut ctx, 0, BindId::A), 0);
        assert_eq!(
            ctx.query(0, DeviceClass::Analog, INDEX_ANALOG_LEFT, ID_ANALOG_Y),
            -5000
        );
    }

    #[test]
    fn mask_query_packs_pad_bits() {
        let mut ctx = InputContext::default();
        press_key(&mut ctx, Key::Z);
        press_key(&mut ctx, Key::X);
        ctx.poll(None).unwrap();
        let mask = ctx.query(0, DeviceClass::Joypad, 0, ID_JOYPAD_MASK) as u16;
        let expected = (1 << BindId::B.index()) | (1 << BindId::A.index());
        assert_eq!(mask, expected);
    }

    #[test]
    fn key_subscription_consumes_transitions() {
        let mut ctx = InputContext::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        ctx.subscribe_key(Box::new(move |event| {
            sink.borrow_mut().push(event.key);
            false
        }));

        press_key(&mut ctx, Key::G);
        assert_eq!(*seen.borrow(), vec![Key::G]);
        assert!(ctx.take_key_events().is_empty());

        press_key(&mut ctx, Key::H);
        let queued = ctx.take_key_events();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].key, Key::H);
    }

    #[test]
    fn silent_ports_and_classes_read_zero() {
        let mut ctx = InputContext::default();
        press_key(&mut ctx, Key::Z);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, MAX_PORTS, BindId::B), 0);

        ctx.set_device_class(0, DeviceClass::None);
        assert_eq!(joypad(&mut ctx, 0, BindId::B), 0);
    }

    #[test]
    fn pointer_class_passes_touch_state_through() {
        let mut ctx = InputContext::default();
        let (pointer, touches) = ScriptedPointer::new();
        ctx.set_pointer(Box::new(pointer));
        touches.borrow_mut().push((1200, -340));
        ctx.poll(None).unwrap();

        assert_eq!(ctx.query(0, DeviceClass::Pointer, 0, ID_POINTER_X), 1200);
        assert_eq!(ctx.query(0, DeviceClass::Pointer, 0, ID_POINTER_Y), -340);
        assert_eq!(ctx.query(0, DeviceClass::Pointer, 0, ID_POINTER_PRESSED), 1);
        assert_eq!(ctx.query(0, DeviceClass::Pointer, 1, ID_POINTER_PRESSED), 0);
    }

    #[test]
    fn autoconf_profile_binds_attached_pad() {
        let mut ctx = InputContext::default();
        let (pad, model) = ScriptedPad::new("Mega Controller");
        ctx.set_joypad(1, Box::new(pad));
        let profile = AutoconfProfile::from_toml(
            r#"
            device_name = "mega controller"

            [[binds]]
            bind = "a"
            button = "4"
            "#,
        )
        .unwrap();
        ctx.autoconfigure(&[profile]);

        model.borrow_mut().buttons.insert(4);
        ctx.poll(None).unwrap();
        assert_eq!(joypad(&mut ctx, 1, BindId::A), 1);
    }
}

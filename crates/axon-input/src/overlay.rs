//! On-screen overlay touch processing.
//!
//! An overlay is a set of pages, each a list of elements with normalized
//! [0,1]x[0,1] geometry. Every poll the active page hit-tests the current
//! touches and emits bind bits, analog pairs, and keyboard keys for the
//! aggregator to merge into port 0. Rendering is someone else's problem;
//! this module owns geometry and state only.

use serde::Deserialize;

use axon_types::binds::{BindId, BindMask, BIND_TABLE};
use axon_types::error::{AxonError, Result};
use axon_types::keys::Key;
use axon_types::settings::OverlaySettings;
use axon_types::{AXIS_RANGE, MAX_TOUCHES};

// ---- geometry ----

/// One touch point in normalized screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f32,
    pub y: f32,
}

/// Hitbox shape of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hitbox {
    Ellipse,
    Rect,
    None,
}

/// Which fixed four-way cluster an eight-way element drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EightWayArea {
    Dpad,
    ActionButtons,
}

impl EightWayArea {
    fn masks(self) -> [(BindId, BindId); 2] {
        // (up, down), (left, right)
        match self {
            EightWayArea::Dpad => {
                [(BindId::Up, BindId::Down), (BindId::Left, BindId::Right)]
            }
            EightWayArea::ActionButtons => {
                [(BindId::X, BindId::B), (BindId::Y, BindId::A)]
            }
        }
    }

    fn sensitivity(self, settings: &OverlaySettings) -> u32 {
        match self {
            EightWayArea::Dpad => settings.dpad_diagonal_sensitivity,
            EightWayArea::ActionButtons => settings.abxy_diagonal_sensitivity,
        }
    }
}

/// What an element emits when touched.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Plain buttons: all bits fire together.
    Buttons(BindMask),
    /// A four-direction cluster with diagonal zones.
    EightWay(EightWayArea),
    /// A virtual analog stick; `stick` 0 = left, 1 = right.
    Analog { stick: u32, saturate_pct: f32 },
    /// A virtual keyboard key.
    Key(Key),
}

/// One touchable element of an overlay page.
#[derive(Debug, Clone)]
pub struct OverlayElement {
    pub x: f32,
    pub y: f32,
    pub range_x: f32,
    pub range_y: f32,
    pub hitbox: Hitbox,
    pub kind: ElementKind,
    /// Per-edge reach factors for the held-state hitbox.
    pub reach_left: f32,
    pub reach_right: f32,
    pub reach_up: f32,
    pub reach_down: f32,
    /// Higher priority elements win overlaps.
    pub priority: i32,
    /// Swallow the touch so nothing below this element fires.
    pub exclusive: bool,
    /// Fingers touching this element as of the previous poll.
    touch_mask: u32,
}

impl OverlayElement {
    /// An ellipse button with default reach and priority.
    pub fn new(x: f32, y: f32, range_x: f32, range_y: f32, kind: ElementKind) -> OverlayElement {
        OverlayElement {
            x,
            y,
            range_x,
            range_y,
            hitbox: Hitbox::Ellipse,
            kind,
            reach_left: 1.0,
            reach_right: 1.0,
            reach_up: 1.0,
            reach_down: 1.0,
            priority: 0,
            exclusive: false,
            touch_mask: 0,
        }
    }

    /// Hit test against the base hitbox.
    fn inside(&self, touch: TouchPoint) -> bool {
        self.inside_box(touch, self.x, self.y, self.range_x, self.range_y)
    }

    /// Hit test against the reach-expanded hitbox used while a finger is
    /// already on the element.
    fn inside_expanded(&self, touch: TouchPoint, range_mod: f32) -> bool {
        let ext_left = self.range_x * range_mod * self.reach_left;
        let ext_right = self.range_x * range_mod * self.reach_right;
        let ext_up = self.range_y * range_mod * self.reach_up;
        let ext_down = self.range_y * range_mod * self.reach_down;
        let cx = self.x + (ext_right - ext_left) / 2.0;
        let cy = self.y + (ext_down - ext_up) / 2.0;
        self.inside_box(touch, cx, cy, (ext_left + ext_right) / 2.0, (ext_up + ext_down) / 2.0)
    }

    fn inside_box(&self, touch: TouchPoint, cx: f32, cy: f32, rx: f32, ry: f32) -> bool {
        match self.hitbox {
            Hitbox::Ellipse => {
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (touch.x - cx) / rx;
                let dy = (touch.y - cy) / ry;
                dx * dx + dy * dy <= 1.0
            }
            Hitbox::Rect => (touch.x - cx).abs() <= rx && (touch.y - cy).abs() <= ry,
            Hitbox::None => false,
        }
    }
}

// ---- output ----

/// Everything the active page emitted for one poll.
#[derive(Debug, Default, PartialEq)]
pub struct OverlayOutput {
    pub buttons: BindMask,
    /// Left X, left Y, right X, right Y.
    pub analog: [i16; 4],
    pub keys: Vec<Key>,
}

// ---- slope limits ----

/// Slope thresholds separating cardinal from diagonal zones.
///
/// `sensitivity` is the relative size of diagonal zones in percent; 100
/// gives all eight zones equal 45-degree spans.
fn eightway_slopes(sensitivity: u32) -> (f32, f32) {
    let f = 2.0 * sensitivity as f32 / (100.0 + sensitivity as f32);
    let high_angle = (f * 0.375 + (1.0 - f) * 0.25) * std::f32::consts::PI;
    let low_angle = (f * 0.125 + (1.0 - f) * 0.25) * std::f32::consts::PI;
    (low_angle.tan(), high_angle.tan())
}

// ---- pages and the set ----

/// One page of elements.
#[derive(Debug, Clone)]
pub struct OverlayPage {
    pub name: String,
    pub elements: Vec<OverlayElement>,
}

#[derive(Debug)]
struct PrevTouch {
    x: f32,
    y: f32,
    finger: usize,
}

/// A loaded overlay: pages, the active page index, and touch history.
#[derive(Debug)]
pub struct OverlaySet {
    pages: Vec<OverlayPage>,
    active: usize,
    prev_touches: Vec<PrevTouch>,
}

impl OverlaySet {
    /// Build a set from pages. Empty sets are valid and emit nothing.
    pub fn new(pages: Vec<OverlayPage>) -> OverlaySet {
        OverlaySet { pages, active: 0, prev_touches: Vec::new() }
    }

    /// Parse an overlay layout document.
    pub fn from_json(text: &str) -> Result<OverlaySet> {
        let doc: LayoutDoc = serde_json::from_str(text)?;
        let mut pages = Vec::with_capacity(doc.pages.len());
        for page in doc.pages {
            let mut elements = Vec::with_capacity(page.elements.len());
            for element in page.elements {
                elements.push(element.build()?);
            }
            pages.push(OverlayPage { name: page.name, elements });
        }
        Ok(OverlaySet::new(pages))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn active_page(&self) -> Option<&OverlayPage> {
        self.pages.get(self.active)
    }

    /// Cycle to the next page, releasing all touch state.
    pub fn next_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.active = (self.active + 1) % self.pages.len();
        self.prev_touches.clear();
        for element in &mut self.pages[self.active].elements {
            element.touch_mask = 0;
        }
        log::info!("overlay page switched to {}", self.pages[self.active].name);
    }

    /// Assign stable finger indices to this frame's touches by nearest
    /// previous touch.
    fn assign_fingers(&self, touches: &[TouchPoint]) -> Vec<usize> {
        let mut assigned = vec![usize::MAX; touches.len()];
        let mut claimed = vec![false; self.prev_touches.len()];

        for (i, touch) in touches.iter().enumerate() {
            let mut best: Option<(usize, f32)> = None;
            for (j, prev) in self.prev_touches.iter().enumerate() {
                if claimed[j] {
                    continue;
                }
                let dx = touch.x - prev.x;
                let dy = touch.y - prev.y;
                let dist = dx * dx + dy * dy;
                if best.map(|(_, d)| dist < d).unwrap_or(true) {
                    best = Some((j, dist));
                }
            }
            if let Some((j, _)) = best {
                claimed[j] = true;
                assigned[i] = self.prev_touches[j].finger;
            }
        }

        // unmatched touches take the lowest free finger slots
        for i in 0..assigned.len() {
            if assigned[i] == usize::MAX {
                assigned[i] = (0..MAX_TOUCHES)
                    .find(|f| !assigned.contains(f))
                    .unwrap_or(MAX_TOUCHES - 1);
            }
        }
        assigned
    }

    /// Process one frame of touches against the active page.
    pub fn poll(&mut self, touches: &[TouchPoint], settings: &OverlaySettings) -> OverlayOutput {
        let mut out = OverlayOutput::default();
        let touches = &touches[..touches.len().min(MAX_TOUCHES)];
        let fingers = self.assign_fingers(touches);

        let Some(page) = self.pages.get_mut(self.active) else {
            return out;
        };

        // highest priority first; ties keep declaration order
        let mut order: Vec<usize> = (0..page.elements.len()).collect();
        order.sort_by_key(|i| std::cmp::Reverse(page.elements[*i].priority));

        let mut new_masks = vec![0u32; page.elements.len()];
        for (touch, finger) in touches.iter().zip(&fingers) {
            for &i in &order {
                let element = &page.elements[i];
                let held = element.touch_mask & (1 << finger) != 0;
                let hit = if held {
                    element.inside_expanded(*touch, settings.range_mod)
                } else {
                    element.inside(*touch)
                };
                if !hit {
                    continue;
                }
                new_masks[i] |= 1 << finger;
                apply_element(element, *touch, settings, &mut out);
                if element.exclusive {
                    break;
                }
            }
        }

        for (element, mask) in page.elements.iter_mut().zip(new_masks) {
            element.touch_mask = mask;
        }
        self.prev_touches = touches
            .iter()
            .zip(fingers)
            .map(|(t, finger)| PrevTouch { x: t.x, y: t.y, finger })
            .collect();
        out
    }

    /// Forget all touch state, e.g. when the overlay is hidden.
    pub fn release(&mut self) {
        self.prev_touches.clear();
        for page in &mut self.pages {
            for element in &mut page.elements {
                element.touch_mask = 0;
            }
        }
    }
}

fn apply_element(
    element: &OverlayElement,
    touch: TouchPoint,
    settings: &OverlaySettings,
    out: &mut OverlayOutput,
) {
    match &element.kind {
        ElementKind::Buttons(mask) => {
            out.buttons = out.buttons.union(*mask);
        }
        ElementKind::EightWay(area) => {
            let (low, high) = eightway_slopes(area.sensitivity(settings));
            let x = touch.x - element.x;
            let y = element.y - touch.y; // up is positive
            let [(up, down), (left, right)] = area.masks();
            let vertical = y.abs() > x.abs() * high;
            let horizontal = y.abs() < x.abs() * low;
            if !horizontal && (y.abs() > 0.0 || x.abs() > 0.0) {
                out.buttons.set(if y >= 0.0 { up } else { down });
            }
            if !vertical && (y.abs() > 0.0 || x.abs() > 0.0) {
                out.buttons.set(if x >= 0.0 { right } else { left });
            }
        }
        ElementKind::Analog { stick, saturate_pct } => {
            if *stick > 1 || element.range_x <= 0.0 || element.range_y <= 0.0 {
                return;
            }
            let saturate = saturate_pct.max(0.01);
            let x_val = (touch.x - element.x) / element.range_x / saturate;
            let y_val = (touch.y - element.y) / element.range_y / saturate;
            let base = (*stick as usize) * 2;
            out.analog[base] = (x_val.clamp(-1.0, 1.0) * f32::from(AXIS_RANGE)) as i16;
            out.analog[base + 1] = (y_val.clamp(-1.0, 1.0) * f32::from(AXIS_RANGE)) as i16;
        }
        ElementKind::Key(key) => {
            if *key != Key::None && !out.keys.contains(key) {
                out.keys.push(*key);
            }
        }
    }
}

// ---- layout document ----

#[derive(Debug, Deserialize)]
struct LayoutDoc {
    #[serde(default)]
    pages: Vec<PageDoc>,
}

#[derive(Debug, Deserialize)]
struct PageDoc {
    name: String,
    #[serde(default)]
    elements: Vec<ElementDoc>,
}

#[derive(Debug, Deserialize)]
struct ElementDoc {
    x: f32,
    y: f32,
    range_x: f32,
    range_y: f32,
    #[serde(default = "default_hitbox")]
    hitbox: Hitbox,
    kind: KindDoc,
    #[serde(default = "one")]
    reach_left: f32,
    #[serde(default = "one")]
    reach_right: f32,
    #[serde(default = "one")]
    reach_up: f32,
    #[serde(default = "one")]
    reach_down: f32,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    exclusive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum KindDoc {
    Buttons { binds: Vec<String> },
    EightWay { area: EightWayArea },
    Analog {
        stick: u32,
        #[serde(default = "one")]
        saturate_pct: f32,
    },
    Key { key: String },
}

fn default_hitbox() -> Hitbox {
    Hitbox::Ellipse
}

fn one() -> f32 {
    1.0
}

impl ElementDoc {
    fn build(self) -> Result<OverlayElement> {
        let kind = match self.kind {
            KindDoc::Buttons { binds } => {
                let mut mask = BindMask::EMPTY;
                for name in &binds {
                    let desc = BIND_TABLE
                        .iter()
                        .find(|d| d.base == *name)
                        .ok_or_else(|| {
                            AxonError::Overlay(format!("unknown bind in layout: {name}"))
                        })?;
                    mask.set(desc.id);
                }
                ElementKind::Buttons(mask)
            }
            KindDoc::EightWay { area } => ElementKind::EightWay(area),
            KindDoc::Analog { stick, saturate_pct } => {
                if stick > 1 {
                    return Err(AxonError::Overlay(format!("bad analog stick index {stick}")));
                }
                ElementKind::Analog { stick, saturate_pct }
            }
            KindDoc::Key { key } => {
                let parsed = Key::from_name(&key);
                if parsed == Key::None && key != "nul" {
                    return Err(AxonError::Overlay(format!("unknown key in layout: {key}")));
                }
                ElementKind::Key(parsed)
            }
        };
        let mut element = OverlayElement::new(self.x, self.y, self.range_x, self.range_y, kind);
        element.hitbox = self.hitbox;
        element.reach_left = self.reach_left;
        element.reach_right = self.reach_right;
        element.reach_up = self.reach_up;
        element.reach_down = self.reach_down;
        element.priority = self.priority;
        element.exclusive = self.exclusive;
        Ok(element)
    }
}

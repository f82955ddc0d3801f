// Copyright 2026 the Vitrine Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Window-property integrations between producers and effects.
//!
//! A producer (an X11 property watcher, a protocol extension) decodes its
//! raw data into a payload and calls [`Registry::update`]. Every effect that
//! registered with [`Registry::add`] receives an [`Update`] record through
//! its callback. The registry keeps the last valid payload per window so a
//! subscriber added later is replayed the current state, in stacking order.
//!
//! Removal is explicit: when a producer goes away (property deleted, window
//! unmapped) the registry delivers one final record with `valid == false`,
//! and consumers drop whatever GPU resources they keyed by that window.
//!
//! Four integrations exist: blur regions, background contrast, sliding
//! popup hints and the screen fade state used while outputs are
//! reconfigured.
//!
//! The registry also owns the advertised capability of its integration.
//! The capability handler is told `true` when the first subscriber arrives
//! and `false` when the last one leaves.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::Vec2;
use vitrine_core::effect::EffectId;
use vitrine_core::region::Region;
use vitrine_core::time::Duration;
use vitrine_core::window::WindowId;

/// One record delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub struct Update<P> {
    /// The window the record is about. `None` is a reset: drop everything
    /// cached for this integration.
    pub window: Option<WindowId>,
    /// `false` when the producer for `window` went away.
    pub valid: bool,
    /// The payload. Default-valued when `valid` is `false`.
    pub payload: P,
}

/// Subscriber callback.
pub type UpdateFn<P> = Box<dyn FnMut(&Update<P>)>;

/// Called with `true` to advertise an integration and `false` to retract it.
pub type CapabilityFn = Box<dyn FnMut(bool)>;

/// Fan-out registry for one integration.
pub struct Registry<P> {
    subscribers: Vec<(EffectId, UpdateFn<P>)>,
    state: BTreeMap<WindowId, P>,
    capability: Option<CapabilityFn>,
    advertised: bool,
}

impl<P> core::fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("subscribers", &self.subscribers.len())
            .field("windows", &self.state.len())
            .field("advertised", &self.advertised)
            .finish_non_exhaustive()
    }
}

impl<P: Clone + Default> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone + Default> Registry<P> {
    /// Creates an empty registry with no capability handler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            state: BTreeMap::new(),
            capability: None,
            advertised: false,
        }
    }

    /// Installs the handler that advertises or retracts the capability.
    ///
    /// If subscribers already exist the handler is told `true` right away.
    pub fn set_capability_handler(&mut self, mut handler: CapabilityFn) {
        if self.advertised {
            handler(true);
        }
        self.capability = Some(handler);
    }

    /// Registers `effect` and replays the current state of every window in
    /// `stacking` (bottom to top) to the new callback.
    ///
    /// A second `add` for the same effect replaces its callback.
    pub fn add(&mut self, effect: EffectId, mut callback: UpdateFn<P>, stacking: &[WindowId]) {
        for &window in stacking {
            if let Some(payload) = self.state.get(&window) {
                callback(&Update {
                    window: Some(window),
                    valid: true,
                    payload: payload.clone(),
                });
            }
        }
        if let Some(slot) = self.subscribers.iter_mut().find(|(id, _)| *id == effect) {
            slot.1 = callback;
        } else {
            self.subscribers.push((effect, callback));
        }
        self.set_advertised(true);
    }

    /// Unregisters `effect`. Retracts the capability if none remain.
    pub fn remove(&mut self, effect: EffectId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(id, _)| *id != effect);
        let removed = self.subscribers.len() != before;
        if self.subscribers.is_empty() {
            self.set_advertised(false);
        }
        removed
    }

    /// Records the producer state for `window` and fans it out.
    ///
    /// `Some(payload)` is a valid update. `None` means the producer went
    /// away; it is delivered as `valid == false` only if a valid payload was
    /// recorded, so consumers see exactly one invalidation.
    pub fn update(&mut self, window: WindowId, payload: Option<P>) {
        let record = match payload {
            Some(payload) => {
                self.state.insert(window, payload.clone());
                Update {
                    window: Some(window),
                    valid: true,
                    payload,
                }
            }
            None => {
                if self.state.remove(&window).is_none() {
                    return;
                }
                Update {
                    window: Some(window),
                    valid: false,
                    payload: P::default(),
                }
            }
        };
        self.fan_out(&record);
    }

    /// Drops every recorded state and tells subscribers to reset.
    pub fn reset(&mut self) {
        self.state.clear();
        self.fan_out(&Update {
            window: None,
            valid: false,
            payload: P::default(),
        });
    }

    /// Invalidates `window` because it is being destroyed.
    pub fn window_removed(&mut self, window: WindowId) {
        self.update(window, None);
    }

    /// The last valid payload recorded for `window`.
    #[must_use]
    pub fn state(&self, window: WindowId) -> Option<&P> {
        self.state.get(&window)
    }

    /// Returns `true` if no effect is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Returns `true` while the capability is advertised.
    #[must_use]
    pub fn is_advertised(&self) -> bool {
        self.advertised
    }

    fn fan_out(&mut self, record: &Update<P>) {
        for (_, callback) in &mut self.subscribers {
            callback(record);
        }
    }

    fn set_advertised(&mut self, advertised: bool) {
        if self.advertised == advertised {
            return;
        }
        self.advertised = advertised;
        tracing::debug!(advertised, "integration capability changed");
        if let Some(handler) = &mut self.capability {
            handler(advertised);
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Blur-behind hint: the region (window-local) to blur. An empty region
/// means the whole window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlurPayload {
    /// Region to blur, relative to the window's top-left corner.
    pub region: Region,
}

/// Background-contrast hint.
#[derive(Clone, Debug, PartialEq)]
pub struct ContrastPayload {
    /// Region to apply the matrix to, window-local. Empty means the whole
    /// window.
    pub region: Region,
    /// Column-major 4×4 colour matrix.
    pub color: [f32; 16],
}

impl Default for ContrastPayload {
    fn default() -> Self {
        Self {
            region: Region::new(),
            color: IDENTITY_COLOR,
        }
    }
}

/// The identity colour matrix.
pub const IDENTITY_COLOR: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

/// Builds a colour matrix from contrast, intensity and saturation factors.
#[must_use]
pub fn color_matrix(contrast: f32, intensity: f32, saturation: f32) -> [f32; 16] {
    // Rec. 709 luminance weights.
    const R: f32 = 0.2126;
    const G: f32 = 0.7152;
    const B: f32 = 0.0722;
    let s = saturation;
    let sat = [
        (1.0 - s) * R + s, (1.0 - s) * R, (1.0 - s) * R, 0.0, //
        (1.0 - s) * G, (1.0 - s) * G + s, (1.0 - s) * G, 0.0, //
        (1.0 - s) * B, (1.0 - s) * B, (1.0 - s) * B + s, 0.0, //
        0.0, 0.0, 0.0, 1.0, //
    ];
    let t = (1.0 - contrast) / 2.0;
    let con = [
        contrast, 0.0, 0.0, 0.0, //
        0.0, contrast, 0.0, 0.0, //
        0.0, 0.0, contrast, 0.0, //
        t, t, t, 1.0, //
    ];
    let inten = [
        intensity, 0.0, 0.0, 0.0, //
        0.0, intensity, 0.0, 0.0, //
        0.0, 0.0, intensity, 0.0, //
        0.0, 0.0, 0.0, 1.0, //
    ];
    mul4(&mul4(&con, &inten), &sat)
}

fn mul4(a: &[f32; 16], b: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

/// Screen edge a sliding popup moves from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SlideEdge {
    /// Slide in from the left edge.
    Left,
    /// Slide in from the top edge.
    Top,
    /// Slide in from the right edge.
    Right,
    /// Slide in from the bottom edge.
    #[default]
    Bottom,
}

/// Sliding-popup hint.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SlidePayload {
    /// Edge to slide from.
    pub edge: SlideEdge,
    /// Distance of the window from that edge of the output, or `None` to
    /// let the effect compute it from the geometry.
    pub offset: Option<f64>,
    /// Slide-in duration; zero uses the configured default.
    pub in_duration: Duration,
    /// Slide-out duration; zero uses the configured default.
    pub out_duration: Duration,
    /// Slide distance in pixels; zero or negative uses the configured
    /// default.
    pub distance: f64,
}

impl SlidePayload {
    /// Offset of the popup relative to its edge, in pixels.
    #[must_use]
    pub fn translation(&self, amount: f64) -> Vec2 {
        match self.edge {
            SlideEdge::Left => Vec2::new(-amount, 0.0),
            SlideEdge::Top => Vec2::new(0.0, -amount),
            SlideEdge::Right => Vec2::new(amount, 0.0),
            SlideEdge::Bottom => Vec2::new(0.0, amount),
        }
    }
}

/// Screen fade state requested by the display configuration tool while it
/// reconfigures outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScreenState {
    /// Screens are shown normally.
    #[default]
    Normal,
    /// The tool asked for a fade to black.
    FadingOut,
    /// The compositor finished fading out.
    FadedOut,
    /// The tool is done; fade back in.
    FadingIn,
}

impl ScreenState {
    /// Decodes the raw property value. Unknown values yield `None`.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Normal),
            1 => Some(Self::FadingOut),
            2 => Some(Self::FadedOut),
            3 => Some(Self::FadingIn),
            _ => None,
        }
    }

    /// The raw property value.
    #[must_use]
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::FadingOut => 1,
            Self::FadedOut => 2,
            Self::FadingIn => 3,
        }
    }
}

/// Screen-state hint. Keyed by the window that carries the property, which
/// on X11 is the root window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KscreenPayload {
    /// Requested fade state.
    pub state: ScreenState,
}

/// Every integration registry the built-in effects subscribe to.
#[derive(Debug, Default)]
pub struct Integrations {
    /// Blur-behind regions.
    pub blur: Registry<BlurPayload>,
    /// Background contrast.
    pub contrast: Registry<ContrastPayload>,
    /// Sliding popups.
    pub slide: Registry<SlidePayload>,
    /// Screen fade state during output reconfiguration.
    pub kscreen: Registry<KscreenPayload>,
}

impl Integrations {
    /// Creates empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unregisters `effect` from every registry.
    pub fn remove_effect(&mut self, effect: EffectId) {
        self.blur.remove(effect);
        self.contrast.remove(effect);
        self.slide.remove(effect);
        self.kscreen.remove(effect);
    }

    /// Invalidates `window` in every registry.
    pub fn window_removed(&mut self, window: WindowId) {
        self.blur.window_removed(window);
        self.contrast.window_removed(window);
        self.slide.window_removed(window);
        self.kscreen.window_removed(window);
    }
}

// Strong typing over raw numbers. Newtypes for timestamps, slot ids and settle tokens.
// Config records are what the host passes in as JSON.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Timestamp in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// Host clocks (`performance.now()`) report fractional milliseconds.
    /// Negative or non-finite readings clamp to zero.
    pub fn from_millis(ms: f64) -> Self {
        if !ms.is_finite() || ms <= 0.0 {
            return Timestamp(0);
        }
        Timestamp((ms * 1000.0).round() as u64)
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn saturating_add_millis(&self, ms: u64) -> Self {
        Timestamp(self.0.saturating_add(ms.saturating_mul(1000)))
    }

    /// Microseconds elapsed since `earlier`, zero if the clock went backwards.
    pub fn micros_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Stable identifier of a slot (card key or section anchor id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        SlotId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        SlotId::new(id)
    }
}

/// One addressable unit in the tracked sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    /// Position along the tracked axis at the last measurement.
    /// `None` when the slot was not found in the layout.
    pub offset: Option<f64>,
    /// 0-based, contiguous.
    pub order: usize,
}

/// Axis a synchronizer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// The single source of truth for "what is in view".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum ActiveSlot {
    /// No slot is active (empty sequence, or page scrolled above every section).
    #[default]
    None,
    Slot(usize),
}

impl ActiveSlot {
    pub fn index(&self) -> Option<usize> {
        match self {
            ActiveSlot::None => None,
            ActiveSlot::Slot(index) => Some(*index),
        }
    }
}

/// How the host should perform a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    Smooth,
}

impl ScrollBehavior {
    /// Value for the DOM `ScrollToOptions.behavior` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollBehavior::Smooth => "smooth",
        }
    }
}

/// Identifies the settle window opened by one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettleToken(u64);

impl SettleToken {
    pub fn new(generation: u64) -> Self {
        SettleToken(generation)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Request handed to the host's scroll-to primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollCommand {
    pub axis: Axis,
    /// Target scroll offset along `axis`, in pixels.
    pub target: f64,
    pub behavior: ScrollBehavior,
    pub token: SettleToken,
}

/// Responsive slot width: applies from `min_viewport_width` upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub min_viewport_width: f64,
    pub slot_width: f64,
}

/// Carousel configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarouselConfig {
    /// Card ids in display order.
    #[serde(default)]
    pub cards: Vec<String>,
    /// Viewport width at construction time.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default = "default_breakpoints")]
    pub breakpoints: Vec<Breakpoint>,
    /// Time before scroll-driven recomputation resumes after a command.
    #[serde(default = "default_carousel_settle_delay")]
    pub settle_delay_ms: u64,
    /// Minimum spacing between applied scroll events. 0 disables debouncing.
    #[serde(default)]
    pub scroll_debounce_ms: u64,
    #[serde(default = "default_true")]
    pub wrap: bool,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        CarouselConfig {
            cards: Vec::new(),
            viewport_width: default_viewport_width(),
            breakpoints: default_breakpoints(),
            settle_delay_ms: default_carousel_settle_delay(),
            scroll_debounce_ms: 0,
            wrap: true,
        }
    }
}

impl CarouselConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.breakpoints.is_empty() {
            return Err(SyncError::InvalidConfig(
                "at least one breakpoint is required".to_string(),
            ));
        }
        for bp in &self.breakpoints {
            check_non_negative("breakpoints.min_viewport_width", bp.min_viewport_width)?;
            if !bp.slot_width.is_finite() || bp.slot_width <= 0.0 {
                return Err(SyncError::InvalidConfig(format!(
                    "slot_width must be positive, got {}",
                    bp.slot_width
                )));
            }
        }
        check_non_negative("viewport_width", self.viewport_width)?;
        check_unique_ids(self.cards.iter().map(String::as_str))
    }
}

fn default_viewport_width() -> f64 {
    1024.0
}

fn default_breakpoints() -> Vec<Breakpoint> {
    vec![
        Breakpoint {
            min_viewport_width: 0.0,
            slot_width: 320.0,
        },
        Breakpoint {
            min_viewport_width: 768.0,
            slot_width: 416.0,
        },
    ]
}

fn default_carousel_settle_delay() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

/// A section as measured by the host: its anchor id and top offset.
/// `top` is `None` when the element was not found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionProbe {
    pub id: String,
    #[serde(default)]
    pub top: Option<f64>,
}

impl SectionProbe {
    pub fn new(id: impl Into<String>, top: Option<f64>) -> Self {
        SectionProbe {
            id: id.into(),
            top,
        }
    }
}

/// Section tracker configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Sections in page order.
    #[serde(default)]
    pub sections: Vec<SectionProbe>,
    /// Measured nav-bar height. `None` falls back to the default height.
    #[serde(default)]
    pub nav_height_px: Option<f64>,
    /// Extra space left above a section when scrolling to it.
    #[serde(default = "default_nav_gap")]
    pub nav_gap_px: f64,
    /// Sections become active this far before their top reaches the nav bar.
    #[serde(default = "default_look_ahead")]
    pub look_ahead_px: f64,
    /// At or above this offset no section is active.
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold_px: f64,
    /// Past this offset the nav bar switches to its scrolled appearance.
    #[serde(default = "default_elevated_threshold")]
    pub elevated_threshold_px: f64,
    #[serde(default = "default_section_settle_delay")]
    pub settle_delay_ms: u64,
    #[serde(default)]
    pub scroll_debounce_ms: u64,
    #[serde(default)]
    pub wrap: bool,
}

impl Default for SectionConfig {
    fn default() -> Self {
        SectionConfig {
            sections: Vec::new(),
            nav_height_px: None,
            nav_gap_px: default_nav_gap(),
            look_ahead_px: default_look_ahead(),
            scroll_threshold_px: default_scroll_threshold(),
            elevated_threshold_px: default_elevated_threshold(),
            settle_delay_ms: default_section_settle_delay(),
            scroll_debounce_ms: 0,
            wrap: false,
        }
    }
}

impl SectionConfig {
    pub fn validate(&self) -> Result<(), SyncError> {
        check_non_negative("nav_gap_px", self.nav_gap_px)?;
        check_non_negative("look_ahead_px", self.look_ahead_px)?;
        check_non_negative("scroll_threshold_px", self.scroll_threshold_px)?;
        check_non_negative("elevated_threshold_px", self.elevated_threshold_px)?;
        if let Some(height) = self.nav_height_px {
            check_non_negative("nav_height_px", height)?;
        }
        check_unique_ids(self.sections.iter().map(|s| s.id.as_str()))
    }
}

fn default_nav_gap() -> f64 {
    10.0
}

fn default_look_ahead() -> f64 {
    100.0
}

fn default_scroll_threshold() -> f64 {
    50.0
}

fn default_elevated_threshold() -> f64 {
    20.0
}

fn default_section_settle_delay() -> u64 {
    600
}

fn check_non_negative(field: &str, value: f64) -> Result<(), SyncError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SyncError::InvalidConfig(format!(
            "{field} must be a finite non-negative number, got {value}"
        )))
    }
}

pub(crate) fn check_unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), SyncError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SyncError::InvalidConfig(format!("duplicate slot id: {id}")));
        }
    }
    Ok(())
}

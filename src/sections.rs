// Scroll section tracker: highlights the nav link of the section in view.
// Also owns the nav bar's "scrolled" elevation and deep-link anchors.
// See DESIGN.md: sections

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::error::SyncError;
use crate::events::{ReportBuilder, SyncBatch, SyncEventType, SyncReport};
use crate::host::{js_error, token_from_js, ScrollBridge, Settles};
use crate::synchronizer::{SlotLayout, StartAt, SyncOptions, ViewportSynchronizer};
use crate::types::*;

/// Nav bar height assumed when the nav element could not be measured.
pub const DEFAULT_NAV_HEIGHT_PX: f64 = 80.0;

/// Measured page sections plus the geometry used to map offsets to them.
#[derive(Debug, Clone)]
pub struct SectionLayout {
    slots: Vec<Slot>,
    nav_height: f64,
    nav_gap: f64,
    look_ahead: f64,
    threshold: f64,
}

impl SectionLayout {
    /// Build a layout from host measurements. Missing values degrade to
    /// defaults (nav height) or unmeasured slots (sections), never errors.
    pub fn measure(probes: &[SectionProbe], nav_height: Option<f64>, config: &SectionConfig) -> Self {
        let nav_height = match nav_height.filter(|h| h.is_finite() && *h >= 0.0) {
            Some(height) => height,
            None => {
                tracing::warn!(
                    ?nav_height,
                    fallback = DEFAULT_NAV_HEIGHT_PX,
                    "nav bar not measured, using default height"
                );
                DEFAULT_NAV_HEIGHT_PX
            }
        };

        let slots = probes
            .iter()
            .enumerate()
            .map(|(order, probe)| {
                let offset = probe.top.filter(|top| top.is_finite());
                if offset.is_none() {
                    tracing::warn!(id = %probe.id, "section not found in layout");
                }
                Slot {
                    id: SlotId::new(probe.id.as_str()),
                    offset,
                    order,
                }
            })
            .collect();

        SectionLayout {
            slots,
            nav_height,
            nav_gap: config.nav_gap_px,
            look_ahead: config.look_ahead_px,
            threshold: config.scroll_threshold_px,
        }
    }

    pub fn nav_height(&self) -> f64 {
        self.nav_height
    }
}

impl SlotLayout for SectionLayout {
    fn axis(&self) -> Axis {
        Axis::Vertical
    }

    fn slots(&self) -> &[Slot] {
        &self.slots
    }

    fn resolve(&self, position: f64) -> ActiveSlot {
        // Near the top of the page nothing is highlighted, not even the first section.
        if position <= self.threshold {
            return ActiveSlot::None;
        }

        // Last section (in page order) whose top has come within reach wins.
        self.slots
            .iter()
            .rev()
            .find(|slot| {
                slot.offset
                    .is_some_and(|top| top - self.nav_height - self.look_ahead <= position)
            })
            .map_or(ActiveSlot::None, |slot| ActiveSlot::Slot(slot.order))
    }

    fn scroll_target(&self, index: usize) -> Option<f64> {
        let top = self.slots.get(index)?.offset?;
        Some((top - self.nav_height - self.nav_gap).max(0.0))
    }
}

fn sync_options(config: &SectionConfig) -> SyncOptions {
    SyncOptions {
        settle_delay_ms: config.settle_delay_ms,
        scroll_debounce_ms: config.scroll_debounce_ms,
        wrap: config.wrap,
        start: StartAt::Nothing,
    }
}

/// Navigation bar state for the home page.
#[derive(Debug, Clone)]
pub struct SectionTracker {
    sync: ViewportSynchronizer<SectionLayout>,
    config: SectionConfig,
    elevated: bool,
    pending_anchor: Option<String>,
}

impl SectionTracker {
    pub fn new(config: SectionConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let layout = SectionLayout::measure(&config.sections, config.nav_height_px, &config);
        Ok(SectionTracker {
            sync: ViewportSynchronizer::new(layout, sync_options(&config)),
            config,
            elevated: false,
            pending_anchor: None,
        })
    }

    pub fn from_json(config_json: &str) -> Result<Self, SyncError> {
        let config: SectionConfig = serde_json::from_str(config_json)?;
        Self::new(config)
    }

    pub fn go_to(&mut self, index: usize, now: Timestamp) -> Option<ScrollCommand> {
        self.sync.go_to(index, now)
    }

    /// Nav link click.
    pub fn go_to_id(&mut self, id: &str, now: Timestamp) -> Option<ScrollCommand> {
        match self.sync.index_of(id) {
            Some(index) => self.sync.go_to(index, now),
            None => {
                let err = SyncError::UnknownSlot(id.to_string());
                tracing::debug!(%err, "ignoring nav click");
                None
            }
        }
    }

    pub fn next(&mut self, now: Timestamp) -> Option<ScrollCommand> {
        self.sync.next(now)
    }

    pub fn previous(&mut self, now: Timestamp) -> Option<ScrollCommand> {
        self.sync.previous(now)
    }

    /// Feed the page's `scrollY`. Elevation follows every event; the active
    /// section only outside a settle window.
    pub fn on_scroll(&mut self, scroll_y: f64, now: Timestamp) -> Option<ActiveSlot> {
        if scroll_y.is_finite() {
            self.elevated = scroll_y > self.config.elevated_threshold_px;
        }
        self.sync.on_scroll(scroll_y, now)
    }

    pub fn tick(&mut self, now: Timestamp) -> Option<ActiveSlot> {
        self.sync.tick(now)
    }

    pub fn complete_scroll(&mut self, token: SettleToken) -> bool {
        self.sync.complete_scroll(token)
    }

    /// Sections or nav bar re-measured (mount, resize, content load).
    /// Issues a deferred anchor scroll once its section can be located.
    pub fn resize(
        &mut self,
        probes: Vec<SectionProbe>,
        nav_height: Option<f64>,
        now: Timestamp,
    ) -> Option<ScrollCommand> {
        if let Err(err) = check_unique_ids(probes.iter().map(|p| p.id.as_str())) {
            tracing::warn!(%err, "ignoring re-measure with duplicate section ids");
            return None;
        }
        self.config.sections = probes;
        self.config.nav_height_px = nav_height;
        let layout = SectionLayout::measure(&self.config.sections, nav_height, &self.config);
        self.sync.measure(layout);

        let anchor = self.pending_anchor.take()?;
        self.request_anchor(&anchor, now)
    }

    /// Scroll to the section named by a URL fragment (`#contact` or `contact`).
    /// Kept for the next `resize` if the section is not measured yet.
    pub fn request_anchor(&mut self, hash: &str, now: Timestamp) -> Option<ScrollCommand> {
        let id = hash.trim_start_matches('#');
        if id.is_empty() {
            return None;
        }

        match self.sync.index_of(id) {
            Some(index) if self.sync.layout().scroll_target(index).is_some() => {
                self.pending_anchor = None;
                self.sync.go_to(index, now)
            }
            Some(_) => {
                self.pending_anchor = Some(id.to_string());
                None
            }
            None if self.sync.slot_count() == 0 => {
                self.pending_anchor = Some(id.to_string());
                None
            }
            None => {
                tracing::debug!(%id, "anchor does not name a section");
                None
            }
        }
    }

    pub fn active(&self) -> ActiveSlot {
        self.sync.active()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.sync.active_id().map(SlotId::as_str)
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    pub fn pending_anchor(&self) -> Option<&str> {
        self.pending_anchor.as_deref()
    }

    pub fn nav_height(&self) -> f64 {
        self.sync.layout().nav_height()
    }

    pub fn is_settling(&self, now: Timestamp) -> bool {
        self.sync.is_settling(now)
    }

    /// Apply a batch of events in order.
    pub fn process(&mut self, batch: &SyncBatch) -> SyncReport {
        let mut report = ReportBuilder::new(self.active());

        for event in &batch.events {
            let now = event.timestamp();
            match &event.event_type {
                SyncEventType::Scroll { position } => {
                    self.on_scroll(*position, now);
                }
                SyncEventType::GoTo { index } => report.command(self.go_to(*index, now)),
                SyncEventType::GoToId { id } => report.command(self.go_to_id(id, now)),
                SyncEventType::Next => report.command(self.next(now)),
                SyncEventType::Previous => report.command(self.previous(now)),
                SyncEventType::ScrollSettled { token } => {
                    self.complete_scroll(*token);
                }
                SyncEventType::Tick => {
                    self.tick(now);
                }
                SyncEventType::SectionsMeasured {
                    sections,
                    nav_height_px,
                } => report.command(self.resize(sections.clone(), *nav_height_px, now)),
                SyncEventType::Anchor { hash } => report.command(self.request_anchor(hash, now)),
                SyncEventType::ViewportResized { .. } => {
                    tracing::debug!("viewport width does not affect sections");
                }
            }
            report.observe(self.active());
        }

        report.finish(self.active_id().map(str::to_string), Some(self.elevated))
    }
}

impl Settles for SectionTracker {
    fn complete_scroll(&mut self, token: SettleToken) -> bool {
        SectionTracker::complete_scroll(self, token)
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

/// WASM-exposed section tracker for the navigation bar.
///
/// # Example JSON Config
/// ```json
/// {
///   "sections": [
///     { "id": "about", "top": 800 },
///     { "id": "services", "top": 1600 },
///     { "id": "contact", "top": 2400 }
///   ],
///   "nav_height_px": 80
/// }
/// ```
#[wasm_bindgen]
pub struct WasmSectionTracker {
    inner: Rc<RefCell<SectionTracker>>,
    bridge: ScrollBridge,
}

#[wasm_bindgen]
impl WasmSectionTracker {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSectionTracker, JsValue> {
        let tracker = SectionTracker::from_json(config_json).map_err(js_error)?;
        Ok(WasmSectionTracker {
            inner: Rc::new(RefCell::new(tracker)),
            bridge: ScrollBridge::default(),
        })
    }

    /// Register `scrollTo(target, behavior, token)`; see `WasmCarousel`.
    pub fn set_scroll_handler(&mut self, handler: js_sys::Function) {
        self.bridge.set_handler(handler);
    }

    pub fn go_to_id(&self, id: &str, now_ms: f64) -> bool {
        let command = self
            .inner
            .borrow_mut()
            .go_to_id(id, Timestamp::from_millis(now_ms));
        self.issue(command)
    }

    pub fn go_to(&self, index: u32, now_ms: f64) -> bool {
        let command = self
            .inner
            .borrow_mut()
            .go_to(index as usize, Timestamp::from_millis(now_ms));
        self.issue(command)
    }

    /// Feed `window.scrollY`. Returns true if the active section changed.
    pub fn on_scroll(&self, scroll_y: f64, now_ms: f64) -> bool {
        self.inner
            .borrow_mut()
            .on_scroll(scroll_y, Timestamp::from_millis(now_ms))
            .is_some()
    }

    pub fn tick(&self, now_ms: f64) -> bool {
        self.inner
            .borrow_mut()
            .tick(Timestamp::from_millis(now_ms))
            .is_some()
    }

    pub fn scroll_settled(&self, token: f64) -> bool {
        token_from_js(token)
            .map(|token| self.inner.borrow_mut().complete_scroll(token))
            .unwrap_or(false)
    }

    /// Re-measure from a JSON array of `{ id, top }` probes.
    /// `nav_height` is `undefined` when the nav element was not found.
    pub fn resize(
        &self,
        sections_json: &str,
        nav_height: Option<f64>,
        now_ms: f64,
    ) -> Result<bool, JsValue> {
        let probes: Vec<SectionProbe> = serde_json::from_str(sections_json)
            .map_err(|e| js_error(SyncError::from(e)))?;
        let command = self
            .inner
            .borrow_mut()
            .resize(probes, nav_height, Timestamp::from_millis(now_ms));
        Ok(self.issue(command))
    }

    /// Deep link: `location.hash` on arrival.
    pub fn request_anchor(&self, hash: &str, now_ms: f64) -> bool {
        let command = self
            .inner
            .borrow_mut()
            .request_anchor(hash, Timestamp::from_millis(now_ms));
        self.issue(command)
    }

    pub fn active_id(&self) -> Option<String> {
        self.inner.borrow().active_id().map(str::to_string)
    }

    pub fn is_elevated(&self) -> bool {
        self.inner.borrow().is_elevated()
    }

    pub fn process_events(&self, batch_json: &str) -> Result<String, JsValue> {
        let batch: SyncBatch = serde_json::from_str(batch_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid events: {}", e)))?;

        let report = self.inner.borrow_mut().process(&batch);
        self.bridge.dispatch_all(&self.inner, &report.commands);

        serde_json::to_string(&report)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

impl WasmSectionTracker {
    fn issue(&self, command: Option<ScrollCommand>) -> bool {
        match command {
            Some(command) => {
                self.bridge.dispatch(&self.inner, &command);
                true
            }
            None => false,
        }
    }
}

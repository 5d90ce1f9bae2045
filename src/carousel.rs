// Carousel index tracker: horizontally snapping cards, prev/next arrows, dots.
// Slot width depends on the viewport breakpoint and is re-measured on resize.
// See DESIGN.md: carousel

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::error::SyncError;
use crate::events::{ReportBuilder, SyncBatch, SyncEventType, SyncReport};
use crate::host::{js_error, token_from_js, ScrollBridge, Settles};
use crate::synchronizer::{SlotLayout, StartAt, SyncOptions, ViewportSynchronizer};
use crate::types::*;

/// Card width used when no breakpoint yields a usable width.
pub const FALLBACK_SLOT_WIDTH: f64 = 416.0;

/// Measured carousel: equally wide cards laid out from offset 0.
#[derive(Debug, Clone)]
pub struct CarouselLayout {
    slots: Vec<Slot>,
    slot_width: f64,
}

impl CarouselLayout {
    /// Lay out `cards` for a viewport `viewport_width` pixels wide.
    pub fn measure(cards: &[String], viewport_width: f64, breakpoints: &[Breakpoint]) -> Self {
        let slot_width = slot_width_for(viewport_width, breakpoints);
        let slots = cards
            .iter()
            .enumerate()
            .map(|(order, id)| Slot {
                id: SlotId::new(id.as_str()),
                offset: Some(slot_width * order as f64),
                order,
            })
            .collect();

        CarouselLayout { slots, slot_width }
    }

    pub fn slot_width(&self) -> f64 {
        self.slot_width
    }
}

impl SlotLayout for CarouselLayout {
    fn axis(&self) -> Axis {
        Axis::Horizontal
    }

    fn slots(&self) -> &[Slot] {
        &self.slots
    }

    fn resolve(&self, position: f64) -> ActiveSlot {
        let Some(last) = self.slots.len().checked_sub(1) else {
            return ActiveSlot::None;
        };
        let snapped = (position / self.slot_width).round();
        if snapped <= 0.0 {
            return ActiveSlot::Slot(0);
        }
        ActiveSlot::Slot((snapped as usize).min(last))
    }

    fn scroll_target(&self, index: usize) -> Option<f64> {
        self.slots.get(index).and_then(|slot| slot.offset)
    }
}

/// Pick the card width for a viewport: the widest breakpoint that applies,
/// else the narrowest one defined.
fn slot_width_for(viewport_width: f64, breakpoints: &[Breakpoint]) -> f64 {
    let applicable = breakpoints
        .iter()
        .filter(|bp| bp.min_viewport_width <= viewport_width)
        .max_by(|a, b| a.min_viewport_width.total_cmp(&b.min_viewport_width))
        .or_else(|| {
            breakpoints
                .iter()
                .min_by(|a, b| a.min_viewport_width.total_cmp(&b.min_viewport_width))
        });

    match applicable.map(|bp| bp.slot_width) {
        Some(width) if width.is_finite() && width > 0.0 => width,
        other => {
            tracing::warn!(?other, viewport_width, "no usable card width, using fallback");
            FALLBACK_SLOT_WIDTH
        }
    }
}

fn sync_options(config: &CarouselConfig) -> SyncOptions {
    SyncOptions {
        settle_delay_ms: config.settle_delay_ms,
        scroll_debounce_ms: config.scroll_debounce_ms,
        wrap: config.wrap,
        start: StartAt::First,
    }
}

/// Services carousel state.
#[derive(Debug, Clone)]
pub struct CarouselTracker {
    sync: ViewportSynchronizer<CarouselLayout>,
    config: CarouselConfig,
}

impl CarouselTracker {
    pub fn new(config: CarouselConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let layout = CarouselLayout::measure(
            &config.cards,
            config.viewport_width,
            &config.breakpoints,
        );
        Ok(CarouselTracker {
            sync: ViewportSynchronizer::new(layout, sync_options(&config)),
            config,
        })
    }

    pub fn from_json(config_json: &str) -> Result<Self, SyncError> {
        let config: CarouselConfig = serde_json::from_str(config_json)?;
        Self::new(config)
    }

    /// Dot click.
    pub fn go_to(&mut self, index: usize, now: Timestamp) -> Option<ScrollCommand> {
        self.sync.go_to(index, now)
    }

    /// Right arrow; wraps to the first card.
    pub fn next(&mut self, now: Timestamp) -> Option<ScrollCommand> {
        self.sync.next(now)
    }

    /// Left arrow; wraps to the last card.
    pub fn previous(&mut self, now: Timestamp) -> Option<ScrollCommand> {
        self.sync.previous(now)
    }

    /// Manual drag/swipe of the card row.
    pub fn on_scroll(&mut self, scroll_left: f64, now: Timestamp) -> Option<ActiveSlot> {
        self.sync.on_scroll(scroll_left, now)
    }

    pub fn tick(&mut self, now: Timestamp) -> Option<ActiveSlot> {
        self.sync.tick(now)
    }

    pub fn complete_scroll(&mut self, token: SettleToken) -> bool {
        self.sync.complete_scroll(token)
    }

    /// Viewport resized; card width may have crossed a breakpoint.
    pub fn resize(&mut self, viewport_width: f64) {
        if !viewport_width.is_finite() || viewport_width < 0.0 {
            tracing::warn!(viewport_width, "ignoring invalid viewport width");
            return;
        }
        self.config.viewport_width = viewport_width;
        self.sync.measure(self.measure());
    }

    /// New card data. Selection returns to the first card.
    pub fn set_cards(&mut self, cards: Vec<String>) -> Result<(), SyncError> {
        let config = CarouselConfig {
            cards,
            ..self.config.clone()
        };
        config.validate()?;
        self.config = config;
        self.sync.reset(self.measure(), StartAt::First);
        Ok(())
    }

    pub fn current_index(&self) -> Option<usize> {
        self.sync.active().index()
    }

    pub fn active(&self) -> ActiveSlot {
        self.sync.active()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.sync.active_id().map(SlotId::as_str)
    }

    pub fn card_count(&self) -> usize {
        self.sync.slot_count()
    }

    pub fn slot_width(&self) -> f64 {
        self.sync.layout().slot_width()
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
                SyncEventType::GoToId { id } => match self.sync.index_of(id) {
                    Some(index) => report.command(self.go_to(index, now)),
                    None => tracing::debug!(%id, "no card with this id"),
                },
                SyncEventType::Next => report.command(self.next(now)),
                SyncEventType::Previous => report.command(self.previous(now)),
                SyncEventType::ScrollSettled { token } => {
                    self.complete_scroll(*token);
                }
                SyncEventType::Tick => {
                    self.tick(now);
                }
                SyncEventType::ViewportResized { width } => self.resize(*width),
                SyncEventType::SectionsMeasured { .. } | SyncEventType::Anchor { .. } => {
                    tracing::debug!(event = ?event.event_type, "not a carousel event");
                }
            }
            report.observe(self.active());
        }

        report.finish(self.active_id().map(str::to_string), None)
    }

    fn measure(&self) -> CarouselLayout {
        CarouselLayout::measure(
            &self.config.cards,
            self.config.viewport_width,
            &self.config.breakpoints,
        )
    }
}

impl Settles for CarouselTracker {
    fn complete_scroll(&mut self, token: SettleToken) -> bool {
        CarouselTracker::complete_scroll(self, token)
    }
}

// =============================================================================
// WASM Bindings
// =============================================================================

/// WASM-exposed carousel tracker.
///
/// # Example JSON Config
/// ```json
/// {
///   "cards": ["audit", "solar", "storage", "consulting"],
///   "viewport_width": 1280,
///   "settle_delay_ms": 500
/// }
/// ```
#[wasm_bindgen]
pub struct WasmCarousel {
    inner: Rc<RefCell<CarouselTracker>>,
    bridge: ScrollBridge,
}

#[wasm_bindgen]
impl WasmCarousel {
    /// Create a tracker from a JSON `CarouselConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmCarousel, JsValue> {
        let tracker = CarouselTracker::from_json(config_json).map_err(js_error)?;
        Ok(WasmCarousel {
            inner: Rc::new(RefCell::new(tracker)),
            bridge: ScrollBridge::default(),
        })
    }

    /// Register `scrollTo(target, behavior, token)`. If it returns a Promise,
    /// resolution ends the settle window early.
    pub fn set_scroll_handler(&mut self, handler: js_sys::Function) {
        self.bridge.set_handler(handler);
    }

    pub fn go_to(&self, index: u32, now_ms: f64) -> bool {
        let command = self
            .inner
            .borrow_mut()
            .go_to(index as usize, Timestamp::from_millis(now_ms));
        self.issue(command)
    }

    pub fn next(&self, now_ms: f64) -> bool {
        let command = self.inner.borrow_mut().next(Timestamp::from_millis(now_ms));
        self.issue(command)
    }

    pub fn previous(&self, now_ms: f64) -> bool {
        let command = self
            .inner
            .borrow_mut()
            .previous(Timestamp::from_millis(now_ms));
        self.issue(command)
    }

    /// Feed the container's `scrollLeft`. Returns true if the index changed.
    pub fn on_scroll(&self, scroll_left: f64, now_ms: f64) -> bool {
        self.inner
            .borrow_mut()
            .on_scroll(scroll_left, Timestamp::from_millis(now_ms))
            .is_some()
    }

    pub fn tick(&self, now_ms: f64) -> bool {
        self.inner
            .borrow_mut()
            .tick(Timestamp::from_millis(now_ms))
            .is_some()
    }

    /// Manual completion signal for hosts whose scroll primitive has no Promise.
    pub fn scroll_settled(&self, token: f64) -> bool {
        token_from_js(token)
            .map(|token| self.inner.borrow_mut().complete_scroll(token))
            .unwrap_or(false)
    }

    pub fn resize(&self, viewport_width: f64) {
        self.inner.borrow_mut().resize(viewport_width);
    }

    /// Replace the cards with a JSON array of ids.
    pub fn set_cards(&self, cards_json: &str) -> Result<(), JsValue> {
        let cards: Vec<String> = serde_json::from_str(cards_json)
            .map_err(|e| js_error(SyncError::from(e)))?;
        self.inner.borrow_mut().set_cards(cards).map_err(js_error)
    }

    pub fn current_index(&self) -> Option<u32> {
        self.inner.borrow().current_index().map(|i| i as u32)
    }

    pub fn card_count(&self) -> u32 {
        self.inner.borrow().card_count() as u32
    }

    pub fn slot_width(&self) -> f64 {
        self.inner.borrow().slot_width()
    }

    /// Batch entry point: JSON `SyncBatch` in, JSON `SyncReport` out.
    /// Commands in the report are also handed to the scroll handler.
    pub fn process_events(&self, batch_json: &str) -> Result<String, JsValue> {
        let batch: SyncBatch = serde_json::from_str(batch_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid events: {}", e)))?;

        let report = self.inner.borrow_mut().process(&batch);
        self.bridge.dispatch_all(&self.inner, &report.commands);

        serde_json::to_string(&report)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

impl WasmCarousel {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SyncEvent;

    fn cards(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("card-{i}")).collect()
    }

    fn tracker(n: usize, viewport_width: f64) -> CarouselTracker {
        CarouselTracker::new(CarouselConfig {
            cards: cards(n),
            viewport_width,
            ..Default::default()
        })
        .expect("valid config")
    }

    fn ms(ms: u64) -> Timestamp {
        Timestamp::from_micros(ms * 1000)
    }

    #[test]
    fn card_width_follows_breakpoints() {
        assert_eq!(tracker(3, 375.0).slot_width(), 320.0);
        assert_eq!(tracker(3, 767.9).slot_width(), 320.0);
        assert_eq!(tracker(3, 768.0).slot_width(), 416.0);
        assert_eq!(tracker(3, 1920.0).slot_width(), 416.0);
    }

    #[test]
    fn narrower_than_every_breakpoint_uses_narrowest() {
        let breakpoints = [
            Breakpoint {
                min_viewport_width: 400.0,
                slot_width: 300.0,
            },
            Breakpoint {
                min_viewport_width: 900.0,
                slot_width: 500.0,
            },
        ];
        assert_eq!(slot_width_for(200.0, &breakpoints), 300.0);
        assert_eq!(slot_width_for(200.0, &[]), FALLBACK_SLOT_WIDTH);
    }

    #[test]
    fn resolve_rounds_and_clamps() {
        let layout = CarouselLayout::measure(&cards(4), 1024.0, &CarouselConfig::default().breakpoints);
        assert_eq!(layout.resolve(-300.0), ActiveSlot::Slot(0));
        assert_eq!(layout.resolve(207.0), ActiveSlot::Slot(0));
        assert_eq!(layout.resolve(208.0), ActiveSlot::Slot(1));
        assert_eq!(layout.resolve(10_000.0), ActiveSlot::Slot(3));

        let empty = CarouselLayout::measure(&[], 1024.0, &CarouselConfig::default().breakpoints);
        assert_eq!(empty.resolve(500.0), ActiveSlot::None);
    }

    #[test]
    fn arrows_wrap_around() {
        let mut carousel = tracker(4, 1024.0);
        let cmd = carousel.previous(ms(0)).expect("command issued");
        assert_eq!(carousel.current_index(), Some(3));
        assert_eq!(cmd.target, 3.0 * 416.0);
        assert_eq!(cmd.axis, Axis::Horizontal);

        carousel.next(ms(10));
        assert_eq!(carousel.current_index(), Some(0));
    }

    #[test]
    fn resize_remeasures_without_moving_index() {
        let mut carousel = tracker(5, 1024.0);
        carousel.go_to(2, ms(0));
        carousel.resize(375.0);

        assert_eq!(carousel.slot_width(), 320.0);
        assert_eq!(carousel.current_index(), Some(2));
        let cmd = carousel.go_to(3, ms(1000)).unwrap();
        assert_eq!(cmd.target, 960.0);

        carousel.resize(f64::NAN);
        assert_eq!(carousel.slot_width(), 320.0);
    }

    #[test]
    fn set_cards_resets_selection() {
        let mut carousel = tracker(5, 1024.0);
        carousel.go_to(4, ms(0));
        carousel.set_cards(cards(2)).unwrap();
        assert_eq!(carousel.current_index(), Some(0));
        assert_eq!(carousel.card_count(), 2);

        carousel.set_cards(Vec::new()).unwrap();
        assert_eq!(carousel.current_index(), None);
        assert!(carousel.next(ms(10)).is_none());

        assert!(carousel.set_cards(vec!["x".into(), "x".into()]).is_err());
    }

    #[test]
    fn process_batch_reports_commands_and_changes() {
        let mut carousel = tracker(5, 1024.0);
        let batch = SyncBatch {
            events: vec![
                SyncEvent::new(0.0, SyncEventType::GoToId { id: "card-3".into() }),
                SyncEvent::new(50.0, SyncEventType::Scroll { position: 650.0 }),
                SyncEvent::new(60.0, SyncEventType::Anchor { hash: "#about".into() }),
            ],
        };

        let report = carousel.process(&batch);
        assert!(report.changed);
        assert_eq!(report.active, ActiveSlot::Slot(3));
        assert_eq!(report.active_id.as_deref(), Some("card-3"));
        assert_eq!(report.commands.len(), 1);
        assert_eq!(report.elevated, None);
    }

    #[test]
    fn wasm_carousel_from_json() {
        let carousel = WasmCarousel::new(r#"{"cards":["a","b","c"],"viewport_width":500}"#)
            .expect("Should parse valid config");

        assert_eq!(carousel.card_count(), 3);
        assert_eq!(carousel.slot_width(), 320.0);
        assert_eq!(carousel.current_index(), Some(0));

        // No handler registered: state still moves.
        assert!(carousel.go_to(2, 0.0));
        assert_eq!(carousel.current_index(), Some(2));
        assert!(!carousel.on_scroll(0.0, 100.0));
        assert!(carousel.on_scroll(0.0, 600.0));
        assert_eq!(carousel.current_index(), Some(0));
    }

    #[test]
    fn wasm_carousel_process_events() {
        let carousel = WasmCarousel::new(r#"{"cards":["a","b","c","d"]}"#).unwrap();
        let output = carousel
            .process_events(r#"{"events":[{"timestamp_ms":0,"event_type":{"type":"Previous"}}]}"#)
            .expect("Should process events");

        let report: SyncReport = serde_json::from_str(&output).unwrap();
        assert_eq!(report.active, ActiveSlot::Slot(3));
        assert_eq!(report.commands[0].target, 3.0 * 416.0);
    }

    // Note: invalid-JSON paths build a JsValue error, which is only available
    // on wasm32. They are covered by tests/web.rs.
}

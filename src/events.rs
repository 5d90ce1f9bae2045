// Batch interface: the host queues events and crosses into WASM once per frame.

use serde::{Deserialize, Serialize};

use crate::types::*;

/// Batch of events from JS (minimizes JS↔WASM crossings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncBatch {
    pub events: Vec<SyncEvent>,
}

/// Single event. `timestamp_ms` is the host clock (`performance.now()`),
/// the same unit the direct `now_ms` methods take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEvent {
    pub timestamp_ms: f64,
    pub event_type: SyncEventType,
}

impl SyncEvent {
    pub fn new(timestamp_ms: f64, event_type: SyncEventType) -> Self {
        SyncEvent {
            timestamp_ms,
            event_type,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        Timestamp::from_millis(self.timestamp_ms)
    }
}

/// Type of event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEventType {
    /// Viewport scroll offset along the tracked axis.
    Scroll { position: f64 },
    /// Dot or nav link click.
    GoTo { index: usize },
    /// Navigate by slot id.
    GoToId { id: String },
    Next,
    Previous,
    /// Host finished the scroll started by `token`.
    ScrollSettled { token: SettleToken },
    /// Timer tick; flushes debounced scrolls.
    Tick,
    /// Carousel viewport width changed.
    ViewportResized { width: f64 },
    /// Sections were re-measured.
    SectionsMeasured {
        sections: Vec<SectionProbe>,
        #[serde(default)]
        nav_height_px: Option<f64>,
    },
    /// URL fragment to scroll to, e.g. `#contact`.
    Anchor { hash: String },
}

/// Result of a batch, returned to JS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub active: ActiveSlot,
    pub active_id: Option<String>,
    /// Nav bar elevation. Only reported by the section tracker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevated: Option<bool>,
    /// Scroll commands for the host, in issue order.
    pub commands: Vec<ScrollCommand>,
    /// Whether the active slot moved at any point during the batch.
    pub changed: bool,
}

/// Accumulates a `SyncReport` while a tracker walks a batch.
#[derive(Debug)]
pub(crate) struct ReportBuilder {
    last: ActiveSlot,
    commands: Vec<ScrollCommand>,
    changed: bool,
}

impl ReportBuilder {
    pub(crate) fn new(start: ActiveSlot) -> Self {
        ReportBuilder {
            last: start,
            commands: Vec::new(),
            changed: false,
        }
    }

    pub(crate) fn command(&mut self, command: Option<ScrollCommand>) {
        self.commands.extend(command);
    }

    /// Record the active slot after an event.
    pub(crate) fn observe(&mut self, active: ActiveSlot) {
        if active != self.last {
            self.changed = true;
            self.last = active;
        }
    }

    pub(crate) fn finish(
        self,
        active_id: Option<String>,
        elevated: Option<bool>,
    ) -> SyncReport {
        SyncReport {
            active: self.last,
            active_id,
            elevated,
            commands: self.commands,
            changed: self.changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_events() {
        let json = r##"{"events":[
            {"timestamp_ms":16.7,"event_type":{"type":"Scroll","position":650.5}},
            {"timestamp_ms":33,"event_type":{"type":"GoTo","index":3}},
            {"timestamp_ms":50,"event_type":{"type":"Next"}},
            {"timestamp_ms":66,"event_type":{"type":"ScrollSettled","token":7}},
            {"timestamp_ms":83,"event_type":{"type":"SectionsMeasured","sections":[{"id":"about","top":800}]}},
            {"timestamp_ms":100,"event_type":{"type":"Anchor","hash":"#about"}}
        ]}"##;

        let batch: SyncBatch = serde_json::from_str(json).unwrap();
        assert_eq!(batch.events.len(), 6);
        assert_eq!(batch.events[0].timestamp().as_micros(), 16_700);
        assert!(matches!(
            batch.events[3].event_type,
            SyncEventType::ScrollSettled { token } if token == SettleToken::new(7)
        ));
        assert!(matches!(
            &batch.events[4].event_type,
            SyncEventType::SectionsMeasured { nav_height_px: None, sections } if sections.len() == 1
        ));
    }

    #[test]
    fn builder_tracks_changes() {
        let mut builder = ReportBuilder::new(ActiveSlot::Slot(0));
        builder.observe(ActiveSlot::Slot(0));
        assert!(!builder.changed);

        builder.observe(ActiveSlot::Slot(2));
        builder.observe(ActiveSlot::Slot(0));
        builder.command(None);
        let report = builder.finish(Some("a".into()), None);

        assert!(report.changed);
        assert_eq!(report.active, ActiveSlot::Slot(0));
        assert!(report.commands.is_empty());

        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("elevated"));
    }
}

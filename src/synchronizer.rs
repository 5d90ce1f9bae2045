// Viewport Index Synchronizer: one "current slot" fed by two sources, explicit
// commands and passive scroll offsets. The settle window arbitrates between them.
// See DESIGN.md: synchronizer

use crate::error::SyncError;
use crate::settle::SettleWindow;
use crate::types::*;

/// A measured layout. Pure data produced by a `measure` function and replaced
/// wholesale on resize; it knows how to map offsets to slots and back.
pub trait SlotLayout {
    fn axis(&self) -> Axis;

    /// Slots in `order`.
    fn slots(&self) -> &[Slot];

    /// Scroll path: which slot is in view at `position`.
    fn resolve(&self, position: f64) -> ActiveSlot;

    /// Command path: where to scroll to bring `index` into view.
    /// `None` when the slot has no usable measurement.
    fn scroll_target(&self, index: usize) -> Option<f64>;
}

/// Where a fresh synchronizer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAt {
    /// First slot, or nothing for an empty layout (carousel).
    First,
    /// Nothing until the first scroll or command (sections).
    Nothing,
}

/// Behavioural knobs shared by both trackers.
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub settle_delay_ms: u64,
    pub scroll_debounce_ms: u64,
    pub wrap: bool,
    pub start: StartAt,
}

/// Coalesces bursts of scroll events. Only the latest position of a burst is
/// kept; it is applied by `tick` once the interval has passed.
#[derive(Debug, Clone)]
struct ScrollDebounce {
    interval_us: u64,
    last_applied: Option<Timestamp>,
    pending: Option<f64>,
}

impl ScrollDebounce {
    fn new(interval_ms: u64) -> Self {
        ScrollDebounce {
            interval_us: interval_ms.saturating_mul(1000),
            last_applied: None,
            pending: None,
        }
    }

    /// Returns true if `position` should be applied now.
    fn admit(&mut self, position: f64, now: Timestamp) -> bool {
        if self.interval_us == 0 {
            return true;
        }
        if let Some(last) = self.last_applied {
            if now.micros_since(last) < self.interval_us {
                self.pending = Some(position);
                return false;
            }
        }
        self.last_applied = Some(now);
        self.pending = None;
        true
    }

    fn take_due(&mut self, now: Timestamp) -> Option<f64> {
        let last = self.last_applied?;
        if self.pending.is_none() || now.micros_since(last) < self.interval_us {
            return None;
        }
        self.last_applied = Some(now);
        self.pending.take()
    }

    fn clear(&mut self) {
        self.pending = None;
    }

    /// A command starts a new epoch: the first scroll after it is never deferred.
    fn restart(&mut self) {
        self.last_applied = None;
        self.pending = None;
    }
}

/// Keeps exactly one active slot consistent between commands and scroll input.
#[derive(Debug, Clone)]
pub struct ViewportSynchronizer<L> {
    layout: L,
    active: ActiveSlot,
    settle: SettleWindow,
    debounce: ScrollDebounce,
    wrap: bool,
}

impl<L: SlotLayout> ViewportSynchronizer<L> {
    pub fn new(layout: L, options: SyncOptions) -> Self {
        let active = match options.start {
            StartAt::First if !layout.slots().is_empty() => ActiveSlot::Slot(0),
            _ => ActiveSlot::None,
        };

        ViewportSynchronizer {
            layout,
            active,
            settle: SettleWindow::new(options.settle_delay_ms),
            debounce: ScrollDebounce::new(options.scroll_debounce_ms),
            wrap: options.wrap,
        }
    }

    /// Explicit command. Updates the active slot immediately and returns the
    /// scroll the host should perform; invalid targets are a silent no-op.
    pub fn go_to(&mut self, index: usize, now: Timestamp) -> Option<ScrollCommand> {
        let target = match self.command_target(index) {
            Ok(target) => target,
            Err(err) => {
                tracing::debug!(%err, "ignoring navigation command");
                return None;
            }
        };

        let token = self.settle.arm(now);
        self.debounce.restart();
        self.active = ActiveSlot::Slot(index);
        tracing::trace!(index, target, token = token.as_u64(), "programmatic scroll");

        Some(ScrollCommand {
            axis: self.layout.axis(),
            target,
            behavior: ScrollBehavior::Smooth,
            token,
        })
    }

    pub fn next(&mut self, now: Timestamp) -> Option<ScrollCommand> {
        let len = self.slot_count();
        if len == 0 {
            return None;
        }
        let index = match self.active {
            ActiveSlot::None => 0,
            ActiveSlot::Slot(i) if i + 1 < len => i + 1,
            ActiveSlot::Slot(_) if self.wrap => 0,
            ActiveSlot::Slot(_) => return None,
        };
        self.go_to(index, now)
    }

    pub fn previous(&mut self, now: Timestamp) -> Option<ScrollCommand> {
        let len = self.slot_count();
        if len == 0 {
            return None;
        }
        let index = match self.active {
            ActiveSlot::None => len - 1,
            ActiveSlot::Slot(i) if i > 0 => i - 1,
            ActiveSlot::Slot(_) if self.wrap => len - 1,
            ActiveSlot::Slot(_) => return None,
        };
        self.go_to(index, now)
    }

    /// Passive recomputation from the viewport's scroll offset.
    /// Returns the new active slot only when it changed.
    pub fn on_scroll(&mut self, position: f64, now: Timestamp) -> Option<ActiveSlot> {
        if !position.is_finite() {
            tracing::debug!(position, "ignoring non-finite scroll position");
            return None;
        }
        // Suppression is checked before anything else touches state.
        if self.settle.is_suppressing(now) {
            tracing::trace!(position, "scroll suppressed during settle window");
            return None;
        }
        if !self.debounce.admit(position, now) {
            return None;
        }
        self.apply_position(position)
    }

    /// Applies a debounced scroll position whose interval has elapsed.
    pub fn tick(&mut self, now: Timestamp) -> Option<ActiveSlot> {
        if self.settle.is_suppressing(now) {
            return None;
        }
        let position = self.debounce.take_due(now)?;
        self.apply_position(position)
    }

    /// Host signal that the scroll started by `token` has finished.
    pub fn complete_scroll(&mut self, token: SettleToken) -> bool {
        self.settle.release(token)
    }

    /// Install a freshly measured layout.
    pub fn measure(&mut self, layout: L) {
        let len = layout.slots().len();
        self.layout = layout;

        if let ActiveSlot::Slot(index) = self.active {
            if index >= len {
                self.active = match len {
                    0 => ActiveSlot::None,
                    _ => ActiveSlot::Slot(len - 1),
                };
                tracing::debug!(index, len, "active slot clamped after re-measure");
            }
        }
    }

    /// Drop the current selection and start over (new data set).
    pub fn reset(&mut self, layout: L, start: StartAt) {
        self.active = match start {
            StartAt::First if !layout.slots().is_empty() => ActiveSlot::Slot(0),
            _ => ActiveSlot::None,
        };
        self.layout = layout;
        self.debounce.clear();
    }

    pub fn active(&self) -> ActiveSlot {
        self.active
    }

    pub fn active_id(&self) -> Option<&SlotId> {
        self.active
            .index()
            .and_then(|index| self.layout.slots().get(index))
            .map(|slot| &slot.id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.layout
            .slots()
            .iter()
            .position(|slot| slot.id.as_str() == id)
    }

    pub fn slot_count(&self) -> usize {
        self.layout.slots().len()
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    pub fn is_settling(&self, now: Timestamp) -> bool {
        self.settle.is_suppressing(now)
    }

    fn command_target(&self, index: usize) -> Result<f64, SyncError> {
        let slots = self.layout.slots();
        let slot = slots.get(index).ok_or(SyncError::SlotOutOfRange {
            index,
            len: slots.len(),
        })?;
        self.layout
            .scroll_target(index)
            .ok_or_else(|| SyncError::Unmeasured(slot.id.as_str().to_string()))
    }

    fn apply_position(&mut self, position: f64) -> Option<ActiveSlot> {
        let resolved = self.layout.resolve(position);
        if resolved == self.active {
            return None;
        }
        tracing::trace!(position, ?resolved, "active slot changed by scroll");
        self.active = resolved;
        Some(resolved)
    }
}

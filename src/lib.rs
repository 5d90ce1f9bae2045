// viewport_sync: Rust/WASM engine for scroll-synchronized navigation state.
// One primitive keeps the carousel's current card and the nav bar's active section
// consistent between clicks and scroll offsets. JS forwards events and performs scrolls.

mod carousel;
mod error;
mod events;
mod host;
mod sections;
mod settle;
mod synchronizer;
mod types;

use wasm_bindgen::prelude::*;

pub use carousel::{CarouselLayout, CarouselTracker, WasmCarousel, FALLBACK_SLOT_WIDTH};
pub use error::SyncError;
pub use events::{SyncBatch, SyncEvent, SyncEventType, SyncReport};
pub use sections::{SectionLayout, SectionTracker, WasmSectionTracker, DEFAULT_NAV_HEIGHT_PX};
pub use settle::SettleWindow;
pub use synchronizer::{SlotLayout, StartAt, SyncOptions, ViewportSynchronizer};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: u64) -> Timestamp {
        Timestamp::from_micros(ms * 1000)
    }

    /// Five 400px cards: a command holds against scroll noise inside the
    /// settle window, and scroll takes over again afterwards.
    #[test]
    fn carousel_command_then_scroll() {
        let mut carousel = CarouselTracker::new(CarouselConfig {
            cards: (0..5).map(|i| i.to_string()).collect(),
            breakpoints: vec![Breakpoint {
                min_viewport_width: 0.0,
                slot_width: 400.0,
            }],
            settle_delay_ms: 500,
            ..Default::default()
        })
        .unwrap();

        carousel.go_to(3, ms(0));
        assert_eq!(carousel.current_index(), Some(3));

        carousel.on_scroll(650.0, ms(50));
        assert_eq!(carousel.current_index(), Some(3));

        carousel.on_scroll(650.0, ms(600));
        assert_eq!(carousel.current_index(), Some(2));
    }

    #[test]
    fn section_highlight_walk() {
        let mut nav = SectionTracker::new(SectionConfig {
            sections: vec![
                SectionProbe::new("about", Some(800.0)),
                SectionProbe::new("services", Some(1600.0)),
                SectionProbe::new("contact", Some(2400.0)),
            ],
            nav_height_px: Some(80.0),
            look_ahead_px: 0.0,
            scroll_threshold_px: 50.0,
            ..Default::default()
        })
        .unwrap();

        nav.on_scroll(50.0, ms(0));
        assert_eq!(nav.active_id(), None);

        nav.on_scroll(850.0, ms(10));
        assert_eq!(nav.active_id(), Some("about"));

        // services: 1600 - 80 = 1520 <= 1580
        nav.on_scroll(1580.0, ms(20));
        assert_eq!(nav.active_id(), Some("services"));
    }

    #[test]
    fn previous_from_first_card_wraps() {
        let mut carousel = CarouselTracker::new(CarouselConfig {
            cards: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            ..Default::default()
        })
        .unwrap();

        carousel.previous(ms(0));
        assert_eq!(carousel.current_index(), Some(3));
    }

    #[test]
    fn engine_creation_rejects_bad_config() {
        assert!(CarouselTracker::from_json("not json").is_err());
        assert!(matches!(
            SectionTracker::from_json(r#"{"look_ahead_px":-1}"#),
            Err(SyncError::InvalidConfig(_))
        ));
    }
}

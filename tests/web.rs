//! Browser tests for the JS-facing surface. Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

use viewport_sync::{WasmCarousel, WasmSectionTracker};

wasm_bindgen_test_configure!(run_in_browser);

fn last_scroll() -> js_sys::Array {
    Reflect::get(&js_sys::global(), &JsValue::from_str("__lastScroll"))
        .expect("global readable")
        .into()
}

async fn sleep(ms: i32) {
    let set_timeout = Function::new_with_args("resolve, ms", "setTimeout(resolve, ms)");
    let promise = Promise::new(&mut |resolve, _reject| {
        let _ = set_timeout.call2(&JsValue::NULL, &resolve, &JsValue::from(ms));
    });
    let _ = JsFuture::from(promise).await;
}

#[wasm_bindgen_test]
fn invalid_config_is_a_js_error() {
    assert!(WasmCarousel::new("{").is_err());
    assert!(WasmSectionTracker::new(r#"{"nav_gap_px":-5}"#).is_err());
}

#[wasm_bindgen_test]
fn handler_receives_scroll_command() {
    let mut carousel = WasmCarousel::new(r#"{"cards":["a","b","c"],"viewport_width":1280}"#)
        .expect("valid config");
    carousel.set_scroll_handler(Function::new_with_args(
        "target, behavior, token",
        "globalThis.__lastScroll = [target, behavior, token];",
    ));

    assert!(carousel.go_to(2, 0.0));

    let args = last_scroll();
    assert_eq!(args.get(0).as_f64(), Some(832.0));
    assert_eq!(args.get(1).as_string().as_deref(), Some("smooth"));
    assert_eq!(args.get(2).as_f64(), Some(1.0));
}

#[wasm_bindgen_test]
async fn resolved_promise_ends_settle_window() {
    let mut carousel = WasmCarousel::new(r#"{"cards":["a","b","c"],"viewport_width":1280}"#)
        .expect("valid config");
    carousel.set_scroll_handler(Function::new_with_args(
        "target, behavior, token",
        "return Promise.resolve();",
    ));

    assert!(carousel.go_to(2, 0.0));
    sleep(10).await;

    // Well inside the 500ms deadline, but the animation reported completion.
    assert!(carousel.on_scroll(0.0, 50.0));
    assert_eq!(carousel.current_index(), Some(0));
}

#[wasm_bindgen_test]
fn throwing_handler_keeps_optimistic_state() {
    let mut nav = WasmSectionTracker::new(
        r#"{"sections":[{"id":"about","top":800},{"id":"contact","top":2400}],"nav_height_px":80}"#,
    )
    .expect("valid config");
    nav.set_scroll_handler(Function::new_no_args("throw new Error('no scroll');"));

    assert!(nav.go_to_id("contact", 0.0));
    assert_eq!(nav.active_id().as_deref(), Some("contact"));
    assert!(!nav.on_scroll(900.0, 100.0));
}

#[wasm_bindgen_test]
fn manual_settle_signal() {
    let nav = WasmSectionTracker::new(
        r#"{"sections":[{"id":"about","top":800},{"id":"contact","top":2400}]}"#,
    )
    .expect("valid config");

    assert!(nav.request_anchor("#contact", 0.0));
    assert!(!nav.scroll_settled(99.0));
    assert!(nav.scroll_settled(1.0));
    assert!(nav.on_scroll(900.0, 10.0));
    assert_eq!(nav.active_id().as_deref(), Some("about"));
}

#[wasm_bindgen_test]
fn deferred_anchor_after_resize() {
    let nav = WasmSectionTracker::new("{}").expect("valid config");
    assert!(!nav.request_anchor("#contact", 0.0));

    let issued = nav
        .resize(r#"[{"id":"contact","top":2400}]"#, Some(80.0), 500.0)
        .expect("valid probes");
    assert!(issued);
    assert_eq!(nav.active_id().as_deref(), Some("contact"));
}

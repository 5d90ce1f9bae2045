// Host bridge: hands scroll commands to the page's scrollTo primitive and turns
// the returned Promise into the "animation completed" signal.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};

use crate::error::SyncError;
use crate::types::{ScrollCommand, SettleToken};

/// Anything that owns a settle window the host can close.
pub(crate) trait Settles {
    fn complete_scroll(&mut self, token: SettleToken) -> bool;
}

/// Holds the host's scroll handler, if one was registered.
#[derive(Default)]
pub(crate) struct ScrollBridge {
    handler: Option<Function>,
}

impl ScrollBridge {
    pub(crate) fn set_handler(&mut self, handler: Function) {
        self.handler = Some(handler);
    }

    /// Call `handler(target, behavior, token)`. Must be called with no
    /// outstanding borrow of `shared`: the handler may call back into WASM.
    pub(crate) fn dispatch<T>(&self, shared: &Rc<RefCell<T>>, command: &ScrollCommand)
    where
        T: Settles + 'static,
    {
        let Some(handler) = &self.handler else {
            return;
        };

        let result = handler.call3(
            &JsValue::NULL,
            &JsValue::from_f64(command.target),
            &JsValue::from_str(command.behavior.as_str()),
            &JsValue::from_f64(command.token.as_u64() as f64),
        );

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(?err, "scroll handler threw");
                return;
            }
        };

        // Handlers without a completion promise rely on the settle deadline.
        let Ok(promise) = value.dyn_into::<Promise>() else {
            return;
        };

        let shared = Rc::clone(shared);
        let token = command.token;
        spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                tracing::debug!(?err, "scroll animation promise rejected");
            }
            shared.borrow_mut().complete_scroll(token);
        });
    }

    pub(crate) fn dispatch_all<T>(&self, shared: &Rc<RefCell<T>>, commands: &[ScrollCommand])
    where
        T: Settles + 'static,
    {
        for command in commands {
            self.dispatch(shared, command);
        }
    }
}

pub(crate) fn js_error(err: SyncError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// JS numbers carry tokens; anything that is not a whole non-negative number
/// can never match a live window.
pub(crate) fn token_from_js(token: f64) -> Option<SettleToken> {
    if token.is_finite() && token >= 0.0 && token.fract() == 0.0 {
        Some(SettleToken::new(token as u64))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_from_js_numbers() {
        assert_eq!(token_from_js(3.0), Some(SettleToken::new(3)));
        assert_eq!(token_from_js(-1.0), None);
        assert_eq!(token_from_js(2.5), None);
        assert_eq!(token_from_js(f64::NAN), None);
    }
}

//! Crate-internal logging.
//!
//! On `wasm32` events go straight to the browser console via `web_sys`,
//! everywhere else they go through the `log` facade so a native host can
//! pick its own logger.

/// Debug-level event, prefixed with a component tag like `[Conductor]`.
macro_rules! ta_debug {
    ($tag:literal, $($arg:tt)+) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::debug_1(&wasm_bindgen::JsValue::from_str(&format!(
            concat!("[", $tag, "] {}"),
            format_args!($($arg)+)
        )));
        #[cfg(not(target_arch = "wasm32"))]
        log::debug!(target: "typeahead_core", concat!("[", $tag, "] {}"), format_args!($($arg)+));
    }};
}

/// Warning-level event. Used for degraded paths (provider failures).
macro_rules! ta_warn {
    ($tag:literal, $($arg:tt)+) => {{
        #[cfg(target_arch = "wasm32")]
        web_sys::console::warn_1(&wasm_bindgen::JsValue::from_str(&format!(
            concat!("[", $tag, "] {}"),
            format_args!($($arg)+)
        )));
        #[cfg(not(target_arch = "wasm32"))]
        log::warn!(target: "typeahead_core", concat!("[", $tag, "] {}"), format_args!($($arg)+));
    }};
}

pub(crate) use ta_debug;
pub(crate) use ta_warn;

//! TypeaheadCore: Multi-Trigger Typeahead + Inline Typeahead Entities
//!
//! A Rust/WASM implementation of the editor typeahead pipeline.
//!
//! # Architecture
//!
//! ## Matching Components
//! - `pattern.rs` - TriggerPattern + Arbiter: trigger regex and cross-trigger arbitration
//! - `session.rs` - QuerySession: per-trigger Idle/Querying state machine with tagged queries
//! - `conductor.rs` - TypeaheadConductor: owns one session per trigger, single active session
//!
//! ## Entity Components
//! - `entity.rs` - TypeaheadEntity: atomic inline node, JSON snapshot
//! - `dom.rs` - DomElement: markup export/import mapping
//! - `document.rs` - TypeaheadDocument seam + in-memory TextDocument
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { TypeaheadPlugin } from 'typeahead-core';
//!
//! await init();
//!
//! const plugin = new TypeaheadPlugin({
//!   configs: [
//!     { type: 'mention', trigger: '@', maxResults: 5 },
//!     { type: 'hashtag', trigger: '#' },
//!   ],
//! });
//! plugin.setSearchCallback('mention', (q) => fetchUsers(q));
//! plugin.onResults((menu) => renderMenu(menu));
//!
//! // On every editor update
//! plugin.onTextChange(textBeforeCaret);
//!
//! // On selection
//! const snapshot = plugin.selectOption('alice');
//! ```

pub mod logging;
pub mod typeahead;

// Public exports
pub use typeahead::*;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("typeahead-core v{}", env!("CARGO_PKG_VERSION"))
}

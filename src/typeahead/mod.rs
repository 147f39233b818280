pub mod config;
pub mod conductor;
pub mod document;
pub mod dom;
pub mod entity;
pub mod error;
pub mod pattern;
pub mod provider;
pub mod session;
pub mod wasm;

#[cfg(test)]
mod tests;

pub use config::*;
pub use conductor::*;
pub use document::*;
pub use dom::*;
pub use entity::*;
pub use error::{ProviderError, TypeaheadError};
pub use pattern::*;
pub use provider::*;
pub use session::*;
pub use wasm::*;

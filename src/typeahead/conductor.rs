//! TypeaheadConductor: coordinator for every registered trigger
//!
//! # Design Principles
//! 1. One [`QuerySession`] per config, in registration order
//! 2. Every trigger is arbitrated against the same text before any session advances
//! 3. At most one session is `Querying` at any time
//!
//! # Usage
//! ```rust,ignore
//! let mut conductor = TypeaheadConductor::new(vec![
//!     TriggerConfig::new("mention", "@"),
//!     TriggerConfig::new("hashtag", "#"),
//! ])?;
//! let change = conductor.on_text_change("hello @al");
//! if let Some(ticket) = change.ticket {
//!     let provider = conductor.provider_for(&ticket).unwrap();
//!     let response = dispatch(&*provider, ticket).await;
//!     conductor.resolve(response);
//! }
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use super::config::{TriggerConfig, TypeaheadPluginParams};
use super::document::{NodeKey, TypeaheadDocument};
use super::error::{Result, TypeaheadError};
use super::pattern::LENGTH_LIMIT;
use super::provider::{QueryResponse, QueryTicket, SearchProvider};
use super::session::{MenuState, QuerySession, ResolveOutcome};
use crate::logging::ta_debug;

/// Characters read before the caret: boundary + trigger + longest query.
/// A window this size can never cut a run so that its start looks like the
/// start of the text.
pub const SCAN_WINDOW: usize = LENGTH_LIMIT + 2;

/// Result of one text-change notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextChange {
    /// Type of the session that is `Querying` afterwards
    pub active: Option<String>,
    /// Query to dispatch, when the active query changed
    pub ticket: Option<QueryTicket>,
}

// =============================================================================
// TypeaheadConductor
// =============================================================================

/// Owns every trigger's session and enforces a single active session.
pub struct TypeaheadConductor {
    configs: Rc<[TriggerConfig]>,
    sessions: Vec<QuerySession>,
    providers: HashMap<String, Rc<dyn SearchProvider>>,
}

impl TypeaheadConductor {
    /// Register `configs`. Duplicate types or missing fields are fatal.
    pub fn new(configs: Vec<TriggerConfig>) -> Result<Self> {
        Self::from_params(TypeaheadPluginParams::new(configs))
    }

    pub fn from_params(params: TypeaheadPluginParams) -> Result<Self> {
        params.validate()?;
        let configs: Rc<[TriggerConfig]> = Rc::from(params.configs);

        let sessions = (0..configs.len())
            .map(|i| QuerySession::new(Rc::clone(&configs), i))
            .collect::<Result<Vec<_>>>()?;

        ta_debug!("Conductor", "registered {} trigger(s)", sessions.len());
        Ok(Self {
            configs,
            sessions,
            providers: HashMap::new(),
        })
    }

    pub fn configs(&self) -> &[TriggerConfig] {
        &self.configs
    }

    pub fn sessions(&self) -> &[QuerySession] {
        &self.sessions
    }

    pub fn session(&self, type_name: &str) -> Option<&QuerySession> {
        self.sessions.iter().find(|s| s.type_name() == type_name)
    }

    fn session_mut(&mut self, type_name: &str) -> Option<&mut QuerySession> {
        self.sessions.iter_mut().find(|s| s.type_name() == type_name)
    }

    pub fn active_session(&self) -> Option<&QuerySession> {
        self.sessions.iter().find(|s| s.is_active())
    }

    fn active_session_mut(&mut self) -> Option<&mut QuerySession> {
        self.sessions.iter_mut().find(|s| s.is_active())
    }

    // -------------------------------------------------------------------------
    // Providers
    // -------------------------------------------------------------------------

    /// Attach the search provider for `type_name`.
    pub fn set_provider(&mut self, type_name: &str, provider: Rc<dyn SearchProvider>) -> Result<()> {
        if self.session(type_name).is_none() {
            return Err(TypeaheadError::UnknownType(type_name.to_string()));
        }
        self.providers.insert(type_name.to_string(), provider);
        Ok(())
    }

    /// Provider that should run `ticket`. Cloned out so the caller can
    /// await it without holding the conductor.
    pub fn provider_for(&self, ticket: &QueryTicket) -> Option<Rc<dyn SearchProvider>> {
        self.providers.get(&ticket.type_name).cloned()
    }

    // -------------------------------------------------------------------------
    // Text changes
    // -------------------------------------------------------------------------

    /// Feed the text before the caret to every trigger.
    pub fn on_text_change(&mut self, text: &str) -> TextChange {
        // Arbitrate first, against one snapshot of the text.
        let mut candidates: Vec<_> = self.sessions.iter().map(|s| s.evaluate(text)).collect();

        if let Some(first) = candidates.iter().position(Option::is_some) {
            for extra in candidates.iter_mut().skip(first + 1).filter(|c| c.is_some()) {
                ta_debug!("Conductor", "dropping second candidate {:?}", extra);
                *extra = None;
            }
        }

        let mut change = TextChange::default();
        for (session, candidate) in self.sessions.iter_mut().zip(candidates) {
            if candidate.is_some() {
                change.active = Some(session.type_name().to_string());
            }
            if let Some(ticket) = session.apply(candidate) {
                change.ticket = Some(ticket);
            }
        }

        debug_assert!(self.sessions.iter().filter(|s| s.is_active()).count() <= 1);
        change
    }

    /// Read the caret window from `document` and feed it. A caret outside
    /// plain text closes every session.
    pub fn on_document_change<D>(&mut self, document: &D) -> TextChange
    where
        D: TypeaheadDocument + ?Sized,
    {
        match document.text_before_caret(SCAN_WINDOW) {
            Some(text) => self.on_text_change(&text),
            None => {
                self.cancel();
                TextChange::default()
            }
        }
    }

    /// Route a provider response to its session.
    pub fn resolve(&mut self, response: QueryResponse) -> ResolveOutcome {
        match self.session_mut(&response.type_name) {
            Some(session) => session.resolve(response),
            None => ResolveOutcome::Stale,
        }
    }

    // -------------------------------------------------------------------------
    // Presentation
    // -------------------------------------------------------------------------

    pub fn menu(&self) -> Option<MenuState> {
        self.active_session().and_then(QuerySession::menu)
    }

    pub fn set_highlighted_index(&mut self, index: usize) -> bool {
        self.active_session_mut()
            .map(|s| s.set_highlighted_index(index))
            .unwrap_or(false)
    }

    pub fn highlight_next(&mut self) {
        if let Some(session) = self.active_session_mut() {
            session.highlight_next();
        }
    }

    pub fn highlight_previous(&mut self) {
        if let Some(session) = self.active_session_mut() {
            session.highlight_previous();
        }
    }

    /// Commit `value` through the active session.
    pub fn select_option<D>(&mut self, value: &str, document: &mut D) -> Result<NodeKey>
    where
        D: TypeaheadDocument + ?Sized,
    {
        self.active_session_mut()
            .ok_or(TypeaheadError::NoActiveSession)?
            .select_option(value, document)
    }

    pub fn select_highlighted<D>(&mut self, document: &mut D) -> Result<NodeKey>
    where
        D: TypeaheadDocument + ?Sized,
    {
        self.active_session_mut()
            .ok_or(TypeaheadError::NoActiveSession)?
            .select_highlighted(document)
    }

    /// Close every session.
    pub fn cancel(&mut self) {
        for session in &mut self.sessions {
            session.cancel();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

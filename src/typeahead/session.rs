//! QuerySession: per-trigger query state machine
//!
//! # States
//! `Idle` → `Querying` → `Idle`
//!
//! - A candidate for this trigger opens or refreshes `Querying`
//! - Each new query string gets a fresh generation and one [`QueryTicket`]
//! - Results arriving for an older generation are dropped
//! - Losing the candidate, committing a selection or cancelling returns to `Idle`
//!
//! There is no separate "resolved" state: results update the list while the
//! session stays `Querying`.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use super::config::TriggerConfig;
use super::document::{CaretSpan, NodeKey, TypeaheadDocument};
use super::entity::TypeaheadEntity;
use super::error::{Result, TypeaheadError};
use super::pattern::{Arbiter, MatchCandidate};
use super::provider::{QueryResponse, QueryTicket};
use crate::logging::{ta_debug, ta_warn};

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No candidate for this trigger
    Idle,
    /// Candidate captured; `generation` tags the latest dispatched query
    Querying {
        candidate: MatchCandidate,
        generation: u64,
    },
}

/// What happened to a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Results replaced the option list
    Applied,
    /// Provider failed; option list is now empty
    Failed,
    /// Response was for an older query or a closed session
    Stale,
}

// =============================================================================
// Presentation state
// =============================================================================

/// One menu row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuOption {
    pub key: String,
    pub value: String,
    /// DOM id for the row, `typeahead-item-{index}`
    pub item_id: String,
    pub selected: bool,
}

/// Everything the presentation layer needs to draw an open menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuState {
    pub type_name: String,
    pub query: String,
    pub options: Vec<MenuOption>,
    pub highlighted_index: usize,
    pub class_name: String,
    /// Where the menu is anchored in the text
    pub anchor: MatchCandidate,
}

// =============================================================================
// QuerySession
// =============================================================================

/// Query session for one registered trigger.
#[derive(Debug, Clone)]
pub struct QuerySession {
    config: TriggerConfig,
    all_configs: Rc<[TriggerConfig]>,
    arbiter: Arbiter,
    state: SessionState,
    results: Vec<String>,
    /// Last generation handed out. Never reset, so tags stay unique across
    /// reopened sessions.
    generation: u64,
    highlighted: usize,
}

impl QuerySession {
    /// Session for `all_configs[index]`, arbitrating against the rest.
    pub fn new(all_configs: Rc<[TriggerConfig]>, index: usize) -> Result<Self> {
        let config = all_configs
            .get(index)
            .cloned()
            .ok_or(TypeaheadError::ConfigIndexOutOfRange {
                index,
                len: all_configs.len(),
            })?;
        let arbiter = Arbiter::new(&config, &all_configs)?;

        Ok(Self {
            config,
            all_configs,
            arbiter,
            state: SessionState::Idle,
            results: Vec::new(),
            generation: 0,
            highlighted: 0,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.config.type_name
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Every config registered next to this one.
    pub fn sibling_configs(&self) -> impl Iterator<Item = &TriggerConfig> {
        self.all_configs
            .iter()
            .filter(|c| c.type_name != self.config.type_name)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Querying { .. })
    }

    pub fn candidate(&self) -> Option<&MatchCandidate> {
        match &self.state {
            SessionState::Querying { candidate, .. } => Some(candidate),
            SessionState::Idle => None,
        }
    }

    /// Current query, `None` while idle.
    pub fn query_string(&self) -> Option<&str> {
        self.candidate().map(|c| c.matching_string.as_str())
    }

    /// Candidate for this trigger in `text`, after arbitration.
    pub fn evaluate(&self, text: &str) -> Option<MatchCandidate> {
        self.arbiter.evaluate(text)
    }

    /// Advance the state machine with the latest candidate. Returns a ticket
    /// when a new query must be dispatched.
    pub fn apply(&mut self, candidate: Option<MatchCandidate>) -> Option<QueryTicket> {
        let Some(candidate) = candidate else {
            self.close();
            return None;
        };

        if let SessionState::Querying {
            candidate: current, ..
        } = &mut self.state
        {
            if current.matching_string == candidate.matching_string {
                *current = candidate;
                return None;
            }
        } else {
            ta_debug!("QuerySession", "{} opened at offset {}", self.config.type_name, candidate.lead_offset);
        }

        self.generation += 1;
        self.highlighted = 0;
        let ticket = QueryTicket {
            type_name: self.config.type_name.clone(),
            query: candidate.matching_string.clone(),
            generation: self.generation,
        };
        self.state = SessionState::Querying {
            candidate,
            generation: self.generation,
        };
        ta_debug!("QuerySession", "{} query {:?} (gen {})", ticket.type_name, ticket.query, ticket.generation);
        Some(ticket)
    }

    /// Evaluate `text` and advance in one step.
    pub fn on_text_change(&mut self, text: &str) -> Option<QueryTicket> {
        let candidate = self.evaluate(text);
        self.apply(candidate)
    }

    /// Apply a provider response if it belongs to the current query.
    pub fn resolve(&mut self, response: QueryResponse) -> ResolveOutcome {
        let current = match &self.state {
            SessionState::Querying { generation, .. } => *generation,
            SessionState::Idle => {
                ta_debug!("QuerySession", "{} dropped response gen {} (idle)", self.config.type_name, response.generation);
                return ResolveOutcome::Stale;
            }
        };
        if response.type_name != self.config.type_name || response.generation != current {
            ta_debug!(
                "QuerySession",
                "{} dropped stale response gen {} (current {})",
                self.config.type_name,
                response.generation,
                current
            );
            return ResolveOutcome::Stale;
        }

        match response.result {
            Ok(results) => {
                self.results = results;
                self.clamp_highlight();
                ResolveOutcome::Applied
            }
            Err(e) => {
                ta_warn!("QuerySession", "{}: {}", self.config.type_name, e);
                self.results.clear();
                self.highlighted = 0;
                ResolveOutcome::Failed
            }
        }
    }

    /// Latest results, truncated to `maxResults`.
    pub fn options(&self) -> &[String] {
        let len = self.results.len().min(self.config.max_results);
        &self.results[..len]
    }

    pub fn highlighted_index(&self) -> usize {
        self.highlighted
    }

    /// Highlight option `index`. Out-of-range indexes are ignored.
    pub fn set_highlighted_index(&mut self, index: usize) -> bool {
        if index >= self.options().len() {
            return false;
        }
        self.highlighted = index;
        true
    }

    /// Move the highlight down, wrapping to the top.
    pub fn highlight_next(&mut self) {
        let len = self.options().len();
        if len > 0 {
            self.highlighted = (self.highlighted + 1) % len;
        }
    }

    /// Move the highlight up, wrapping to the bottom.
    pub fn highlight_previous(&mut self) {
        let len = self.options().len();
        if len > 0 {
            self.highlighted = (self.highlighted + len - 1) % len;
        }
    }

    fn clamp_highlight(&mut self) {
        let len = self.options().len();
        if self.highlighted >= len {
            self.highlighted = len.saturating_sub(1);
        }
    }

    /// Menu contents, or `None` when there is nothing to show.
    pub fn menu(&self) -> Option<MenuState> {
        let candidate = self.candidate()?;
        let options = self.options();
        if options.is_empty() {
            return None;
        }

        Some(MenuState {
            type_name: self.config.type_name.clone(),
            query: candidate.matching_string.clone(),
            options: options
                .iter()
                .enumerate()
                .map(|(i, value)| MenuOption {
                    key: format!("{}-{}", i, value),
                    value: value.clone(),
                    item_id: format!("typeahead-item-{}", i),
                    selected: i == self.highlighted,
                })
                .collect(),
            highlighted_index: self.highlighted,
            class_name: self.config.popover_class(),
            anchor: candidate.clone(),
        })
    }

    /// Commit `value`: replace the matched span with a new entity, select
    /// it, and go idle. The session is left as-is if the document refuses.
    pub fn select_option<D>(&mut self, value: &str, document: &mut D) -> Result<NodeKey>
    where
        D: TypeaheadDocument + ?Sized,
    {
        let candidate = self.candidate().ok_or(TypeaheadError::NoActiveSession)?;
        let span = CaretSpan::new(&candidate.replaceable_string);
        let entity = TypeaheadEntity::create(&self.config.type_name, value, &self.config.trigger, None)?;

        let key = document.replace_span(&span, entity)?;
        document.select_node(key);
        ta_debug!("QuerySession", "{} committed {:?}", self.config.type_name, value);
        self.close();
        Ok(key)
    }

    /// Commit the highlighted option.
    pub fn select_highlighted<D>(&mut self, document: &mut D) -> Result<NodeKey>
    where
        D: TypeaheadDocument + ?Sized,
    {
        let value = self
            .options()
            .get(self.highlighted)
            .cloned()
            .ok_or(TypeaheadError::NoOptionHighlighted)?;
        self.select_option(&value, document)
    }

    /// Close the menu without committing.
    pub fn cancel(&mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.is_active() {
            ta_debug!("QuerySession", "{} closed", self.config.type_name);
        }
        self.state = SessionState::Idle;
        self.results.clear();
        self.highlighted = 0;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeahead::document::TextDocument;
    use crate::typeahead::error::ProviderError;
    use pretty_assertions::assert_eq;

    fn configs() -> Rc<[TriggerConfig]> {
        Rc::from(vec![
            TriggerConfig::new("mention", "@").with_max_results(2),
            TriggerConfig::new("hashtag", "#").with_class_name("tags"),
        ])
    }

    fn mention_session() -> QuerySession {
        QuerySession::new(configs(), 0).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_starts_idle() {
        let session = mention_session();
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.query_string().is_none());
        assert!(session.menu().is_none());
        assert_eq!(session.sibling_configs().count(), 1);
    }

    #[test]
    fn test_text_change_opens_session_with_ticket() {
        let mut session = mention_session();
        let ticket = session.on_text_change("hello @al").unwrap();

        assert_eq!(ticket.type_name, "mention");
        assert_eq!(ticket.query, "al");
        assert!(session.is_active());
        assert_eq!(session.query_string(), Some("al"));
    }

    #[test]
    fn test_same_query_dispatches_once() {
        let mut session = mention_session();
        assert!(session.on_text_change("hello @al").is_some());
        assert!(session.on_text_change("hello @al").is_none(), "Unchanged query must not redispatch");
        assert!(session.on_text_change("hello @ali").is_some());
    }

    #[test]
    fn test_bare_trigger_does_not_open() {
        let mut session = mention_session();
        assert!(session.on_text_change("hello @").is_none());
        assert!(!session.is_active());
    }

    #[test]
    fn test_losing_candidate_goes_idle_and_clears_results() {
        let mut session = mention_session();
        let ticket = session.on_text_change("@al").unwrap();
        session.resolve(QueryResponse::ok(&ticket, strings(&["alice"])));
        assert_eq!(session.options().len(), 1);

        assert!(session.on_text_change("@al ").is_none());
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.options().is_empty());
    }

    #[test]
    fn test_results_truncated_to_max_results() {
        let mut session = mention_session();
        let ticket = session.on_text_change("@a").unwrap();
        let outcome = session.resolve(QueryResponse::ok(&ticket, strings(&["ann", "amy", "ava"])));

        assert_eq!(outcome, ResolveOutcome::Applied);
        assert_eq!(session.options(), &strings(&["ann", "amy"])[..]);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut session = mention_session();
        let al = session.on_text_change("@al").unwrap();
        let ali = session.on_text_change("@ali").unwrap();

        assert_eq!(session.resolve(QueryResponse::ok(&ali, strings(&["alice"]))), ResolveOutcome::Applied);
        assert_eq!(
            session.resolve(QueryResponse::ok(&al, strings(&["albert", "alfred"]))),
            ResolveOutcome::Stale
        );
        assert_eq!(session.options(), &strings(&["alice"])[..]);
    }

    #[test]
    fn test_response_after_reopen_with_same_query_is_stale() {
        let mut session = mention_session();
        let first = session.on_text_change("@al").unwrap();
        session.cancel();
        let second = session.on_text_change("@al").unwrap();

        assert_ne!(first.generation, second.generation);
        assert_eq!(session.resolve(QueryResponse::ok(&first, strings(&["x"]))), ResolveOutcome::Stale);
    }

    #[test]
    fn test_response_while_idle_is_stale() {
        let mut session = mention_session();
        let ticket = session.on_text_change("@al").unwrap();
        session.cancel();
        assert_eq!(session.resolve(QueryResponse::ok(&ticket, strings(&["alice"]))), ResolveOutcome::Stale);
        assert!(session.options().is_empty());
    }

    #[test]
    fn test_provider_failure_empties_results_and_stays_querying() {
        let mut session = mention_session();
        let al = session.on_text_change("@al").unwrap();
        session.resolve(QueryResponse::ok(&al, strings(&["alice"])));

        let ali = session.on_text_change("@ali").unwrap();
        let outcome = session.resolve(QueryResponse {
            type_name: ali.type_name.clone(),
            generation: ali.generation,
            result: Err(ProviderError("timeout".to_string())),
        });

        assert_eq!(outcome, ResolveOutcome::Failed);
        assert!(session.options().is_empty());
        assert!(session.is_active());
    }

    #[test]
    fn test_highlight_navigation_wraps() {
        let mut session = mention_session();
        let ticket = session.on_text_change("@a").unwrap();
        session.resolve(QueryResponse::ok(&ticket, strings(&["ann", "amy"])));

        assert_eq!(session.highlighted_index(), 0);
        session.highlight_next();
        assert_eq!(session.highlighted_index(), 1);
        session.highlight_next();
        assert_eq!(session.highlighted_index(), 0);
        session.highlight_previous();
        assert_eq!(session.highlighted_index(), 1);

        assert!(!session.set_highlighted_index(2));
        assert!(session.set_highlighted_index(0));
    }

    #[test]
    fn test_highlight_resets_when_query_changes() {
        let configs: Rc<[TriggerConfig]> = Rc::from(vec![TriggerConfig::new("mention", "@")]);
        let mut session = QuerySession::new(configs, 0).unwrap();
        let a = session.on_text_change("@a").unwrap();
        session.resolve(QueryResponse::ok(&a, strings(&["ann", "amy", "abe"])));
        session.set_highlighted_index(2);

        let am = session.on_text_change("@am").unwrap();
        assert_eq!(session.highlighted_index(), 0);
        session.resolve(QueryResponse::ok(&am, strings(&["amy", "amos", "amir"])));

        let menu = session.menu().unwrap();
        assert_eq!(menu.highlighted_index, 0);
        assert!(menu.options[0].selected);
        assert_eq!(menu.options[0].value, "amy");
    }

    #[test]
    fn test_highlight_kept_when_query_unchanged() {
        let mut session = mention_session();
        let a = session.on_text_change("@a").unwrap();
        session.resolve(QueryResponse::ok(&a, strings(&["ann", "amy"])));
        session.set_highlighted_index(1);

        assert!(session.on_text_change("so @a").is_none());
        assert_eq!(session.highlighted_index(), 1);
    }

    #[test]
    fn test_highlight_clamped_on_shorter_results() {
        let mut session = mention_session();
        let a = session.on_text_change("@a").unwrap();
        session.resolve(QueryResponse::ok(&a, strings(&["ann", "amy"])));
        session.set_highlighted_index(1);

        // A late refresh for the same query shrinks the list.
        session.resolve(QueryResponse::ok(&a, strings(&["ann"])));
        assert_eq!(session.highlighted_index(), 0);
    }

    #[test]
    fn test_out_of_range_config_index() {
        let result = QuerySession::new(configs(), 5);
        assert!(matches!(
            result,
            Err(TypeaheadError::ConfigIndexOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_duplicate_results_get_distinct_keys() {
        let mut session = mention_session();
        let ticket = session.on_text_change("@al").unwrap();
        session.resolve(QueryResponse::ok(&ticket, strings(&["alice", "alice"])));

        let menu = session.menu().unwrap();
        assert_eq!(menu.options[0].value, menu.options[1].value);
        assert_ne!(menu.options[0].key, menu.options[1].key);
    }

    #[test]
    fn test_select_highlighted_without_options() {
        let mut doc = TextDocument::from_text("@al");
        let mut session = mention_session();
        let ticket = session.on_text_change("@al").unwrap();
        session.resolve(QueryResponse::ok(&ticket, Vec::new()));

        assert!(matches!(
            session.select_highlighted(&mut doc),
            Err(TypeaheadError::NoOptionHighlighted)
        ));
        assert!(session.is_active());
    }

    #[test]
    fn test_menu_state() {
        let mut session = QuerySession::new(configs(), 1).unwrap();
        let ticket = session.on_text_change("so #ru").unwrap();
        session.resolve(QueryResponse::ok(&ticket, strings(&["rust", "ruby"])));

        let menu = session.menu().unwrap();
        assert_eq!(menu.type_name, "hashtag");
        assert_eq!(menu.query, "ru");
        assert_eq!(menu.class_name, "typeahead-popover tags");
        assert_eq!(menu.anchor.replaceable_string, "#ru");
        assert_eq!(menu.options[1].item_id, "typeahead-item-1");
        assert!(menu.options[0].selected);
        assert!(!menu.options[1].selected);
    }

    #[test]
    fn test_select_option_commits_entity() {
        let mut doc = TextDocument::from_text("hello @al");
        let mut session = mention_session();
        session.on_text_change(&doc.text_before_caret(100).unwrap());

        let key = session.select_option("alice", &mut doc).unwrap();

        assert_eq!(doc.text_content(), "hello @alice");
        assert_eq!(doc.selected_node(), Some(key));
        let entity = doc.entities().next().unwrap();
        assert_eq!(entity.typeahead_type(), "mention");
        assert_eq!(entity.content(), "alice");
        assert_eq!(entity.trigger(), "@");
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn test_select_highlighted() {
        let mut doc = TextDocument::from_text("@a");
        let mut session = mention_session();
        let ticket = session.on_text_change("@a").unwrap();
        session.resolve(QueryResponse::ok(&ticket, strings(&["ann", "amy"])));
        session.highlight_next();

        session.select_highlighted(&mut doc).unwrap();
        assert_eq!(doc.text_content(), "@amy");
    }

    #[test]
    fn test_select_without_session_fails() {
        let mut doc = TextDocument::from_text("hello");
        let mut session = mention_session();
        assert!(matches!(
            session.select_option("alice", &mut doc),
            Err(TypeaheadError::NoActiveSession)
        ));
        assert_eq!(doc.text_content(), "hello");
    }

    #[test]
    fn test_rejected_commit_keeps_session() {
        let mut doc = TextDocument::from_text("@bo");
        let mut session = mention_session();
        session.on_text_change("@al");

        assert!(session.select_option("alice", &mut doc).is_err());
        assert!(session.is_active());
        assert_eq!(doc.text_content(), "@bo");
    }
}

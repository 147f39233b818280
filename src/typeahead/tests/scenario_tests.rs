//! End-to-end typeahead scenarios
//!
//! Each test drives the conductor the way an editor host would: text
//! changes in, tickets out, provider responses back, then a commit.

use crate::typeahead::conductor::TypeaheadConductor;
use crate::typeahead::config::TriggerConfig;
use crate::typeahead::document::TextDocument;
use crate::typeahead::dom::DomElement;
use crate::typeahead::entity::{InlineEntity, TypeaheadEntity};
use crate::typeahead::error::ProviderError;
use crate::typeahead::provider::{dispatch, QueryResponse};
use crate::typeahead::session::ResolveOutcome;
use futures::executor::block_on;
use futures::future;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn mention_and_hashtag() -> TypeaheadConductor {
    TypeaheadConductor::new(vec![
        TriggerConfig::new("mention", "@").with_max_results(1),
        TriggerConfig::new("hashtag", "#"),
    ])
    .unwrap()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Mention lookup and commit
// ============================================================================

#[test]
fn test_mention_query_resolves_and_commits() {
    let mut conductor = mention_and_hashtag();
    conductor
        .set_provider(
            "mention",
            Rc::new(|_: String| future::ready(Ok::<_, ProviderError>(strings(&["alice", "albert"])))),
        )
        .unwrap();
    let mut doc = TextDocument::from_text("hello @al");

    let change = conductor.on_document_change(&doc);
    assert_eq!(change.active.as_deref(), Some("mention"));
    let ticket = change.ticket.expect("New query must produce a ticket");
    assert_eq!(ticket.query, "al");

    let provider = conductor.provider_for(&ticket).unwrap();
    let response = block_on(dispatch(&*provider, ticket));
    assert_eq!(conductor.resolve(response), ResolveOutcome::Applied);

    let menu = conductor.menu().unwrap();
    assert_eq!(menu.options.len(), 1, "Results must be truncated to maxResults");
    assert_eq!(menu.options[0].value, "alice");

    conductor.select_option("alice", &mut doc).unwrap();
    assert_eq!(doc.text_content(), "hello @alice");
    let entity = doc.entities().next().unwrap();
    assert_eq!(entity.display_text(), "@alice");
    assert_eq!(entity.content(), "alice");
    assert!(conductor.active_session().is_none());
}

// ============================================================================
// Adjacent triggers
// ============================================================================

#[test]
fn test_adjacent_triggers_open_no_session() {
    let mut conductor = mention_and_hashtag();

    let change = conductor.on_text_change("@#x");
    assert!(change.active.is_none());
    assert!(change.ticket.is_none());
    assert!(!conductor.session("mention").unwrap().is_active());
    assert!(!conductor.session("hashtag").unwrap().is_active());
}

#[test]
fn test_overlapping_trigger_classes_open_no_session() {
    // "@+" matches any of '@' or '+', so it overlaps every mention run.
    let mut conductor = TypeaheadConductor::new(vec![
        TriggerConfig::new("mention", "@"),
        TriggerConfig::new("assign", "@+"),
    ])
    .unwrap();

    assert!(conductor.on_text_change("hi @al").active.is_none());
    assert!(conductor.active_session().is_none());

    // Only "assign" can read a '+' run.
    let change = conductor.on_text_change("hi +al");
    assert_eq!(change.active.as_deref(), Some("assign"));
    assert_eq!(change.ticket.unwrap().query, "al");
}

// ============================================================================
// Markup import
// ============================================================================

#[test]
fn test_import_span_without_content_attribute() {
    let element = DomElement::new("span")
        .with_attribute("data-lexical-typeahead", "true")
        .with_attribute("data-lexical-typeahead-type", "mention")
        .with_attribute("data-lexical-typeahead-trigger", "@")
        .with_text("@bob");

    let entity = TypeaheadEntity::import_dom().convert(&element).unwrap();
    assert_eq!(entity.typeahead_type(), "mention");
    assert_eq!(entity.content(), "bob");
    assert_eq!(entity.trigger(), "@");
    assert_eq!(entity.display_text(), "@bob");

    // Re-export omits the redundant content attribute again.
    assert!(!entity.export_dom().has_attribute("data-lexical-typeahead-content"));
}

// ============================================================================
// Out-of-order responses
// ============================================================================

#[test]
fn test_stale_response_never_overwrites_newer_results() {
    let mut conductor = mention_and_hashtag();
    let slow = conductor.on_text_change("@al").ticket.unwrap();
    let fast = conductor.on_text_change("@ali").ticket.unwrap();
    assert!(fast.generation > slow.generation);

    assert_eq!(
        conductor.resolve(QueryResponse::ok(&fast, strings(&["alice"]))),
        ResolveOutcome::Applied
    );
    assert_eq!(
        conductor.resolve(QueryResponse::ok(&slow, strings(&["albert"]))),
        ResolveOutcome::Stale
    );

    let menu = conductor.menu().unwrap();
    assert_eq!(menu.query, "ali");
    assert_eq!(menu.options[0].value, "alice");
}

//! Search provider seam
//!
//! A provider maps a query string to candidate values, asynchronously.
//! Calls are never cancelled: a session issues a [`QueryTicket`] per
//! distinct query and later drops any [`QueryResponse`] whose generation is
//! no longer current.

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;

use super::error::ProviderError;

/// Outcome of one provider call.
pub type SearchResult = Result<Vec<String>, ProviderError>;

/// Asynchronous candidate source for one trigger.
pub trait SearchProvider {
    fn search(&self, query: &str) -> LocalBoxFuture<'static, SearchResult>;
}

impl<F, Fut> SearchProvider for F
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = SearchResult> + 'static,
{
    fn search(&self, query: &str) -> LocalBoxFuture<'static, SearchResult> {
        self(query.to_string()).boxed_local()
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// A query a session wants dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTicket {
    pub type_name: String,
    pub query: String,
    /// Session-local tag; only the latest one may update results
    pub generation: u64,
}

/// Provider result for a ticket, routed back to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResponse {
    pub type_name: String,
    pub generation: u64,
    pub result: SearchResult,
}

impl QueryResponse {
    pub fn ok(ticket: &QueryTicket, results: Vec<String>) -> Self {
        Self {
            type_name: ticket.type_name.clone(),
            generation: ticket.generation,
            result: Ok(results),
        }
    }

    pub fn failed(ticket: &QueryTicket, message: impl Into<String>) -> Self {
        Self {
            type_name: ticket.type_name.clone(),
            generation: ticket.generation,
            result: Err(ProviderError(message.into())),
        }
    }
}

/// Run `ticket` against `provider`.
pub async fn dispatch<P: SearchProvider + ?Sized>(provider: &P, ticket: QueryTicket) -> QueryResponse {
    let result = provider.search(&ticket.query).await;
    QueryResponse {
        type_name: ticket.type_name,
        generation: ticket.generation,
        result,
    }
}

// =============================================================================
// Tests
// =============================================================================

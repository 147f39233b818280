//! TriggerPattern - trigger detection at the caret via Regex
//!
//! A trigger run must:
//! - start at the beginning of the text, after whitespace, or after `(`
//! - begin with the trigger character
//! - continue with up to [`LENGTH_LIMIT`] valid characters
//! - end exactly at the caret (end of the evaluated text)
//!
//! Valid characters exclude the trigger itself, whitespace and a fixed
//! punctuation set. The [`Arbiter`] layers cross-trigger conflict handling
//! on top: one trigger only matches when no other registered trigger
//! matches the same text at all.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::config::TriggerConfig;
use super::error::Result;

// =============================================================================
// Constants
// =============================================================================

/// Hard cap on the query length after the trigger character.
pub const LENGTH_LIMIT: usize = 75;

/// Punctuation that terminates a query.
pub const PUNCTUATION: &str = ".,+*?$@|#{}()^-[]\\/!%'\"~=<>_:;";

/// Query length required for a trigger's own match.
pub const PRIMARY_MIN_MATCH_LENGTH: usize = 1;

/// Query length used when probing other triggers for conflicts. A bare
/// trigger character already counts as a conflict.
pub const CONFLICT_MIN_MATCH_LENGTH: usize = 0;

// =============================================================================
// Types
// =============================================================================

/// A trigger run found at the caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    /// Byte offset where the trigger character starts
    pub lead_offset: usize,
    /// Query text after the trigger
    pub matching_string: String,
    /// Trigger plus query: the span replaced on selection
    pub replaceable_string: String,
}

impl MatchCandidate {
    /// Byte range of the replaceable span within the evaluated text.
    pub fn replace_range(&self) -> Range<usize> {
        self.lead_offset..self.lead_offset + self.replaceable_string.len()
    }
}

// =============================================================================
// TriggerPattern
// =============================================================================

/// Compiled matcher for one trigger.
#[derive(Debug, Clone)]
pub struct TriggerPattern {
    trigger: String,
    re: Regex,
}

/// Escape each character for use inside a regex character class.
fn class_escape(chars: &str) -> String {
    let mut out = String::with_capacity(chars.len() * 2);
    let mut buf = [0u8; 4];
    for c in chars.chars() {
        out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
    }
    out
}

impl TriggerPattern {
    /// Build the matcher for `trigger`.
    ///
    /// The trigger is used as a character class, so a multi-character
    /// trigger matches any one of its characters.
    pub fn new(trigger: &str) -> Result<Self> {
        let escaped_trigger = class_escape(trigger);
        let punctuation = class_escape(PUNCTUATION);

        // Group 1: boundary, Group 2: replaceable span, Group 3: query
        let pattern = format!(
            r"(^|\s|\()([{t}]((?:[^{t}{p}\s]){{0,{limit}}}))$",
            t = escaped_trigger,
            p = punctuation,
            limit = LENGTH_LIMIT,
        );
        let re = Regex::new(&pattern)?;

        Ok(Self {
            trigger: trigger.to_string(),
            re,
        })
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Match against text ending at the caret.
    ///
    /// Returns a candidate only when the query has at least
    /// `min_match_length` characters.
    pub fn find(&self, text: &str, min_match_length: usize) -> Option<MatchCandidate> {
        let cap = self.re.captures(text)?;
        let boundary = cap.get(1)?;
        let replaceable = cap.get(2)?;
        let matching = cap.get(3)?;

        if matching.as_str().chars().count() < min_match_length {
            return None;
        }

        Some(MatchCandidate {
            lead_offset: boundary.end(),
            matching_string: matching.as_str().to_string(),
            replaceable_string: replaceable.as_str().to_string(),
        })
    }
}

// =============================================================================
// Arbiter
// =============================================================================

/// Trigger matcher for one config, aware of every sibling config.
///
/// The policy is "any other trigger matches, so this one yields": a rival's
/// zero-length match anywhere at the caret suppresses this trigger,
/// regardless of which lead offset is closer to the caret. This keeps
/// behaviour compatible with existing editors but is a candidate for a
/// nearest-match rule later.
#[derive(Debug, Clone)]
pub struct Arbiter {
    type_name: String,
    own: TriggerPattern,
    rivals: Vec<TriggerPattern>,
}

impl Arbiter {
    /// Build the arbiter for `config`; every entry of `all_configs` with a
    /// different type is a rival.
    pub fn new(config: &TriggerConfig, all_configs: &[TriggerConfig]) -> Result<Self> {
        let own = TriggerPattern::new(&config.trigger)?;
        let rivals = all_configs
            .iter()
            .filter(|c| c.type_name != config.type_name)
            .map(|c| TriggerPattern::new(&c.trigger))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            type_name: config.type_name.clone(),
            own,
            rivals,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Rival whose conflict probe matches `text`, if any.
    pub fn conflicting_trigger(&self, text: &str) -> Option<&str> {
        self.rivals
            .iter()
            .find(|rival| rival.find(text, CONFLICT_MIN_MATCH_LENGTH).is_some())
            .map(TriggerPattern::trigger)
    }

    /// This trigger's candidate at the caret, after arbitration.
    pub fn evaluate(&self, text: &str) -> Option<MatchCandidate> {
        if self.conflicting_trigger(text).is_some() {
            return None;
        }
        self.own.find(text, PRIMARY_MIN_MATCH_LENGTH)
    }
}

// =============================================================================
// Tests
// =============================================================================

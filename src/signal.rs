//! Status-signal extraction.
//!
//! The assistant is expected to end every turn that proposed or made changes
//! with a small status object embedded in its closing message:
//!
//! ```text
//! {"proposedChanges": true, "madeChanges": true}
//! ```
//!
//! Only the last assistant turn is scanned for the object; when it narrates
//! intermediate states, the rightmost occurrence is the final summary and
//! wins. A turn with no object at all falls back to tool-invocation
//! detection over the last two turns.
use crate::transcript::TranscriptTail;
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Tool names whose invocation implies the turn mutated files.
const MUTATING_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit", "NotebookEdit"];

/// Status signal derived from one invocation's transcript tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSignal {
    /// A well-formed status object closed the turn.
    Explicit {
        proposed_changes: bool,
        made_changes: bool,
    },
    /// A status object was present but violated the contract.
    Malformed,
    /// No status object, but a mutating tool ran in the fallback window.
    Inferred,
    /// A conversational turn: nothing to gate.
    NoSignal,
}

/// Extraction strategy over the last assistant turn's text.
///
/// Scanning free text for an embedded object is fragile against unusual
/// phrasing; keeping the strategy behind this trait lets a reserved-delimiter
/// protocol replace it without touching the gate's state machine. `None`
/// means "no occurrence" and hands control to the tool fallback.
pub trait SignalExtractor {
    fn extract(&self, text: &str) -> Option<StatusSignal>;
}

/// Default strategy: regex scan for a minimal JSON object carrying the two
/// status fields, last match authoritative.
#[derive(Debug, Default)]
pub struct EmbeddedJsonExtractor;

#[derive(Debug, Deserialize)]
struct RawSignal {
    #[serde(rename = "proposedChanges")]
    proposed_changes: Option<bool>,
    #[serde(rename = "madeChanges")]
    made_changes: Option<bool>,
}

fn signal_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{[^{}]*"(?:proposedChanges|madeChanges)"[^{}]*\}"#)
            .expect("regex for embedded status objects")
    })
}

impl SignalExtractor for EmbeddedJsonExtractor {
    fn extract(&self, text: &str) -> Option<StatusSignal> {
        let last = signal_object_re().find_iter(text).last()?;
        let signal = match serde_json::from_str::<RawSignal>(last.as_str()) {
            Ok(RawSignal {
                proposed_changes: Some(proposed_changes),
                made_changes: Some(made_changes),
            }) => StatusSignal::Explicit {
                proposed_changes,
                made_changes,
            },
            // Missing field, non-boolean value, or not JSON at all: an
            // attempted contract, not silence.
            Ok(_) | Err(_) => StatusSignal::Malformed,
        };
        Some(signal)
    }
}

/// Derive the invocation's status signal from the transcript tail.
pub fn derive_signal(tail: &TranscriptTail, extractor: &dyn SignalExtractor) -> StatusSignal {
    if let Some(text) = tail.last_assistant_text() {
        if let Some(signal) = extractor.extract(&text) {
            return signal;
        }
    }
    let mutated = tail
        .recent_tool_names()
        .iter()
        .any(|name| MUTATING_TOOLS.contains(name));
    if mutated {
        StatusSignal::Inferred
    } else {
        StatusSignal::NoSignal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{Block, Turn};

    fn extract(text: &str) -> Option<StatusSignal> {
        EmbeddedJsonExtractor.extract(text)
    }

    #[test]
    fn explicit_signal_parses_regardless_of_key_order() {
        let expected = StatusSignal::Explicit {
            proposed_changes: false,
            made_changes: true,
        };
        assert_eq!(
            extract(r#"Made changes. {"proposedChanges": false, "madeChanges": true}"#),
            Some(expected)
        );
        assert_eq!(
            extract(r#"Made changes. {"madeChanges": true, "proposedChanges": false}"#),
            Some(expected)
        );
    }

    #[test]
    fn last_occurrence_wins() {
        let text = concat!(
            r#"First pass: {"proposedChanges": true, "madeChanges": true}"#,
            " then reverted everything. ",
            r#"Final: {"proposedChanges": false, "madeChanges": false}"#
        );
        assert_eq!(
            extract(text),
            Some(StatusSignal::Explicit {
                proposed_changes: false,
                made_changes: false,
            })
        );
    }

    #[test]
    fn missing_field_is_malformed() {
        assert_eq!(
            extract(r#"{"proposedChanges": true}"#),
            Some(StatusSignal::Malformed)
        );
    }

    #[test]
    fn non_boolean_value_is_malformed() {
        assert_eq!(
            extract(r#"{"proposedChanges": "yes", "madeChanges": true}"#),
            Some(StatusSignal::Malformed)
        );
    }

    #[test]
    fn plain_prose_has_no_occurrence() {
        assert_eq!(extract("All done, nothing changed."), None);
        assert_eq!(extract(r#"see {"other": 1} for details"#), None);
    }

    fn assistant_turn(blocks: Vec<Block>) -> Turn {
        Turn {
            role: Some("assistant".to_string()),
            blocks,
        }
    }

    #[test]
    fn tool_fallback_infers_changes() {
        let tail = TranscriptTail::from_turns(vec![assistant_turn(vec![
            Block::ToolInvocation("Edit".to_string()),
            Block::Text("patched the parser".to_string()),
        ])]);
        assert_eq!(
            derive_signal(&tail, &EmbeddedJsonExtractor),
            StatusSignal::Inferred
        );
    }

    #[test]
    fn read_only_tools_do_not_trigger_fallback() {
        let tail = TranscriptTail::from_turns(vec![assistant_turn(vec![
            Block::ToolInvocation("Read".to_string()),
            Block::Text("just looking around".to_string()),
        ])]);
        assert_eq!(
            derive_signal(&tail, &EmbeddedJsonExtractor),
            StatusSignal::NoSignal
        );
    }

    #[test]
    fn explicit_signal_preempts_tool_fallback() {
        let tail = TranscriptTail::from_turns(vec![assistant_turn(vec![
            Block::ToolInvocation("Edit".to_string()),
            Block::Text(r#"{"proposedChanges": true, "madeChanges": true}"#.to_string()),
        ])]);
        assert_eq!(
            derive_signal(&tail, &EmbeddedJsonExtractor),
            StatusSignal::Explicit {
                proposed_changes: true,
                made_changes: true,
            }
        );
    }
}

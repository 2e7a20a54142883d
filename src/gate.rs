//! The decision state machine.
//!
//! Composes the signal, ticket, policy, and evidence views into one of three
//! outcomes. Severity is deliberate: silence on a conversational turn is
//! allowed, a broken status contract is fatal to the turn, and everything in
//! between is guidance the session can act on next turn.
use crate::evidence;
use crate::policy;
use crate::signal::{derive_signal, EmbeddedJsonExtractor, StatusSignal};
use crate::tickets;
use crate::transcript::TranscriptTail;
use serde::Serialize;
use std::path::Path;

/// Final outcome of one gate invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Decision {
    /// The turn may end; the gate stays silent.
    Allow,
    /// The turn ends, but `reason` is injected as guidance for another turn.
    SoftBlock { reason: String },
    /// The turn must not end until `reason` is resolved.
    HardBlock { reason: String },
}

/// Evaluate one turn end against the transcript tail and ticket store.
pub fn evaluate(tail: &TranscriptTail, store_root: &Path) -> Decision {
    match derive_signal(tail, &EmbeddedJsonExtractor) {
        StatusSignal::NoSignal => Decision::Allow,
        StatusSignal::Malformed => Decision::HardBlock {
            reason: "missing required structured summary: end the turn with \
                     {\"proposedChanges\": <bool>, \"madeChanges\": <bool>}"
                .to_string(),
        },
        // Less severe than a broken explicit contract: the turn forgot to
        // report, it did not misreport.
        StatusSignal::Inferred => Decision::SoftBlock {
            reason: "edit tools were detected in this turn but no structured status \
                     summary was found; end the turn with {\"proposedChanges\": <bool>, \
                     \"madeChanges\": <bool>}"
                .to_string(),
        },
        StatusSignal::Explicit {
            proposed_changes: false,
            made_changes: false,
        } => Decision::Allow,
        StatusSignal::Explicit { .. } => gate_changes(tail, store_root),
    }
}

/// The turn proposed or made changes: resolve the active ticket and apply its
/// phase policy.
fn gate_changes(tail: &TranscriptTail, store_root: &Path) -> Decision {
    let ticket = tickets::select_active_ticket(store_root);
    let phase = ticket.as_ref().and_then(|ticket| ticket.phase.as_deref());
    let (phase_name, row) = policy::resolve(phase);

    if let Some(ticket) = ticket.as_ref().filter(|ticket| ticket.kind.has_lifecycle()) {
        // A missing cumulative artifact pre-empts both phase guidance and
        // evidence checking.
        if let Some(artifact) = policy::first_missing_artifact(&ticket.dir, phase_name) {
            return Decision::SoftBlock {
                reason: format!(
                    "ticket {} is missing required artifact {artifact}; create it in the \
                     ticket folder before ending the turn",
                    ticket.id
                ),
            };
        }
        if row.terminal {
            let missing = evidence::missing_evidence(&tail.text(), &ticket.kind);
            if missing.is_empty() {
                return Decision::Allow;
            }
            let labels: Vec<&str> = missing.iter().map(|class| class.label()).collect();
            return Decision::HardBlock {
                reason: format!(
                    "ticket {} is at its terminal phase but the transcript lacks required \
                     evidence: {}",
                    ticket.id,
                    labels.join(", ")
                ),
            };
        }
    }

    Decision::SoftBlock {
        reason: row.guidance.to_string(),
    }
}

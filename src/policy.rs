//! Phase policy table and cumulative artifact checking.
//!
//! The table is pure data on purpose: adding a phase is adding a row, not
//! touching control flow. Row order is the lifecycle order, which is what
//! makes artifact requirements cumulative.
use std::path::Path;

/// Policy for one lifecycle phase.
#[derive(Debug)]
pub struct PhasePolicy {
    /// Guidance injected when a turn ends mid-phase.
    pub guidance: &'static str,
    /// Artifact that must exist under the ticket's folder once the ticket has
    /// reached this phase.
    pub artifact: Option<&'static str>,
    /// Terminal phases are gated by evidence, not guidance.
    pub terminal: bool,
}

/// Phase used when a ticket has no phase, an unrecognized phase, or when no
/// ticket is active at all.
pub const DEFAULT_PHASE: &str = "implement";

const PHASES: &[(&str, PhasePolicy)] = &[
    (
        "intake",
        PhasePolicy {
            guidance: "Intake: restate the problem in your own words and record the \
                       acceptance criteria on the ticket before writing code.",
            artifact: None,
            terminal: false,
        },
    ),
    (
        "design",
        PhasePolicy {
            guidance: "Design: write the intended approach to design.md before building. \
                       Name the seams, the data that crosses them, and what can go wrong.",
            artifact: Some("design.md"),
            terminal: false,
        },
    ),
    (
        "implement",
        PhasePolicy {
            guidance: "Re-read the diff before ending the turn. Is it correct? Is it \
                       complete? Did the tests change along with the code?",
            artifact: None,
            terminal: false,
        },
    ),
    (
        "scenario-gate",
        PhasePolicy {
            guidance: "Scenario gate: enumerate the acceptance scenarios in scenarios.md \
                       and note how each one will be exercised.",
            artifact: Some("scenarios.md"),
            terminal: false,
        },
    ),
    (
        "review",
        PhasePolicy {
            guidance: "Review: walk the change once more. Naming, error paths, docs, and \
                       tests all updated?",
            artifact: None,
            terminal: false,
        },
    ),
    (
        "done",
        PhasePolicy {
            guidance: "Closing: the transcript should demonstrate the work - a test run \
                       summary and completed scenarios - before the ticket is wrapped up.",
            artifact: None,
            terminal: true,
        },
    ),
];

/// Resolve a ticket phase to its policy row. Missing and unrecognized phases
/// are equivalent: both land on the default row.
pub fn resolve(phase: Option<&str>) -> (&'static str, &'static PhasePolicy) {
    let name = phase.unwrap_or(DEFAULT_PHASE);
    PHASES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .or_else(|| PHASES.iter().find(|(candidate, _)| *candidate == DEFAULT_PHASE))
        .map(|(name, policy)| (*name, policy))
        .unwrap_or_else(|| unreachable!("default phase row missing from table"))
}

/// First missing cumulative artifact for a ticket at `phase_name`: every
/// artifact required by phases up to and including the resolved phase must
/// still exist under `ticket_dir`.
pub fn first_missing_artifact(ticket_dir: &Path, phase_name: &str) -> Option<&'static str> {
    let resolved_index = PHASES
        .iter()
        .position(|(name, _)| *name == phase_name)
        .unwrap_or_else(|| {
            PHASES
                .iter()
                .position(|(name, _)| *name == DEFAULT_PHASE)
                .unwrap_or(0)
        });
    PHASES[..=resolved_index]
        .iter()
        .filter_map(|(_, policy)| policy.artifact)
        .find(|artifact| !ticket_dir.join(artifact).is_file())
}

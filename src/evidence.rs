//! Terminal-phase evidence scanning.
//!
//! Two independent evidence classes are recognized in the transcript tail: a
//! test-execution summary with a pass count, and a scenario/acceptance
//! completion marker. Which classes a ticket needs depends on its kind.
use crate::tickets::TicketKind;
use regex::Regex;
use std::sync::OnceLock;

/// One class of turn-end evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceClass {
    Tests,
    Scenarios,
}

impl EvidenceClass {
    pub fn label(self) -> &'static str {
        match self {
            Self::Tests => "tests",
            Self::Scenarios => "scenarios",
        }
    }
}

/// Matches test-runner pass summaries: `15 passed`, `test result: ok. 5
/// passed; 0 failed`, `2 tests passed`.
fn test_summary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b\d+\s+(?:tests?\s+)?passed\b").expect("regex for test summaries")
    })
}

/// Matches scenario/acceptance completion markers: `scenarios: complete`,
/// `all scenarios passed`, `scenario verified`.
fn scenario_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:all\s+)?scenarios?\s*:?\s+?(?:complete(?:d)?|verified|accepted|pass(?:ed)?)\b|\bscenarios?\s*:\s*(?:complete(?:d)?|verified|accepted|pass(?:ed)?)\b",
        )
        .expect("regex for scenario markers")
    })
}

fn present(class: EvidenceClass, text: &str) -> bool {
    match class {
        EvidenceClass::Tests => test_summary_re().is_match(text),
        EvidenceClass::Scenarios => scenario_marker_re().is_match(text),
    }
}

/// Evidence classes a ticket kind must demonstrate at its terminal phase.
/// Features carry acceptance scenarios; other lifecycle kinds only need a
/// test run.
fn required_classes(kind: &TicketKind) -> &'static [EvidenceClass] {
    match kind {
        TicketKind::Feature => &[EvidenceClass::Tests, EvidenceClass::Scenarios],
        _ => &[EvidenceClass::Tests],
    }
}

/// Scan `text` for the evidence `kind` requires; returns the classes still
/// missing, in requirement order.
pub fn missing_evidence(text: &str, kind: &TicketKind) -> Vec<EvidenceClass> {
    required_classes(kind)
        .iter()
        .copied()
        .filter(|class| !present(*class, text))
        .collect()
}

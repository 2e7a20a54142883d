//! Workflow ticket store reader.
//!
//! Tickets are owned by external planning tooling; this module only takes a
//! read-only snapshot per invocation. The store is a directory of ticket
//! folders, each holding a `ticket.md` whose front-matter block carries the
//! fields the gate cares about:
//!
//! ```text
//! ---
//! id: TCK-0042
//! type: feature
//! phase: scenario-gate
//! status: in_progress
//! last_modified: 2026-08-20T14:03:00Z
//! ---
//! free-form notes, ignored here
//! ```
//!
//! Parsing is permissive: unknown keys are ignored, missing optional keys
//! take defaults, and a malformed ticket file is skipped rather than fatal.
use anyhow::{anyhow, Context, Result};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

const TICKET_FILE: &str = "ticket.md";
const FRONT_MATTER_DELIMITER: &str = "---";

/// Ticket kind. Unknown kinds behave like `task`: guidance without gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketKind {
    Feature,
    Task,
    Epic,
    Other(String),
}

impl TicketKind {
    fn parse(value: &str) -> Self {
        match value {
            "feature" => Self::Feature,
            "task" => Self::Task,
            "epic" => Self::Epic,
            other => Self::Other(other.to_string()),
        }
    }

    /// Kinds with a full phase lifecycle get artifact and evidence gating.
    pub fn has_lifecycle(&self) -> bool {
        matches!(self, Self::Feature)
    }
}

/// Ticket status. Only `in_progress` tickets are eligible for selection;
/// unknown values are treated like the `backlog` default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketStatus {
    Backlog,
    InProgress,
    Done,
    Blocked,
}

impl TicketStatus {
    fn parse(value: &str) -> Self {
        match value {
            "in_progress" => Self::InProgress,
            "done" => Self::Done,
            "blocked" => Self::Blocked,
            _ => Self::Backlog,
        }
    }
}

/// One ticket's snapshot, plus the folder its artifacts live in.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: String,
    pub kind: TicketKind,
    pub phase: Option<String>,
    pub status: TicketStatus,
    pub last_modified: String,
    pub dir: PathBuf,
}

/// Resolve the single active ticket, if any: the most-recently-modified
/// in-progress non-epic ticket, ties broken by lexical id order.
///
/// Pure function of the store root, re-evaluated every invocation; a missing
/// root yields `None`, never an error.
pub fn select_active_ticket(store_root: &Path) -> Option<Ticket> {
    let entries = match fs::read_dir(store_root) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::debug!("no ticket store at {}: {err}", store_root.display());
            return None;
        }
    };
    let mut active: Option<Ticket> = None;
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let ticket = match load_ticket(&dir) {
            Ok(ticket) => ticket,
            Err(err) => {
                tracing::debug!("skipping malformed ticket at {}: {err:#}", dir.display());
                continue;
            }
        };
        if ticket.status != TicketStatus::InProgress || ticket.kind == TicketKind::Epic {
            continue;
        }
        active = Some(match active.take() {
            None => ticket,
            Some(best) => prefer(best, ticket),
        });
    }
    active
}

/// Pick the preferred of two eligible tickets: later `last_modified` wins,
/// ties go to the lexically smaller id. RFC 3339 timestamps order correctly
/// under string comparison; a missing timestamp sorts oldest.
fn prefer(best: Ticket, candidate: Ticket) -> Ticket {
    match candidate.last_modified.cmp(&best.last_modified) {
        Ordering::Greater => candidate,
        Ordering::Equal if candidate.id < best.id => candidate,
        _ => best,
    }
}

fn load_ticket(dir: &Path) -> Result<Ticket> {
    let path = dir.join(TICKET_FILE);
    let text = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let fields = parse_front_matter(&text)
        .with_context(|| format!("front matter in {}", path.display()))?;

    let mut id = None;
    let mut kind = TicketKind::Task;
    let mut phase = None;
    let mut status = TicketStatus::Backlog;
    let mut last_modified = String::new();
    for (key, value) in fields {
        match key.as_str() {
            "id" => id = Some(value),
            "type" => kind = TicketKind::parse(&value),
            "phase" => phase = Some(value),
            "status" => status = TicketStatus::parse(&value),
            "last_modified" => last_modified = value,
            _ => {}
        }
    }
    let id = id
        .or_else(|| dir.file_name().map(|name| name.to_string_lossy().into_owned()))
        .ok_or_else(|| anyhow!("ticket folder has no usable id"))?;
    Ok(Ticket {
        id,
        kind,
        phase,
        status,
        last_modified,
        dir: dir.to_path_buf(),
    })
}

/// Parse a `---`-delimited front-matter block of `key: value` lines. Lines
/// without a colon are skipped; everything after the closing delimiter is
/// ignored.
fn parse_front_matter(text: &str) -> Result<Vec<(String, String)>> {
    let mut lines = text.lines();
    let opener = lines
        .by_ref()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| anyhow!("empty ticket file"))?;
    if opener.trim() != FRONT_MATTER_DELIMITER {
        return Err(anyhow!("missing opening front-matter delimiter"));
    }
    let mut fields = Vec::new();
    for line in lines {
        if line.trim() == FRONT_MATTER_DELIMITER {
            return Ok(fields);
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    Err(anyhow!("missing closing front-matter delimiter"))
}

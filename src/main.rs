//! Session-completion quality gate.
//!
//! Invoked by the host at the end of every assistant turn with a hook record
//! on stdin. One bounded read-parse-decide pass, then one of three
//! host-visible encodings:
//!
//! - allow: exit 0, no output
//! - soft-block: exit 0, `{"outcome":"soft-block","reason":…}` on stdout
//! - hard-block: exit 2, reason on stderr
//!
//! The one absolute rule: failures to read an input fail open (allow). This
//! tooling is an advisory safety layer and must never stall a human's
//! workflow.
use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

mod cli;
mod evidence;
mod gate;
mod policy;
mod signal;
mod tickets;
mod transcript;

use cli::{Command, ExplainArgs, GateArgs, RootArgs, DEFAULT_STORE_ROOT};
use gate::Decision;
use transcript::TranscriptTail;

/// Exit status for a hard block. 1 is left for crashes of the gate itself so
/// the host never mistakes a failure for a deliberate block.
const HARD_BLOCK_EXIT: i32 = 2;

/// Hook record delivered on stdin at turn end. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct HookRecord {
    transcript_path: PathBuf,
    #[serde(default)]
    cwd: Option<PathBuf>,
    #[serde(default)]
    session_id: Option<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let args = RootArgs::parse();
    match args.command {
        Command::Gate(args) => run_gate(args),
        Command::Explain(args) => run_explain(args),
    }
}

/// Diagnostics go to stderr and stay off unless explicitly enabled: both
/// output streams belong to the host protocol.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_gate(args: GateArgs) -> Result<()> {
    let record = match read_hook_record() {
        Ok(record) => record,
        Err(err) => {
            tracing::warn!("hook record unreadable, allowing turn: {err:#}");
            return Ok(());
        }
    };
    if let Some(session_id) = record.session_id.as_deref() {
        tracing::debug!("gating turn end for session {session_id}");
    }
    let tail = TranscriptTail::load(&record.transcript_path);
    let store_root = resolve_store_root(record.cwd.as_deref(), args.store_root.as_deref());
    emit(gate::evaluate(&tail, &store_root))
}

fn run_explain(args: ExplainArgs) -> Result<()> {
    let tail = TranscriptTail::load(&args.transcript);
    let store_root = resolve_store_root(args.cwd.as_deref(), args.store_root.as_deref());
    let decision = gate::evaluate(&tail, &store_root);
    let text = serde_json::to_string_pretty(&decision).context("serialize decision")?;
    println!("{text}");
    Ok(())
}

fn read_hook_record() -> Result<HookRecord> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("read hook record from stdin")?;
    serde_json::from_str(&input).context("parse hook record")
}

fn resolve_store_root(cwd: Option<&Path>, explicit: Option<&Path>) -> PathBuf {
    if let Some(root) = explicit {
        return root.to_path_buf();
    }
    match cwd {
        Some(cwd) => cwd.join(DEFAULT_STORE_ROOT),
        None => PathBuf::from(DEFAULT_STORE_ROOT),
    }
}

/// Encode the decision for the host. The host distinguishes the three
/// outcomes purely from (exit status, stdout payload).
fn emit(decision: Decision) -> Result<()> {
    match decision {
        Decision::Allow => Ok(()),
        Decision::SoftBlock { .. } => {
            let payload =
                serde_json::to_string(&decision).context("serialize soft-block payload")?;
            println!("{payload}");
            Ok(())
        }
        Decision::HardBlock { reason } => {
            eprintln!("{reason}");
            std::process::exit(HARD_BLOCK_EXIT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_root_resolution_prefers_the_explicit_flag() {
        let explicit = PathBuf::from("/elsewhere/tickets");
        assert_eq!(
            resolve_store_root(Some(Path::new("/work")), Some(&explicit)),
            explicit
        );
        assert_eq!(
            resolve_store_root(Some(Path::new("/work")), None),
            PathBuf::from("/work").join(DEFAULT_STORE_ROOT)
        );
        assert_eq!(
            resolve_store_root(None, None),
            PathBuf::from(DEFAULT_STORE_ROOT)
        );
    }

    #[test]
    fn hook_record_tolerates_unknown_fields() {
        let record: HookRecord = serde_json::from_str(
            r#"{"transcript_path":"/tmp/session.jsonl","hook_event_name":"turn_end","extra":1}"#,
        )
        .expect("parse record");
        assert_eq!(record.transcript_path, PathBuf::from("/tmp/session.jsonl"));
        assert_eq!(record.cwd, None);
    }
}

//! CLI argument parsing for the session gate.
//!
//! The CLI is intentionally thin: it wires a single read-parse-decide pass
//! without embedding policy, so the same core logic can be reused elsewhere.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default ticket store root, relative to the session working directory.
pub const DEFAULT_STORE_ROOT: &str = ".tickets";

/// Root CLI entrypoint for the gate.
#[derive(Parser, Debug)]
#[command(
    name = "turnstile",
    version,
    about = "Session-completion quality gate for assistant-driven workflows",
    after_help = "Commands:\n  gate                        Evaluate the hook record on stdin (host entry point)\n  explain --transcript <log>  Evaluate and print the decision as JSON\n\nExamples:\n  turnstile gate < hook.json\n  turnstile explain --transcript ~/.sessions/abc.jsonl --cwd /work/project",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Gate(GateArgs),
    Explain(ExplainArgs),
}

/// Gate command inputs: the hook record arrives on stdin.
#[derive(Parser, Debug)]
#[command(about = "Evaluate the turn-end hook record delivered on stdin")]
pub struct GateArgs {
    /// Ticket store root (defaults to <cwd>/.tickets from the hook record)
    #[arg(long, value_name = "DIR")]
    pub store_root: Option<PathBuf>,
}

/// Explain command inputs for operator debugging.
#[derive(Parser, Debug)]
#[command(about = "Evaluate a transcript directly and print the decision")]
pub struct ExplainArgs {
    /// Path to the line-delimited session transcript
    #[arg(long, value_name = "FILE")]
    pub transcript: PathBuf,

    /// Session working directory used to locate the ticket store
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Ticket store root (overrides <cwd>/.tickets)
    #[arg(long, value_name = "DIR")]
    pub store_root: Option<PathBuf>,
}

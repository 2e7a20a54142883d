//! Transcript tail loading.
//!
//! The gate only ever looks at the end of a session log: the last assistant
//! turn for the structured status signal, the last two turns for the
//! mutating-tool fallback, and the trailing window's text for evidence
//! markers. Anything that prevents reading the log degrades to an empty tail
//! so the engine fails open.
use serde::Deserialize;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Trailing turns kept per invocation. Two turns cover the tool-invocation
/// fallback; the rest is the evidence-scanning window.
const TAIL_TURNS: usize = 40;

/// Raw per-line shape, parsed permissively: unknown fields and unknown block
/// kinds are ignored rather than fatal.
#[derive(Debug, Deserialize)]
struct RawTurn {
    role: Option<String>,
    content: Option<RawContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Blocks(Vec<RawBlock>),
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    name: Option<String>,
}

/// One content block of a turn, reduced to what the gate inspects.
#[derive(Debug, Clone)]
pub enum Block {
    Text(String),
    ToolInvocation(String),
}

/// One transcript turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Option<String>,
    pub blocks: Vec<Block>,
}

impl Turn {
    pub fn is_assistant(&self) -> bool {
        self.role.as_deref() == Some("assistant")
    }

    /// Concatenated text blocks of this turn.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Text(text) => Some(text.as_str()),
                Block::ToolInvocation(_) => None,
            })
            .collect();
        parts.join("\n")
    }

    fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::ToolInvocation(name) => Some(name.as_str()),
            Block::Text(_) => None,
        })
    }
}

/// The trailing window of a session transcript.
#[derive(Debug, Default)]
pub struct TranscriptTail {
    turns: Vec<Turn>,
}

impl TranscriptTail {
    /// Load the tail of the log at `path`. A missing or unreadable log yields
    /// an empty tail; individual unparseable lines are skipped.
    pub fn load(path: &Path) -> Self {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!("transcript unreadable at {}: {err}", path.display());
                return Self::default();
            }
        };
        let mut tail: VecDeque<Turn> = VecDeque::with_capacity(TAIL_TURNS);
        for line in BufReader::new(file).lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!("transcript read failed at {}: {err}", path.display());
                    return Self::default();
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let raw: RawTurn = match serde_json::from_str(&line) {
                Ok(raw) => raw,
                Err(err) => {
                    tracing::debug!("skipping unparseable transcript line: {err}");
                    continue;
                }
            };
            if tail.len() == TAIL_TURNS {
                tail.pop_front();
            }
            tail.push_back(reduce_turn(raw));
        }
        Self {
            turns: tail.into_iter().collect(),
        }
    }

    #[cfg(test)]
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Text of the last assistant turn, if any.
    pub fn last_assistant_text(&self) -> Option<String> {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.is_assistant())
            .map(Turn::text)
    }

    /// Tool names invoked in the last two turns (the fallback window).
    pub fn recent_tool_names(&self) -> Vec<&str> {
        self.turns
            .iter()
            .rev()
            .take(2)
            .flat_map(Turn::tool_names)
            .collect()
    }

    /// Concatenated text of every turn in the tail (evidence window).
    pub fn text(&self) -> String {
        let parts: Vec<String> = self.turns.iter().map(Turn::text).collect();
        parts.join("\n")
    }
}

fn reduce_turn(raw: RawTurn) -> Turn {
    let blocks = match raw.content {
        Some(RawContent::Text(text)) => vec![Block::Text(text)],
        Some(RawContent::Blocks(blocks)) => blocks
            .into_iter()
            .filter_map(|block| match block.kind.as_deref() {
                Some("text") => block.text.map(Block::Text),
                Some("tool_use") | Some("tool_invocation") => {
                    block.name.map(Block::ToolInvocation)
                }
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    };
    Turn {
        role: raw.role,
        blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_log(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp log");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        file
    }

    #[test]
    fn missing_log_yields_empty_tail() {
        let tail = TranscriptTail::load(Path::new("/nonexistent/session.jsonl"));
        assert!(tail.is_empty());
        assert_eq!(tail.last_assistant_text(), None);
    }

    #[test]
    fn unparseable_lines_are_skipped() {
        let log = write_log(&[
            "{not json",
            r#"{"role":"assistant","content":[{"type":"text","text":"hello"}]}"#,
        ]);
        let tail = TranscriptTail::load(log.path());
        assert_eq!(tail.last_assistant_text().as_deref(), Some("hello"));
    }

    #[test]
    fn string_content_and_unknown_blocks_are_tolerated() {
        let log = write_log(&[
            r#"{"role":"user","content":"please fix the parser"}"#,
            r#"{"role":"assistant","content":[{"type":"thinking","signature":"x"},{"type":"text","text":"done"}]}"#,
        ]);
        let tail = TranscriptTail::load(log.path());
        assert_eq!(tail.last_assistant_text().as_deref(), Some("done"));
        assert!(tail.text().contains("please fix the parser"));
    }

    #[test]
    fn recent_tool_names_cover_the_last_two_turns_only() {
        let log = write_log(&[
            r#"{"role":"assistant","content":[{"type":"tool_use","name":"Edit"}]}"#,
            r#"{"role":"user","content":[{"type":"tool_result","name":"Edit"}]}"#,
            r#"{"role":"assistant","content":[{"type":"tool_use","name":"Read"},{"type":"text","text":"looking"}]}"#,
        ]);
        let tail = TranscriptTail::load(log.path());
        let names = tail.recent_tool_names();
        assert!(names.contains(&"Read"));
        assert!(!names.contains(&"Edit"));
    }

    #[test]
    fn tail_window_drops_old_turns() {
        let mut lines = Vec::new();
        for index in 0..50 {
            lines.push(format!(
                r#"{{"role":"assistant","content":[{{"type":"text","text":"turn {index}"}}]}}"#
            ));
        }
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let log = write_log(&refs);
        let tail = TranscriptTail::load(log.path());
        assert!(!tail.text().contains("turn 9"));
        assert!(tail.text().contains("turn 49"));
    }
}

//! Matching traced output against expected entry/return lines.
//!
//! Assertions are substring checks on the raw text. [`TraceLine`] parsing
//! is only used to check that several expected lines appear in order.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::suite::CaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Entry,
    Return,
}

impl MarkerKind {
    pub fn arrow(self) -> &'static str {
        match self {
            MarkerKind::Entry => "=>",
            MarkerKind::Return => "<=",
        }
    }
}

/// One `=> function in file:line` / `<= ...` line the output must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedLine {
    pub kind: MarkerKind,
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl ExpectedLine {
    pub fn entry(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            kind: MarkerKind::Entry,
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    pub fn exit(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            kind: MarkerKind::Return,
            function: function.into(),
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for ExpectedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} in {}:{}",
            self.kind.arrow(),
            self.function,
            self.file,
            self.line
        )
    }
}

/// A parsed hierarchy-script line:
/// `<elapsed> <exec>(<tid>):<indent> => <function> in <file>:<line>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub elapsed_us: u64,
    pub exec: String,
    pub tid: u32,
    pub depth: usize,
    pub kind: MarkerKind,
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl TraceLine {
    pub fn matches(&self, expected: &ExpectedLine) -> bool {
        self.kind == expected.kind
            && self.function == expected.function
            && self.file == expected.file
            && self.line == expected.line
    }
}

fn trace_line_regex() -> &'static Regex {
    static TRACE_LINE: OnceLock<Regex> = OnceLock::new();
    TRACE_LINE.get_or_init(|| {
        Regex::new(
            r"^\s*(?P<elapsed>\d+) (?P<exec>[^(]*)\((?P<tid>\d+)\):(?P<indent> *)(?P<arrow>=>|<=) (?P<function>.+?) in (?P<file>.+):(?P<line>\d+)\s*$",
        )
        .expect("trace line pattern is valid")
    })
}

/// Lines that don't look like hierarchy output (the traced program's own
/// prints, for instance) are skipped.
pub fn parse_trace_lines(output: &str) -> Vec<TraceLine> {
    let re = trace_line_regex();
    output
        .lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            let kind = match &caps["arrow"] {
                "=>" => MarkerKind::Entry,
                _ => MarkerKind::Return,
            };
            // The pad ends in the format's own separator space. thread_indent
            // pads with its counter after applying the delta, so entries sit
            // one column deeper than the matching return.
            let pad = caps["indent"].len().saturating_sub(1);
            let depth = match kind {
                MarkerKind::Entry => pad.saturating_sub(1),
                MarkerKind::Return => pad,
            };
            Some(TraceLine {
                elapsed_us: caps["elapsed"].parse().ok()?,
                exec: caps["exec"].to_string(),
                tid: caps["tid"].parse().ok()?,
                depth,
                kind,
                function: caps["function"].to_string(),
                file: caps["file"].to_string(),
                line: caps["line"].parse().ok()?,
            })
        })
        .collect()
}

pub fn expect_contains(output: &str, needle: &str) -> Result<(), CaseError> {
    if output.contains(needle) {
        Ok(())
    } else {
        Err(CaseError::AssertionMismatch {
            expected: needle.to_string(),
        })
    }
}

/// Every expected line must be present, and they must appear in the given
/// order (other lines may come in between).
pub fn expect_in_order(output: &str, expected: &[ExpectedLine]) -> Result<(), CaseError> {
    for line in expected {
        expect_contains(output, &line.to_string())?;
    }

    let traced = parse_trace_lines(output);
    let mut position = 0;
    for (matched, line) in expected.iter().enumerate() {
        match traced[position..].iter().position(|t| t.matches(line)) {
            Some(offset) => position += offset + 1,
            None => {
                return Err(CaseError::OutOfOrder {
                    missing: line.to_string(),
                    matched,
                })
            }
        }
    }
    Ok(())
}

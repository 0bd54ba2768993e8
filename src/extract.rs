//! Fenced code-block extraction from agent output.
//!
//! Agents are asked to answer under fixed headings (`IMPLEMENTATION:`,
//! `TESTS:`, `SUGGESTED IMPROVEMENTS:`). This module scans the combined text
//! line by line, pulls out every triple-backtick block and tags it with the
//! most recent recognized heading.
//!
//! Nested fences are not supported: any fence line inside a block closes it.

use serde::{Deserialize, Serialize};

/// Language assumed for fences without an annotation.
pub const DEFAULT_LANGUAGE: &str = "python";

const FENCE: &str = "```";

/// Heading labels that tag the code blocks following them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    Implementation,
    Tests,
    SuggestedImprovements,
}

impl Section {
    pub const ALL: [Section; 3] = [
        Section::Implementation,
        Section::Tests,
        Section::SuggestedImprovements,
    ];

    /// Heading text as it appears in agent output (without the colon).
    pub fn label(&self) -> &'static str {
        match self {
            Section::Implementation => "IMPLEMENTATION",
            Section::Tests => "TESTS",
            Section::SuggestedImprovements => "SUGGESTED IMPROVEMENTS",
        }
    }

    /// Match a heading line such as `Tests:` or `  IMPLEMENTATION:`.
    ///
    /// Returns `None` for lines that do not end with a colon or whose label is
    /// outside the closed set.
    pub fn from_heading(line: &str) -> Option<Section> {
        let label = line.trim().strip_suffix(':')?.to_uppercase();
        Section::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A fenced block pulled out of agent output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
    pub section: Option<Section>,
}

/// Scanner state while walking the text.
#[derive(Default)]
struct Scanner {
    blocks: Vec<CodeBlock>,
    lines: Vec<String>,
    language: Option<String>,
    section: Option<Section>,
    in_fence: bool,
}

impl Scanner {
    fn feed(&mut self, line: &str) {
        let trimmed = line.trim();

        if trimmed.starts_with(FENCE) {
            if self.in_fence {
                self.flush();
            } else {
                let annotation = trimmed[FENCE.len()..].trim();
                if !annotation.is_empty() {
                    self.language = Some(annotation.to_string());
                }
            }
            self.in_fence = !self.in_fence;
            return;
        }

        // Headings only count outside fences, on purpose: a `TESTS:` line
        // inside a block stays code and does not switch the section.
        if self.in_fence {
            self.lines.push(line.to_string());
        } else if let Some(section) = Section::from_heading(line) {
            self.section = Some(section);
        }
    }

    /// Emit the buffered block (if any) and reset per-block state.
    fn flush(&mut self) {
        let language = self
            .language
            .take()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if self.lines.is_empty() {
            return;
        }
        self.blocks.push(CodeBlock {
            language,
            code: self.lines.join("\n"),
            section: self.section,
        });
        self.lines.clear();
    }

    fn finish(mut self) -> Vec<CodeBlock> {
        // Unterminated fence: keep what was collected.
        self.flush();
        self.blocks
    }
}

/// Extract every fenced code block from `text`, in order of appearance.
pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut scanner = Scanner::default();
    for line in text.split('\n') {
        scanner.feed(line);
    }
    scanner.finish()
}

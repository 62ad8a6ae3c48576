use regex::Regex;

/// Strips formatting artifacts from model output so the remainder is
/// executable source text.
///
/// The patterns are compiled once at construction; a `Normalizer` is built
/// at process start and shared by reference.
#[derive(Debug)]
pub struct Normalizer {
    fence: Regex,
    emphasis: Regex,
    numbered_commentary: Regex,
}

/// Leading tokens that mark trailing prose the model appends after code.
const PROSE_DENYLIST: [&str; 3] = ["Energy", "Complexity", "Optimizations"];

impl Normalizer {
    pub fn new() -> Self {
        Self {
            // A fence marker line: ``` with an optional language tag.
            fence: Regex::new(r"^\s*```[A-Za-z0-9_+-]*\s*$").unwrap(),
            emphasis: Regex::new(r"\*\*").unwrap(),
            numbered_commentary: Regex::new(r"^\s*\d+\.(\s|$)").unwrap(),
        }
    }

    /// Extracts the code portion of a free-form model response.
    ///
    /// Grammar: the first fence-delimited block wins, with its optional
    /// language tag discarded; a response with no complete fenced block is
    /// taken to be code in its entirety.
    pub fn extract_code_block(&self, raw: &str) -> String {
        let lines: Vec<&str> = raw.lines().collect();
        let mut open = None;
        for (idx, line) in lines.iter().enumerate() {
            if self.fence.is_match(line) {
                match open {
                    None => open = Some(idx),
                    Some(start) => return lines[start + 1..idx].join("\n"),
                }
            }
        }
        raw.to_string()
    }

    /// Removes every recognized non-code artifact. Idempotent; never fails,
    /// an empty input yields an empty string.
    pub fn normalize(&self, raw: &str) -> String {
        let body = self.extract_code_block(raw);
        let mut out = String::with_capacity(body.len());
        for line in body.lines() {
            if self.fence.is_match(line) {
                continue;
            }
            let line = self.emphasis.replace_all(line, "");
            if line.trim().is_empty() {
                continue;
            }
            if self.numbered_commentary.is_match(&line) {
                continue;
            }
            let trimmed = line.trim_start();
            if PROSE_DENYLIST.iter().any(|t| trimmed.starts_with(t)) {
                continue;
            }
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

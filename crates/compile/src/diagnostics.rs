//! Best-effort extraction of a readable error from a TeX log.
//! 從 TeX 記錄檔中盡力擷取可讀的錯誤訊息。

/// Turns a raw tool log into a short, human-readable diagnostic.
/// 將原始記錄轉換為簡短易讀的診斷訊息。
pub trait DiagnosticExtractor: Send + Sync {
    fn extract(&self, log: &str) -> String;
}

/// Heuristic for LaTeX logs: error lines start with `!`, and the offending
/// source line is reported on a following line starting with `l.`.
/// LaTeX 記錄檔規則：錯誤行以 `!` 開頭，出錯的原始碼行以 `l.` 開頭。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatexLogExtractor {
    pub context_lines: usize,
    pub max_lines: usize,
    pub fallback_tail: usize,
}

impl Default for LatexLogExtractor {
    fn default() -> Self {
        Self {
            context_lines: 4,
            max_lines: 15,
            fallback_tail: 20,
        }
    }
}

const ERROR_MARKER: &str = "!";
const LINE_MARKER: &str = "l.";

impl DiagnosticExtractor for LatexLogExtractor {
    fn extract(&self, log: &str) -> String {
        let lines: Vec<&str> = log
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        let mut captured = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            if !line.starts_with(ERROR_MARKER) {
                continue;
            }
            captured.push(*line);
            let end = (index + 1 + self.context_lines).min(lines.len());
            for follow in &lines[index + 1..end] {
                if !follow.trim().is_empty() {
                    captured.push(*follow);
                }
                if follow.starts_with(LINE_MARKER) {
                    break;
                }
            }
        }

        if captured.is_empty() {
            let start = lines.len().saturating_sub(self.fallback_tail);
            return lines[start..].join("\n");
        }
        captured.truncate(self.max_lines);
        captured.join("\n")
    }
}

/// Runs the default [`LatexLogExtractor`].
pub fn extract_diagnostic(log: &str) -> String {
    LatexLogExtractor::default().extract(log)
}

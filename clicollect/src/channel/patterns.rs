//! Prompt detection.
//!
//! A prompt is recognized by a suffix match of one or more patterns against
//! the tail of the received output. Nothing here parses the output.

use memchr::memrchr;
use regex::bytes::Regex;

/// Generic prompt: a `>`, `#` or `$` terminator at the very end of the output.
pub const DEFAULT_PROMPT_PATTERN: &str = r"[>#$]\s*$";

/// Most characters allowed between the hostname and the terminator, for
/// context such as ` (global) ` or ` (interface) `.
const MAX_PROMPT_CONTEXT: usize = 30;

/// Compile a prompt pattern string into a regex anchored at end of input.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}

/// Recognizes a ready-for-input prompt at the end of received output.
#[derive(Debug, Clone)]
pub struct PromptDetector {
    patterns: Vec<Regex>,
}

impl PromptDetector {
    /// Build a detector from pattern strings. Each is anchored to end of input.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| compile_prompt_pattern(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Detector using [`DEFAULT_PROMPT_PATTERN`].
    pub fn generic() -> Self {
        let pattern = Regex::new(DEFAULT_PROMPT_PATTERN).expect("default prompt pattern is valid");
        Self {
            patterns: vec![pattern],
        }
    }

    /// Whether `data` ends in a prompt.
    pub fn is_ready(&self, data: &[u8]) -> bool {
        self.patterns.iter().any(|p| p.is_match(data))
    }

    /// The full prompt line at the end of `data`, if there is one.
    pub fn matched_prompt(&self, data: &[u8]) -> Option<String> {
        let m = self.patterns.iter().find_map(|p| p.find(data))?;
        let line_start = memrchr(b'\n', &data[..m.start()]).map_or(0, |i| i + 1);
        let line = String::from_utf8_lossy(&data[line_start..m.end()]);
        Some(line.trim().to_string())
    }

    /// Derive an appliance-specific detector from startup output.
    ///
    /// The last non-empty line is taken as the prompt sample. Its leading
    /// word (the hostname) must be followed, within a short span of context,
    /// by a prompt terminator at end of input. Returns `None` when no
    /// hostname can be extracted, e.g. a bare `#` prompt.
    pub fn learn(output: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(output);
        let line = text.lines().rev().map(str::trim).find(|l| !l.is_empty())?;

        let hostname = line
            .split(|c: char| c.is_whitespace() || matches!(c, '(' | '>' | '#' | '$'))
            .next()
            .filter(|h| !h.is_empty())?;

        let pattern = format!(
            r"{}[^\n]{{0,{}}}[>#$]\s*$",
            regex::escape(hostname),
            MAX_PROMPT_CONTEXT
        );
        Regex::new(&pattern).ok().map(|re| Self { patterns: vec![re] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_regex() {
        let pattern = Regex::new(r"FG100 #\s*$").unwrap();
        assert!(pattern.is_match(b"FG100 # "));
        assert!(pattern.is_match(b"some output\nFG100 #"));
        assert!(!pattern.is_match(b"FG100 > "));
    }

    #[test]
    fn test_compile_prompt_pattern() {
        // Pattern without anchor gets one added
        let pattern = compile_prompt_pattern(r"router#").unwrap();
        assert!(pattern.is_match(b"router# "));
        assert!(!pattern.is_match(b"router# more"));

        // Pattern with anchor stays as-is
        let pattern = compile_prompt_pattern(r"router#$").unwrap();
        assert!(pattern.is_match(b"router#"));
    }

    #[test]
    fn test_generic_detector() {
        let detector = PromptDetector::generic();
        assert!(detector.is_ready(b"Welcome\r\nFG100 # "));
        assert!(detector.is_ready(b"FG100 (global) # "));
        assert!(detector.is_ready(b"user@host:~$ "));
        assert!(!detector.is_ready(b"Loading configuration..."));
        assert!(!detector.is_ready(b""));
    }

    #[test]
    fn test_multiple_patterns() {
        let detector = PromptDetector::new([r"login:", r"FG\d+ #"]).unwrap();
        assert!(detector.is_ready(b"login: "));
        assert!(detector.is_ready(b"FG200 # "));
        assert!(!detector.is_ready(b"FG200 > "));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(PromptDetector::new([r"(unclosed"]).is_err());
    }

    #[test]
    fn test_matched_prompt() {
        let detector = PromptDetector::generic();
        let prompt = detector.matched_prompt(b"banner line\r\nFG100 # ");
        assert_eq!(prompt.as_deref(), Some("FG100 #"));
        assert_eq!(detector.matched_prompt(b"no prompt here"), None);
    }

    #[test]
    fn test_learn_from_banner() {
        let learned = PromptDetector::learn(b"Welcome to FortiGate\r\n\r\nFG100 # ").unwrap();

        assert!(learned.is_ready(b"output\nFG100 # "));
        assert!(learned.is_ready(b"FG100 (global) # "));
        assert!(learned.is_ready(b"FG100 $ "));
        assert!(!learned.is_ready(b"other-host # "));
    }

    #[test]
    fn test_learn_escapes_hostname() {
        let learned = PromptDetector::learn(b"fw.lab+1 # ").unwrap();
        assert!(learned.is_ready(b"fw.lab+1 # "));
        assert!(!learned.is_ready(b"fwXlab+1 # "));
    }

    #[test]
    fn test_learn_bare_prompt() {
        assert!(PromptDetector::learn(b"\r\n# ").is_none());
        assert!(PromptDetector::learn(b"").is_none());
    }
}

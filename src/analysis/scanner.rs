//! Comment- and string-aware lexical scanning.
//!
//! [`LexicalScanner`] classifies every byte offset of a source text as code,
//! block comment, line comment or string literal. It is a forward-only cursor:
//! queries at increasing offsets resume where the previous one stopped, so a
//! pass over all matches of a pattern costs one linear scan. A query behind the
//! cursor restarts from the beginning of the text.
//!
//! [`CodePattern`] combines the scanner with a regular expression to extract
//! only the matches that start in code.

use regex::{CaptureMatches, Regex};

/// Lexical region of a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Code,
    BlockComment,
    LineComment,
    String,
}

/// Forward-only region classifier over one source text.
#[derive(Debug, Clone)]
pub struct LexicalScanner<'t> {
    text: &'t [u8],
    /// Next byte to consume
    pos: usize,
    /// State at `pos`
    state: ScanState,
    /// Start of the most recently consumed token (one or two bytes)
    token_start: usize,
    /// State before the most recently consumed token
    token_prev: ScanState,
}

impl<'t> LexicalScanner<'t> {
    /// Create a scanner positioned at the start of `text`.
    pub fn new(text: &'t str) -> Self {
        LexicalScanner {
            text: text.as_bytes(),
            pos: 0,
            state: ScanState::Code,
            token_start: 0,
            token_prev: ScanState::Code,
        }
    }

    /// Offset up to which the text has been scanned.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Rewind to the start of the text.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.state = ScanState::Code;
        self.token_start = 0;
        self.token_prev = ScanState::Code;
    }

    /// Whether `offset` lies inside a comment or string literal.
    pub fn is_inside_string_or_comment(&mut self, offset: usize) -> bool {
        self.state_at(offset) != ScanState::Code
    }

    /// Classify the byte at `offset`.
    ///
    /// Delimiters belong to the region they open or close: the `*` of `/*`
    /// and the `/` of `*/` are both inside the comment. Offsets past the end
    /// report the state at the end of the text.
    pub fn state_at(&mut self, offset: usize) -> ScanState {
        if offset < self.pos {
            if offset >= self.token_start {
                return self.token_state(offset);
            }
            tracing::trace!(offset, pos = self.pos, "backward scan query, rescanning");
            self.reset();
        }

        let end = offset.min(self.text.len());
        while self.pos < end {
            self.step();
        }

        if offset < self.pos {
            self.token_state(offset)
        } else {
            self.state
        }
    }

    /// State at an offset inside the most recently consumed token.
    fn token_state(&self, offset: usize) -> ScanState {
        if offset == self.token_start || self.token_prev != ScanState::Code {
            self.token_prev
        } else {
            self.state
        }
    }

    /// Consume one token.
    fn step(&mut self) {
        let b = self.text[self.pos];
        let next = self.text.get(self.pos + 1).copied();

        self.token_start = self.pos;
        self.token_prev = self.state;

        let (state, width) = match self.state {
            ScanState::Code => match (b, next) {
                (b'/', Some(b'*')) => (ScanState::BlockComment, 2),
                (b'/', Some(b'/')) => (ScanState::LineComment, 2),
                (b'"', _) => (ScanState::String, 1),
                _ => (ScanState::Code, 1),
            },
            ScanState::BlockComment => match (b, next) {
                (b'*', Some(b'/')) => (ScanState::Code, 2),
                _ => (ScanState::BlockComment, 1),
            },
            ScanState::LineComment => match b {
                b'\n' => (ScanState::Code, 1),
                _ => (ScanState::LineComment, 1),
            },
            ScanState::String => match (b, next) {
                (b'\\', Some(b'"')) => (ScanState::String, 2),
                (b'"', _) => (ScanState::Code, 1),
                _ => (ScanState::String, 1),
            },
        };

        self.state = state;
        self.pos += width;
    }
}

/// A regular expression whose matches only count when they start in code.
#[derive(Debug, Clone)]
pub struct CodePattern {
    regex: Regex,
    /// Capture group whose start offset is checked and whose text is returned
    group: usize,
}

impl CodePattern {
    /// Compile a pattern; `group` selects the capture to extract.
    pub fn new(pattern: &str, group: usize) -> Result<Self, regex::Error> {
        Ok(CodePattern {
            regex: Regex::new(pattern)?,
            group,
        })
    }

    /// Wrap an already compiled regex.
    pub fn from_regex(regex: Regex, group: usize) -> Self {
        CodePattern { regex, group }
    }

    /// Get the underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Lazily iterate the code-region matches in `text`.
    ///
    /// Each call starts a fresh pass.
    pub fn matches<'r, 't>(&'r self, text: &'t str) -> CodeMatches<'r, 't> {
        CodeMatches {
            scanner: LexicalScanner::new(text),
            captures: self.regex.captures_iter(text),
            group: self.group,
        }
    }

    /// First code-region match in `text`.
    pub fn first<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.matches(text).next()
    }
}

/// Iterator over matches whose designated group starts in code.
pub struct CodeMatches<'r, 't> {
    scanner: LexicalScanner<'t>,
    captures: CaptureMatches<'r, 't>,
    group: usize,
}

impl<'r, 't> Iterator for CodeMatches<'r, 't> {
    type Item = &'t str;

    fn next(&mut self) -> Option<&'t str> {
        for caps in self.captures.by_ref() {
            let Some(m) = caps.get(self.group) else {
                continue;
            };
            if !self.scanner.is_inside_string_or_comment(m.start()) {
                return Some(m.as_str());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset_of(text: &str, needle: &str) -> usize {
        text.find(needle).unwrap()
    }

    #[test]
    fn test_quotes_inside_line_comment() {
        let text = r#"// has "quotes" inside a comment"#;
        let mut scanner = LexicalScanner::new(text);
        assert!(scanner.is_inside_string_or_comment(offset_of(text, "quotes")));

        let pattern = CodePattern::new("(quotes)", 1).unwrap();
        assert_eq!(pattern.matches(text).count(), 0);
    }

    #[test]
    fn test_comment_opener_inside_string() {
        let text = r#"x = "a/*not a comment*/b"; y = 1;"#;
        let mut scanner = LexicalScanner::new(text);

        assert_eq!(scanner.state_at(offset_of(text, "not")), ScanState::String);
        assert!(!scanner.is_inside_string_or_comment(offset_of(text, "y =")));
        assert_eq!(scanner.state_at(text.len()), ScanState::Code);
    }

    #[test]
    fn test_escaped_quote_does_not_close_string() {
        let text = r#"s = "say \"hi\" now"; call();"#;
        let mut scanner = LexicalScanner::new(text);

        assert!(scanner.is_inside_string_or_comment(offset_of(text, "hi")));
        assert!(scanner.is_inside_string_or_comment(offset_of(text, "now")));
        assert!(!scanner.is_inside_string_or_comment(offset_of(text, "call")));
    }

    #[test]
    fn test_line_comment_ends_at_newline() {
        let text = "a(); // note\nb();";
        let mut scanner = LexicalScanner::new(text);

        assert_eq!(scanner.state_at(offset_of(text, "note")), ScanState::LineComment);
        assert_eq!(scanner.state_at(offset_of(text, "b()")), ScanState::Code);
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let text = "a();\n/* one\n two */ b();";
        let mut scanner = LexicalScanner::new(text);

        assert_eq!(scanner.state_at(offset_of(text, "two")), ScanState::BlockComment);
        assert_eq!(scanner.state_at(offset_of(text, "b()")), ScanState::Code);
    }

    #[test]
    fn test_delimiters_belong_to_their_region() {
        let text = "a/*b*/c";
        let mut scanner = LexicalScanner::new(text);

        assert_eq!(scanner.state_at(1), ScanState::Code);
        assert_eq!(scanner.state_at(2), ScanState::BlockComment);
        assert_eq!(scanner.state_at(4), ScanState::BlockComment);
        assert_eq!(scanner.state_at(5), ScanState::BlockComment);
        assert_eq!(scanner.state_at(6), ScanState::Code);
    }

    #[test]
    fn test_backward_query_rescans() {
        let text = "/* c */ code \"str\"";
        let mut scanner = LexicalScanner::new(text);

        assert!(scanner.is_inside_string_or_comment(offset_of(text, "str")));
        assert_eq!(scanner.position(), offset_of(text, "str"));

        assert!(scanner.is_inside_string_or_comment(offset_of(text, " c ")));
        assert!(!scanner.is_inside_string_or_comment(offset_of(text, "code")));
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        let text = "x(); /* never closed";
        let mut scanner = LexicalScanner::new(text);
        assert!(scanner.is_inside_string_or_comment(text.len() + 10));
    }

    #[test]
    fn test_code_matches_skip_comments_and_strings() {
        let text = r#"
// lookup(Ignored)
lookup(First);
String s = "lookup(InString)";
/* lookup(Block) */ lookup(Second);
"#;
        let pattern = CodePattern::new(r"lookup\((\w+)\)", 1).unwrap();
        let found: Vec<_> = pattern.matches(text).collect();
        assert_eq!(found, vec!["First", "Second"]);

        // A second pass starts over.
        assert_eq!(pattern.first(text), Some("First"));
    }

    #[test]
    fn test_non_participating_group_is_skipped() {
        let pattern = CodePattern::new(r"(?:a(\d)|b)", 1).unwrap();
        let found: Vec<_> = pattern.matches("b a1 b a2").collect();
        assert_eq!(found, vec!["1", "2"]);
    }
}

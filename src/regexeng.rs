//! Regex engine wrapper: BRE/ERE syntax normalization feeding the `regex`
//! crate, plus the empty-regex (`//`) sentinel used to reuse the last
//! compiled pattern.

use crate::error::{CompileError, CompileErrorKind, SourceLoc};
use regex::Regex;

/// Which POSIX dialect a pattern was written in; both are normalized down
/// to the syntax the `regex` crate accepts before compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexDialect {
    Basic,
    Extended,
}

#[derive(Debug, Clone)]
pub struct CompiledRegex {
    re: Regex,
    source: String,
}

impl CompiledRegex {
    pub fn compile(
        pattern: &str,
        dialect: RegexDialect,
        case_insensitive: bool,
        source_name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<Self, CompileError> {
        let normalized = normalize(pattern, dialect);
        let mut builder = regex::RegexBuilder::new(&normalized);
        builder.case_insensitive(case_insensitive);
        let re = builder
            .build()
            .map_err(|e| CompileError::new(CompileErrorKind::RegexInvalid(e.to_string()), source_name, loc))?;
        Ok(Self { re, source: pattern.to_string() })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<regex::Captures<'t>> {
        self.re.captures(text)
    }

    pub fn find_at<'t>(&self, text: &'t str, start: usize) -> Option<regex::Match<'t>> {
        self.re.find_at(text, start)
    }

    /// Searches for a match beginning no earlier than byte offset `start`,
    /// with capture spans still relative to the full `text` (unlike slicing
    /// `text` first, which would desync them).
    pub fn captures_at<'t>(&self, text: &'t str, start: usize) -> Option<regex::Captures<'t>> {
        self.re.captures_at(text, start)
    }

    pub fn captures_len(&self) -> usize {
        self.re.captures_len()
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A regex that may be empty (`//`), meaning "reuse whatever was last used".
#[derive(Debug, Clone)]
pub enum RegexSlot {
    Concrete(CompiledRegex),
    Empty,
}

impl RegexSlot {
    pub fn compile(
        pattern: &str,
        dialect: RegexDialect,
        case_insensitive: bool,
        source_name: &str,
        loc: Option<SourceLoc>,
    ) -> Result<Self, CompileError> {
        if pattern.is_empty() {
            if case_insensitive {
                return Err(CompileError::new(
                    CompileErrorKind::CaseInsensitiveOnEmptyRegex,
                    source_name,
                    loc,
                ));
            }
            return Ok(RegexSlot::Empty);
        }
        Ok(RegexSlot::Concrete(CompiledRegex::compile(
            pattern,
            dialect,
            case_insensitive,
            source_name,
            loc,
        )?))
    }

    /// Resolves this slot against the last-used register, updating the
    /// register when this slot is concrete.
    pub fn resolve<'a>(
        &'a self,
        last: &mut Option<&'a CompiledRegex>,
    ) -> Result<&'a CompiledRegex, crate::error::ExecErrorKind> {
        match self {
            RegexSlot::Concrete(re) => {
                *last = Some(re);
                Ok(re)
            }
            RegexSlot::Empty => last.ok_or(crate::error::ExecErrorKind::NoPreviousRegex),
        }
    }
}

fn posix_class(name: &str) -> Option<&'static str> {
    match name {
        "alnum" => Some("a-zA-Z0-9"),
        "alpha" => Some("a-zA-Z"),
        "ascii" => Some("\\x00-\\x7F"),
        "blank" => Some(" \\t"),
        "cntrl" => Some("\\x00-\\x1F\\x7F"),
        "digit" => Some("0-9"),
        "graph" => Some("!-~"),
        "lower" => Some("a-z"),
        "print" => Some(" -~"),
        "punct" => Some("!-/:-@\\[-`{-~"),
        "space" => Some(" \\t\\n\\r\\x0C\\x0B"),
        "upper" => Some("A-Z"),
        "word" => Some("a-zA-Z0-9_"),
        "xdigit" => Some("0-9A-Fa-f"),
        _ => None,
    }
}

fn find_posix_close(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start;
    while i + 2 < chars.len() {
        if chars[i] == ':' && chars[i + 1] == ']' && chars[i + 2] == ']' {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn find_posix_close_inside(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start;
    while i + 1 < chars.len() {
        if chars[i] == ':' && chars[i + 1] == ']' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Converts a Basic Regular Expression to Extended syntax: `+ ? | ( )`
/// swap specialness with their backslashed forms, bracket expressions and
/// POSIX classes pass through expanded, and `^`/`$` are anchors only where
/// BRE allows them to be.
fn bre_to_ere(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::new();
    let mut i = 0;
    let mut in_bracket = false;

    while i < chars.len() {
        if chars[i] == '[' && !in_bracket {
            if i + 2 < chars.len() && chars[i + 1] == '[' && chars[i + 2] == ':' {
                if let Some(close_idx) = find_posix_close(&chars, i + 3) {
                    let class_name: String = chars[i + 3..close_idx].iter().collect();
                    if let Some(cls) = posix_class(&class_name) {
                        result.push('[');
                        result.push_str(cls);
                        result.push(']');
                        i = close_idx + 3;
                        continue;
                    }
                }
            }

            if i + 3 < chars.len() && chars[i + 1] == '^' && chars[i + 2] == '[' && chars[i + 3] == ':' {
                if let Some(close_idx) = find_posix_close(&chars, i + 4) {
                    let class_name: String = chars[i + 4..close_idx].iter().collect();
                    if let Some(cls) = posix_class(&class_name) {
                        result.push_str("[^");
                        result.push_str(cls);
                        result.push(']');
                        i = close_idx + 3;
                        continue;
                    }
                }
            }

            result.push('[');
            i += 1;
            in_bracket = true;

            if i < chars.len() && chars[i] == '^' {
                result.push('^');
                i += 1;
            }
            if i < chars.len() && chars[i] == ']' {
                result.push_str("\\]");
                i += 1;
            }
            continue;
        }

        if in_bracket {
            if chars[i] == ']' {
                result.push(']');
                i += 1;
                in_bracket = false;
                continue;
            }

            if i + 1 < chars.len() && chars[i] == '[' && chars[i + 1] == ':' {
                if let Some(close_idx) = find_posix_close_inside(&chars, i + 2) {
                    let class_name: String = chars[i + 2..close_idx].iter().collect();
                    if let Some(cls) = posix_class(&class_name) {
                        result.push_str(cls);
                        i = close_idx + 2;
                        continue;
                    }
                }
            }

            if chars[i] == '\\' && i + 1 < chars.len() {
                result.push(chars[i]);
                result.push(chars[i + 1]);
                i += 2;
                continue;
            }

            result.push(chars[i]);
            i += 1;
            continue;
        }

        if chars[i] == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            if next == '+' || next == '?' || next == '|' || next == '(' || next == ')' || next == '{' || next == '}' {
                result.push(next);
                i += 2;
                continue;
            }
            if next == 't' {
                result.push('\t');
                i += 2;
                continue;
            }
            if next == 'n' {
                result.push('\n');
                i += 2;
                continue;
            }
            if next == 'r' {
                result.push('\r');
                i += 2;
                continue;
            }
            result.push(chars[i]);
            result.push(next);
            i += 2;
            continue;
        }

        if chars[i] == '+' || chars[i] == '?' || chars[i] == '|' || chars[i] == '(' || chars[i] == ')' {
            result.push('\\');
            result.push(chars[i]);
            i += 1;
            continue;
        }

        if chars[i] == '^' {
            let is_anchor = result.is_empty() || result.ends_with('(');
            if !is_anchor {
                result.push_str("\\^");
                i += 1;
                continue;
            }
        }

        if chars[i] == '$' {
            let is_end = i == chars.len() - 1;
            let before_group_close = i + 2 < chars.len() && chars[i + 1] == '\\' && chars[i + 2] == ')';
            if !is_end && !before_group_close {
                result.push_str("\\$");
                i += 1;
                continue;
            }
        }

        result.push(chars[i]);
        i += 1;
    }

    result
}

/// Converts GNU `{,n}` to the `{0,n}` the `regex` crate requires.
fn normalize_quantifiers(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut result = String::new();
    let mut in_bracket = false;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '[' && !in_bracket {
            in_bracket = true;
            result.push('[');
            i += 1;
            if i < chars.len() && chars[i] == '^' {
                result.push('^');
                i += 1;
            }
            if i < chars.len() && chars[i] == ']' {
                result.push(']');
                i += 1;
            }
            continue;
        } else if chars[i] == ']' && in_bracket {
            in_bracket = false;
            result.push(']');
            i += 1;
            continue;
        } else if !in_bracket && i + 1 < chars.len() && chars[i] == '{' && chars[i + 1] == ',' {
            result.push_str("{0,");
            i += 2;
            continue;
        }

        result.push(chars[i]);
        i += 1;
    }

    result
}

fn normalize(pattern: &str, dialect: RegexDialect) -> String {
    let ere = match dialect {
        RegexDialect::Basic => bre_to_ere(pattern),
        RegexDialect::Extended => pattern.to_string(),
    };
    normalize_quantifiers(&ere)
}

/// Escapes the pattern space the way the `l` command prints it: non-printable
/// characters as backslash escapes (or octal), embedded newlines as `$`
/// followed by an actual newline, and a trailing `$`.
pub fn escape_for_list(input: &str) -> String {
    let mut result = String::new();

    for ch in input.chars() {
        let code = ch as u32;
        match ch {
            '\\' => result.push_str("\\\\"),
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("$\n"),
            '\r' => result.push_str("\\r"),
            '\x07' => result.push_str("\\a"),
            '\x08' => result.push_str("\\b"),
            '\x0C' => result.push_str("\\f"),
            '\x0B' => result.push_str("\\v"),
            _ if code < 32 || code >= 127 => {
                result.push_str(&format!("\\{:03o}", code));
            }
            _ => result.push(ch),
        }
    }

    result.push('$');
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bre_escaped_plus_becomes_special() {
        assert_eq!(bre_to_ere(r"\+"), "+");
        assert_eq!(bre_to_ere(r"\(foo\)"), "(foo)");
    }

    #[test]
    fn bre_bare_plus_is_literal() {
        assert_eq!(bre_to_ere("+"), r"\+");
    }

    #[test]
    fn posix_class_expands() {
        assert_eq!(bre_to_ere("[[:alpha:]]"), "[a-zA-Z]");
        assert_eq!(bre_to_ere("[^[:digit:]]"), "[^0-9]");
    }

    #[test]
    fn gnu_quantifier_normalizes() {
        assert_eq!(normalize_quantifiers("{,3}"), "{0,3}");
    }

    #[test]
    fn escape_for_list_handles_tabs_and_newlines() {
        assert_eq!(escape_for_list("a\tb"), "a\\tb$");
        assert_eq!(escape_for_list("a\nb"), "a$\nb$");
    }

    #[test]
    fn empty_pattern_compiles_to_empty_slot() {
        let slot = RegexSlot::compile("", RegexDialect::Basic, false, "-e", None).unwrap();
        assert!(matches!(slot, RegexSlot::Empty));
    }

    #[test]
    fn empty_pattern_with_case_insensitive_is_rejected() {
        let err = RegexSlot::compile("", RegexDialect::Basic, true, "-e", None);
        assert!(err.is_err());
    }

    #[test]
    fn resolve_requires_previous_regex_before_first_concrete() {
        let mut last: Option<&CompiledRegex> = None;
        let empty = RegexSlot::Empty;
        assert!(empty.resolve(&mut last).is_err());
    }

    #[test]
    fn concrete_regex_matches_through_dialects() {
        let re = CompiledRegex::compile("a.c", RegexDialect::Basic, false, "-e", None).unwrap();
        assert!(re.is_match("abc"));
        let re = CompiledRegex::compile("a(b|c)", RegexDialect::Extended, false, "-e", None).unwrap();
        assert!(re.is_match("ab"));
    }
}

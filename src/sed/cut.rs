//! The `C` sub-command: cuts a selection of characters or fields out of
//! the pattern space, replacing it with the join of the selected pieces.
//!
//! Unlike a standalone `cut` invocation, which is locked to one global
//! `-c` or `-f` mode, each selector here carries its own char/field tag,
//! so `C,f1,c5-8,f3,` is legal. A selector without an explicit `c`/`f`
//! prefix inherits whichever kind the previous selector used, defaulting
//! to char.
//!
//! Grammar: `<delim>SELECTORS<delim>[OPTIONS]`. The character right
//! after `C` is the list delimiter (any character but backslash); it
//! closes the selector list the next time it's seen unescaped.
//! `SELECTORS` is a comma-separated list of entries, each either:
//!   - `d<c>` / `D<c>` - sets the input / output delimiter to `c` in
//!     place (default: space for both), or
//!   - `[c|f]?(N|N-|-M|N-M)` - a 1-origin, inclusive char/field range.
//! `OPTIONS` is a run of single-letter flags with no separators: `f`
//! (fold consecutive output delimiters), `w` (split fields on runs of
//! whitespace instead of the input delimiter), `d` (drop lines that
//! contain no delimiter instead of passing them through unchanged).
//!
//! `lexer::read_cut` already bounds the exact span consumed (delimiter,
//! list, closing delimiter, options); this module re-walks that same
//! span to build the structured `CutSpec`.

use crate::error::{CompileError, CompileErrorKind, SourceLoc};
use crate::sed::ast::{CutSpec, SelKind, Selector};

pub fn parse_cut_spec(body: &str, source_name: &str, loc: Option<SourceLoc>) -> Result<CutSpec, CompileError> {
    let chars: Vec<char> = body.chars().collect();
    let bad = || CompileError::new(CompileErrorKind::InvalidCutSelector(body.to_string()), source_name, loc);

    let delimiter = *chars.first().ok_or_else(bad)?;
    let mut idx = 1;

    let mut din = ' ';
    let mut dout = ' ';
    let mut selectors = Vec::new();
    let mut current_kind = SelKind::Char;

    loop {
        while matches!(chars.get(idx), Some(' ') | Some('\t')) {
            idx += 1;
        }

        match chars.get(idx) {
            Some('d') | Some('D') => {
                let sets_output = chars[idx] == 'D';
                idx += 1;
                let c = *chars.get(idx).ok_or_else(bad)?;
                if sets_output {
                    dout = c;
                } else {
                    din = c;
                }
                idx += 1;
            }
            _ => {
                let mut kind = current_kind;
                if matches!(chars.get(idx), Some('c') | Some('f')) {
                    kind = if chars[idx] == 'c' { SelKind::Char } else { SelKind::Field };
                    idx += 1;
                    while matches!(chars.get(idx), Some(' ') | Some('\t')) {
                        idx += 1;
                    }
                }
                current_kind = kind;

                let start = read_number(&chars, &mut idx);
                while matches!(chars.get(idx), Some(' ') | Some('\t')) {
                    idx += 1;
                }
                let end = if chars.get(idx) == Some(&'-') {
                    idx += 1;
                    while matches!(chars.get(idx), Some(' ') | Some('\t')) {
                        idx += 1;
                    }
                    let e = read_number(&chars, &mut idx);
                    while matches!(chars.get(idx), Some(' ') | Some('\t')) {
                        idx += 1;
                    }
                    e
                } else {
                    start
                };

                if start.is_none() && end.is_none() {
                    return Err(bad());
                }
                if start == Some(0) || end == Some(0) {
                    return Err(bad());
                }
                selectors.push(Selector { kind, start, end });
            }
        }

        while matches!(chars.get(idx), Some(' ') | Some('\t')) {
            idx += 1;
        }
        match chars.get(idx) {
            Some(&c) if c == delimiter => {
                idx += 1;
                break;
            }
            Some(',') => idx += 1,
            _ => return Err(bad()),
        }
    }

    if selectors.is_empty() {
        return Err(bad());
    }

    let mut fold = false;
    let mut whitespace = false;
    let mut drop_undelimited = false;
    while let Some(&c) = chars.get(idx) {
        match c {
            'f' => fold = true,
            'w' => whitespace = true,
            'd' => drop_undelimited = true,
            _ => return Err(bad()),
        }
        idx += 1;
    }

    Ok(CutSpec { selectors, din, dout, fold, whitespace, drop_undelimited })
}

fn read_number(chars: &[char], idx: &mut usize) -> Option<u32> {
    let mut n: Option<u32> = None;
    while let Some(c) = chars.get(*idx) {
        let Some(d) = c.to_digit(10) else { break };
        n = Some(n.unwrap_or(0) * 10 + d);
        *idx += 1;
    }
    n
}

/// Applies a compiled selector list to one line, returning `None` when the
/// line should be dropped (only possible with `drop_undelimited` set and
/// no delimiter present).
pub fn apply(spec: &CutSpec, line: &str) -> Option<String> {
    let needs_fields = spec.selectors.iter().any(|s| s.kind == SelKind::Field);
    let has_delim = if spec.whitespace { line.split_whitespace().count() > 1 } else { line.contains(spec.din) };

    if needs_fields && !has_delim {
        if spec.drop_undelimited {
            return None;
        }
        return Some(line.to_string());
    }

    let chars: Vec<char> = line.chars().collect();
    let fields: Vec<&str> =
        if spec.whitespace { line.split_whitespace().collect() } else { line.split(spec.din).collect() };

    let mut out_parts: Vec<String> = Vec::new();
    for sel in &spec.selectors {
        match sel.kind {
            SelKind::Char => {
                let len = chars.len();
                let start = sel.start.unwrap_or(1).max(1) as usize;
                let end = sel.end.unwrap_or(len as u32) as usize;
                if start <= end {
                    if start > len {
                        continue;
                    }
                    out_parts.push(chars[start - 1..end.min(len)].iter().collect());
                } else {
                    // Descending range: emit the slice end..=start with its
                    // characters reversed.
                    if end > len {
                        continue;
                    }
                    out_parts.push(chars[end - 1..start.min(len)].iter().rev().collect());
                }
            }
            SelKind::Field => {
                let start = sel.start.unwrap_or(1).max(1) as usize;
                let end = sel.end.unwrap_or(fields.len() as u32) as usize;
                // A descending range (start > end) selects the same fields
                // as its ascending counterpart; field order isn't reversed.
                let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
                if lo > fields.len() {
                    continue;
                }
                out_parts.push(fields[lo - 1..hi.min(fields.len())].join(&spec.dout.to_string()));
            }
        }
    }

    let joined = out_parts.join(&spec.dout.to_string());
    if spec.fold {
        let mut collapsed = String::with_capacity(joined.len());
        let mut last_was_dout = false;
        for c in joined.chars() {
            if c == spec.dout {
                if last_was_dout {
                    continue;
                }
                last_was_dout = true;
            } else {
                last_was_dout = false;
            }
            collapsed.push(c);
        }
        Some(collapsed)
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_char_and_field_selectors() {
        let spec = parse_cut_spec("/f1,c5-8,f3/", "-e", None).unwrap();
        assert_eq!(spec.selectors.len(), 3);
        assert_eq!(spec.selectors[0].kind, SelKind::Field);
        assert_eq!(spec.selectors[1].kind, SelKind::Char);
        assert_eq!(spec.selectors[2].kind, SelKind::Field);
    }

    #[test]
    fn sticky_kind_carries_to_next_selector() {
        let spec = parse_cut_spec("/c1,3-5/", "-e", None).unwrap();
        assert_eq!(spec.selectors[1].kind, SelKind::Char);
    }

    #[test]
    fn open_ended_ranges_parse() {
        let spec = parse_cut_spec("/f2-/", "-e", None).unwrap();
        assert_eq!(spec.selectors[0].start, Some(2));
        assert_eq!(spec.selectors[0].end, None);
        let spec = parse_cut_spec("/f-3/", "-e", None).unwrap();
        assert_eq!(spec.selectors[0].start, None);
        assert_eq!(spec.selectors[0].end, Some(3));
    }

    #[test]
    fn delimiters_default_to_space() {
        let spec = parse_cut_spec("/f1/", "-e", None).unwrap();
        assert_eq!(spec.din, ' ');
        assert_eq!(spec.dout, ' ');
    }

    #[test]
    fn in_list_d_and_upper_d_set_input_and_output_delimiters() {
        // "d," sets the input delimiter to ',', "D-" sets the output
        // delimiter to '-'; both appear as ordinary comma-separated
        // entries inside the selector list.
        let spec = parse_cut_spec("/f1,f3,d,,D-/", "-e", None).unwrap();
        assert_eq!(spec.din, ',');
        assert_eq!(spec.dout, '-');
        assert_eq!(apply(&spec, "a,b,c"), Some("a-c".to_string()));
    }

    #[test]
    fn trailing_d_option_drops_undelimited_lines() {
        let spec = parse_cut_spec("/f1,d,/d", "-e", None).unwrap();
        assert!(spec.drop_undelimited);
        assert_eq!(apply(&spec, "noseparator"), None);
    }

    #[test]
    fn char_selection_clamps_to_line_length() {
        let spec = parse_cut_spec("/c2-100/", "-e", None).unwrap();
        assert_eq!(apply(&spec, "abcde"), Some("bcde".to_string()));
    }

    #[test]
    fn descending_char_range_reverses_the_slice() {
        let spec = parse_cut_spec("/c4-2/", "-e", None).unwrap();
        assert_eq!(apply(&spec, "abcde"), Some("dcb".to_string()));
    }

    #[test]
    fn descending_field_range_keeps_ascending_order() {
        let spec = parse_cut_spec("/f3-1,D-/", "-e", None).unwrap();
        assert_eq!(apply(&spec, "a b c"), Some("a-b-c".to_string()));
    }

    #[test]
    fn any_character_can_be_the_list_delimiter() {
        let spec = parse_cut_spec(":f1,f2:", "-e", None).unwrap();
        assert_eq!(spec.selectors.len(), 2);
    }

    #[test]
    fn invalid_selector_is_rejected() {
        assert!(parse_cut_spec("/z9/", "-e", None).is_err());
        assert!(parse_cut_spec("", "-e", None).is_err());
    }
}

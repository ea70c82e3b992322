//! Single-cycle execution engine: walks the flat command arena for one
//! pattern space, applying address gating, substitution, and the handful
//! of commands (`n`/`N`/branches/blocks) that need control-flow access
//! rather than a plain one-shot effect.

use crate::error::{ExecError, ExecErrorKind};
use crate::regexeng::CompiledRegex;
use crate::sed::ast::*;
use crate::sed::cmdlist::{CmdId, CommandList, ExecState, Next};
use crate::sed::cut;
use crate::stream::LineBufferedSink;
use std::path::PathBuf;

/// Deferred output queued by `a`/`r`/`R`, flushed by the caller after the
/// cycle's own dispatch (and after `p`/auto-print) the way GNU sed's append
/// queue works.
#[derive(Debug, Clone)]
pub enum AppendItem {
    Text(String),
    File(PathBuf),
    FileLine(PathBuf),
}

/// What a cycle ended with, driving what the caller does about auto-print
/// and whether to read another line of input.
#[derive(Debug)]
pub enum CycleEnd {
    /// Ran off the end of the script normally: auto-print unless quiet.
    Normal,
    /// `d`: pattern space dropped, no auto-print, read a new line.
    Deleted,
    /// `c`: print this text unconditionally (even under `-n`), no
    /// auto-print of the pattern space, read a new line.
    Changed(String),
    /// `D` truncated an embedded newline: rerun the cycle on what's left
    /// without reading new input and without resetting `t`/`T` state.
    Restart,
    /// `q N`: auto-print (unless quiet) then stop reading input.
    Quit(i32),
    /// `Q N`: stop reading input without auto-printing.
    QuitQuiet(i32),
}

/// State carried across an entire run (every cycle), as opposed to
/// [`ExecState`], which is per-command range-tracking state.
pub struct ExecContext<'p> {
    pub hold_space: String,
    pub last_regex: Option<&'p CompiledRegex>,
    pub substitution_made: bool,
    pub quiet: bool,
    pub append_queue: Vec<AppendItem>,
}

impl<'p> ExecContext<'p> {
    pub fn new(quiet: bool) -> Self {
        Self {
            hold_space: "\n".to_string(),
            last_regex: None,
            substitution_made: false,
            quiet,
            append_queue: Vec::new(),
        }
    }
}

/// Pulls further input lines for `n`/`N`, and names the current input
/// element for `F`. Implemented by the orchestrator over its input stream.
pub trait LineSource {
    fn next_line(&mut self) -> Option<(String, bool)>;
    fn current_name(&self) -> &str;
}

fn next_char_boundary(s: &str, pos: usize) -> usize {
    let bytes = s.as_bytes();
    if pos >= bytes.len() {
        return pos + 1;
    }
    let mut next = pos + 1;
    while next < bytes.len() && (bytes[next] & 0xC0) == 0x80 {
        next += 1;
    }
    next
}

fn render_replacement(parts: &[ReplPart], caps: &regex::Captures) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            ReplPart::Literal(s) => out.push_str(s),
            ReplPart::Whole => out.push_str(caps.get(0).map_or("", |m| m.as_str())),
            ReplPart::Group(n) => {
                if let Some(m) = caps.get(*n as usize) {
                    out.push_str(m.as_str());
                }
            }
        }
    }
    out
}

/// Replaces matches of `re` in `ps` per GNU sed's occurrence/global rules,
/// skipping the zero-length match that sits right where a non-empty match
/// just ended (POSIX's rule for `s///g` on patterns like `x*`).
fn apply_substitution(
    ps: &str,
    re: &CompiledRegex,
    repl: &[ReplPart],
    global: bool,
    occurrence: Option<u32>,
) -> (String, bool) {
    let nth = occurrence.unwrap_or(1).max(1);
    let mut result = String::new();
    let mut pos = 0usize;
    let mut count = 0u32;
    let mut changed = false;
    let mut prev_nonempty_end: Option<usize> = None;

    while pos <= ps.len() {
        let caps = match re.captures_at(ps, pos) {
            Some(c) => c,
            None => {
                result.push_str(&ps[pos..]);
                break;
            }
        };
        let m = caps.get(0).unwrap();

        if m.start() == m.end() && prev_nonempty_end == Some(m.start()) {
            if m.start() >= ps.len() {
                result.push_str(&ps[pos..]);
                break;
            }
            let next = next_char_boundary(ps, m.start());
            result.push_str(&ps[pos..next]);
            pos = next;
            prev_nonempty_end = None;
            continue;
        }

        result.push_str(&ps[pos..m.start()]);
        count += 1;

        let replace_this = if global { count >= nth } else { count == nth };
        if replace_this {
            changed = true;
            result.push_str(&render_replacement(repl, &caps));
        } else {
            result.push_str(m.as_str());
        }

        if m.start() == m.end() {
            if m.start() >= ps.len() {
                break;
            }
            let next = next_char_boundary(ps, m.start());
            result.push_str(&ps[m.start()..next]);
            pos = next;
            prev_nonempty_end = None;
        } else {
            pos = m.end();
            prev_nonempty_end = Some(m.end());
        }

        if !global && count >= nth {
            result.push_str(&ps[pos..]);
            break;
        }
    }

    (result, changed)
}

fn test_single_address<'a>(
    addr: &'a Address,
    line_number: u64,
    is_last: bool,
    pattern_space: &str,
    last_regex: &mut Option<&'a CompiledRegex>,
) -> Result<bool, ExecError> {
    match addr {
        Address::Line(n) => Ok(line_number == *n),
        Address::LastLine => Ok(is_last),
        Address::Step { first, step } => {
            if *step == 0 {
                Ok(line_number == *first)
            } else {
                Ok(line_number >= *first && (line_number - first) % step == 0)
            }
        }
        Address::Regex(slot) => {
            let re = slot.resolve(last_regex).map_err(|k| ExecError::new(k, None))?;
            Ok(re.is_match(pattern_space))
        }
        Address::RelLine(_) | Address::RelLineMultiple(_) => Ok(false),
    }
}

/// Evaluates a command's address against the current line, returning
/// `(matched, is_range_boundary)`. `is_range_boundary` is true for
/// single/no addresses (always a boundary) and for two-address ranges on
/// the line that closes them - used by `c` to print its text only once
/// per range instead of on every line inside it.
fn address_matches<'a>(
    addr: &'a Option<AddressRange>,
    state: &mut ExecState,
    line_number: u64,
    is_last: bool,
    pattern_space: &str,
    last_regex: &mut Option<&'a CompiledRegex>,
) -> Result<(bool, bool), ExecError> {
    let Some(range) = addr else {
        return Ok((true, true));
    };

    let (matched, boundary) = match (&range.start, &range.end) {
        (None, None) => (true, true),
        (Some(start), None) => (test_single_address(start, line_number, is_last, pattern_space, last_regex)?, true),
        (Some(start), Some(end)) => {
            range_matches(start, end, state, line_number, is_last, pattern_space, last_regex)?
        }
        (None, Some(_)) => (false, false),
    };

    if range.negated {
        Ok((!matched, boundary))
    } else {
        Ok((matched, boundary))
    }
}

fn range_matches<'a>(
    start: &'a Address,
    end: &'a Address,
    state: &mut ExecState,
    line_number: u64,
    is_last: bool,
    pattern_space: &str,
    last_regex: &mut Option<&'a CompiledRegex>,
) -> Result<(bool, bool), ExecError> {
    if let Address::RelLine(n) = end {
        if !state.range_active {
            if test_single_address(start, line_number, is_last, pattern_space, last_regex)? {
                state.range_active = true;
                state.range_start_line = Some(line_number);
                if *n == 0 {
                    state.range_active = false;
                    return Ok((true, true));
                }
                return Ok((true, false));
            }
            return Ok((false, false));
        }
        let start_line = state.range_start_line.unwrap_or(line_number);
        let closing = line_number >= start_line + n;
        if closing {
            state.range_active = false;
        }
        return Ok((true, closing));
    }

    if let Address::RelLineMultiple(n) = end {
        if !state.range_active {
            if test_single_address(start, line_number, is_last, pattern_space, last_regex)? {
                state.range_active = true;
                state.range_start_line = Some(line_number);
                let closing = *n > 0 && line_number % n == 0;
                if closing {
                    state.range_active = false;
                }
                return Ok((true, closing));
            }
            return Ok((false, false));
        }
        let closing = *n > 0 && line_number % n == 0;
        if closing {
            state.range_active = false;
        }
        return Ok((true, closing));
    }

    let is_zero_start = matches!(start, Address::Line(0));

    if !state.range_active && !state.range_done {
        let start_matches = is_zero_start || test_single_address(start, line_number, is_last, pattern_space, last_regex)?;
        if !start_matches {
            return Ok((false, false));
        }
        state.range_active = true;
        state.range_start_line = Some(line_number);

        if let Address::Line(n) = end {
            if !is_zero_start && *n <= line_number {
                state.range_active = false;
                state.range_done = true;
                return Ok((true, true));
            }
        }

        if is_zero_start {
            let closes = test_single_address(end, line_number, is_last, pattern_space, last_regex)?;
            if closes {
                state.range_active = false;
                state.range_done = true;
            }
            return Ok((true, closes));
        }

        return Ok((true, false));
    }

    if state.range_active {
        let closes = test_single_address(end, line_number, is_last, pattern_space, last_regex)?;
        if closes {
            state.range_active = false;
            if matches!(start, Address::Line(_)) {
                state.range_done = true;
            }
        }
        return Ok((true, closes));
    }

    Ok((false, false))
}

fn wrap_list(s: &str, width: Option<u32>) -> String {
    let width = width.unwrap_or(70);
    if width == 0 {
        return s.to_string();
    }
    let width = width as usize;
    if width <= 1 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::new();
    let mut col = 0;
    for (i, c) in chars.iter().enumerate() {
        if col >= width - 1 && i != chars.len() - 1 {
            out.push('\\');
            out.push('\n');
            col = 0;
        }
        out.push(*c);
        col += 1;
    }
    out
}

/// Runs one cycle (one pass through the command arena) over `pattern_space`.
#[allow(clippy::too_many_arguments)]
pub fn run_cycle<'a>(
    commands: &'a CommandList,
    states: &mut [ExecState],
    ctx: &mut ExecContext<'a>,
    pattern_space: &mut String,
    line_number: &mut u64,
    is_last_line: &mut bool,
    out: &mut LineBufferedSink,
    sinks: &mut [LineBufferedSink],
    input: &mut dyn LineSource,
) -> Result<CycleEnd, ExecError> {
    let Some(mut pc) = commands.first_id() else {
        return Ok(CycleEnd::Normal);
    };

    loop {
        let cmd = commands.get(pc);
        let state = &mut states[pc.0 as usize];
        let (matched, boundary) = address_matches(
            &cmd.addr,
            state,
            *line_number,
            *is_last_line,
            pattern_space,
            &mut ctx.last_regex,
        )?;

        if let CommandKind::BlockGuard(target) = &cmd.kind {
            let next = if matched { cmd.next } else { Next::Cmd(*target) };
            pc = match advance(next) {
                Some(next) => next,
                None => return finish(CycleEnd::Normal),
            };
            continue;
        }

        if !matched {
            match advance(cmd.next) {
                Some(next) => {
                    pc = next;
                    continue;
                }
                None => return Ok(CycleEnd::Normal),
            }
        }

        let mut override_next: Option<Next> = None;

        match &cmd.kind {
            CommandKind::Substitute(spec) => {
                if spec.eval {
                    return Err(ExecError::new(ExecErrorKind::UnsupportedCommand('e'), cmd.loc));
                }
                let re = spec.pattern.resolve(&mut ctx.last_regex).map_err(|k| ExecError::new(k, cmd.loc))?;
                let (new_ps, changed) =
                    apply_substitution(pattern_space, re, &spec.replacement, spec.global, spec.occurrence);
                if changed {
                    *pattern_space = new_ps;
                    ctx.substitution_made = true;
                    if spec.print_on_match {
                        out.write_str(pattern_space).map_err(ExecError::from)?;
                        out.write_str("\n").map_err(ExecError::from)?;
                    }
                    if let Some(sink_id) = spec.write_sink {
                        let sink = &mut sinks[sink_id.0 as usize];
                        sink.write_str(pattern_space).map_err(ExecError::from)?;
                        sink.write_str("\n").map_err(ExecError::from)?;
                    }
                }
            }
            CommandKind::Print => {
                out.write_str(pattern_space).map_err(ExecError::from)?;
                out.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::PrintFirstLine => {
                let first = pattern_space.split('\n').next().unwrap_or("");
                out.write_str(first).map_err(ExecError::from)?;
                out.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::Delete => return finish(CycleEnd::Deleted),
            CommandKind::DeleteFirstLine => {
                if let Some(idx) = pattern_space.find('\n') {
                    *pattern_space = pattern_space[idx + 1..].to_string();
                    return finish(CycleEnd::Restart);
                }
                return finish(CycleEnd::Deleted);
            }
            CommandKind::Zap => pattern_space.clear(),
            CommandKind::Append(text) => ctx.append_queue.push(AppendItem::Text(text.clone())),
            CommandKind::Insert(text) => {
                out.write_str(text).map_err(ExecError::from)?;
                out.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::Change(text) => {
                if boundary {
                    return finish(CycleEnd::Changed(text.clone()));
                }
                return finish(CycleEnd::Deleted);
            }
            CommandKind::Hold => ctx.hold_space = pattern_space.clone(),
            CommandKind::HoldAppend => {
                ctx.hold_space.push('\n');
                ctx.hold_space.push_str(pattern_space);
            }
            CommandKind::Get => *pattern_space = ctx.hold_space.clone(),
            CommandKind::GetAppend => {
                pattern_space.push('\n');
                pattern_space.push_str(&ctx.hold_space);
            }
            CommandKind::Exchange => std::mem::swap(pattern_space, &mut ctx.hold_space),
            CommandKind::NextLine => {
                if !ctx.quiet {
                    out.write_str(pattern_space).map_err(ExecError::from)?;
                    out.write_str("\n").map_err(ExecError::from)?;
                }
                match input.next_line() {
                    Some((line, last)) => {
                        *pattern_space = line;
                        *line_number += 1;
                        *is_last_line = last;
                    }
                    None => return finish(CycleEnd::QuitQuiet(0)),
                }
            }
            CommandKind::NextAppend => match input.next_line() {
                Some((line, last)) => {
                    pattern_space.push('\n');
                    pattern_space.push_str(&line);
                    *line_number += 1;
                    *is_last_line = last;
                }
                None => {
                    if ctx.quiet {
                        return finish(CycleEnd::QuitQuiet(0));
                    }
                    return finish(CycleEnd::Quit(0));
                }
            },
            CommandKind::Quit(code) => return finish(CycleEnd::Quit(*code)),
            CommandKind::QuitQuiet(code) => return finish(CycleEnd::QuitQuiet(*code)),
            CommandKind::Transliterate(spec) => {
                let mut result = String::with_capacity(pattern_space.len());
                for ch in pattern_space.chars() {
                    match spec.from.iter().position(|&c| c == ch) {
                        Some(idx) => result.push(spec.to[idx]),
                        None => result.push(ch),
                    }
                }
                *pattern_space = result;
            }
            CommandKind::LineNumber => {
                out.write_str(&line_number.to_string()).map_err(ExecError::from)?;
                out.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::Branch(target) => {
                override_next = Some(match target {
                    Some(id) => Next::Cmd(*id),
                    None => Next::Over,
                });
            }
            CommandKind::BranchOnSubst(target) => {
                if ctx.substitution_made {
                    ctx.substitution_made = false;
                    override_next = Some(match target {
                        Some(id) => Next::Cmd(*id),
                        None => Next::Over,
                    });
                }
            }
            CommandKind::BranchOnNoSubst(target) => {
                if !ctx.substitution_made {
                    override_next = Some(match target {
                        Some(id) => Next::Cmd(*id),
                        None => Next::Over,
                    });
                }
            }
            CommandKind::Label => {}
            CommandKind::List(width) => {
                let escaped = crate::regexeng::escape_for_list(pattern_space);
                let wrapped = wrap_list(&escaped, *width);
                out.write_str(&wrapped).map_err(ExecError::from)?;
                out.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::PrintFilename => {
                out.write_str(input.current_name()).map_err(ExecError::from)?;
                out.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::Version => {}
            CommandKind::ReadFile(path) => ctx.append_queue.push(AppendItem::File(PathBuf::from(path))),
            CommandKind::ReadFileLine(path) => ctx.append_queue.push(AppendItem::FileLine(PathBuf::from(path))),
            CommandKind::WriteFile(sink_id) => {
                let sink = &mut sinks[sink_id.0 as usize];
                sink.write_str(pattern_space).map_err(ExecError::from)?;
                sink.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::WriteFirstLine(sink_id) => {
                let first = pattern_space.split('\n').next().unwrap_or("").to_string();
                let sink = &mut sinks[sink_id.0 as usize];
                sink.write_str(&first).map_err(ExecError::from)?;
                sink.write_str("\n").map_err(ExecError::from)?;
            }
            CommandKind::Cut(spec) => match cut::apply(spec, pattern_space) {
                Some(new_ps) => *pattern_space = new_ps,
                None => {
                    pattern_space.clear();
                    override_next = Some(Next::Over);
                }
            },
            CommandKind::Execute => {
                return Err(ExecError::new(ExecErrorKind::UnsupportedCommand('e'), cmd.loc));
            }
            CommandKind::BlockGuard(_) => unreachable!("handled above"),
        }

        let next = override_next.unwrap_or(cmd.next);
        match advance(next) {
            Some(n) => pc = n,
            None => return finish(CycleEnd::Normal),
        }
    }
}

/// Translates a [`Next`] into either a continuing `CmdId` or a terminal
/// [`CycleEnd`], flattened into an `Option` so the dispatch loop has one
/// place to decide "keep going" vs. "stop".
fn advance(next: Next) -> Option<CmdId> {
    match next {
        Next::Cmd(id) => Some(id),
        Next::Over => None,
        Next::Again => None,
        Next::Quit => None,
        Next::QuitQuiet => None,
    }
}

fn finish(end: CycleEnd) -> Result<CycleEnd, ExecError> {
    Ok(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sed::cmdlist::new_exec_states;
    use crate::sed::parser::compile;
    use crate::sed::SedTraits;

    struct NoMoreInput;
    impl LineSource for NoMoreInput {
        fn next_line(&mut self) -> Option<(String, bool)> {
            None
        }
        fn current_name(&self) -> &str {
            "-"
        }
    }

    fn run(script: &str, line: &str, is_last: bool) -> (String, CycleEnd, String) {
        let prog = compile(&[script], &SedTraits::default(), "-e").unwrap();
        let mut states = new_exec_states(&prog.commands);
        let mut ctx = ExecContext::new(prog.traits.quiet);
        let mut out = LineBufferedSink::for_memory("out");
        let mut sinks: Vec<LineBufferedSink> = Vec::new();
        let mut ps = line.to_string();
        let mut line_number = 1u64;
        let mut last = is_last;
        let end = run_cycle(
            &prog.commands,
            &mut states,
            &mut ctx,
            &mut ps,
            &mut line_number,
            &mut last,
            &mut out,
            &mut sinks,
            &mut NoMoreInput,
        )
        .unwrap();
        out.flush().unwrap();
        (ps, end, out.contents())
    }

    #[test]
    fn substitute_replaces_first_match_by_default() {
        let (ps, end, _) = run("s/a/X/", "banana", true);
        assert_eq!(ps, "bXnana");
        assert!(matches!(end, CycleEnd::Normal));
    }

    #[test]
    fn substitute_global_replaces_all() {
        let (ps, _, _) = run("s/a/X/g", "banana", true);
        assert_eq!(ps, "bXnXnX");
    }

    #[test]
    fn substitute_nth_occurrence() {
        let (ps, _, _) = run("s/a/X/2", "banana", true);
        assert_eq!(ps, "banXna");
    }

    #[test]
    fn substitute_nth_and_global_replaces_from_nth_onward() {
        let (ps, _, _) = run("s/a/X/2g", "banana", true);
        assert_eq!(ps, "banXnX");
    }

    #[test]
    fn delete_suppresses_auto_print() {
        let (_, end, _) = run("d", "line", true);
        assert!(matches!(end, CycleEnd::Deleted));
    }

    #[test]
    fn print_writes_immediately() {
        let (_, _, out) = run("p", "line", true);
        assert_eq!(out, "line\n");
    }

    #[test]
    fn negated_address_skips_matching_line() {
        let prog = compile(&["1!d"], &SedTraits::default(), "-e").unwrap();
        let mut states = new_exec_states(&prog.commands);
        let mut ctx = ExecContext::new(prog.traits.quiet);
        let mut out = LineBufferedSink::for_memory("out");
        let mut sinks: Vec<LineBufferedSink> = Vec::new();
        let mut ps = "first".to_string();
        let mut line_number = 1u64;
        let mut last = true;
        let end = run_cycle(
            &prog.commands,
            &mut states,
            &mut ctx,
            &mut ps,
            &mut line_number,
            &mut last,
            &mut out,
            &mut sinks,
            &mut NoMoreInput,
        )
        .unwrap();
        assert!(matches!(end, CycleEnd::Normal));
    }

    #[test]
    fn branch_to_label_skips_intermediate_command() {
        let (ps, _, _) = run("b skip\ns/a/X/\n:skip", "banana", true);
        assert_eq!(ps, "banana");
    }

    #[test]
    fn change_prints_text_and_deletes() {
        let (_, end, _) = run("c\\\nreplacement", "line", true);
        match end {
            CycleEnd::Changed(text) => assert_eq!(text, "replacement"),
            _ => panic!("expected Changed"),
        }
    }

    #[test]
    fn transliterate_maps_characters() {
        let (ps, _, _) = run("y/abc/xyz/", "cab", true);
        assert_eq!(ps, "zxy");
    }

    #[test]
    fn cut_field_selection() {
        let (ps, _, _) = run("C/f2,d,/", "a,b,c", true);
        assert_eq!(ps, "b");
    }

    #[test]
    fn block_guard_skips_body_when_address_fails() {
        let (ps, _, _) = run("/nomatch/{ s/a/X/ }", "banana", true);
        assert_eq!(ps, "banana");
    }

    #[test]
    fn block_guard_runs_body_when_address_matches() {
        let (ps, _, _) = run("/ban/{ s/a/X/ }", "banana", true);
        assert_eq!(ps, "bXnana");
    }

    #[test]
    fn quit_code_is_reported() {
        let (_, end, _) = run("q5", "line", true);
        assert!(matches!(end, CycleEnd::Quit(5)));
    }

    #[test]
    fn range_address_spans_inclusive_lines() {
        let prog = compile(&["1,2d"], &SedTraits::default(), "-e").unwrap();
        let mut states = new_exec_states(&prog.commands);
        let mut ctx = ExecContext::new(prog.traits.quiet);
        let mut out = LineBufferedSink::for_memory("out");
        let mut sinks: Vec<LineBufferedSink> = Vec::new();

        for n in 1..=3u64 {
            let mut ps = format!("line{}", n);
            let mut line_number = n;
            let mut last = n == 3;
            let end = run_cycle(
                &prog.commands,
                &mut states,
                &mut ctx,
                &mut ps,
                &mut line_number,
                &mut last,
                &mut out,
                &mut sinks,
                &mut NoMoreInput,
            )
            .unwrap();
            if n <= 2 {
                assert!(matches!(end, CycleEnd::Deleted));
            } else {
                assert!(matches!(end, CycleEnd::Normal));
            }
        }
    }
}

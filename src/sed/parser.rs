//! Two-pass compiler: scripts are lexed and walked once into a flat
//! command arena (nested `{ }` groups become a `BlockGuard` synthetic
//! command followed inline by the group's body), then branch targets are
//! resolved against the label table built during that walk.

use crate::error::{CompileError, CompileErrorKind, SourceLoc};
use crate::regexeng::{RegexDialect, RegexSlot};
use crate::sed::ast::*;
use crate::sed::cmdlist::{CmdId, CommandList, Next};
use crate::sed::cut;
use crate::sed::lexer::{tokenize, SedToken};
use crate::sed::{Program, SedTraits};
use std::collections::HashMap;
use std::path::PathBuf;

fn dialect_from(traits: &SedTraits) -> RegexDialect {
    if traits.extended_regex { RegexDialect::Extended } else { RegexDialect::Basic }
}

/// Joins `-e`/`-f` script fragments, honoring the convention that a
/// fragment ending in a bare backslash continues into the next one on its
/// own line (so `a\` followed by a separate `text` fragment behaves the
/// same as a single script with an embedded newline).
fn join_scripts(scripts: &[&str]) -> String {
    let mut joined: Vec<String> = Vec::new();
    for script in scripts {
        let script_str = script.to_string();
        if let Some(last) = joined.last() {
            if last.ends_with('\\') {
                let prev = joined.pop().unwrap();
                joined.push(format!("{}\n{}", prev, script_str));
                continue;
            }
        }
        joined.push(script_str);
    }
    joined.join("\n")
}

/// Strips a leading `#n`/`#r` (and combinations) directive comment, which
/// are equivalent to passing `-n`/`-E` on the command line.
fn strip_leading_directives(body: &str) -> (String, bool, bool) {
    let mut silent = false;
    let mut extended = false;
    let mut rest = body;

    if let Some(after) = rest.strip_prefix("#n") {
        silent = true;
        rest = after;
        if let Some(after_r) = rest.strip_prefix('r') {
            extended = true;
            rest = after_r;
        }
    } else if let Some(after) = rest.strip_prefix("#r") {
        extended = true;
        rest = after;
        if let Some(after_n) = rest.strip_prefix('n') {
            silent = true;
            rest = after_n;
        }
    } else {
        return (body.to_string(), false, false);
    }

    let rest = rest.trim_start_matches(['\t', ' ']);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    (rest.to_string(), silent, extended)
}

#[derive(Clone, Copy)]
enum BranchKind {
    Branch,
    OnSubst,
    OnNoSubst,
}

struct Compiler {
    tokens: Vec<SedToken>,
    pos: usize,
    line: u32,
    traits: SedTraits,
    source_name: String,
    commands: CommandList,
    labels: HashMap<String, CmdId>,
    pending_branches: Vec<(CmdId, BranchKind, String, Option<SourceLoc>)>,
    sinks: Vec<PathBuf>,
    sink_index: HashMap<String, SinkId>,
}

impl Compiler {
    fn new(tokens: Vec<SedToken>, traits: SedTraits, source_name: String) -> Self {
        Self {
            tokens,
            pos: 0,
            line: 1,
            traits,
            source_name,
            commands: CommandList::new(),
            labels: HashMap::new(),
            pending_branches: Vec::new(),
            sinks: Vec::new(),
            sink_index: HashMap::new(),
        }
    }

    fn loc(&self) -> Option<SourceLoc> {
        Some(SourceLoc::new(self.line, 0))
    }

    fn err(&self, kind: CompileErrorKind) -> CompileError {
        CompileError::new(kind, self.source_name.clone(), self.loc())
    }

    fn peek(&self) -> &SedToken {
        self.tokens.get(self.pos).unwrap_or(&SedToken::Eof)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), SedToken::Eof)
    }

    fn bump(&mut self) {
        if let Some(tok) = self.tokens.get(self.pos) {
            if matches!(tok, SedToken::Newline) {
                self.line += 1;
            }
        }
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn advance_owned(&mut self) -> SedToken {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(SedToken::Eof);
        self.bump();
        tok
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), SedToken::Newline | SedToken::Semicolon) {
            self.bump();
        }
    }

    fn register_sink(&mut self, path: &str) -> SinkId {
        if let Some(id) = self.sink_index.get(path) {
            return *id;
        }
        let id = SinkId(self.sinks.len() as u32);
        self.sinks.push(PathBuf::from(path));
        self.sink_index.insert(path.to_string(), id);
        id
    }

    fn check_filename(&self, name: &str) -> Result<(), CompileError> {
        if name.is_empty() {
            return Err(self.err(CompileErrorKind::FileNameEmpty));
        }
        if name.contains('\0') {
            return Err(self.err(CompileErrorKind::FileNameHasNul));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), CompileError> {
        self.parse_block(false)?;
        if !self.is_at_end() {
            return Err(self.err(CompileErrorKind::UnbalancedGroup));
        }
        Ok(())
    }

    fn parse_block(&mut self, in_group: bool) -> Result<(), CompileError> {
        loop {
            self.skip_separators();
            if self.is_at_end() {
                if in_group {
                    return Err(self.err(CompileErrorKind::UnbalancedGroup));
                }
                return Ok(());
            }
            if matches!(self.peek(), SedToken::RBrace) {
                if in_group {
                    return Ok(());
                }
                return Err(self.err(CompileErrorKind::UnbalancedGroup));
            }
            self.parse_one_command()?;
        }
    }

    fn parse_one_command(&mut self) -> Result<(), CompileError> {
        let loc = self.loc();
        let mut addr = self.parse_address_range()?;

        if matches!(self.peek(), SedToken::Negation) {
            self.bump();
            match &mut addr {
                Some(a) => a.negated = true,
                None => addr = Some(AddressRange { start: None, end: None, negated: true }),
            }
        }

        if self.is_at_end() || matches!(self.peek(), SedToken::RBrace) {
            if addr.is_some() {
                return Err(self.err(CompileErrorKind::CommandMissing));
            }
            return Ok(());
        }

        let tok = self.advance_owned();
        match tok {
            SedToken::LBrace => self.parse_group(addr, loc),
            SedToken::Command(c) => self.push_simple(c, addr, loc),
            SedToken::Substitute { pattern, replacement, flags, wfile } => {
                self.push_substitute(pattern, replacement, flags, wfile, addr, loc)
            }
            SedToken::Transliterate { source, dest } => self.push_translit(source, dest, addr, loc),
            SedToken::Cut(body) => self.push_cut(body, addr, loc),
            SedToken::LabelDef(name) => self.push_label(name, addr, loc),
            SedToken::Branch { label } => self.push_branch(BranchKind::Branch, label, addr, loc),
            SedToken::BranchOnSubst { label } => self.push_branch(BranchKind::OnSubst, label, addr, loc),
            SedToken::BranchOnNoSubst { label } => self.push_branch(BranchKind::OnNoSubst, label, addr, loc),
            SedToken::TextCmd { cmd, text } => self.push_text(cmd, text, addr, loc),
            SedToken::FileRead(f) => {
                self.check_filename(&f)?;
                self.commands.push(Command { addr, kind: CommandKind::ReadFile(f), next: Next::Over, loc });
                Ok(())
            }
            SedToken::FileReadLine(f) => {
                self.check_filename(&f)?;
                self.commands.push(Command { addr, kind: CommandKind::ReadFileLine(f), next: Next::Over, loc });
                Ok(())
            }
            SedToken::FileWrite(f) => {
                self.check_filename(&f)?;
                let sink = self.register_sink(&f);
                self.commands.push(Command { addr, kind: CommandKind::WriteFile(sink), next: Next::Over, loc });
                Ok(())
            }
            SedToken::FileWriteLine(f) => {
                self.check_filename(&f)?;
                let sink = self.register_sink(&f);
                self.commands.push(Command { addr, kind: CommandKind::WriteFirstLine(sink), next: Next::Over, loc });
                Ok(())
            }
            SedToken::Execute(_) => {
                self.commands.push(Command { addr, kind: CommandKind::Execute, next: Next::Over, loc });
                Ok(())
            }
            SedToken::Version(_) => {
                self.commands.push(Command { addr, kind: CommandKind::Version, next: Next::Over, loc });
                Ok(())
            }
            SedToken::List(width) => {
                self.commands.push(Command { addr, kind: CommandKind::List(width), next: Next::Over, loc });
                Ok(())
            }
            SedToken::Error(msg) => Err(self.err(CompileErrorKind::TokenizeError(msg))),
            _ => Err(self.err(CompileErrorKind::CommandMissing)),
        }
    }

    fn parse_group(&mut self, addr: Option<AddressRange>, loc: Option<SourceLoc>) -> Result<(), CompileError> {
        let guard_id = self.commands.push(Command {
            addr,
            kind: CommandKind::BlockGuard(CmdId(0)),
            next: Next::Over,
            loc,
        });
        self.parse_block(true)?;
        if !matches!(self.peek(), SedToken::RBrace) {
            return Err(self.err(CompileErrorKind::UnbalancedGroup));
        }
        self.bump();
        let after = CmdId(self.commands.len() as u32);
        self.commands.get_mut(guard_id).kind = CommandKind::BlockGuard(after);
        Ok(())
    }

    fn push_simple(&mut self, c: char, addr: Option<AddressRange>, loc: Option<SourceLoc>) -> Result<(), CompileError> {
        if matches!(c, 'q' | 'Q' | '=') {
            self.check_strict_second_address(&addr)?;
        }
        let kind = match c {
            'p' => CommandKind::Print,
            'P' => CommandKind::PrintFirstLine,
            'd' => CommandKind::Delete,
            'D' => CommandKind::DeleteFirstLine,
            'h' => CommandKind::Hold,
            'H' => CommandKind::HoldAppend,
            'g' => CommandKind::Get,
            'G' => CommandKind::GetAppend,
            'x' => CommandKind::Exchange,
            'n' => CommandKind::NextLine,
            'N' => CommandKind::NextAppend,
            'q' => CommandKind::Quit(self.take_exit_code()),
            'Q' => CommandKind::QuitQuiet(self.take_exit_code()),
            'z' => CommandKind::Zap,
            '=' => CommandKind::LineNumber,
            'F' => CommandKind::PrintFilename,
            _ => return Err(self.err(CompileErrorKind::UnknownCommand(c))),
        };
        self.commands.push(Command { addr, kind, next: Next::Over, loc });
        Ok(())
    }

    /// Under `-a`/`--strict`, `q`, `Q`, `a`, `i` and `=` reject a range
    /// address (a command meant for one line shouldn't silently run on a
    /// whole span). Outside strict mode the range is accepted as GNU sed
    /// does.
    fn check_strict_second_address(&self, addr: &Option<AddressRange>) -> Result<(), CompileError> {
        if self.traits.strict {
            if let Some(a) = addr {
                if a.end.is_some() {
                    return Err(self.err(CompileErrorKind::InvalidSecondAddress));
                }
            }
        }
        Ok(())
    }

    fn take_exit_code(&mut self) -> i32 {
        if let SedToken::Number(n) = self.peek() {
            let n = *n;
            self.bump();
            n as i32
        } else {
            0
        }
    }

    fn push_substitute(
        &mut self,
        pattern: String,
        replacement: String,
        flags: String,
        wfile: Option<String>,
        addr: Option<AddressRange>,
        loc: Option<SourceLoc>,
    ) -> Result<(), CompileError> {
        let global = flags.contains('g');
        let case_insensitive = flags.contains('i') || flags.contains('I');
        let print_on_match = flags.contains('p');
        let eval = flags.contains('e');

        let digits: String = flags.chars().filter(|c| c.is_ascii_digit()).collect();
        let occurrence = if digits.is_empty() {
            None
        } else {
            let n = digits.parse::<u32>().unwrap_or(0);
            if n == 0 {
                return Err(self.err(CompileErrorKind::ZeroOccurrence));
            }
            Some(n)
        };

        let dialect = dialect_from(&self.traits);
        let pattern_slot = RegexSlot::compile(&pattern, dialect, case_insensitive, &self.source_name, loc)?;
        let repl_parts = tokenize_replacement(&replacement);

        let write_sink = match wfile {
            Some(f) => {
                self.check_filename(&f)?;
                Some(self.register_sink(&f))
            }
            None => None,
        };

        let spec = SubstSpec {
            pattern: pattern_slot,
            replacement: repl_parts,
            global,
            occurrence,
            print_on_match,
            write_sink,
            eval,
        };
        self.commands.push(Command { addr, kind: CommandKind::Substitute(spec), next: Next::Over, loc });
        Ok(())
    }

    fn push_translit(
        &mut self,
        source: String,
        dest: String,
        addr: Option<AddressRange>,
        loc: Option<SourceLoc>,
    ) -> Result<(), CompileError> {
        let from: Vec<char> = source.chars().collect();
        let to: Vec<char> = dest.chars().collect();
        if from.len() != to.len() {
            return Err(self.err(CompileErrorKind::TranslitLengthMismatch));
        }
        self.commands.push(Command {
            addr,
            kind: CommandKind::Transliterate(TranslitSpec { from, to }),
            next: Next::Over,
            loc,
        });
        Ok(())
    }

    fn push_cut(&mut self, body: String, addr: Option<AddressRange>, loc: Option<SourceLoc>) -> Result<(), CompileError> {
        let spec = cut::parse_cut_spec(&body, &self.source_name, loc)?;
        self.commands.push(Command { addr, kind: CommandKind::Cut(spec), next: Next::Over, loc });
        Ok(())
    }

    fn push_label(&mut self, name: String, addr: Option<AddressRange>, loc: Option<SourceLoc>) -> Result<(), CompileError> {
        if name.is_empty() {
            if self.traits.strict {
                return Err(self.err(CompileErrorKind::EmptyLabel));
            }
            // Non-strict: an empty label is a no-op, silently dropped
            // rather than registered.
            return Ok(());
        }
        if addr.is_some() {
            return Err(self.err(CompileErrorKind::InvalidAddressForCommand));
        }
        let id = self.commands.push(Command { addr: None, kind: CommandKind::Label, next: Next::Over, loc });
        if self.labels.insert(name.clone(), id).is_some() {
            return Err(self.err(CompileErrorKind::DuplicateLabel(name)));
        }
        Ok(())
    }

    fn push_branch(
        &mut self,
        kind: BranchKind,
        label: Option<String>,
        addr: Option<AddressRange>,
        loc: Option<SourceLoc>,
    ) -> Result<(), CompileError> {
        let resolved = match &label {
            Some(name) => self.labels.get(name).copied(),
            None => None,
        };

        let cmd_kind = match kind {
            BranchKind::Branch => CommandKind::Branch(resolved),
            BranchKind::OnSubst => CommandKind::BranchOnSubst(resolved),
            BranchKind::OnNoSubst => CommandKind::BranchOnNoSubst(resolved),
        };
        let id = self.commands.push(Command { addr, kind: cmd_kind, next: Next::Over, loc });

        if let Some(name) = label {
            if resolved.is_none() {
                self.pending_branches.push((id, kind, name, loc));
            }
        }
        Ok(())
    }

    fn push_text(&mut self, cmd: char, text: String, addr: Option<AddressRange>, loc: Option<SourceLoc>) -> Result<(), CompileError> {
        // `c` (change) legitimately spans a range - it replaces the whole
        // matched block with one copy of the text - so only `a`/`i` are
        // policed here.
        if matches!(cmd, 'a' | 'i') {
            self.check_strict_second_address(&addr)?;
        }
        let kind = match cmd {
            'a' => CommandKind::Append(text),
            'i' => CommandKind::Insert(text),
            'c' => CommandKind::Change(text),
            _ => return Err(self.err(CompileErrorKind::UnknownCommand(cmd))),
        };
        self.commands.push(Command { addr, kind, next: Next::Over, loc });
        Ok(())
    }

    fn parse_address_range(&mut self) -> Result<Option<AddressRange>, CompileError> {
        let loc = self.loc();
        let start = self.parse_one_address(loc)?;
        if start.is_none() {
            return Ok(None);
        }

        let end = if matches!(self.peek(), SedToken::RelativeOffset(_)) {
            match self.advance_owned() {
                SedToken::RelativeOffset(n) => Some(Address::RelLine(n)),
                _ => unreachable!(),
            }
        } else if matches!(self.peek(), SedToken::Multiple(_)) {
            match self.advance_owned() {
                SedToken::Multiple(n) => Some(Address::RelLineMultiple(n)),
                _ => unreachable!(),
            }
        } else if matches!(self.peek(), SedToken::Comma) {
            self.bump();
            match self.parse_one_address(loc)? {
                Some(a) => Some(a),
                None => return Err(self.err(CompileErrorKind::InvalidSecondAddress)),
            }
        } else {
            None
        };

        if let Some(Address::Line(0)) = &start {
            if !matches!(end, Some(Address::Regex(_))) {
                return Err(self.err(CompileErrorKind::ZeroAddressMisuse));
            }
        }

        Ok(Some(AddressRange { start, end, negated: false }))
    }

    fn parse_one_address(&mut self, loc: Option<SourceLoc>) -> Result<Option<Address>, CompileError> {
        match self.peek().clone() {
            SedToken::Number(n) => {
                self.bump();
                Ok(Some(Address::Line(n)))
            }
            SedToken::Dollar => {
                self.bump();
                Ok(Some(Address::LastLine))
            }
            SedToken::Pattern(p) => {
                self.bump();
                let dialect = dialect_from(&self.traits);
                let slot = RegexSlot::compile(&p, dialect, false, &self.source_name, loc)?;
                Ok(Some(Address::Regex(slot)))
            }
            SedToken::Step { first, step } => {
                self.bump();
                Ok(Some(Address::Step { first, step }))
            }
            _ => Ok(None),
        }
    }

    fn resolve_branches(&mut self) -> Result<(), CompileError> {
        let pending = std::mem::take(&mut self.pending_branches);
        for (id, kind, label, loc) in pending {
            let target = match self.labels.get(&label) {
                Some(t) => *t,
                None => return Err(CompileError::new(CompileErrorKind::LabelNotFound(label), self.source_name.clone(), loc)),
            };
            let cmd = self.commands.get_mut(id);
            match kind {
                BranchKind::Branch => cmd.kind = CommandKind::Branch(Some(target)),
                BranchKind::OnSubst => cmd.kind = CommandKind::BranchOnSubst(Some(target)),
                BranchKind::OnNoSubst => cmd.kind = CommandKind::BranchOnNoSubst(Some(target)),
            }
        }
        Ok(())
    }

    fn fixup_next(&mut self) {
        let len = self.commands.len();
        for i in 0..len {
            let next = if i + 1 < len { Next::Cmd(CmdId((i + 1) as u32)) } else { Next::Over };
            self.commands.get_mut(CmdId(i as u32)).next = next;
        }
    }
}

fn tokenize_replacement(repl: &str) -> Vec<ReplPart> {
    let chars: Vec<char> = repl.chars().collect();
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '&' {
            if !literal.is_empty() {
                parts.push(ReplPart::Literal(std::mem::take(&mut literal)));
            }
            parts.push(ReplPart::Whole);
            i += 1;
        } else if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            match next {
                '0' => {
                    if !literal.is_empty() {
                        parts.push(ReplPart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(ReplPart::Whole);
                    i += 2;
                }
                '1'..='9' => {
                    if !literal.is_empty() {
                        parts.push(ReplPart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(ReplPart::Group(next.to_digit(10).unwrap() as u8));
                    i += 2;
                }
                '&' => {
                    literal.push('&');
                    i += 2;
                }
                '\\' => {
                    literal.push('\\');
                    i += 2;
                }
                'n' => {
                    literal.push('\n');
                    i += 2;
                }
                't' => {
                    literal.push('\t');
                    i += 2;
                }
                'r' => {
                    literal.push('\r');
                    i += 2;
                }
                other => {
                    literal.push(other);
                    i += 2;
                }
            }
        } else {
            literal.push(c);
            i += 1;
        }
    }

    if !literal.is_empty() {
        parts.push(ReplPart::Literal(literal));
    }
    parts
}

pub fn compile(scripts: &[&str], traits: &SedTraits, source_name: &str) -> Result<Program, CompileError> {
    if scripts.is_empty() || scripts.iter().all(|s| s.trim().is_empty()) {
        return Err(CompileError::new(CompileErrorKind::ScriptMissing, source_name, None));
    }

    let combined = join_scripts(scripts);
    let (body, silent_from_comment, ere_from_comment) = strip_leading_directives(&combined);

    let mut effective = traits.clone();
    effective.quiet |= silent_from_comment;
    effective.extended_regex |= ere_from_comment;

    let tokens = tokenize(&body);
    let mut compiler = Compiler::new(tokens, effective.clone(), source_name.to_string());
    compiler.run()?;
    compiler.resolve_branches()?;
    compiler.fixup_next();

    Ok(Program { commands: compiler.commands, traits: effective, sinks: compiler.sinks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sed::ast::CommandKind;

    fn compile_ok(script: &str) -> Program {
        compile(&[script], &SedTraits::default(), "-e").expect("compiles")
    }

    #[test]
    fn compiles_simple_substitute() {
        let prog = compile_ok("s/foo/bar/");
        assert_eq!(prog.commands.len(), 1);
        assert!(matches!(prog.commands.get(CmdId(0)).kind, CommandKind::Substitute(_)));
    }

    #[test]
    fn compiles_address_range_delete() {
        let prog = compile_ok("1,3d");
        let cmd = prog.commands.get(CmdId(0));
        assert!(matches!(cmd.kind, CommandKind::Delete));
        let addr = cmd.addr.as_ref().unwrap();
        assert!(matches!(addr.start, Some(Address::Line(1))));
        assert!(matches!(addr.end, Some(Address::Line(3))));
    }

    #[test]
    fn negation_without_address_always_excludes() {
        let prog = compile_ok("!d");
        let addr = prog.commands.get(CmdId(0)).addr.as_ref().unwrap();
        assert!(addr.negated);
        assert!(addr.start.is_none());
    }

    #[test]
    fn group_emits_block_guard_with_correct_target() {
        let prog = compile_ok("/x/{ p; d }");
        assert_eq!(prog.commands.len(), 3);
        match prog.commands.get(CmdId(0)).kind {
            CommandKind::BlockGuard(target) => assert_eq!(target, CmdId(3)),
            _ => panic!("expected BlockGuard"),
        }
    }

    #[test]
    fn forward_branch_resolves_after_full_parse() {
        let prog = compile_ok("b end\np\n:end");
        match prog.commands.get(CmdId(0)).kind {
            CommandKind::Branch(Some(target)) => {
                assert!(matches!(prog.commands.get(target).kind, CommandKind::Label));
            }
            _ => panic!("expected resolved branch"),
        }
    }

    #[test]
    fn undefined_label_is_rejected() {
        let err = compile(&["b nope"], &SedTraits::default(), "-e");
        assert!(matches!(err, Err(e) if matches!(e.kind, CompileErrorKind::LabelNotFound(_))));
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let err = compile(&[":x\n:x"], &SedTraits::default(), "-e");
        assert!(err.is_err());
    }

    #[test]
    fn translit_length_mismatch_is_rejected() {
        let err = compile(&["y/abc/xy/"], &SedTraits::default(), "-e");
        assert!(matches!(err, Err(e) if matches!(e.kind, CompileErrorKind::TranslitLengthMismatch)));
    }

    #[test]
    fn zero_start_address_requires_regex_end() {
        assert!(compile(&["0,3d"], &SedTraits::default(), "-e").is_err());
        assert!(compile(&["0,/x/d"], &SedTraits::default(), "-e").is_ok());
    }

    #[test]
    fn leading_silent_comment_sets_quiet_trait() {
        let prog = compile_ok("#n\np");
        assert!(prog.traits.quiet);
    }

    #[test]
    fn write_flag_registers_a_deduplicated_sink() {
        let prog = compile_ok("s/a/b/w out.txt\ns/c/d/w out.txt");
        assert_eq!(prog.sinks.len(), 1);
    }

    #[test]
    fn cut_subcommand_compiles() {
        let prog = compile_ok("C/f1,f2,d,/");
        assert!(matches!(prog.commands.get(CmdId(0)).kind, CommandKind::Cut(_)));
    }

    #[test]
    fn last_command_falls_through_to_over() {
        let prog = compile_ok("p\np");
        assert_eq!(prog.commands.get(CmdId(0)).next, Next::Cmd(CmdId(1)));
        assert_eq!(prog.commands.get(CmdId(1)).next, Next::Over);
    }

    fn strict_traits() -> SedTraits {
        SedTraits { strict: true, ..SedTraits::default() }
    }

    #[test]
    fn strict_rejects_range_address_on_quit() {
        let err = compile(&["1,3q"], &strict_traits(), "-e");
        assert!(matches!(err, Err(e) if matches!(e.kind, CompileErrorKind::InvalidSecondAddress)));
        assert!(compile(&["1,3q"], &SedTraits::default(), "-e").is_ok());
    }

    #[test]
    fn strict_rejects_range_address_on_append_and_linenumber() {
        assert!(compile(&["1,3a\\\ntext"], &strict_traits(), "-e").is_err());
        assert!(compile(&["1,3="], &strict_traits(), "-e").is_err());
        assert!(compile(&["1,3c\\\ntext"], &strict_traits(), "-e").is_ok());
    }

    #[test]
    fn strict_rejects_empty_label_where_non_strict_drops_it() {
        let err = compile(&[":\np"], &strict_traits(), "-e");
        assert!(matches!(err, Err(e) if matches!(e.kind, CompileErrorKind::EmptyLabel)));

        let prog = compile(&[":\np"], &SedTraits::default(), "-e").expect("compiles");
        assert_eq!(prog.commands.len(), 1);
        assert!(matches!(prog.commands.get(CmdId(0)).kind, CommandKind::Print));
    }
}

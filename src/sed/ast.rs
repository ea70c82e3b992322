//! Command and address types produced by the compiler and consumed by the
//! execution engine.

use crate::regexeng::RegexSlot;
use crate::sed::cmdlist::CmdId;

/// A single address: either a line-based test or a pattern-based test.
/// `Line(0)` is only meaningful as a range start (`0,/re/`), matched by
/// nothing on its own once past the first cycle.
#[derive(Debug, Clone)]
pub enum Address {
    Line(u64),
    LastLine,
    Regex(RegexSlot),
    Step { first: u64, step: u64 },
    RelLine(u64),
    RelLineMultiple(u64),
}

#[derive(Debug, Clone)]
pub struct AddressRange {
    pub start: Option<Address>,
    pub end: Option<Address>,
    pub negated: bool,
}

impl AddressRange {
    pub fn none() -> Self {
        Self { start: None, end: None, negated: false }
    }
}

/// A sink that has been registered with the program's output table; shared
/// by every command that names the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(pub u32);

/// One piece of a tokenized replacement template, built once at compile
/// time instead of being re-scanned for every match.
#[derive(Debug, Clone)]
pub enum ReplPart {
    Literal(String),
    Whole,
    Group(u8),
}

#[derive(Debug, Clone)]
pub struct SubstSpec {
    pub pattern: RegexSlot,
    pub replacement: Vec<ReplPart>,
    pub global: bool,
    pub occurrence: Option<u32>,
    pub print_on_match: bool,
    pub write_sink: Option<SinkId>,
    pub eval: bool,
}

#[derive(Debug, Clone)]
pub struct TranslitSpec {
    pub from: Vec<char>,
    pub to: Vec<char>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelKind {
    Char,
    Field,
}

#[derive(Debug, Clone, Copy)]
pub struct Selector {
    pub kind: SelKind,
    pub start: Option<u32>,
    pub end: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CutSpec {
    pub selectors: Vec<Selector>,
    pub din: char,
    pub dout: char,
    pub fold: bool,
    pub whitespace: bool,
    pub drop_undelimited: bool,
}

#[derive(Debug, Clone)]
pub enum CommandKind {
    Substitute(SubstSpec),
    Print,
    PrintFirstLine,
    Delete,
    DeleteFirstLine,
    Append(String),
    Insert(String),
    Change(String),
    Hold,
    HoldAppend,
    Get,
    GetAppend,
    Exchange,
    NextLine,
    NextAppend,
    Quit(i32),
    QuitQuiet(i32),
    Transliterate(TranslitSpec),
    LineNumber,
    Branch(Option<CmdId>),
    BranchOnSubst(Option<CmdId>),
    BranchOnNoSubst(Option<CmdId>),
    Label,
    Zap,
    List(Option<u32>),
    PrintFilename,
    Version,
    ReadFile(String),
    ReadFileLine(String),
    WriteFile(SinkId),
    WriteFirstLine(SinkId),
    Cut(CutSpec),
    Execute,
    /// Synthetic: evaluates this command's address and, if it does not
    /// match, jumps straight to the target (the command after a `{ }`
    /// block) instead of falling through into the block's body.
    BlockGuard(CmdId),
}

#[derive(Debug, Clone)]
pub struct Command {
    pub addr: Option<AddressRange>,
    pub kind: CommandKind,
    pub next: crate::sed::cmdlist::Next,
    pub loc: Option<crate::error::SourceLoc>,
}

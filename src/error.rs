//! Structured error types for compilation, execution, and stream I/O.
//!
//! Mirrors the location-carrying `thiserror` pattern used elsewhere in this
//! codebase for parse errors and filesystem errors: a flat enum of kinds,
//! each formatting its own message, wrapped in a struct that adds shared
//! context (source name, line/column).

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
}

impl SourceLoc {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot compile {source_name} - {kind}{}", loc_suffix(.loc))]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub source_name: String,
    pub loc: Option<SourceLoc>,
}

fn loc_suffix(loc: &Option<SourceLoc>) -> String {
    match loc {
        Some(l) => format!(" at line {} column {}", l.line, l.column),
        None => String::new(),
    }
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, source_name: impl Into<String>, loc: Option<SourceLoc>) -> Self {
        Self { kind, source_name: source_name.into(), loc }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileErrorKind {
    #[error("script is empty")]
    ScriptMissing,
    #[error("a command is expected")]
    CommandMissing,
    #[error("unknown command '{0}'")]
    UnknownCommand(char),
    #[error("address is not allowed for this command")]
    InvalidAddressForCommand,
    #[error("second address is invalid for this command")]
    InvalidSecondAddress,
    #[error("label name is empty")]
    EmptyLabel,
    #[error("label '{0}' is defined more than once")]
    DuplicateLabel(String),
    #[error("label '{0}' is not defined")]
    LabelNotFound(String),
    #[error("a group is not closed")]
    UnbalancedGroup,
    #[error("groups are nested too deeply")]
    GroupNestingTooDeep,
    #[error("a regular expression is not terminated")]
    RegexIncomplete,
    #[error("a backslash cannot be used as a delimiter")]
    BackslashAsDelimiter,
    #[error("regular expression is invalid - {0}")]
    RegexInvalid(String),
    #[error("the I modifier cannot be used on an empty regular expression")]
    CaseInsensitiveOnEmptyRegex,
    #[error("strings for transliteration differ in length")]
    TranslitLengthMismatch,
    #[error("occurrence number is zero")]
    ZeroOccurrence,
    #[error("occurrence number is too large")]
    OccurrenceTooLarge,
    #[error("a file name is empty")]
    FileNameEmpty,
    #[error("a file name contains a null character")]
    FileNameHasNul,
    #[error("a semicolon or a newline is expected")]
    ExpectedSemicolonOrEnd,
    #[error("a backslash is expected")]
    BackslashExpected,
    #[error("invalid cut selector '{0}'")]
    InvalidCutSelector(String),
    #[error("address 0 is only allowed with a regex second address")]
    ZeroAddressMisuse,
    #[error("{0}")]
    TokenizeError(String),
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("cannot execute - {kind}{}", loc_suffix(.loc))]
pub struct ExecError {
    pub kind: ExecErrorKind,
    pub loc: Option<SourceLoc>,
}

impl ExecError {
    pub fn new(kind: ExecErrorKind, loc: Option<SourceLoc>) -> Self {
        Self { kind, loc }
    }
}

impl From<StreamError> for ExecError {
    fn from(e: StreamError) -> Self {
        ExecError { kind: ExecErrorKind::Stream(e), loc: None }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ExecErrorKind {
    #[error("no previous regular expression")]
    NoPreviousRegex,
    #[error("command '{0}' is not supported")]
    UnsupportedCommand(char),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("internal invariant violated: {0}")]
    InternalInvariant(&'static str),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StreamError {
    #[error("cannot open '{path}' - {message}")]
    OpenFailed { path: String, message: String },
    #[error("cannot read from '{path}' - {message}")]
    ReadFailed { path: String, message: String },
    #[error("cannot write to '{path}' - {message}")]
    WriteFailed { path: String, message: String },
    #[error("cannot close '{path}' - {message}")]
    CloseFailed { path: String, message: String },
    #[error("cannot rename '{from}' to '{to}' - {message}")]
    RenameFailed { from: PathBuf, to: PathBuf, message: String },
}

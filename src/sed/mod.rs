//! The sed-style stream editor: compiler, execution engine, and the cut
//! sub-language it embeds.

pub mod ast;
pub mod cmdlist;
pub mod cut;
pub mod exec;
pub mod lexer;
pub mod orchestrator;
pub mod parser;

use crate::sed::cmdlist::CommandList;
use std::path::PathBuf;

/// Behavioral switches that affect compilation and execution. Plain bools
/// rather than a bitflags type, since there are few of them and each reads
/// fine on its own at a call site.
#[derive(Debug, Clone, Default)]
pub struct SedTraits {
    /// `-n`: suppress automatic printing of the pattern space.
    pub quiet: bool,
    /// `-E`/`-r`: addresses and `s` patterns are ERE, not BRE.
    pub extended_regex: bool,
    /// GNU-style escape extensions in replacement/text bodies (`\n`, `\t`
    /// outside of `y///`) are accepted rather than rejected.
    pub nonstandard_regex_extensions: bool,
    /// POSIXLY_CORRECT-style strictness: reject GNU-only syntax instead of
    /// silently accepting it.
    pub strict: bool,
    /// `-s`: treat each input file as a separate stream (resets `$` and
    /// the line counter at each file boundary).
    pub separate: bool,
    /// Every `s///` implicitly behaves as though `p` were given when set
    /// (used by the `-n`-free "show only changed lines" idiom some
    /// callers want); currently unused by the CLI but kept for embedders.
    pub same_line: bool,
    /// Ensures the last line of output ends with a newline even if the
    /// final input line didn't.
    pub ensure_newline: bool,
    /// Preserves a trailing backslash on text-command bodies instead of
    /// treating it purely as a line-continuation marker.
    pub keep_trailing_backslash: bool,
}

/// A compiled script, ready to run against one or more inputs via
/// [`orchestrator::SedEditor`]. Immutable once built so the same program
/// can be executed repeatedly.
pub struct Program {
    pub commands: CommandList,
    pub traits: SedTraits,
    pub sinks: Vec<PathBuf>,
}

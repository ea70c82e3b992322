//! Command-line flag surface for the `sed` binary, grounded on the
//! teacher's `main.rs` `clap::Parser`-derived `Cli` shape and on
//! `commands/sed/mod.rs`'s hand-rolled flag walk for which sed-specific
//! switches exist.

use clap::Parser;
use sedcore::SedTraits;

#[derive(Parser, Debug)]
#[command(name = "sed")]
#[command(about = "A sed-style stream editor")]
#[command(version)]
pub struct Cli {
    /// Suppress automatic printing of the pattern space.
    #[arg(short = 'n')]
    pub quiet: bool,

    /// Add a script fragment (may be repeated).
    #[arg(short = 'e', value_name = "SCRIPT")]
    pub scripts: Vec<String>,

    /// Add a script file (may be repeated).
    #[arg(short = 'f', value_name = "PATH")]
    pub script_files: Vec<String>,

    /// Write output to a file instead of stdout.
    #[arg(short = 'o', value_name = "PATH")]
    pub output: Option<String>,

    /// Use extended (ERE) regular expressions.
    #[arg(short = 'r')]
    pub extended_regex: bool,

    /// Accept nonstandard GNU-style regex/text escape extensions.
    #[arg(short = 'R')]
    pub nonstandard_regex: bool,

    /// Edit files in place (implies -s).
    #[arg(short = 'i')]
    pub in_place: bool,

    /// Treat each input file as a separate stream: `$` and the line
    /// counter reset at every file boundary.
    #[arg(short = 's')]
    pub separate: bool,

    /// Strict address/label policing: reject GNU-only syntax.
    #[arg(short = 'a')]
    pub strict: bool,

    /// Allow `~`/`+` relative addresses. This engine accepts them
    /// unconditionally; the flag is kept for command-line compatibility.
    #[arg(short = 'b')]
    pub extended_address: bool,

    /// Allow text on the same physical line as its command.
    #[arg(short = 'x')]
    pub same_line: bool,

    /// Ensure the last line of output ends with a newline even if the
    /// final input line didn't.
    #[arg(short = 'y')]
    pub ensure_newline: bool,

    /// Memory limit in bytes. Accepted for compatibility; not enforced.
    #[arg(short = 'm', value_name = "N")]
    pub memory_limit: Option<u64>,

    /// Expand wildcards in file arguments on platforms that don't do it
    /// natively. No-op on unix shells, which already expand globs.
    #[arg(short = 'w')]
    pub expand_wildcards: bool,

    /// Trace READ/WRITE events to stderr.
    #[arg(short = 't')]
    pub trace: bool,

    #[arg(long = "script-encoding", value_name = "NAME")]
    pub script_encoding: Option<String>,

    #[arg(long = "infile-encoding", value_name = "NAME")]
    pub infile_encoding: Option<String>,

    #[arg(long = "outfile-encoding", value_name = "NAME")]
    pub outfile_encoding: Option<String>,

    /// Input files (or the script itself, if neither `-e` nor `-f` was
    /// given, followed by input files); `-` or an empty list means stdin.
    pub args: Vec<String>,
}

impl Cli {
    pub fn traits(&self) -> SedTraits {
        SedTraits {
            quiet: self.quiet,
            extended_regex: self.extended_regex,
            nonstandard_regex_extensions: self.nonstandard_regex,
            strict: self.strict,
            separate: self.separate || self.in_place,
            same_line: self.same_line,
            ensure_newline: self.ensure_newline,
            keep_trailing_backslash: false,
        }
    }

    /// Splits `args` into the script source(s) (already ordered: every
    /// `-f` file's contents, in flag order, followed by every `-e`
    /// fragment in flag order; if neither was given, the first positional
    /// argument is the script) and the remaining input file paths.
    pub fn resolve_scripts(&self) -> Result<(Vec<String>, Vec<String>), std::io::Error> {
        if !self.scripts.is_empty() || !self.script_files.is_empty() {
            let mut fragments = Vec::new();
            for path in &self.script_files {
                fragments.push(std::fs::read_to_string(path)?);
            }
            fragments.extend(self.scripts.iter().cloned());
            Ok((fragments, self.args.clone()))
        } else {
            let mut rest = self.args.clone();
            if rest.is_empty() {
                return Ok((Vec::new(), Vec::new()));
            }
            let script = rest.remove(0);
            Ok((vec![script], rest))
        }
    }
}

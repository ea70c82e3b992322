//! `SedEditor`: the crate's top-level entry point. Wires a compiled
//! [`Program`] to the Stream Layer and drives the per-line cycle loop,
//! mirroring how `commands/sed/mod.rs`'s `SedCommand::execute` sits above
//! `process_content` - argument/source handling lives here, dispatch logic
//! lives in `sed::exec`.

use crate::error::{ExecError, ExecErrorKind, StreamError};
use crate::sed::cmdlist::new_exec_states;
use crate::sed::exec::{self, AppendItem, CycleEnd, ExecContext, LineSource};
use crate::sed::Program;
use crate::stream::{ChainedSource, LineBufferedSink};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

/// Events a caller-supplied [`Tracer`] can observe during `execute`. `Match`
/// and `Exec` are reserved for callers that want finer-grained hooks than
/// this orchestrator currently fires; only `Read`/`Write` are emitted today.
#[derive(Debug, Clone)]
pub enum SedEvent {
    Read { source: String, line: u64 },
    Write { sink: String },
    Match { pattern: String },
    Exec { command: char },
}

pub trait Tracer {
    fn on_event(&self, event: SedEvent);
}

/// Wraps a sink so the newline that would follow the *final* auto-printed
/// line can be withheld until it's known whether anything else gets
/// written - reproducing "no trailing newline if the input's last line
/// lacked one" without preloading the whole input the way the original
/// batch design does.
struct TailGuard<'a> {
    sink: &'a mut LineBufferedSink,
    pending_newline: bool,
}

impl<'a> TailGuard<'a> {
    fn new(sink: &'a mut LineBufferedSink) -> Self {
        Self { sink, pending_newline: false }
    }

    fn sink_mut(&mut self) -> &mut LineBufferedSink {
        if self.pending_newline {
            self.pending_newline = false;
            let _ = self.sink.write_str("\n");
        }
        self.sink
    }

    fn write_line(&mut self, text: &str, suppress_trailing_newline: bool) -> Result<(), StreamError> {
        self.flush_pending()?;
        self.sink.write_str(text)?;
        if suppress_trailing_newline {
            self.pending_newline = true;
        } else {
            self.sink.write_str("\n")?;
        }
        Ok(())
    }

    fn write_raw(&mut self, text: &str) -> Result<(), StreamError> {
        self.flush_pending()?;
        self.sink.write_str(text)
    }

    fn flush_pending(&mut self) -> Result<(), StreamError> {
        if self.pending_newline {
            self.pending_newline = false;
            self.sink.write_str("\n")?;
        }
        Ok(())
    }

    fn finish(self) -> Result<(), StreamError> {
        self.sink.flush()
    }
}

struct ChainCursor<'a> {
    chain: &'a mut ChainedSource,
    had_newline: bool,
}

impl<'a> ChainCursor<'a> {
    fn new(chain: &'a mut ChainedSource) -> Self {
        Self { chain, had_newline: true }
    }

    fn had_newline(&self) -> bool {
        self.had_newline
    }
}

impl<'a> LineSource for ChainCursor<'a> {
    fn next_line(&mut self) -> Option<(String, bool)> {
        let raw = self.chain.read_line()?;
        self.had_newline = raw.ends_with('\n');
        let text = raw.strip_suffix('\n').unwrap_or(&raw).to_string();
        let is_last = self.chain.peek().is_none();
        Some((text, is_last))
    }

    fn current_name(&self) -> &str {
        self.chain.current_name()
    }
}

/// `SedEditor::compile`/`execute`/`halt`, per §4.6. A single instance can
/// `execute` the same compiled program against several inputs in turn.
pub struct SedEditor {
    program: Option<Program>,
    tracer: Option<Box<dyn Tracer>>,
    halted: Cell<bool>,
}

impl Default for SedEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl SedEditor {
    pub fn new() -> Self {
        Self { program: None, tracer: None, halted: Cell::new(false) }
    }

    pub fn set_tracer(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = Some(tracer);
    }

    /// Cooperative cancellation: checked between cycles, never mid-dispatch.
    pub fn halt(&self) {
        self.halted.set(true);
    }

    /// Compiles `scripts` (already split into their `-e`/`-f` fragments) and
    /// stores the result, replacing any previously compiled program.
    /// Returns the number of script fragments consumed.
    pub fn compile(
        &mut self,
        scripts: &[&str],
        traits: &crate::sed::SedTraits,
        source_name: &str,
    ) -> Result<usize, crate::error::CompileError> {
        let program = crate::sed::parser::compile(scripts, traits, source_name)?;
        self.program = Some(program);
        self.halted.set(false);
        Ok(scripts.len())
    }

    pub fn program(&self) -> Result<&Program, ExecError> {
        self.program
            .as_ref()
            .ok_or_else(|| ExecError::new(ExecErrorKind::InternalInvariant("compile() must run before execute()"), None))
    }

    /// Fresh per-run state: hold space empty, no pending substitution flag,
    /// quiet mode copied from the compiled program's traits. Callers reuse
    /// one `ExecContext` across several `run()` calls (e.g. `-s` mode) when
    /// hold space and `t`/`T` state should survive file boundaries.
    pub fn new_context(&self) -> Result<ExecContext<'_>, ExecError> {
        let program = self.program()?;
        Ok(ExecContext::new(program.traits.quiet))
    }

    fn open_sinks(&self, program: &Program) -> Result<Vec<LineBufferedSink>, ExecError> {
        program.sinks.iter().map(|p| LineBufferedSink::for_file(p).map_err(ExecError::from)).collect()
    }

    /// Runs the compiled program over one logical input stream (several
    /// `CharSource` elements already chained into `chain`), writing to
    /// `out`. Line numbering and `$` start fresh each call; `ctx` carries
    /// whatever state the caller wants to persist across calls.
    pub fn run<'a>(
        &'a self,
        chain: &mut ChainedSource,
        out: &mut LineBufferedSink,
        ctx: &mut ExecContext<'a>,
    ) -> Result<i32, ExecError> {
        let program = self.program()?;
        let mut states = new_exec_states(&program.commands);
        let mut sinks = self.open_sinks(program)?;
        let mut read_cursors: HashMap<PathBuf, VecDeque<String>> = HashMap::new();
        let mut line_number: u64 = 0;
        let mut guard = TailGuard::new(out);
        let mut cursor = ChainCursor::new(chain);

        let exit_code = loop {
            let Some((mut ps, mut is_last)) = cursor.next_line() else {
                break 0;
            };
            line_number += 1;
            if let Some(t) = &self.tracer {
                t.on_event(SedEvent::Read { source: cursor.current_name().to_string(), line: line_number });
            }

            let cycle_result = loop {
                let end = exec::run_cycle(
                    &program.commands,
                    &mut states,
                    ctx,
                    &mut ps,
                    &mut line_number,
                    &mut is_last,
                    guard.sink_mut(),
                    &mut sinks,
                    &mut cursor,
                )?;

                let suppress = is_last && !cursor.had_newline() && !program.traits.ensure_newline;

                match end {
                    CycleEnd::Normal => {
                        if !ctx.quiet {
                            guard.write_line(&ps, suppress).map_err(ExecError::from)?;
                        }
                        break None;
                    }
                    CycleEnd::Deleted => break None,
                    CycleEnd::Changed(text) => {
                        guard.write_line(&text, suppress).map_err(ExecError::from)?;
                        break None;
                    }
                    CycleEnd::Restart => continue,
                    CycleEnd::Quit(code) => {
                        if !ctx.quiet {
                            guard.write_line(&ps, suppress).map_err(ExecError::from)?;
                        }
                        break Some(code);
                    }
                    CycleEnd::QuitQuiet(code) => break Some(code),
                }
            };

            self.drain_appends(ctx, &mut guard, &mut read_cursors)?;
            ctx.substitution_made = false;

            if let Some(code) = cycle_result {
                break code;
            }
            if self.halted.get() {
                break 0;
            }
        };

        guard.finish().map_err(ExecError::from)?;
        for sink in &mut sinks {
            sink.close().map_err(ExecError::from)?;
        }
        Ok(exit_code)
    }

    /// Convenience wrapper for the common one-shot case: chain every
    /// element into a single stream (no per-file `$`/line-number reset)
    /// and run with a fresh context.
    pub fn execute(
        &self,
        sources: Vec<Box<dyn crate::stream::CharSource>>,
        out: &mut LineBufferedSink,
    ) -> Result<i32, ExecError> {
        let mut chain = ChainedSource::new(sources, false);
        let mut ctx = self.new_context()?;
        self.run(&mut chain, out, &mut ctx)
    }

    fn drain_appends(
        &self,
        ctx: &mut ExecContext,
        guard: &mut TailGuard,
        read_cursors: &mut HashMap<PathBuf, VecDeque<String>>,
    ) -> Result<(), ExecError> {
        for item in ctx.append_queue.drain(..) {
            match item {
                AppendItem::Text(text) => {
                    guard.write_raw(&text).map_err(ExecError::from)?;
                    guard.write_raw("\n").map_err(ExecError::from)?;
                }
                AppendItem::File(path) => {
                    if let Ok(contents) = std::fs::read_to_string(&path) {
                        guard.write_raw(&contents).map_err(ExecError::from)?;
                    }
                }
                AppendItem::FileLine(path) => {
                    let queue = read_cursors.entry(path.clone()).or_insert_with(|| {
                        std::fs::read_to_string(&path)
                            .map(|s| s.lines().map(|l| l.to_string()).collect())
                            .unwrap_or_default()
                    });
                    if let Some(line) = queue.pop_front() {
                        guard.write_raw(&line).map_err(ExecError::from)?;
                        guard.write_raw("\n").map_err(ExecError::from)?;
                    }
                }
            }
            if let Some(t) = &self.tracer {
                t.on_event(SedEvent::Write { sink: "stdout".to_string() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sed::SedTraits;
    use crate::stream::{CharSource, MemCharSource};

    fn make_editor(script: &str) -> SedEditor {
        let mut editor = SedEditor::new();
        editor.compile(&[script], &SedTraits::default(), "-e").unwrap();
        editor
    }

    fn run_text(editor: &SedEditor, text: &str) -> String {
        let sources: Vec<Box<dyn CharSource>> = vec![Box::new(MemCharSource::new("-", text))];
        let mut out = LineBufferedSink::for_memory("out");
        editor.execute(sources, &mut out).unwrap();
        out.contents()
    }

    #[test]
    fn auto_prints_every_line_with_no_script_effect() {
        let editor = make_editor("");
        assert_eq!(run_text(&editor, "a\nb\nc\n"), "a\nb\nc\n");
    }

    #[test]
    fn substitute_across_multiple_lines() {
        let editor = make_editor("s/a/X/");
        assert_eq!(run_text(&editor, "a\naa\nb\n"), "X\nXa\nb\n");
    }

    #[test]
    fn missing_trailing_newline_is_preserved() {
        let editor = make_editor("");
        assert_eq!(run_text(&editor, "a\nb"), "a\nb");
    }

    #[test]
    fn append_runs_after_auto_print_on_final_line_without_newline() {
        let editor = make_editor("a\\\nfooter");
        assert_eq!(run_text(&editor, "x"), "x\nfooter\n");
    }

    #[test]
    fn quiet_mode_suppresses_auto_print() {
        let editor = make_editor_with_traits("p", SedTraits { quiet: true, ..Default::default() });
        assert_eq!(run_text(&editor, "a\nb\n"), "a\nb\n");
    }

    fn make_editor_with_traits(script: &str, traits: SedTraits) -> SedEditor {
        let mut editor = SedEditor::new();
        editor.compile(&[script], &traits, "-e").unwrap();
        editor
    }

    #[test]
    fn delete_removes_line_from_output() {
        let editor = make_editor("2d");
        assert_eq!(run_text(&editor, "a\nb\nc\n"), "a\nc\n");
    }

    #[test]
    fn hold_space_persists_across_run_calls_with_shared_context() {
        let mut editor = SedEditor::new();
        editor.compile(&["H"], &SedTraits::default(), "-e").unwrap();
        let mut ctx = editor.new_context().unwrap();
        let mut out = LineBufferedSink::for_memory("out");

        let mut chain1 = ChainedSource::new(vec![Box::new(MemCharSource::new("a", "one\n"))], false);
        editor.run(&mut chain1, &mut out, &mut ctx).unwrap();
        assert_eq!(ctx.hold_space, "\n\none");

        let mut chain2 = ChainedSource::new(vec![Box::new(MemCharSource::new("b", "two\n"))], false);
        editor.run(&mut chain2, &mut out, &mut ctx).unwrap();
        assert_eq!(ctx.hold_space, "\n\none\ntwo");
    }
}

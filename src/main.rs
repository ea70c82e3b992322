mod cli;

use clap::Parser;
use cli::Cli;
use sedcore::sed::orchestrator::{SedEvent, Tracer};
use sedcore::stream::{stdin_source, write_in_place, ChainedSource, CharSource, FileCharSource, LineBufferedSink};
use sedcore::SedEditor;
use std::path::Path;
use std::process::ExitCode;

struct StderrTracer;

impl Tracer for StderrTracer {
    fn on_event(&self, event: SedEvent) {
        match event {
            SedEvent::Read { source, line } => eprintln!("sed: READ {source}:{line}"),
            SedEvent::Write { sink } => eprintln!("sed: WRITE {sink}"),
            SedEvent::Match { pattern } => eprintln!("sed: MATCH {pattern}"),
            SedEvent::Exec { command } => eprintln!("sed: EXEC {command}"),
        }
    }
}

fn open_input(path: &str) -> Result<Box<dyn CharSource>, String> {
    if path == "-" {
        stdin_source().map(|s| Box::new(s) as Box<dyn CharSource>).map_err(|e| e.to_string())
    } else {
        FileCharSource::open(Path::new(path)).map(|s| Box::new(s) as Box<dyn CharSource>).map_err(|e| e.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (scripts, inputs) = match cli.resolve_scripts() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("sed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if scripts.is_empty() {
        eprintln!("sed: no script specified");
        return ExitCode::FAILURE;
    }

    let script_refs: Vec<&str> = scripts.iter().map(String::as_str).collect();
    let traits = cli.traits();

    let mut editor = SedEditor::new();
    if cli.trace {
        editor.set_tracer(Box::new(StderrTracer));
    }
    if let Err(e) = editor.compile(&script_refs, &traits, "-e") {
        eprintln!("sed: {e}");
        return ExitCode::FAILURE;
    }

    let inputs = if inputs.is_empty() { vec!["-".to_string()] } else { inputs };

    if cli.in_place {
        for path in &inputs {
            if path == "-" {
                eprintln!("sed: -i cannot be used when reading from standard input");
                return ExitCode::FAILURE;
            }
            let source = match open_input(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("sed: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let mut out = LineBufferedSink::for_memory(path.clone());
            let mut chain = ChainedSource::new(vec![source], false);
            let mut ctx = match editor.new_context() {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("sed: {e}");
                    return ExitCode::FAILURE;
                }
            };
            match editor.run(&mut chain, &mut out, &mut ctx) {
                Ok(code) if code != 0 => return ExitCode::from(code as u8),
                Ok(_) => {}
                Err(e) => {
                    eprintln!("sed: {e}");
                    return ExitCode::FAILURE;
                }
            }
            if let Err(e) = write_in_place(Path::new(path), &out.contents()) {
                eprintln!("sed: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    let mut out = match &cli.output {
        Some(path) => match LineBufferedSink::for_file(Path::new(path)) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("sed: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => LineBufferedSink::for_stdout(),
    };

    let exit_code = if cli.separate {
        let mut ctx = match editor.new_context() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("sed: {e}");
                return ExitCode::FAILURE;
            }
        };
        let mut code = 0i32;
        'files: for path in &inputs {
            let source = match open_input(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("sed: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let mut chain = ChainedSource::new(vec![source], false);
            match editor.run(&mut chain, &mut out, &mut ctx) {
                Ok(c) => {
                    code = c;
                    if c != 0 {
                        break 'files;
                    }
                }
                Err(e) => {
                    eprintln!("sed: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
        code
    } else {
        let sources: Result<Vec<Box<dyn CharSource>>, String> = inputs.iter().map(|p| open_input(p)).collect();
        let sources = match sources {
            Ok(s) => s,
            Err(e) => {
                eprintln!("sed: {e}");
                return ExitCode::FAILURE;
            }
        };
        match editor.execute(sources, &mut out) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("sed: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    if exit_code != 0 {
        ExitCode::from(exit_code as u8)
    } else {
        ExitCode::SUCCESS
    }
}

//! End-to-end scenarios exercised against the public `SedEditor` API,
//! grounded on `commands/sed/mod.rs`'s own `test_*` functions that drive
//! `SedCommand::execute` rather than only the inner dispatcher.

use sedcore::stream::{CharSource, LineBufferedSink, MemCharSource};
use sedcore::{SedEditor, SedTraits};

fn run(script: &str, input: &str) -> String {
    run_with_traits(script, input, SedTraits::default())
}

fn run_with_traits(script: &str, input: &str, traits: SedTraits) -> String {
    let mut editor = SedEditor::new();
    editor.compile(&[script], &traits, "-e").expect("script compiles");
    let sources: Vec<Box<dyn CharSource>> = vec![Box::new(MemCharSource::new("-", input))];
    let mut out = LineBufferedSink::for_memory("out");
    editor.execute(sources, &mut out).expect("execution succeeds");
    out.contents()
}

#[test]
fn scenario_basic_substitute() {
    assert_eq!(run("s/foo/bar/g", "foo foo foobar\n"), "bar bar barbar\n");
}

#[test]
fn scenario_empty_regex_reuse() {
    assert_eq!(run("/abc/{s//XYZ/;s///g}", "abcabc\n"), "XYZ\n");
}

#[test]
fn scenario_hold_swap_prints_saved_line_between_exchanges() {
    // 1h saves "one" to hold; on line 2, x;p;x swaps in the saved line,
    // prints it explicitly, then swaps back so auto-print emits "two".
    // Line 1's own auto-print still fires (nothing suppresses it), so
    // "one" appears twice: once as line 1's auto-print, once as line 2's
    // explicit `p`.
    assert_eq!(run("1h;2{x;p;x}", "one\ntwo\n"), "one\none\ntwo\n");
}

#[test]
fn scenario_address_range_silent_exit() {
    assert_eq!(run("1,3d", "a\nb\nc\nd\ne\n"), "d\ne\n");
}

#[test]
fn scenario_negated_group_prints_non_comment_lines_once() {
    // p;d prints explicitly then suppresses auto-print, so each
    // non-comment line appears exactly once despite the explicit `p`.
    assert_eq!(run("/^#/!{p;d}", "#a\nb\nc\n"), "#a\nb\nc\n");
}

#[test]
fn scenario_transliteration() {
    assert_eq!(run("y/abc/xyz/", "cabbage\n"), "zxyyxge\n");
}

#[test]
fn p1_zero_length_global_match_terminates_and_interleaves() {
    assert_eq!(run("s/x*/-/g", "abc\n"), "-a-b-c-\n");
}

#[test]
fn p2_unbalanced_group_fails_to_compile() {
    let mut editor = SedEditor::new();
    let err = editor.compile(&["/x/{ p"], &SedTraits::default(), "-e").unwrap_err();
    assert!(matches!(err.kind, sedcore::CompileErrorKind::UnbalancedGroup));
}

#[test]
fn p3_undefined_branch_target_fails_to_compile() {
    let mut editor = SedEditor::new();
    let err = editor.compile(&["b nowhere"], &SedTraits::default(), "-e").unwrap_err();
    assert!(matches!(err.kind, sedcore::CompileErrorKind::LabelNotFound(_)));
}

#[test]
fn p4_output_ordering_within_a_cycle() {
    let script = "i\\\nbefore\np\na\\\nafter";
    assert_eq!(run(script, "line\n"), "before\nline\nline\nafter\n");
}

#[test]
fn p5_hold_then_get_is_idempotent() {
    assert_eq!(run("h;g", "hello\n"), "hello\n");
}

#[test]
fn p6_transliteration_round_trips() {
    assert_eq!(run("y/AB/BA/;y/AB/BA/", "AB\n"), "AB\n");
}

#[test]
fn p7_quit_emits_pending_output_quit_quiet_does_not() {
    assert_eq!(run("2q", "a\nb\nc\n"), "a\nb\n");
    assert_eq!(run("2Q", "a\nb\nc\n"), "a\n");
}

#[test]
fn quiet_trait_suppresses_auto_print_but_not_explicit_print() {
    let traits = SedTraits { quiet: true, ..Default::default() };
    assert_eq!(run_with_traits("p", "a\nb\n", traits), "a\nb\n");
}

#[test]
fn extended_regex_trait_enables_alternation() {
    let traits = SedTraits { extended_regex: true, ..Default::default() };
    assert_eq!(run_with_traits("s/a|b/X/g", "abc\n", traits), "XXc\n");
}

#[test]
fn basic_regex_treats_unescaped_alternation_as_literal() {
    assert_eq!(run("s/a|b/X/g", "a|bc\n"), "Xc\n");
}

#[test]
fn multi_file_input_is_chained_by_default() {
    let mut editor = SedEditor::new();
    editor.compile(&["s/$/!/"], &SedTraits::default(), "-e").unwrap();
    let sources: Vec<Box<dyn CharSource>> = vec![
        Box::new(MemCharSource::new("a", "one\n")),
        Box::new(MemCharSource::new("b", "two\n")),
    ];
    let mut out = LineBufferedSink::for_memory("out");
    editor.execute(sources, &mut out).unwrap();
    assert_eq!(out.contents(), "one!\ntwo!\n");
}

#[test]
fn separate_files_reset_last_line_address_per_file() {
    let mut editor = SedEditor::new();
    editor.compile(&["$d"], &SedTraits { separate: true, ..Default::default() }, "-e").unwrap();
    let mut ctx = editor.new_context().unwrap();
    let mut out = LineBufferedSink::for_memory("out");

    let mut chain_a = sedcore::stream::ChainedSource::new(
        vec![Box::new(MemCharSource::new("a", "1\n2\n")) as Box<dyn CharSource>],
        false,
    );
    editor.run(&mut chain_a, &mut out, &mut ctx).unwrap();

    let mut chain_b = sedcore::stream::ChainedSource::new(
        vec![Box::new(MemCharSource::new("b", "3\n4\n")) as Box<dyn CharSource>],
        false,
    );
    editor.run(&mut chain_b, &mut out, &mut ctx).unwrap();

    // `$` (last line) fires once per file under -s, deleting "2" and "4".
    assert_eq!(out.contents(), "1\n3\n");
}

#[test]
fn missing_trailing_newline_is_not_fabricated() {
    assert_eq!(run("", "a\nb"), "a\nb");
}

#[test]
fn cut_selects_fields_with_custom_delimiter() {
    assert_eq!(run("C/f2,f3,d,,D,/", "a,b,c\n"), "b,c\n");
}

use super::{count, run, run_with};
use crate::util::diagnostic::{ErrorLevel, WarningCode};

#[test]
fn test_object_macro() {
    let (text, sink) = run("#define X 1 + 2\nvar/a = X\n");
    assert_eq!(text, "var/a = 1 + 2\n");
    assert!(sink.is_empty());
}

#[test]
fn test_function_macro() {
    let (text, _) = run("#define ADD(a, b) a + b\nADD(1, 2)\n");
    assert_eq!(text, "1 + 2\n");
}

#[test]
fn test_function_macro_without_call_is_plain_identifier() {
    let (text, _) = run("#define F(x) x\nF\n");
    assert_eq!(text, "F\n");
}

#[test]
fn test_self_referencing_macro_expands_once() {
    let (text, _) = run("#define X X+1\nX\n");
    assert_eq!(text, "X+1\n");
}

#[test]
fn test_blank_lines_are_dropped() {
    let (text, _) = run("a\n\n   \nb\n");
    assert_eq!(text, "a\nb\n");
}

#[test]
fn test_line_macro() {
    let (text, _) = run("a\n__LINE__\n");
    assert_eq!(text, "a\n2\n");
}

#[test]
fn test_if_elif_else() {
    let (text, sink) = run("#if 0\na\n#elif 1\nb\n#else\nc\n#endif\n");
    assert_eq!(text, "b\n");
    assert!(sink.is_empty());

    let (text, _) = run("#if 1 + 1 == 3\na\n#else\nc\n#endif\n");
    assert_eq!(text, "c\n");
}

#[test]
fn test_nested_conditionals_are_skipped_whole() {
    let (text, _) = run("#if 0\n#if 1\na\n#else\nb\n#endif\n#else\nc\n#endif\n");
    assert_eq!(text, "c\n");
}

#[test]
fn test_ifdef_and_ifndef() {
    let (text, _) = run("#define A\n#ifdef A\nx\n#endif\n#ifndef A\ny\n#endif\n");
    assert_eq!(text, "x\n");
}

#[test]
fn test_defined_in_if() {
    let (text, _) = run("#define A\n#if defined(A) && !defined(B)\nok\n#endif\n");
    assert_eq!(text, "ok\n");
}

#[test]
fn test_host_define() {
    let (text, _) = run_with("#if DEBUG\nyes\n#endif\n", &[], |p| p.define("DEBUG", "1"));
    assert_eq!(text, "yes\n");
}

#[test]
fn test_empty_and_invalid_if() {
    let (text, sink) = run("#if\na\n#endif\nb\n");
    assert_eq!(text, "b\n");
    assert_eq!(sink.diagnostics()[0].message, "Expression expected for #if");

    let (text, sink) = run("#if foo bar\na\n#endif\n");
    assert_eq!(text, "");
    assert_eq!(sink.diagnostics()[0].message, "Expression is invalid");
}

#[test]
fn test_missing_endif() {
    let (_, sink) = run("#if 1\nx\n");
    let diagnostics = sink.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message, "Missing 1 #endif directive");
}

#[test]
fn test_unexpected_branches() {
    let (_, sink) = run("#endif\n#else\n");
    assert_eq!(count(&sink, WarningCode::BadDirective), 2);
}

#[test]
fn test_undef() {
    let (text, sink) = run("#define A 1\n#undef A\nA\n#undef B\n");
    assert_eq!(text, "A\n");
    assert_eq!(count(&sink, WarningCode::UndefineMissingDirective), 1);
}

#[test]
fn test_misplaced_directive() {
    let (_, sink) = run("a #define X 1\n");
    assert_eq!(count(&sink, WarningCode::MisplacedDirective), 1);
}

#[test]
fn test_directive_after_semicolon() {
    let (text, sink) = run("a; #define X 1\nX\n");
    assert_eq!(count(&sink, WarningCode::MisplacedDirective), 0);
    assert!(text.ends_with("1\n"));
}

#[test]
fn test_error_and_warn_directives() {
    let (_, sink) = run("#error broken\n#warn careful\n");
    assert_eq!(count(&sink, WarningCode::ErrorDirective), 1);
    assert_eq!(count(&sink, WarningCode::WarningDirective), 1);
    assert!(sink.has_errors());
}

#[test]
fn test_pragma_sets_level() {
    let (_, sink) = run("#pragma EmptyBlock error\n");
    assert!(sink.is_empty());
    assert_eq!(sink.level(WarningCode::EmptyBlock), ErrorLevel::Error);
}

#[test]
fn test_pragma_failures() {
    let (_, sink) = run("#pragma BadToken warning\n#pragma NoSuchCode error\n#pragma EmptyBlock loud\n");
    assert_eq!(count(&sink, WarningCode::BadDirective), 2);
    assert_eq!(count(&sink, WarningCode::InvalidWarningCode), 1);
}

#[test]
fn test_bad_define_does_not_eat_next_line() {
    let (text, sink) = run("#define\nnext\n");
    assert_eq!(text, "next\n");
    assert_eq!(count(&sink, WarningCode::BadDirective), 1);
}

#[test]
fn test_variadic_macro() {
    let (text, _) = run("#define LOG(fmt, args...) log(fmt, args)\nLOG(a, b, c)\n");
    assert_eq!(text, "log(a, b,c)\n");
}

#[test]
fn test_unterminated_macro_call() {
    let (_, sink) = run("#define F(x) x\nF(1\n");
    assert_eq!(count(&sink, WarningCode::BadDirective), 1);
}

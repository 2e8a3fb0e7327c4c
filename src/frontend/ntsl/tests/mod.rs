//! NTSL tests

use super::{parse_script, NtslFile};
use crate::frontend::dm::ast::{AssignOp, BinaryOp, ExpressionKind, ProcStatementKind};
use crate::util::diagnostic::DiagnosticSink;

fn parse(text: &str) -> (NtslFile, DiagnosticSink) {
    let sink = DiagnosticSink::with_defaults();
    let file = parse_script("script.ntsl", text, sink.clone());
    (file, sink)
}

#[test]
fn test_function_records_used_vars() {
    let (file, sink) = parse("def main() {\n\t$x = 1;\n\treturn $x;\n}\n");
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    assert_eq!(file.procs.len(), 1);

    let proc = &file.procs[0];
    assert_eq!(proc.definition.name, "main");
    assert!(proc.definition.object_path.is_root());
    assert!(proc.definition.parameters.is_empty());
    assert_eq!(proc.used_vars.iter().collect::<Vec<_>>(), vec!["x"]);

    let body = &proc.definition.body.as_ref().unwrap().statements;
    assert_eq!(body.len(), 2);
    match &body[0].kind {
        ProcStatementKind::Expression(expr) => {
            assert!(matches!(expr.kind, ExpressionKind::Assign { op: AssignOp::Assign, .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(&body[1].kind, ProcStatementKind::Return(Some(v)) if v.as_identifier() == Some("x")));
}

#[test]
fn test_addition_and_calls() {
    let (file, sink) = parse("def f() { $a = $b + 2 + \"s\"; print($a); }");
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    let proc = &file.procs[0];
    assert_eq!(proc.used_vars.len(), 2);

    let body = &proc.definition.body.as_ref().unwrap().statements;
    match &body[0].kind {
        ProcStatementKind::Expression(expr) => match &expr.kind {
            ExpressionKind::Assign { value, .. } => {
                assert!(matches!(value.kind, ExpressionKind::Binary { op: BinaryOp::Add, .. }));
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        &body[1].kind,
        ProcStatementKind::Expression(e) if matches!(e.kind, ExpressionKind::ProcCall { .. })
    ));
}

#[test]
fn test_vector_and_at() {
    let (file, sink) = parse("def f() { $v = vector(1, 2); at($v, 1, 5); return at($v, 2); }");
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    let body = &file.procs[0].definition.body.as_ref().unwrap().statements;
    assert_eq!(body.len(), 3);
    assert!(matches!(
        &body[1].kind,
        ProcStatementKind::Expression(e) if matches!(e.kind, ExpressionKind::Assign { .. })
    ));
    assert!(matches!(
        &body[2].kind,
        ProcStatementKind::Return(Some(e)) if matches!(e.kind, ExpressionKind::Dereference { .. })
    ));
}

#[test]
fn test_used_vars_are_per_function() {
    let (file, _) = parse("def a() { $x = 1; } def b() { $y = 2; }");
    assert_eq!(file.procs.len(), 2);
    assert!(file.procs[0].used_vars.contains("x"));
    assert!(!file.procs[0].used_vars.contains("y"));
    assert_eq!(file.used_vars().len(), 2);
}

#[test]
fn test_errors() {
    let (_, sink) = parse("def f() { $x = 1 }");
    assert!(sink
        .diagnostics()
        .iter()
        .any(|d| d.message == "Expected ';' to end statement"));

    let (file, sink) = parse("x = 1;");
    assert!(file.procs.is_empty());
    assert_eq!(sink.error_count(), 1);

    let (_, sink) = parse("def f() { at($v); }");
    assert!(sink
        .diagnostics()
        .iter()
        .any(|d| d.message == "at() required 2 or 3 arguments"));
}

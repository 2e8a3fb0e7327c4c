//! Object tree and artifact tests

mod artifact;
mod objtree;

use crate::frontend::dm::parse_snippet;
use crate::middle::objtree::ObjectTree;
use crate::util::diagnostic::DiagnosticSink;

/// Build the object tree of a DM snippet
fn tree_of(source: &str) -> (ObjectTree, DiagnosticSink) {
    let sink = DiagnosticSink::with_defaults();
    let file = parse_snippet("test.dm", source, &sink);
    let mut tree = ObjectTree::new();
    tree.add_file(file, &sink);
    tree.check_overrides(&sink);
    (tree, sink)
}

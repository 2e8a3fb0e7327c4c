use super::tree_of;
use crate::frontend::dm::{Constant, DreamPath};
use crate::frontend::dmm::{MapLayer, MapTypes};
use crate::middle::objtree::INIT_PROC_NAME;
use crate::util::diagnostic::{DiagnosticSink, WarningCode};

fn path(text: &str) -> DreamPath {
    DreamPath::parse(text)
}

fn has_code(
    sink: &DiagnosticSink,
    code: WarningCode,
) -> bool {
    sink.diagnostics().iter().any(|diagnostic| diagnostic.code == code)
}

#[test]
fn test_builtin_parent_chain() {
    let (tree, sink) = tree_of("/obj/item\n");
    assert!(!sink.has_errors());

    let item = tree.type_id(&path("/obj/item")).unwrap();
    let chain: Vec<String> = tree.ancestors(item).map(|ty| ty.path.to_string()).collect();
    assert_eq!(chain, vec!["/obj/item", "/obj", "/atom/movable", "/atom", "/datum", "/"]);
    assert_eq!(tree.root().id, 0);
}

#[test]
fn test_list_subtypes_are_sealed() {
    let (tree, _) = tree_of("/list/special\n");
    assert_eq!(tree.type_id(&path("/list/special")), tree.type_id(&path("/list")));
}

#[test]
fn test_parent_type_reparents() {
    let (tree, sink) = tree_of("/datum/thing\n\tparent_type = /obj\n");
    assert!(!sink.has_errors());

    let thing = tree.type_id(&path("/datum/thing")).unwrap();
    assert!(tree.is_subtype_of(thing, &path("/obj")));
}

#[test]
fn test_duplicate_declarations() {
    let (_, sink) = tree_of("/mob\n\tvar/a\n\tvar/a\n/proc/f()\n/proc/f()\n");
    assert!(has_code(&sink, WarningCode::DuplicateVariable));
    assert!(has_code(&sink, WarningCode::DuplicateProcDefinition));
}

#[test]
fn test_const_override_is_rejected() {
    let (_, sink) = tree_of("/mob\n\tvar/const/limit = 3\n/mob/player\n\tlimit = 4\n");
    assert!(has_code(&sink, WarningCode::WriteToConstant));
}

#[test]
fn test_final_proc_override_is_rejected() {
    let (_, sink) = tree_of("/mob/proc/final/act()\n/mob/player/act()\n");
    assert!(has_code(&sink, WarningCode::FinalOverride));
}

#[test]
fn test_static_var_is_a_global() {
    let (tree, _) = tree_of("/mob\n\tvar/static/count = 3\n");
    let mob = tree.type_id(&path("/mob")).unwrap();
    let id = tree.global_var_id(mob, "count").expect("a global slot");
    assert_eq!(tree.globals()[id as usize].name, "count");
    assert!(tree.variable(mob, "count").is_none());
}

#[test]
fn test_overrides_shadow_declarations() {
    let (tree, _) = tree_of("/mob\n\tvar/health = 10\n/mob/player\n\thealth = 20\n");
    let player = tree.type_id(&path("/mob/player")).unwrap();

    let initial = tree.initial_value(player, "health").and_then(|v| v.constant());
    assert_eq!(initial, Some(Constant::Num(20.0)));
    assert!(tree.variable(player, "health").is_some());
}

#[test]
fn test_non_constant_initializers_get_an_init_proc() {
    let (mut tree, _) = tree_of("/obj/box\n\tvar/contents_list = new /list\n\tvar/size = 2\n");
    let box_id = tree.type_id(&path("/obj/box")).unwrap();
    assert_eq!(tree.get(box_id).unwrap().init_assignments.len(), 1);

    tree.create_init_procs();
    let init = tree.get(box_id).and_then(|ty| ty.init_proc).expect("an init proc");
    assert_eq!(tree.proc(init).unwrap().name, INIT_PROC_NAME);
}

#[test]
fn test_newest_overload_wins() {
    let (tree, _) = tree_of("/mob/proc/act()\n/mob/act()\n");
    let mob = tree.type_id(&path("/mob")).unwrap();
    let overloads = &tree.get(mob).unwrap().procs["act"];
    assert_eq!(overloads.len(), 2);
    assert_eq!(tree.find_proc(mob, "act"), overloads.last().copied());
}

#[test]
fn test_map_layers() {
    let (tree, _) = tree_of("/turf/floor\n/area/station\n/obj/item\n");
    let layer = |text: &str| tree.resolve(&path(text)).map(|ty| ty.layer);

    assert_eq!(layer("/turf/floor"), Some(MapLayer::Turf));
    assert_eq!(layer("/area/station"), Some(MapLayer::Area));
    assert_eq!(layer("/obj/item"), Some(MapLayer::Object));
    assert_eq!(layer("/obj/missing"), None);
}

use serde_json::Value;

use super::tree_of;
use crate::middle::artifact::{DreamCompiledJson, ProcAttributes};
use crate::middle::{assemble, compile_procs};
use crate::vm::opcodes_version;

fn artifact_of(source: &str) -> DreamCompiledJson {
    let (mut tree, sink) = tree_of(source);
    let (procs, global_init) = compile_procs(&mut tree, &sink);
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    assemble(&tree, procs, global_init, Vec::new(), Some("interface.dmf".to_string()))
}

const SOURCE: &str = concat!(
    "var/global/greeting = \"hello\"\n",
    "/mob\n",
    "\tvar/health = 10\n",
    "\tvar/tmp/target\n",
    "\tvar/const/LIMIT = 3\n",
    "\tvar/list/inventory = new\n",
    "\tproc/hurt(amount)\n",
    "\t\thealth -= amount\n",
    "/proc/main()\n",
    "\treturn greeting\n",
);

#[test]
fn test_types_carry_constant_initial_values() {
    let artifact = artifact_of(SOURCE);
    let mob = artifact
        .types
        .iter()
        .find(|ty| ty.path == "/mob")
        .expect("/mob in the type table");

    assert_eq!(mob.variables["health"], Value::from(10.0));
    // Assigned by the init proc instead
    assert_eq!(mob.variables["inventory"], Value::Null);
    assert!(mob.init_proc.is_some());
    assert_eq!(mob.const_variables, vec!["LIMIT".to_string()]);
    assert_eq!(mob.tmp_variables, vec!["target".to_string()]);
    assert_eq!(mob.procs.len(), 1);
}

#[test]
fn test_globals_and_global_procs() {
    let artifact = artifact_of(SOURCE);

    assert_eq!(artifact.globals.global_count, 1);
    assert_eq!(artifact.globals.names, vec!["greeting".to_string()]);
    assert_eq!(artifact.globals.globals[&0], Value::from("hello"));
    assert_eq!(artifact.global_procs.len(), 1);
    assert!(artifact.global_init_proc.is_none());
    assert_eq!(artifact.metadata.version, opcodes_version());
}

#[test]
fn test_json_layout() {
    let artifact = artifact_of(SOURCE);
    let text = artifact.to_json_string().unwrap();
    let json: Value = serde_json::from_str(&text).unwrap();

    for key in ["Metadata", "Strings", "Types", "Procs", "Globals", "GlobalProcs", "Interface"] {
        assert!(json.get(key).is_some(), "missing {}", key);
    }
    let first_proc = &json["Procs"][0];
    assert!(first_proc.get("OwningTypeId").is_some());
    assert!(first_proc.get("MaxStackSize").is_some());
    assert!(first_proc["Bytecode"].is_array());

    assert_eq!(DreamCompiledJson::from_json_str(&text).unwrap(), artifact);
}

#[test]
fn test_write_to_disk() {
    let artifact = artifact_of("/proc/main()\n\treturn 1\n");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");

    artifact.write_to(&path, true).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(DreamCompiledJson::from_json_str(&text).unwrap(), artifact);
}

#[test]
fn test_attribute_names() {
    let mut attributes = ProcAttributes::NONE;
    assert_eq!(attributes.to_string(), "none");

    attributes.set(ProcAttributes::HIDDEN, true);
    attributes.set(ProcAttributes::INSTANT, true);
    assert_eq!(attributes.to_string(), "hidden|instant");
    assert_eq!(attributes.bits(), 4 | 64);

    attributes.set(ProcAttributes::HIDDEN, false);
    assert!(!attributes.contains(ProcAttributes::HIDDEN));
}

//! Object tree, code generation and the compiled artifact
//!
//! [`ObjectTree`] collects the declarations of every parsed file,
//! [`codegen`] lowers its procs to bytecode and [`assemble`] lays the
//! result out as a [`DreamCompiledJson`].

pub mod artifact;
pub mod codegen;
pub mod objtree;

#[cfg(test)]
mod tests;

use indexmap::IndexMap;
use serde_json::Value;

use crate::frontend::dm::DreamPath;
use crate::frontend::dmm::DreamMapJson;
use crate::vm::opcodes_version;

pub use artifact::{
    ArtifactMetadata, DreamCompiledJson, DreamTypeJson, GlobalListJson, ProcAttributes, ProcDefinitionJson,
};
pub use codegen::{compile_procs, CodegenError};
pub use objtree::{DMObject, DMProc, DMVariable, ObjectTree};

fn type_json(
    ty: &DMObject,
    type_id: &dyn Fn(&DreamPath) -> Option<i32>,
) -> DreamTypeJson {
    let mut variables: IndexMap<String, Value> = IndexMap::new();
    let mut const_variables = Vec::new();
    let mut tmp_variables = Vec::new();
    for (name, variable) in ty.variables.iter().chain(&ty.overrides) {
        // Non-constant values are assigned by the init proc
        let value = variable
            .constant()
            .map(|constant| constant.to_json(type_id))
            .unwrap_or(Value::Null);
        variables.insert(name.clone(), value);
        if variable.modifiers.is_const && !const_variables.contains(name) {
            const_variables.push(name.clone());
        }
        if variable.modifiers.is_tmp && !tmp_variables.contains(name) {
            tmp_variables.push(name.clone());
        }
    }

    DreamTypeJson {
        path: ty.path.to_string(),
        parent: ty.parent,
        init_proc: ty.init_proc,
        procs: ty.procs.values().cloned().collect(),
        verbs: ty.verbs.clone(),
        variables,
        global_variables: ty.global_variables.clone(),
        const_variables,
        tmp_variables,
    }
}

fn globals_json(
    tree: &ObjectTree,
    type_id: &dyn Fn(&DreamPath) -> Option<i32>,
) -> GlobalListJson {
    let globals = tree.globals();
    let values = globals
        .iter()
        .enumerate()
        .filter_map(|(id, global)| Some((id as i32, global.constant()?.to_json(type_id))))
        .filter(|(_, value)| !value.is_null())
        .collect();
    GlobalListJson {
        global_count: globals.len() as i32,
        names: globals.iter().map(|global| global.name.clone()).collect(),
        globals: values,
    }
}

/// Lay out a compiled tree, its procs and maps as an artifact
pub fn assemble(
    tree: &ObjectTree,
    procs: Vec<ProcDefinitionJson>,
    global_init_proc: Option<ProcDefinitionJson>,
    maps: Vec<DreamMapJson>,
    interface: Option<String>,
) -> DreamCompiledJson {
    let type_id = |path: &DreamPath| tree.type_id(path);

    DreamCompiledJson {
        metadata: ArtifactMetadata {
            version: opcodes_version(),
        },
        strings: tree.strings().clone(),
        resources: tree.resources().clone(),
        interface,
        maps,
        types: tree.types().iter().map(|ty| type_json(ty, &type_id)).collect(),
        procs,
        global_init_proc,
        globals: globals_json(tree, &type_id),
        global_procs: tree.global_procs().values().copied().collect(),
    }
}

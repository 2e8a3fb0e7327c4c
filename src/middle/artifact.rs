//! Compiled artifact
//!
//! The JSON document a compilation produces. Field names are PascalCase and
//! every table is indexed by the ids the object tree handed out, so the
//! runtime can resolve `PushType 3` or `Global(7)` by position.

use std::fmt;
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frontend::dmm::DreamMapJson;

/// Proc attribute flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcAttributes(u32);

impl ProcAttributes {
    pub const NONE: ProcAttributes = ProcAttributes(0);
    pub const IS_OVERRIDE: ProcAttributes = ProcAttributes(1 << 0);
    pub const UNIMPLEMENTED: ProcAttributes = ProcAttributes(1 << 1);
    pub const HIDDEN: ProcAttributes = ProcAttributes(1 << 2);
    pub const BACKGROUND: ProcAttributes = ProcAttributes(1 << 3);
    pub const DISABLE_WAITFOR: ProcAttributes = ProcAttributes(1 << 4);
    pub const HIDE_POPUP_MENU: ProcAttributes = ProcAttributes(1 << 5);
    pub const INSTANT: ProcAttributes = ProcAttributes(1 << 6);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(
        self,
        other: ProcAttributes,
    ) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(
        &mut self,
        flag: ProcAttributes,
        enabled: bool,
    ) {
        if enabled {
            self.0 |= flag.0;
        } else {
            self.0 &= !flag.0;
        }
    }
}

impl fmt::Display for ProcAttributes {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        const NAMES: &[(ProcAttributes, &str)] = &[
            (ProcAttributes::IS_OVERRIDE, "override"),
            (ProcAttributes::UNIMPLEMENTED, "unimplemented"),
            (ProcAttributes::HIDDEN, "hidden"),
            (ProcAttributes::BACKGROUND, "background"),
            (ProcAttributes::DISABLE_WAITFOR, "nowait"),
            (ProcAttributes::HIDE_POPUP_MENU, "hide_popup_menu"),
            (ProcAttributes::INSTANT, "instant"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArtifactMetadata {
    /// Fingerprint of the opcode catalog the bytecode was written against
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DreamTypeJson {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_proc: Option<i32>,
    /// Overload chains, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub procs: Vec<Vec<i32>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<i32>,
    /// Constant initial values of declared and overridden vars
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub global_variables: IndexMap<String, i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub const_variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tmp_variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcArgumentJson {
    pub name: String,
    /// Value type bits of the `as` clause
    #[serde(rename = "Type")]
    pub types: u32,
}

/// A local coming into or going out of scope at `offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalVariableJson {
    pub offset: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<i32>,
}

/// Line table entry; `file` is a string id, present when the file changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceInfoJson {
    pub offset: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<i32>,
    pub line: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcDefinitionJson {
    pub owning_type_id: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "ProcAttributes::is_empty")]
    pub attributes: ProcAttributes,
    pub max_stack_size: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ProcArgumentJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locals: Vec<LocalVariableJson>,
    #[serde(default)]
    pub source_info: Vec<SourceInfoJson>,
    #[serde(default)]
    pub bytecode: Vec<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_verb: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invisibility: Option<i8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalListJson {
    pub global_count: i32,
    pub names: Vec<String>,
    /// Constant initial values; globals without one start as null
    pub globals: IndexMap<i32, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DreamCompiledJson {
    pub metadata: ArtifactMetadata,
    pub strings: IndexSet<String>,
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub resources: IndexSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    pub maps: Vec<DreamMapJson>,
    pub types: Vec<DreamTypeJson>,
    pub procs: Vec<ProcDefinitionJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_init_proc: Option<ProcDefinitionJson>,
    pub globals: GlobalListJson,
    pub global_procs: Vec<i32>,
}

impl DreamCompiledJson {
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize to `path`, indented when `pretty` is set
    pub fn write_to(
        &self,
        path: &Path,
        pretty: bool,
    ) -> anyhow::Result<()> {
        use anyhow::Context;

        let text = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            self.to_json_string()
        }
        .context("Failed to serialize the compiled artifact")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

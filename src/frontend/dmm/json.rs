//! Serialized form of a parsed map, embedded in the compiled artifact

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One map file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DreamMapJson {
    pub max_x: i32,
    pub max_y: i32,
    pub max_z: i32,
    /// Keyed by cell name, in definition order
    pub cell_definitions: IndexMap<String, CellDefinitionJson>,
    pub blocks: Vec<MapBlockJson>,
}

/// Contents of one cell: at most one turf and area, any number of objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CellDefinitionJson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turf: Option<MapObjectJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<MapObjectJson>,
    #[serde(default)]
    pub objects: Vec<MapObjectJson>,
}

impl CellDefinitionJson {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            turf: None,
            area: None,
            objects: Vec::new(),
        }
    }
}

/// A placed object with its var overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapObjectJson {
    /// Type index, or -1 when the type is unknown
    #[serde(rename = "Type")]
    pub type_id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub var_overrides: Option<IndexMap<String, Value>>,
}

impl MapObjectJson {
    pub fn new(type_id: i32) -> Self {
        Self {
            type_id,
            var_overrides: None,
        }
    }

    /// Set an override. Returns false if it replaced an earlier one.
    pub fn add_var_override(
        &mut self,
        name: &str,
        value: Value,
    ) -> bool {
        self.var_overrides
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), value)
            .is_none()
    }
}

/// A rectangle of cells anchored at `(x, y, z)`, rows top to bottom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapBlockJson {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: i32,
    pub height: i32,
    pub cells: Vec<String>,
}

impl MapBlockJson {
    pub fn new(
        x: i32,
        y: i32,
        z: i32,
    ) -> Self {
        Self {
            x,
            y,
            z,
            width: 0,
            height: 0,
            cells: Vec::new(),
        }
    }

    /// The last `(x, y)` the block covers, or `None` when it is past the
    /// coordinate range
    pub fn far_corner(&self) -> Option<(i32, i32)> {
        let x = self.x.checked_add(self.width.checked_sub(1)?)?;
        let y = self.y.checked_add(self.height.checked_sub(1)?)?;
        Some((x, y))
    }
}

//! Map files (`.dmm`)
//!
//! A map is a list of cell definitions followed by map blocks:
//!
//! ```text
//! "aa" = (/turf/floor{name = "tile"; dir = 2},/area/station)
//! (1,1,1) = {"
//! aaaa
//! "}
//! ```
//!
//! The DM lexer and parser are reused as they are. Map syntax is not
//! layout-sensitive, so [`LayoutFilter`] drops newline, indentation and
//! whitespace tokens before the parser sees them.

pub mod json;
#[cfg(test)]
mod tests;

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashSet;
use tracing::debug;

pub use json::{CellDefinitionJson, DreamMapJson, MapBlockJson, MapObjectJson};

use crate::frontend::core::lexer::{Lexer, Token, TokenKind};
use crate::frontend::core::parser::ParserState;
use crate::frontend::dm::ast::{ExpressionKind, StatementKind};
use crate::frontend::dm::{Constant, DmLexer, DmParser, DreamPath};
use crate::frontend::preprocessor::{MemoryLoader, Preprocessor};
use crate::util::diagnostic::{DiagnosticSink, WarningCode};
use crate::util::span::Location;

use TokenKind::*;

/// Where a placed type goes in a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapLayer {
    Turf,
    Area,
    Object,
}

/// A type a map may place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapType {
    /// Type index, or -1 when there is no object tree
    pub id: i32,
    pub layer: MapLayer,
}

/// Type lookup for map parsing
pub trait MapTypes: Sync {
    fn resolve(
        &self,
        path: &DreamPath,
    ) -> Option<MapType>;
}

/// Accepts every path and sorts it by its first element. For parsing maps
/// without compiling any code.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathTypes;

impl MapTypes for PathTypes {
    fn resolve(
        &self,
        path: &DreamPath,
    ) -> Option<MapType> {
        let layer = match path.elements().first().map(String::as_str) {
            Some("turf") => MapLayer::Turf,
            Some("area") => MapLayer::Area,
            _ => MapLayer::Object,
        };
        Some(MapType { id: -1, layer })
    }
}

/// Turns layout tokens into `Skip`, which `Lexer::next_token` drops
pub struct LayoutFilter<L: Lexer> {
    inner: L,
    pending: VecDeque<Token>,
}

impl<L: Lexer> LayoutFilter<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            pending: VecDeque::new(),
        }
    }
}

impl<L: Lexer> Lexer for LayoutFilter<L> {
    fn parse_next_token(&mut self) -> Token {
        let mut token = self.inner.next_token();
        if matches!(token.kind, Newline | DmIndent | DmDedent | DmWhitespace) {
            token.kind = Skip;
        }
        token
    }

    fn pending_queue(&mut self) -> &mut VecDeque<Token> {
        &mut self.pending
    }
}

/// Parser for one map file
pub struct DmmParser<'t, L: Lexer> {
    parser: DmParser<LayoutFilter<L>>,
    types: &'t dyn MapTypes,
    /// Fixed by the first cell definition
    cell_name_length: Option<usize>,
    /// Unknown types already warned about
    skipped_types: HashSet<DreamPath>,
}

impl<'t, L: Lexer> DmmParser<'t, L> {
    pub fn new(
        lexer: L,
        sink: DiagnosticSink,
        types: &'t dyn MapTypes,
    ) -> Self {
        Self {
            parser: DmParser::new(LayoutFilter::new(lexer), sink),
            types,
            cell_name_length: None,
            skipped_types: HashSet::new(),
        }
    }

    fn state(&mut self) -> &mut ParserState<LayoutFilter<L>> {
        &mut self.parser.state
    }

    pub fn parse_map(&mut self) -> DreamMapJson {
        let mut map = DreamMapJson::default();

        loop {
            let cell = self.cell_definition();
            let found_cell = cell.is_some();
            if let Some((location, cell)) = cell {
                let length = cell.name.chars().count();
                let expected = *self.cell_name_length.get_or_insert(length);
                if length == expected {
                    map.cell_definitions.insert(cell.name.clone(), cell);
                } else {
                    self.state().emit_at(
                        WarningCode::BadToken,
                        location,
                        format!("Invalid cell definition name length '{}'", cell.name),
                    );
                }
            }

            let block = self.map_block();
            let found_block = block.is_some();
            if let Some((block, (far_x, far_y))) = block {
                map.max_x = map.max_x.max(far_x);
                map.max_y = map.max_y.max(far_y);
                map.max_z = map.max_z.max(block.z);
                map.blocks.push(block);
            }

            if !found_cell && !found_block {
                break;
            }
        }

        self.state().consume(EndOfFile, "Expected EOF");
        debug!(
            "Parsed map with {} cell definitions and {} blocks",
            map.cell_definitions.len(),
            map.blocks.len()
        );
        map
    }

    /// `"aa" = (/turf/a{var = 1}, /area/b)`
    fn cell_definition(&mut self) -> Option<(Location, CellDefinitionJson)> {
        if self.state().current_kind() != DmConstantString {
            return None;
        }
        let name = self.state().bump();
        self.state().consume(DmEquals, "Expected '='");
        self.state().consume(DmLeftParenthesis, "Expected '('");

        let mut cell = CellDefinitionJson::new(name.value_or_text());
        let mut next = self.parser.path(false);
        while let Some(parsed) = next {
            let path = parsed.path.to_absolute();
            let resolved = self.types.resolve(&path);
            if resolved.is_none() && self.skipped_types.insert(path.clone()) {
                self.state()
                    .warning(parsed.location.clone(), format!("Skipping type '{}'", path));
            }

            let mut object = MapObjectJson::new(resolved.map_or(-1, |t| t.id));
            if self.state().check(DmLeftCurlyBracket) {
                self.var_overrides(&path, &mut object);
                self.state().consume(DmRightCurlyBracket, "Expected '}'");
            }

            match resolved.map(|t| t.layer) {
                Some(MapLayer::Turf) => cell.turf = Some(object),
                Some(MapLayer::Area) => cell.area = Some(object),
                Some(MapLayer::Object) => cell.objects.push(object),
                None => {}
            }

            next = if self.state().check(DmComma) {
                self.parser.path(false)
            } else {
                None
            };
        }

        self.state().consume(DmRightParenthesis, "Expected ')'");
        Some((name.location, cell))
    }

    /// `{name = "x"; dir = 2}` after a placed type; the `{` is consumed
    fn var_overrides(
        &mut self,
        type_path: &DreamPath,
        object: &mut MapObjectJson,
    ) {
        let types = self.types;
        let type_id = |path: &DreamPath| types.resolve(path).map(|t| t.id).filter(|id| *id >= 0);

        loop {
            let statement = match self.parser.statement(false) {
                Ok(Some(statement)) => statement,
                Ok(None) => break,
                Err(_) => {
                    self.state().skip_until(&[DmRightCurlyBracket]);
                    break;
                }
            };
            let location = statement.location.clone();
            let StatementKind::VarOverride {
                object_path,
                name,
                value,
            } = statement.kind
            else {
                self.state().emit_at(
                    WarningCode::InvalidVarDefinition,
                    location,
                    "Expected a var override",
                );
                break;
            };

            let sink = self.parser.sink();
            if !object_path.is_root() {
                sink.emit(
                    WarningCode::InvalidVarDefinition,
                    location.clone(),
                    format!("Invalid var name '{}' in DMM on type {}", name, type_path),
                );
            }
            match Constant::fold(&value) {
                Some(constant) => {
                    if !object.add_var_override(&name, constant.to_json(&type_id)) {
                        sink.emit(
                            WarningCode::DuplicateVariable,
                            location,
                            format!("Duplicate var override '{}' in DMM on type {}", name, type_path),
                        );
                    }
                }
                None => {
                    sink.emit(
                        WarningCode::BadExpression,
                        location,
                        format!("Failed to serialize value to json ({})", value.describe()),
                    );
                }
            }

            if !self.state().check(DmSemicolon) {
                break;
            }
        }
    }

    /// `(x,y,z) = {"rows"}`, with the block's far corner
    fn map_block(&mut self) -> Option<(MapBlockJson, (i32, i32))> {
        let (x, y, z) = self.coordinates()?;
        let mut block = MapBlockJson::new(x, y, z);

        self.state().consume(DmEquals, "Expected '='");
        let token = self.state().current().clone();
        if !self.state().consume(DmConstantString, "Expected a constant string") {
            return None;
        }

        let rows: Vec<Vec<char>> = token
            .value_or_text()
            .split('\n')
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .map(|row| row.chars().collect())
            .collect();
        let Some(cell_length) = self.cell_name_length.filter(|l| *l > 0) else {
            self.state()
                .emit_at(WarningCode::BadToken, token.location, "Map block has no cell definitions");
            return None;
        };

        block.height = rows.len() as i32;
        for row in rows {
            if row.len() % cell_length != 0 {
                self.state()
                    .emit_at(WarningCode::BadToken, token.location, "Invalid map block row");
                return None;
            }
            block.width = block.width.max((row.len() / cell_length) as i32);
            block
                .cells
                .extend(row.chunks(cell_length).map(|cell| cell.iter().collect::<String>()));
        }
        match block.far_corner() {
            Some(corner) => Some((block, corner)),
            None => {
                self.state()
                    .emit_at(WarningCode::BadToken, token.location, "Invalid map block coordinates");
                None
            }
        }
    }

    fn coordinates(&mut self) -> Option<(i32, i32, i32)> {
        if !self.state().check(DmLeftParenthesis) {
            return None;
        }
        let x = self.coordinate()?;
        self.state().consume(DmComma, "Expected ','");
        let y = self.coordinate()?;
        self.state().consume(DmComma, "Expected ','");
        let z = self.coordinate()?;
        self.state().consume(DmRightParenthesis, "Expected ')'");
        Some((x, y, z))
    }

    fn coordinate(&mut self) -> Option<i32> {
        match self.parser.constant() {
            Ok(Some(expr)) => {
                if let ExpressionKind::Int(value) = expr.kind {
                    return Some(value);
                }
                self.state()
                    .emit_at(WarningCode::BadToken, expr.location, "Expected an integer");
                None
            }
            _ => {
                self.state().emit(WarningCode::BadToken, "Expected an integer");
                None
            }
        }
    }
}

/// Parse map text. Directives are not allowed in map files.
pub fn parse_map(
    name: &str,
    text: &str,
    sink: DiagnosticSink,
    types: &dyn MapTypes,
) -> DreamMapJson {
    let mut preprocessor = Preprocessor::new(Arc::new(MemoryLoader::new()), sink.clone());
    preprocessor.disable_directives();
    preprocessor.push_source(name, text);

    let lexer = DmLexer::new(preprocessor, Location::in_source(Arc::from(name))).without_indentation();
    DmmParser::new(lexer, sink, types).parse_map()
}

impl DreamMapJson {
    /// Move the map up by `levels` z-levels
    pub fn offset_z(
        &mut self,
        levels: i32,
    ) {
        for block in &mut self.blocks {
            block.z = block.z.saturating_add(levels);
        }
        self.max_z = self.max_z.saturating_add(levels);
    }
}

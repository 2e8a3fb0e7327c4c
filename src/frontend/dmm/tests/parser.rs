use serde_json::json;

use crate::frontend::dm::DreamPath;
use crate::frontend::dmm::{parse_map, DreamMapJson, MapLayer, MapType, MapTypes, PathTypes};
use crate::util::diagnostic::{DiagnosticSink, ErrorLevel, WarningCode};

const MAP: &str = r#""aa" = (/turf/floor{name = "tile"; dir = 2},/area/station)
"ab" = (/obj/item,/turf/wall,/area/station)

(1,1,1) = {"
aaab
abaa
"}
"#;

fn parse(text: &str) -> (DreamMapJson, DiagnosticSink) {
    let sink = DiagnosticSink::with_defaults();
    let map = parse_map("test.dmm", text, sink.clone(), &PathTypes);
    (map, sink)
}

/// Knows `/turf` and `/area` only
struct TurfsOnly;

impl MapTypes for TurfsOnly {
    fn resolve(
        &self,
        path: &DreamPath,
    ) -> Option<MapType> {
        match path.elements().first().map(String::as_str) {
            Some("turf") => Some(MapType {
                id: 3,
                layer: MapLayer::Turf,
            }),
            Some("area") => Some(MapType {
                id: 4,
                layer: MapLayer::Area,
            }),
            _ => None,
        }
    }
}

#[test]
fn test_cells_and_block() {
    let (map, sink) = parse(MAP);
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());

    assert_eq!(map.cell_definitions.len(), 2);
    let aa = &map.cell_definitions["aa"];
    let turf = aa.turf.as_ref().unwrap();
    let overrides = turf.var_overrides.as_ref().unwrap();
    assert_eq!(overrides["name"], json!("tile"));
    assert_eq!(overrides["dir"], json!(2.0));
    assert!(aa.area.is_some());
    assert!(aa.objects.is_empty());

    let ab = &map.cell_definitions["ab"];
    assert_eq!(ab.objects.len(), 1);
    assert!(ab.turf.is_some());

    assert_eq!(map.blocks.len(), 1);
    let block = &map.blocks[0];
    assert_eq!((block.width, block.height), (2, 2));
    assert_eq!(block.cells, vec!["aa", "ab", "ab", "aa"]);
    assert_eq!((map.max_x, map.max_y, map.max_z), (2, 2, 1));
}

#[test]
fn test_cell_name_length_mismatch_recovers() {
    let (map, sink) = parse("\"aa\" = (/turf/a)\n\"aaa\" = (/turf/b)\n(1,1,1) = {\"\naa\n\"}\n");
    let errors: Vec<_> = sink
        .diagnostics()
        .into_iter()
        .filter(|d| d.level == ErrorLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Invalid cell definition name length 'aaa'");
    assert_eq!(map.cell_definitions.len(), 1);
    assert_eq!(map.blocks.len(), 1);
}

#[test]
fn test_bad_row_width() {
    let (map, sink) = parse("\"aa\" = (/turf/a)\n(1,1,1) = {\"\naaa\n\"}\n");
    assert!(sink
        .diagnostics()
        .iter()
        .any(|d| d.message == "Invalid map block row"));
    assert!(map.blocks.is_empty());
}

#[test]
fn test_unknown_types_warn_once() {
    let sink = DiagnosticSink::with_defaults();
    let text = "\"a\" = (/obj/thing,/turf/a)\n\"b\" = (/obj/thing,/area/b)\n";
    let map = parse_map("test.dmm", text, sink.clone(), &TurfsOnly);

    let skipped: Vec<_> = sink
        .diagnostics()
        .into_iter()
        .filter(|d| d.message.starts_with("Skipping type"))
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].message, "Skipping type '/obj/thing'");
    assert_eq!(map.cell_definitions["a"].turf.as_ref().map(|t| t.type_id), Some(3));
    assert!(map.cell_definitions["b"].objects.is_empty());
}

#[test]
fn test_non_override_statement() {
    let (_, sink) = parse("\"a\" = (/turf/a{/obj/b})\n");
    assert!(sink
        .diagnostics()
        .iter()
        .any(|d| d.message == "Expected a var override"));
}

#[test]
fn test_offset_z() {
    let (mut map, _) = parse(MAP);
    map.offset_z(2);
    assert_eq!(map.blocks[0].z, 3);
    assert_eq!(map.max_z, 3);

    map.offset_z(i32::MAX);
    assert_eq!(map.blocks[0].z, i32::MAX);
    assert_eq!(map.max_z, i32::MAX);
}

#[test]
fn test_block_past_coordinate_range() {
    for anchor in ["(2147483647,1,1)", "(1,2147483647,1)"] {
        let text = format!("\"a\" = (/turf)\n{} = {{\"\naa\naa\n\"}}\n", anchor);
        let (map, sink) = parse(&text);
        let errors: Vec<_> = sink
            .diagnostics()
            .into_iter()
            .filter(|d| d.level == ErrorLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1, "{}: {:?}", anchor, errors);
        assert_eq!(errors[0].message, "Invalid map block coordinates");
        assert!(map.blocks.is_empty());
        assert_eq!((map.max_x, map.max_y), (0, 0));
    }

    // A one-cell block right at the edge still fits
    let (map, sink) = parse("\"a\" = (/turf)\n(2147483647,1,1) = {\"\na\n\"}\n");
    assert!(!sink.has_errors(), "{:?}", sink.diagnostics());
    assert_eq!(map.max_x, i32::MAX);
}

#[test]
fn test_var_override_diagnostics_have_codes() {
    let (_, sink) = parse("\"a\" = (/turf/a{dir = 1; dir = 2; area/name = 3; icon = src})\n");
    let codes: Vec<_> = sink
        .diagnostics()
        .into_iter()
        .map(|d| (d.code, d.level))
        .collect();
    assert!(codes.contains(&(WarningCode::DuplicateVariable, ErrorLevel::Warning)), "{:?}", codes);
    assert!(codes.contains(&(WarningCode::InvalidVarDefinition, ErrorLevel::Error)), "{:?}", codes);
    assert!(codes.contains(&(WarningCode::BadExpression, ErrorLevel::Error)), "{:?}", codes);
    assert!(codes.iter().all(|(code, _)| *code != WarningCode::Unknown));
}

#[test]
fn test_duplicate_override_can_be_disabled() {
    let sink = DiagnosticSink::with_defaults();
    sink.set_pragma(WarningCode::DuplicateVariable, ErrorLevel::Disabled).unwrap();
    parse_map("test.dmm", "\"a\" = (/turf/a{dir = 1; dir = 2})\n", sink.clone(), &PathTypes);
    assert!(sink.is_empty(), "{:?}", sink.diagnostics());
}

#[test]
fn test_json_shape() {
    let (map, _) = parse(MAP);
    let value = serde_json::to_value(&map).unwrap();
    assert_eq!(value["MaxX"], json!(2));
    assert_eq!(value["Blocks"][0]["Cells"][1], json!("ab"));
    assert_eq!(value["CellDefinitions"]["ab"]["Objects"][0]["Type"], json!(-1));
}

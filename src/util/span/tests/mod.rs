//! Location unit tests

use std::sync::Arc;

use crate::util::span::Location;

#[test]
fn test_unknown_location_display() {
    assert_eq!(Location::UNKNOWN.to_string(), "<unknown>");
    assert!(Location::UNKNOWN.is_unknown());
    assert_eq!(Location::default(), Location::UNKNOWN);
}

#[test]
fn test_location_display() {
    let loc = Location::new(Arc::from("code/mob.dm"), 12, 4);
    assert_eq!(loc.to_string(), "code/mob.dm:12:4");

    let file_only = Location::in_source(Arc::from("map.dmm"));
    assert_eq!(file_only.to_string(), "map.dmm");
}

#[test]
fn test_location_order_within_file() {
    let file: Arc<str> = Arc::from("a.dm");
    let first = Location::new(file.clone(), 1, 10);
    let second = Location::new(file.clone(), 2, 1);
    let third = Location::new(file, 2, 5);

    assert!(first < second);
    assert!(second < third);
    assert!(Location::UNKNOWN < first);
}

#[test]
fn test_with_column() {
    let loc = Location::new(Arc::from("a.dm"), 3, 1);
    let moved = loc.with_column(9);
    assert_eq!(moved.line, Some(3));
    assert_eq!(moved.column, Some(9));
    assert_eq!(moved.source, loc.source);
}

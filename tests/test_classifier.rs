mod common;

use std::io::Write;

use anyhow::Result;
use image::GrayImage;
use ringmark::detection::circles::DedupParams;

use common::*;

fn classifier(inner_count: usize) -> MarkerClassifier {
    MarkerClassifier::new(
        test_catalog(),
        Box::new(StubCircleDetector::with_count(inner_count)),
        DedupParams::default(),
    )
}

fn binary() -> GrayImage {
    GrayImage::new(WIDTH, HEIGHT)
}

#[test]
fn needs_two_candidates() {
    let classifier = classifier(3);
    assert!(classifier.classify(&[], &binary()).is_none());
    assert!(classifier
        .classify(&[candidate(320.0, 240.0, 200.0, 198.0)], &binary())
        .is_none());
}

#[test]
fn second_largest_is_the_target() {
    let classifier = classifier(3);
    let outer = candidate(320.0, 240.0, 300.0, 296.0);
    let target = candidate(480.0, 240.0, 200.0, 198.0);
    let small = candidate(100.0, 100.0, 80.0, 80.0);

    let result = classifier
        .classify(&[small, target.clone(), outer.clone()], &binary())
        .unwrap();

    assert_eq!(result.reference, outer);
    assert_eq!(result.target, target);
    assert_eq!(result.inner_ring_count, 3);
    assert_eq!(result.identity, MarkerIdentity::Known("Marker 3".to_string()));
}

#[test]
fn ranking_ignores_input_order() {
    let a = candidate(100.0, 100.0, 150.0, 150.0);
    let b = candidate(300.0, 100.0, 150.0, 150.0);
    let c = candidate(500.0, 300.0, 250.0, 240.0);

    let forward = MarkerClassifier::rank(&[a.clone(), b.clone(), c.clone()]);
    let backward = MarkerClassifier::rank(&[b.clone(), c.clone(), a.clone()]);

    assert_eq!(forward, backward);
    assert_eq!(forward, vec![c, a, b]);
}

#[test]
fn unknown_counts_fall_through() {
    let result = classifier(7)
        .classify(
            &[candidate(320.0, 240.0, 300.0, 300.0), candidate(320.0, 240.0, 200.0, 200.0)],
            &binary(),
        )
        .unwrap();

    assert_eq!(result.inner_ring_count, 7);
    assert_eq!(result.identity, MarkerIdentity::Unknown);
    assert_eq!(result.identity.to_string(), "Unknown marker");
}

#[test]
fn inner_circles_are_reported_in_frame_coordinates() {
    let result = classifier(1)
        .classify(
            &[candidate(320.0, 240.0, 300.0, 300.0), candidate(320.0, 240.0, 200.0, 200.0)],
            &binary(),
        )
        .unwrap();

    // ROI of a 200 px circle at (320, 240) starts at (220, 140); the stub reports (10, 20)
    assert_eq!(result.roi, BoundingBox { x: 220, y: 140, width: 200, height: 200 });
    assert_eq!(result.inner_circles, vec![circle(230.0, 160.0, 8.0)]);
}

#[test]
fn off_image_target_counts_zero_circles() {
    let result = classifier(3)
        .classify(
            &[candidate(320.0, 240.0, 300.0, 300.0), candidate(-500.0, -500.0, 200.0, 200.0)],
            &binary(),
        )
        .unwrap();

    assert!(result.roi.is_empty());
    assert_eq!(result.inner_ring_count, 0);
    assert_eq!(result.identity, MarkerIdentity::Unknown);
}

#[test]
fn overlapping_inner_circles_count_once() {
    let detector = StubCircleDetector {
        circles: vec![circle(30.0, 30.0, 8.0), circle(32.0, 31.0, 8.0), circle(80.0, 30.0, 8.0)],
    };
    let classifier = MarkerClassifier::new(test_catalog(), Box::new(detector), DedupParams::default());

    let result = classifier
        .classify(
            &[candidate(320.0, 240.0, 300.0, 300.0), candidate(320.0, 240.0, 200.0, 200.0)],
            &binary(),
        )
        .unwrap();

    assert_eq!(result.inner_ring_count, 2);
}

#[test]
fn default_catalog_names_furniture() {
    let catalog = MarkerCatalog::default();
    assert_eq!(catalog.len(), 5);
    assert_eq!(catalog.lookup(1), MarkerIdentity::Known("Chair".to_string()));
    assert_eq!(catalog.lookup(5), MarkerIdentity::Known("Trash bin".to_string()));
    assert_eq!(catalog.lookup(0), MarkerIdentity::Unknown);
}

#[test]
fn catalog_loads_from_json() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, r#"{{"2": "Door", "6": "Stairs"}}"#)?;

    let catalog = MarkerCatalog::load(file.path())?;
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.lookup(6), MarkerIdentity::Known("Stairs".to_string()));
    assert_eq!(catalog.lookup(3), MarkerIdentity::Unknown);
    Ok(())
}

#[test]
fn malformed_catalog_is_a_parse_error() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, "[1, 2, 3]")?;

    let err = MarkerCatalog::load(file.path()).unwrap_err();
    assert!(matches!(err, ringmark::error::ConfigError::Parse { .. }));
    Ok(())
}

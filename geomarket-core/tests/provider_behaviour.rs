//! End-to-end behaviour of the in-memory provider: coarse bounding-box
//! queries versus exact point containment.

use geo::{LineString, Polygon};
use geomarket_core::{Attributes, GeoProvider, GeoRecord, MemoryProvider};

fn square_with_hole() -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ]),
        vec![LineString::from(vec![
            (4.0, 4.0),
            (6.0, 4.0),
            (6.0, 6.0),
            (4.0, 6.0),
            (4.0, 4.0),
        ])],
    )
}

fn holed_provider() -> MemoryProvider {
    let record = GeoRecord::from_polygon(1, &square_with_hole(), Attributes::new())
        .expect("valid polygon");
    MemoryProvider::new([record])
}

#[test]
fn bbox_query_is_a_coarse_filter() {
    let provider = holed_provider();
    // (5, 5) sits inside the hole: the envelope still overlaps, so the
    // coarse query reports the record.
    let coarse: Vec<_> = provider
        .query_bbox(5.0, 5.0, 5.0, 5.0, &[])
        .expect("query")
        .collect();
    assert_eq!(coarse.len(), 1);
}

#[test]
fn point_query_is_exact() {
    let provider = holed_provider();
    // Inside the hole: excluded despite the envelope overlap.
    assert_eq!(
        provider
            .query_point(5.0, 5.0, &[])
            .expect("query")
            .count(),
        0
    );
    // Inside the shell, outside the hole: included.
    assert_eq!(
        provider
            .query_point(1.0, 1.0, &[])
            .expect("query")
            .count(),
        1
    );
    // Outside the shell entirely.
    assert_eq!(
        provider
            .query_point(20.0, 20.0, &[])
            .expect("query")
            .count(),
        0
    );
}

#[test]
fn non_finite_point_query_errors() {
    let provider = holed_provider();
    assert!(provider.query_point(f64::NAN, 1.0, &[]).is_err());
}

#[test]
fn requested_attributes_travel_through_point_queries() {
    let attributes = Attributes::from([
        (String::from("name"), serde_json::json!("donut")),
        (String::from("value"), serde_json::json!(12)),
    ]);
    let record =
        GeoRecord::from_polygon(9, &square_with_hole(), attributes).expect("valid polygon");
    let provider = MemoryProvider::new([record]);

    let found = provider
        .query_point(1.0, 1.0, &[String::from("value")])
        .expect("query")
        .next()
        .expect("one record");
    assert_eq!(found.attributes.len(), 1);
    assert_eq!(found.attributes.get("value"), Some(&serde_json::json!(12)));
}

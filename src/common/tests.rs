//! Tests for shared data types

use super::*;
use crate::http::Params;
use crate::types::{GeometryType, SpatialRelationship};
use chrono::TimeZone;
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

#[test_case(json!({"x": 1.0, "y": 2.0}), GeometryType::Point ; "point")]
#[test_case(json!({"points": [[1.0, 2.0]]}), GeometryType::Multipoint ; "multipoint")]
#[test_case(json!({"paths": [[[0.0, 0.0], [1.0, 1.0]]]}), GeometryType::Polyline ; "polyline")]
#[test_case(json!({"rings": [[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]}), GeometryType::Polygon ; "polygon")]
#[test_case(json!({"xmin": 0.0, "ymin": 0.0, "xmax": 1.0, "ymax": 1.0}), GeometryType::Envelope ; "envelope")]
fn test_geometry_detection(value: serde_json::Value, expected: GeometryType) {
    let geometry: Geometry = serde_json::from_value(value).unwrap();
    assert_eq!(geometry.geometry_type(), expected);
}

#[test]
fn test_geometry_serializes_spatial_reference() {
    let point = Point::new(-117.19, 34.05).with_sr(SpatialReference::wgs84());
    let value = serde_json::to_value(Geometry::from(point)).unwrap();
    assert_eq!(
        value,
        json!({"x": -117.19, "y": 34.05, "spatialReference": {"wkid": 4326}})
    );
}

#[test]
fn test_spatial_reference_param() {
    assert_eq!(SpatialReference::wkid(3857).to_param(), json!(3857));
    assert_eq!(
        SpatialReference::wkt("PROJCS[...]").to_param(),
        json!({"wkt": "PROJCS[...]"})
    );
}

#[test]
fn test_feature_set_from_query_response() {
    let set: FeatureSet = serde_json::from_value(json!({
        "objectIdFieldName": "OBJECTID",
        "geometryType": "esriGeometryPoint",
        "spatialReference": {"wkid": 102100, "latestWkid": 3857},
        "fields": [{"name": "OBJECTID", "type": "esriFieldTypeOID", "alias": "OBJECTID"}],
        "features": [
            {"attributes": {"OBJECTID": 1, "NAME": "A"}, "geometry": {"x": 1.0, "y": 2.0}},
            {"attributes": {"OBJECTID": 2, "NAME": "B"}}
        ],
        "exceededTransferLimit": true,
        "uniqueIdField": {"name": "OBJECTID", "isSystemMaintained": true}
    }))
    .unwrap();

    assert_eq!(set.len(), 2);
    assert_eq!(set.geometry_type, Some(GeometryType::Point));
    assert_eq!(set.features[0].id("OBJECTID"), Some(1));
    assert!(set.features[1].geometry.is_none());
    assert!(set.exceeded_transfer_limit);
    assert!(set.extra.contains_key("uniqueIdField"));
}

#[test]
fn test_feature_set_with_empty_geometries() {
    let set: FeatureSet = serde_json::from_value(json!({
        "geometryType": "esriGeometryPoint",
        "features": [
            {"attributes": {"OBJECTID": 1}, "geometry": {"x": 1.0, "y": 2.0}},
            {"attributes": {"OBJECTID": 2}, "geometry": {"x": null, "y": null}},
            {"attributes": {"OBJECTID": 3}, "geometry": {}},
            {"attributes": {"OBJECTID": 4}, "geometry": {"x": "NaN", "y": "NaN", "spatialReference": {"wkid": 4326}}},
            {"attributes": {"OBJECTID": 5}, "geometry": null}
        ]
    }))
    .unwrap();

    assert_eq!(set.len(), 5);
    assert_eq!(
        set.features[0].geometry,
        Some(Geometry::Point(Point::new(1.0, 2.0)))
    );
    assert!(set.features[1..].iter().all(|f| f.geometry.is_none()));
}

#[test]
fn test_malformed_geometry_is_still_an_error() {
    let result = serde_json::from_value::<Feature>(json!({
        "attributes": {},
        "geometry": {"x": 1.0}
    }));
    assert!(result.is_err());
}

#[test]
fn test_edit_results() {
    let mut results: EditResults = serde_json::from_value(json!({
        "addResults": [{"objectId": 10, "success": true}],
        "updateResults": [],
        "deleteResults": [{
            "objectId": 3,
            "success": false,
            "error": {"code": 1000, "description": "Feature not found"}
        }]
    }))
    .unwrap();

    assert!(!results.all_succeeded());
    assert_eq!(results.failures().len(), 1);
    assert_eq!(results.failures()[0].error.as_ref().unwrap().code, 1000);

    results.merge(EditResults {
        add_results: vec![EditResult {
            object_id: Some(11),
            global_id: None,
            success: true,
            error: None,
        }],
        ..Default::default()
    });
    assert_eq!(results.add_results.len(), 2);
}

#[test]
fn test_geometry_filter_params() {
    let envelope = Envelope::new(0.0, 0.0, 10.0, 10.0).with_sr(SpatialReference::wkid(3857));
    let filter = GeometryFilter::new(envelope)
        .relationship(SpatialRelationship::Contains)
        .buffer(5.0, "esriSRUnit_Meter");

    let mut params = Params::new();
    filter.apply(&mut params).unwrap();

    assert_eq!(params.get("geometryType"), Some("esriGeometryEnvelope"));
    assert_eq!(params.get("spatialRel"), Some("esriSpatialRelContains"));
    assert_eq!(params.get("spatialRelationship"), None);
    assert_eq!(params.get("inSR"), Some("3857"));
    assert_eq!(params.get("buffer"), Some("5.0"));
    assert_eq!(params.get("units"), Some("esriSRUnit_Meter"));
    assert!(params.get("geometry").unwrap().contains("\"xmax\":10.0"));
}

#[test]
fn test_time_filter() {
    let start = chrono::Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let end = chrono::Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();

    assert_eq!(TimeFilter::instant(start).value(), "1577836800000");
    assert_eq!(
        TimeFilter::range(start, end).value(),
        "1577836800000,1577923200000"
    );
}

#[test]
fn test_statistic_filter() {
    let mut filter = StatisticFilter::new();
    filter.add("SUM", "POP2020", "total_pop").unwrap();
    filter.add("count", "OBJECTID", "n").unwrap();

    let err = filter.add("median", "POP2020", "m").unwrap_err();
    assert!(matches!(err, crate::Error::InvalidArgument { .. }));

    assert_eq!(
        serde_json::to_value(filter.statistics()).unwrap(),
        json!([
            {"statisticType": "sum", "onStatisticField": "POP2020", "outStatisticFieldName": "total_pop"},
            {"statisticType": "count", "onStatisticField": "OBJECTID", "outStatisticFieldName": "n"}
        ])
    );
}

#[test]
fn test_layer_definition_filter() {
    let filter = LayerDefinitionFilter::new()
        .add(0, "STATE = 'CA'")
        .add(2, "POP > 1000");
    assert_eq!(
        serde_json::to_value(filter.definitions()).unwrap(),
        json!([
            {"layerId": 0, "where": "STATE = 'CA'"},
            {"layerId": 2, "where": "POP > 1000"}
        ])
    );
}

#[test_case("Roads", &[], Some("jdoe"), false, "Roads owner:jdoe" ; "owner scoped")]
#[test_case("Roads: 2020", &[], Some("jdoe"), true, "Roads  2020" ; "org search replaces colon")]
#[test_case("Roads", &["Feature Service"], None, false, "Roads (type:\"Feature Service\")" ; "single type")]
#[test_case("Roads", &["Feature Service", "Web Map"], Some("jdoe"), false, "Roads owner:jdoe (type:\"Feature Service\" OR type:\"Web Map\")" ; "several types")]
fn test_find_item_query(
    title: &str,
    types: &[&str],
    username: Option<&str>,
    search_org: bool,
    expected: &str,
) {
    assert_eq!(find_item_query(title, types, username, search_org), expected);
}

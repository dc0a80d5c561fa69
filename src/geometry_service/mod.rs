//! Geometry service (`.../GeometryServer`)
//!
//! Each operation sends its geometries as Esri JSON templates:
//!
//! ```text
//! arrays:  {"geometryType": "esriGeometryPolygon", "geometries": [...]}
//! single:  {"geometryType": "esriGeometryPolygon", "geometry": {...}}
//! ```
//!
//! All geometries of one array must share a type.

mod types;

pub use types::{
    BufferOptions, CalculationType, ConversionType, CoordinateStringOptions, OffsetHow,
    OffsetOptions, RelationType, EXTEND_HOW_VALUES,
};

use crate::common::{Envelope, Geometry, Polygon, Polyline, SpatialReference};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Params};
use crate::resource::{Loaded, Resource, ResourceWrapper};
use crate::types::{GeometryType, JsonObject, JsonValue};
use serde_json::json;
use std::sync::Arc;

/// Wrapper over a Geometry Server
#[derive(Debug)]
pub struct GeometryService {
    resource: Resource<JsonObject>,
}

impl GeometryService {
    pub fn new(client: Arc<HttpClient>, url: impl Into<String>) -> Self {
        Self {
            resource: Resource::new(client, url),
        }
    }

    /// Service description
    pub async fn info(&self) -> Result<Arc<Loaded<JsonObject>>> {
        self.resource.get().await
    }

    /// Area and perimeter of each polygon
    ///
    /// The spatial reference is taken from the first polygon.
    pub async fn areas_and_lengths(
        &self,
        polygons: &[Polygon],
        length_unit: Option<&str>,
        area_unit: Option<&str>,
        calculation_type: CalculationType,
    ) -> Result<JsonValue> {
        let first = polygons
            .first()
            .ok_or_else(|| Error::invalid_argument("polygons", "no polygons provided"))?;
        let mut params = Params::new()
            .with("calculationType", calculation_type.as_str())
            .with_opt("lengthUnit", length_unit);
        if let Some(unit) = area_unit {
            params.set("areaUnit", json!({ "areaUnit": unit }));
        }
        params.set_opt(
            "sr",
            first.spatial_reference.as_ref().map(SpatialReference::to_param),
        );
        params.set_json("polygons", polygons)?;
        self.get("areasAndLengths", params).await
    }

    /// Close gaps between polygons with polylines
    pub async fn auto_complete(
        &self,
        polygons: &[Polygon],
        polylines: &[Polyline],
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let mut params = Params::new().with_opt("sr", sr.map(SpatialReference::to_param));
        params.set_json("polygons", polygons)?;
        params.set_json("polylines", polylines)?;
        self.get("autoComplete", params).await
    }

    /// Buffer polygons around geometries
    pub async fn buffer(
        &self,
        geometries: &[Geometry],
        options: &BufferOptions,
    ) -> Result<JsonValue> {
        require_types(
            "geometries",
            geometries,
            &[GeometryType::Point, GeometryType::Polyline, GeometryType::Polygon],
        )?;
        let distances: Vec<String> = options.distances.iter().map(f64::to_string).collect();
        let in_sr = options
            .in_sr
            .as_ref()
            .or_else(|| first_sr(geometries))
            .map(SpatialReference::to_param);

        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with("distances", distances.join(","))
            .with("unionResults", options.union_results)
            .with("geodesic", options.geodesic)
            .with_opt("inSR", in_sr)
            .with_opt("unit", options.unit.clone())
            .with_opt("outSR", options.out_sr.as_ref().map(SpatialReference::to_param))
            .with_opt(
                "bufferSR",
                options.buffer_sr.as_ref().map(SpatialReference::to_param),
            );
        self.get("buffer", params).await
    }

    /// Smallest convex polygon enclosing the geometries
    pub async fn convex_hull(
        &self,
        geometries: &[Geometry],
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("convexHull", params).await
    }

    /// Cut polylines or polygons with a polyline
    pub async fn cut(
        &self,
        cutter: &Polyline,
        target: &[Geometry],
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        require_types(
            "target",
            target,
            &[GeometryType::Polyline, GeometryType::Polygon],
        )?;
        let mut params = Params::new()
            .with("target", geometries_template(target)?)
            .with_opt("sr", resolve_sr(sr, target));
        params.set_json("cutter", cutter)?;
        self.get("cut", params).await
    }

    /// Add vertices so no segment is longer than `max_segment_length`
    pub async fn densify(
        &self,
        geometries: &[Geometry],
        sr: Option<&SpatialReference>,
        max_segment_length: f64,
        length_unit: Option<&str>,
        geodesic: bool,
    ) -> Result<JsonValue> {
        require_types(
            "geometries",
            geometries,
            &[GeometryType::Polyline, GeometryType::Polygon],
        )?;
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with("maxSegmentLength", max_segment_length)
            .with("geodesic", geodesic)
            .with_opt("lengthUnit", length_unit)
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("densify", params).await
    }

    /// Subtract `geometry` from each geometry of the array
    pub async fn difference(
        &self,
        geometries: &[Geometry],
        geometry: &Geometry,
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with("geometry", geometry_template(geometry))
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("difference", params).await
    }

    /// Distance between two geometries
    pub async fn distance(
        &self,
        geometry1: &Geometry,
        geometry2: &Geometry,
        sr: Option<&SpatialReference>,
        distance_unit: Option<&str>,
        geodesic: bool,
    ) -> Result<JsonValue> {
        let sr = sr
            .or_else(|| geometry1.spatial_reference())
            .map(SpatialReference::to_param);
        let params = Params::new()
            .with("geometry1", geometry_template(geometry1))
            .with("geometry2", geometry_template(geometry2))
            .with("geodesic", geodesic)
            .with_opt("distanceUnit", distance_unit)
            .with_opt("sr", sr);
        self.get("distance", params).await
    }

    /// Datum transformations between two spatial references
    pub async fn find_transformations(
        &self,
        in_sr: &SpatialReference,
        out_sr: &SpatialReference,
        extent_of_interest: Option<&Envelope>,
        num_of_results: u32,
    ) -> Result<JsonValue> {
        let mut params = Params::new()
            .with("inSR", in_sr.to_param())
            .with("outSR", out_sr.to_param())
            .with("numOfResults", num_of_results);
        if let Some(extent) = extent_of_interest {
            params.set_json("extentOfInterest", extent)?;
        }
        self.post("findTransformations", params).await
    }

    /// Parse coordinate strings (MGRS, UTM, DMS, ...) into points
    pub async fn from_geo_coordinate_string<S: AsRef<str>>(
        &self,
        sr: &SpatialReference,
        strings: &[S],
        conversion_type: ConversionType,
        conversion_mode: Option<&str>,
    ) -> Result<JsonValue> {
        let strings: Vec<&str> = strings.iter().map(AsRef::as_ref).collect();
        let mut params = Params::new()
            .with("sr", sr.to_param())
            .with("conversionType", conversion_type.as_str())
            .with_opt("conversionMode", conversion_mode);
        params.set_json("strings", &strings)?;
        self.post("fromGeoCoordinateString", params).await
    }

    /// Simplify geometries with the Douglas-Peucker algorithm
    pub async fn generalize(
        &self,
        geometries: &[Geometry],
        sr: Option<&SpatialReference>,
        max_deviation: f64,
        deviation_unit: Option<&str>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with("maxDeviation", max_deviation)
            .with_opt("deviationUnit", deviation_unit)
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("generalize", params).await
    }

    /// Intersection of each geometry with `geometry`
    pub async fn intersect(
        &self,
        geometries: &[Geometry],
        geometry: &Geometry,
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with("geometry", geometry_template(geometry))
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("intersect", params).await
    }

    /// Interior label point of each polygon
    pub async fn label_points(
        &self,
        polygons: &[Polygon],
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let sr = sr
            .or_else(|| polygons.first().and_then(|p| p.spatial_reference.as_ref()))
            .map(SpatialReference::to_param);
        let mut params = Params::new().with_opt("sr", sr);
        params.set_json("polygons", polygons)?;
        self.get("labelPoints", params).await
    }

    /// Length of each polyline
    pub async fn lengths(
        &self,
        polylines: &[Polyline],
        sr: Option<&SpatialReference>,
        length_unit: Option<&str>,
        calculation_type: CalculationType,
    ) -> Result<JsonValue> {
        let sr = sr
            .or_else(|| polylines.first().and_then(|p| p.spatial_reference.as_ref()))
            .map(SpatialReference::to_param);
        let paths: Vec<JsonValue> = polylines.iter().map(|p| json!({ "paths": p.paths })).collect();
        let mut params = Params::new()
            .with("calculationType", calculation_type.as_str())
            .with_opt("lengthUnit", length_unit)
            .with_opt("sr", sr);
        params.set_json("polylines", &paths)?;
        self.get("lengths", params).await
    }

    /// Offset geometries by a distance
    pub async fn offset(
        &self,
        geometries: &[Geometry],
        options: &OffsetOptions,
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with("offsetDistance", options.distance)
            .with("offsetHow", options.how.as_str())
            .with("bevelRatio", options.bevel_ratio)
            .with("simplifyResult", options.simplify_result)
            .with_opt("offsetUnit", options.unit.clone())
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("offset", params).await
    }

    /// Project geometries to another spatial reference
    pub async fn project(
        &self,
        geometries: &[Geometry],
        in_sr: &SpatialReference,
        out_sr: &SpatialReference,
        transformation: Option<&JsonValue>,
        transform_forward: bool,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with("inSR", in_sr.to_param())
            .with("outSR", out_sr.to_param())
            .with("transformForward", transform_forward)
            .with_opt("transformation", transformation.cloned());
        self.get("project", params).await
    }

    /// Pairs of geometries that satisfy a spatial relation
    pub async fn relation(
        &self,
        geometries1: &[Geometry],
        geometries2: &[Geometry],
        sr: Option<&SpatialReference>,
        relation: RelationType,
        relation_param: Option<&str>,
    ) -> Result<JsonValue> {
        if relation == RelationType::Relation && relation_param.is_none() {
            return Err(Error::invalid_argument(
                "relationParam",
                "required for esriGeometryRelationRelation",
            ));
        }
        let params = Params::new()
            .with("geometries1", geometries_template(geometries1)?)
            .with("geometries2", geometries_template(geometries2)?)
            .with("relation", relation.as_str())
            .with_opt("relationParam", relation_param)
            .with_opt("sr", resolve_sr(sr, geometries1));
        self.get("relation", params).await
    }

    /// Reshape a polyline or polygon with a single path
    pub async fn reshape(
        &self,
        target: &Geometry,
        reshaper: &Polyline,
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let sr = sr
            .or_else(|| target.spatial_reference())
            .map(SpatialReference::to_param);
        let mut params = Params::new()
            .with("target", geometry_template(target))
            .with_opt("sr", sr);
        params.set_json("reshaper", reshaper)?;
        self.get("reshape", params).await
    }

    /// Make geometries topologically consistent
    pub async fn simplify(
        &self,
        geometries: &[Geometry],
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("simplify", params).await
    }

    /// Format coordinates as MGRS, UTM, DMS, ... strings
    pub async fn to_geo_coordinate_string(
        &self,
        sr: &SpatialReference,
        coordinates: &[[f64; 2]],
        options: &CoordinateStringOptions,
    ) -> Result<JsonValue> {
        let mut params = Params::new()
            .with("sr", sr.to_param())
            .with("conversionType", options.conversion_type.as_str())
            .with("rounding", options.rounding)
            .with("addSpaces", options.add_spaces)
            .with_opt("conversionMode", options.conversion_mode.clone())
            .with_opt("numOfDigits", options.num_of_digits);
        params.set_json("coordinates", coordinates)?;
        self.post("toGeoCoordinateString", params).await
    }

    /// Trim or extend polylines to meet another polyline
    ///
    /// `extend_how` is one of the flags in [`EXTEND_HOW_VALUES`].
    pub async fn trim_extend(
        &self,
        polylines: &[Polyline],
        trim_extend_to: &Polyline,
        extend_how: u8,
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        if !EXTEND_HOW_VALUES.contains(&extend_how) {
            return Err(Error::invalid_argument(
                "extendHow",
                format!("{extend_how} is not one of 0, 1, 2, 4, 8, 16"),
            ));
        }
        let sr = sr
            .or_else(|| polylines.first().and_then(|p| p.spatial_reference.as_ref()))
            .map(SpatialReference::to_param);
        let mut params = Params::new()
            .with("extendHow", extend_how)
            .with_opt("sr", sr);
        params.set_json("polylines", polylines)?;
        params.set_json("trimExtendTo", trim_extend_to)?;
        self.get("trimExtend", params).await
    }

    /// Union of all geometries
    pub async fn union(
        &self,
        geometries: &[Geometry],
        sr: Option<&SpatialReference>,
    ) -> Result<JsonValue> {
        let params = Params::new()
            .with("geometries", geometries_template(geometries)?)
            .with_opt("sr", resolve_sr(sr, geometries));
        self.get("union", params).await
    }

    async fn get(&self, operation: &str, params: Params) -> Result<JsonValue> {
        self.resource
            .client()
            .get_json(&self.resource.child(operation), params)
            .await
    }

    async fn post(&self, operation: &str, params: Params) -> Result<JsonValue> {
        self.resource
            .client()
            .post_json(&self.resource.child(operation), params)
            .await
    }
}

impl ResourceWrapper for GeometryService {
    type Props = JsonObject;

    fn resource(&self) -> &Resource<JsonObject> {
        &self.resource
    }
}

/// `{"geometryType", "geometries"}` template; all geometries must share a type
pub fn geometries_template(geometries: &[Geometry]) -> Result<JsonValue> {
    let first = geometries
        .first()
        .ok_or_else(|| Error::invalid_argument("geometries", "no geometries provided"))?;
    let geometry_type = first.geometry_type();
    if let Some(other) = geometries
        .iter()
        .find(|g| g.geometry_type() != geometry_type)
    {
        return Err(Error::invalid_argument(
            "geometries",
            format!(
                "mixed geometry types {} and {}",
                geometry_type,
                other.geometry_type()
            ),
        ));
    }
    Ok(json!({
        "geometryType": geometry_type.as_str(),
        "geometries": geometries,
    }))
}

/// `{"geometryType", "geometry"}` template
pub fn geometry_template(geometry: &Geometry) -> JsonValue {
    json!({
        "geometryType": geometry.geometry_type().as_str(),
        "geometry": geometry,
    })
}

fn require_types(name: &str, geometries: &[Geometry], allowed: &[GeometryType]) -> Result<()> {
    match geometries
        .iter()
        .find(|g| !allowed.contains(&g.geometry_type()))
    {
        Some(g) => Err(Error::invalid_argument(
            name,
            format!("{} is not supported here", g.geometry_type()),
        )),
        None => Ok(()),
    }
}

fn first_sr(geometries: &[Geometry]) -> Option<&SpatialReference> {
    geometries.first().and_then(Geometry::spatial_reference)
}

fn resolve_sr(sr: Option<&SpatialReference>, geometries: &[Geometry]) -> Option<JsonValue> {
    sr.or_else(|| first_sr(geometries))
        .map(SpatialReference::to_param)
}

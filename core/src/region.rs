//! Region masks: named polygon regions selected out of a GeoJSON boundary collection.

use crate::model::Coordinate;
use crate::prelude::{PipelineError, PipelineResult};
use geo::{BoundingRect, Geometry, Intersects, MultiPolygon, Point, Rect};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use std::path::Path;

pub const DEFAULT_ATTRIBUTE: &str = "name";

/// Union of every polygon whose identifying attribute equals the requested name.
///
/// Coordinates follow GeoJSON order: `x` is longitude, `y` latitude.
#[derive(Debug, Clone)]
pub struct RegionMask {
    name: String,
    attribute: String,
    polygons: MultiPolygon<f64>,
    bounds: Option<Rect<f64>>,
}

impl RegionMask {
    pub fn new(name: &str, attribute: &str, polygons: MultiPolygon<f64>) -> Self {
        let bounds = polygons.bounding_rect();
        Self {
            name: name.to_string(),
            attribute: attribute.to_string(),
            polygons,
            bounds,
        }
    }

    /// Loads `path` and keeps the features whose `attribute` is exactly `name`.
    pub fn load(path: &Path, attribute: &str, name: &str) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
        Self::from_geojson_str(&text, path, attribute, name)
    }

    pub fn from_geojson_str(
        text: &str,
        path: &Path,
        attribute: &str,
        name: &str,
    ) -> PipelineResult<Self> {
        let mask_error = |reason: String| PipelineError::Mask {
            path: path.to_path_buf(),
            reason,
        };

        let geojson: GeoJson = text.parse().map_err(|err: geojson::Error| mask_error(err.to_string()))?;
        let features = match geojson {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(mask_error(
                    "bare geometry has no attributes to select a region by".into(),
                ))
            }
        };

        let mut polygons = Vec::new();
        let mut found = false;
        for (index, feature) in features.into_iter().enumerate() {
            let matches = feature
                .property(attribute)
                .and_then(|value| value.as_str())
                .map(|value| value == name)
                .unwrap_or(false);
            if !matches {
                continue;
            }
            found = true;

            let geometry = feature
                .geometry
                .ok_or_else(|| mask_error(format!("feature {} has no geometry", index)))?;
            let geometry = Geometry::<f64>::try_from(geometry)
                .map_err(|err| mask_error(format!("feature {}: {}", index, err)))?;
            match geometry {
                Geometry::Polygon(polygon) => polygons.push(polygon),
                Geometry::MultiPolygon(multi) => polygons.extend(multi.0),
                other => {
                    return Err(mask_error(format!(
                        "feature {} is not polygonal ({})",
                        index,
                        kind_of(&other)
                    )))
                }
            }
        }

        if !found {
            return Err(PipelineError::MaskNotFound {
                name: name.to_string(),
                attribute: attribute.to_string(),
                path: path.to_path_buf(),
            });
        }

        Ok(Self::new(name, attribute, MultiPolygon::new(polygons)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.0.len()
    }

    /// Boundary-inclusive containment against any constituent polygon.
    pub fn contains(&self, coordinate: Coordinate) -> bool {
        let point = Point::new(coordinate.longitude, coordinate.latitude);
        let Some(bounds) = &self.bounds else {
            return false;
        };
        let (min, max) = (bounds.min(), bounds.max());
        (min.x..=max.x).contains(&point.x())
            && (min.y..=max.y).contains(&point.y())
            && self.polygons.intersects(&point)
    }

    /// Writes this region alone as a single-feature GeoJSON collection.
    pub fn write_geojson(&self, path: &Path) -> PipelineResult<()> {
        let mut properties = JsonObject::new();
        properties.insert(self.attribute.clone(), self.name.clone().into());
        let feature = Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.polygons))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        };
        let collection = FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        };
        std::fs::write(path, GeoJson::from(collection).to_string())
            .map_err(|err| PipelineError::io(path, err))
    }
}

fn kind_of(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
    }
}

//! Persists fused tables and per-source point sets as GeoJSON point collections.

use crate::model::{Coordinate, FusedTable, PointSet};
use crate::prelude::{PipelineError, PipelineResult};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, JsonValue, Value};
use std::path::Path;

/// Outcome of [`ensure_directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryStatus {
    Created,
    AlreadyPresent,
}

/// Creates `path` (and parents) unless it already exists as a directory.
pub fn ensure_directory(path: &Path) -> PipelineResult<DirectoryStatus> {
    if path.is_dir() {
        return Ok(DirectoryStatus::AlreadyPresent);
    }
    if path.exists() {
        return Err(PipelineError::Sink {
            path: path.to_path_buf(),
            reason: "exists but is not a directory".into(),
        });
    }
    std::fs::create_dir_all(path).map_err(|err| PipelineError::io(path, err))?;
    Ok(DirectoryStatus::Created)
}

/// Writes one point feature per fused row.
///
/// Properties are `<source>_<field>` for every candidate field plus
/// `<source>_distance`; unmatched sources get `null` values.
pub fn write_fused_table(table: &FusedTable, path: &Path) -> PipelineResult<()> {
    let features = table
        .records
        .iter()
        .map(|record| {
            let mut properties = JsonObject::new();
            for (field, value) in table.anchor_fields.iter().zip(&record.anchor_values) {
                properties.insert(field.clone(), number(*value));
            }
            for (schema, matched) in table.sources.iter().zip(&record.matches) {
                for (position, field) in schema.fields.iter().enumerate() {
                    let value = matched
                        .as_ref()
                        .map(|m| number(m.values[position]))
                        .unwrap_or(JsonValue::Null);
                    properties.insert(column(&schema.source_id, field), value);
                }
                let distance = matched
                    .as_ref()
                    .map(|m| number(m.distance))
                    .unwrap_or(JsonValue::Null);
                properties.insert(column(&schema.source_id, "distance"), distance);
            }
            point_feature(record.anchor, properties)
        })
        .collect();
    write_collection(path, features, table.crs.epsg())
}

/// Writes a clipped source as-is, one feature per record.
pub fn write_point_set(set: &PointSet, path: &Path) -> PipelineResult<()> {
    let features = set
        .records
        .iter()
        .map(|record| {
            let mut properties = JsonObject::new();
            for (field, value) in set.schema.iter().zip(&record.values) {
                properties.insert(field.clone(), number(*value));
            }
            point_feature(record.coordinate(), properties)
        })
        .collect();
    let epsg = set.crs.map(|crs| crs.epsg()).unwrap_or(4326);
    write_collection(path, features, epsg)
}

fn column(source_id: &str, field: &str) -> String {
    format!("{}_{}", source_id, field)
}

fn number(value: f64) -> JsonValue {
    // NaN and infinities have no JSON form and become null
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn point_feature(coordinate: Coordinate, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            coordinate.longitude,
            coordinate.latitude,
        ]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn write_collection(path: &Path, features: Vec<Feature>, epsg: u32) -> PipelineResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_directory(parent)?;
    }
    let mut foreign = JsonObject::new();
    foreign.insert(
        "crs".into(),
        serde_json::json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", epsg) }
        }),
    );
    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign),
    };
    std::fs::write(path, GeoJson::from(collection).to_string())
        .map_err(|err| PipelineError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Crs, FusedRecord, Match, PointRecord, SourceSchema};

    fn table() -> FusedTable {
        FusedTable {
            anchor_source: "ease2".into(),
            anchor_fields: Vec::new(),
            crs: Crs::Wgs84,
            sources: vec![SourceSchema {
                source_id: "smap".into(),
                fields: vec!["soil_moisture".into()],
            }],
            records: vec![
                FusedRecord {
                    anchor: Coordinate::new(10.0, -100.0),
                    anchor_values: Vec::new(),
                    matches: vec![Some(Match {
                        values: vec![0.25],
                        distance: 0.5,
                        candidate_index: 0,
                    })],
                },
                FusedRecord {
                    anchor: Coordinate::new(10.0, -99.0),
                    anchor_values: Vec::new(),
                    matches: vec![None],
                },
            ],
        }
    }

    #[test]
    fn ensure_directory_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Shape_Files").join("Master");
        assert_eq!(ensure_directory(&target).unwrap(), DirectoryStatus::Created);
        assert_eq!(
            ensure_directory(&target).unwrap(),
            DirectoryStatus::AlreadyPresent
        );
    }

    #[test]
    fn ensure_directory_rejects_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ensure_directory(file.path()).is_err());
    }

    #[test]
    fn fused_table_marks_absent_matches_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master").join("fused.geojson");
        write_fused_table(&table(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let collection = match text.parse::<GeoJson>().unwrap() {
            GeoJson::FeatureCollection(collection) => collection,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(collection.features.len(), 2);
        let first = &collection.features[0];
        assert_eq!(first.property("smap_soil_moisture"), Some(&serde_json::json!(0.25)));
        let second = &collection.features[1];
        assert_eq!(second.property("smap_soil_moisture"), Some(&JsonValue::Null));
        assert_eq!(second.property("smap_distance"), Some(&JsonValue::Null));
    }

    #[test]
    fn point_set_writes_one_feature_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smap.geojson");
        let mut set = PointSet::new("smap", vec!["soil_moisture".into()]);
        set.records = vec![
            PointRecord::new(20.0, -100.0, vec![0.1]),
            PointRecord::new(21.0, -100.0, vec![f64::NAN]),
        ];
        write_point_set(&set, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"soil_moisture\":null"));
        assert!(text.contains("[-100.0,20.0]"));
    }
}

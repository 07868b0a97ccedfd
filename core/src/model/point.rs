use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference system attached by the geometry normalizer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Crs {
    /// WGS84 geographic coordinates in degrees.
    Wgs84,
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One observation. `values` is laid out in the owning set's schema order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub values: Vec<f64>,
}

impl PointRecord {
    pub fn new(latitude: f64, longitude: f64, values: Vec<f64>) -> Self {
        Self {
            latitude,
            longitude,
            values,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Ordered records from a single source sharing one schema and CRS tag.
///
/// Record order is the original read order (file, then in-file row-major)
/// and is relied on for deduplication and nearest-neighbor tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointSet {
    pub source_id: String,
    pub schema: Vec<String>,
    pub crs: Option<Crs>,
    pub records: Vec<PointRecord>,
}

impl PointSet {
    pub fn new(source_id: impl Into<String>, schema: Vec<String>) -> Self {
        Self {
            source_id: source_id.into(),
            schema,
            crs: None,
            records: Vec::new(),
        }
    }

    /// Builds a set that shares this one's identity and schema but holds `records`.
    pub fn derive(&self, records: Vec<PointRecord>) -> Self {
        Self {
            source_id: self.source_id.clone(),
            schema: self.schema.clone(),
            crs: self.crs,
            records,
        }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|field| field == name)
    }

    pub fn attribute(&self, index: usize, name: &str) -> Option<f64> {
        let field = self.field_index(name)?;
        self.records.get(index).map(|record| record.values[field])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends `other` after this set's records. Schemas must match exactly.
    pub fn append(&mut self, other: PointSet) -> Result<(), String> {
        if other.schema != self.schema {
            return Err(format!(
                "schema {:?} does not match {:?}",
                other.schema, self.schema
            ));
        }
        self.records.extend(other.records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_keeps_file_order() {
        let schema = vec!["ddm_snr".to_string()];
        let mut first = PointSet::new("cygnss", schema.clone());
        first.records.push(PointRecord::new(1.0, 2.0, vec![3.0]));
        let mut second = PointSet::new("cygnss", schema);
        second.records.push(PointRecord::new(4.0, 5.0, vec![6.0]));

        first.append(second).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.attribute(1, "ddm_snr"), Some(6.0));
    }

    #[test]
    fn append_rejects_other_schema() {
        let mut first = PointSet::new("a", vec!["x".into()]);
        let second = PointSet::new("a", vec!["y".into()]);
        assert!(first.append(second).is_err());
    }

    #[test]
    fn crs_displays_epsg_code() {
        assert_eq!(Crs::Wgs84.to_string(), "EPSG:4326");
    }
}

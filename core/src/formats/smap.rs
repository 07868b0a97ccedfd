//! Hierarchical soil-moisture product: one group holding 2-D coordinate and
//! retrieval arrays plus a 3-band categorical landcover stack.

use crate::formats::{bundle_error, flatten_records, require, ArrayBundle, LongitudeConvention};
use crate::model::PointSet;
use crate::prelude::{PipelineError, PipelineResult};
use ndarray::Axis;
use std::path::Path;

pub const DEFAULT_GROUP: &str = "Soil_Moisture_Retrieval_Data_AM";
pub const LANDCOVER_BANDS: usize = 3;
pub const PRIMARY_FIELD: &str = "soil_moisture";
pub const FIELDS: [&str; 4] = [
    "landcover_class_0",
    "landcover_class_1",
    "landcover_class_2",
    PRIMARY_FIELD,
];

/// Sentinel the product writes for cells without a retrieval.
pub const FILL_VALUE: f64 = -9999.0;

pub fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

pub fn read_file(source_id: &str, path: &Path, group: &str) -> PipelineResult<PointSet> {
    let bundle = ArrayBundle::open(path).map_err(|err| bundle_error(source_id, path, err))?;
    let name = |array: &str| format!("{}/{}", group, array);
    let latitude = require(source_id, path, &bundle, &name("latitude"))?;
    let longitude = require(source_id, path, &bundle, &name("longitude"))?;
    let soil_moisture = require(source_id, path, &bundle, &name("soil_moisture"))?;
    let landcover = require(source_id, path, &bundle, &name("landcover_class"))?;

    if landcover.ndim() < 2 || landcover.shape()[landcover.ndim() - 1] < LANDCOVER_BANDS {
        return Err(PipelineError::format(
            source_id,
            path,
            format!(
                "shape mismatch: landcover_class {:?} lacks {} trailing bands",
                landcover.shape(),
                LANDCOVER_BANDS
            ),
        ));
    }
    let band_axis = Axis(landcover.ndim() - 1);

    let mut attributes = Vec::with_capacity(FIELDS.len());
    for (band, field) in FIELDS.iter().take(LANDCOVER_BANDS).enumerate() {
        attributes.push((*field, landcover.index_axis(band_axis, band)));
    }
    attributes.push((PRIMARY_FIELD, soil_moisture.view()));

    let records = flatten_records(
        source_id,
        path,
        latitude,
        longitude,
        attributes,
        LongitudeConvention::Signed,
    )?;

    let mut set = PointSet::new(source_id, FIELDS.iter().map(|f| f.to_string()).collect());
    set.records = records;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::DType;
    use ndarray::{Array, IxDyn};

    fn write_granule(path: &Path, landcover_shape: &[usize]) {
        let mut bundle = ArrayBundle::new();
        let grid = |values: Vec<f64>| Array::from_shape_vec(IxDyn(&[2, 2]), values).unwrap();
        bundle.insert(
            format!("{}/latitude", DEFAULT_GROUP),
            DType::F32,
            grid(vec![20.0, 20.0, 19.0, 19.0]),
        );
        bundle.insert(
            format!("{}/longitude", DEFAULT_GROUP),
            DType::F32,
            grid(vec![-101.0, -100.0, -101.0, -100.0]),
        );
        bundle.insert(
            format!("{}/soil_moisture", DEFAULT_GROUP),
            DType::F32,
            grid(vec![0.25, FILL_VALUE, 0.5, 0.125]),
        );
        let count = landcover_shape.iter().product::<usize>();
        bundle.insert(
            format!("{}/landcover_class", DEFAULT_GROUP),
            DType::U8,
            Array::from_shape_vec(IxDyn(landcover_shape), (0..count).map(|v| v as f64).collect())
                .unwrap(),
        );
        bundle.save(path).unwrap();
    }

    #[test]
    fn bands_become_separate_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("granule.gfab");
        write_granule(&path, &[2, 2, 3]);

        let set = read_file("smap", &path, DEFAULT_GROUP).unwrap();
        assert_eq!(set.len(), 4);
        assert_eq!(set.schema, FIELDS.to_vec());
        // cell (0, 1): bands 3, 4, 5
        assert_eq!(set.records[1].values, vec![3.0, 4.0, 5.0, FILL_VALUE]);
        assert_eq!(set.records[3].latitude, 19.0);
        assert_eq!(set.records[3].longitude, -100.0);
    }

    #[test]
    fn landcover_without_bands_is_a_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("granule.gfab");
        write_granule(&path, &[2, 2, 2]);

        let err = read_file("smap", &path, DEFAULT_GROUP).unwrap_err();
        assert!(err.to_string().contains("shape mismatch"));
    }

    #[test]
    fn missing_group_names_the_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("granule.gfab");
        write_granule(&path, &[2, 2, 3]);

        let err = read_file("smap", &path, "Soil_Moisture_Retrieval_Data_PM").unwrap_err();
        assert!(err.to_string().contains("Soil_Moisture_Retrieval_Data_PM/latitude"));
    }
}

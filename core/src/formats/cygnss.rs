//! Specular-point swath product. Every array is (sample, ddm) and longitudes
//! are stored in `[0, 360)`.

use crate::formats::{bundle_error, flatten_records, require, ArrayBundle, LongitudeConvention};
use crate::model::PointSet;
use crate::prelude::PipelineResult;
use std::path::Path;

pub const PRIMARY_FIELD: &str = "ddm_snr";
pub const FIELDS: [&str; 1] = [PRIMARY_FIELD];

pub fn read_file(
    source_id: &str,
    path: &Path,
    lon_convention: LongitudeConvention,
) -> PipelineResult<PointSet> {
    let bundle = ArrayBundle::open(path).map_err(|err| bundle_error(source_id, path, err))?;
    let latitude = require(source_id, path, &bundle, "sp_lat")?;
    let longitude = require(source_id, path, &bundle, "sp_lon")?;
    let snr = require(source_id, path, &bundle, "ddm_snr")?;

    let records = flatten_records(
        source_id,
        path,
        latitude,
        longitude,
        [(PRIMARY_FIELD, snr.view())],
        lon_convention,
    )?;

    let mut set = PointSet::new(source_id, vec![PRIMARY_FIELD.to_string()]);
    set.records = records;
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{ingest, DType, SourceFormat, SourceSpec};
    use ndarray::{Array, IxDyn};

    fn write_swath(path: &Path, lats: Vec<f64>, lons: Vec<f64>, snr: Vec<f64>) {
        let mut bundle = ArrayBundle::new();
        let samples = lats.len() / 2;
        let shape = [samples, 2];
        bundle.insert("sp_lat", DType::F32, Array::from_shape_vec(IxDyn(&shape), lats).unwrap());
        bundle.insert("sp_lon", DType::F32, Array::from_shape_vec(IxDyn(&shape), lons).unwrap());
        bundle.insert(
            "ddm_snr",
            DType::F32,
            Array::from_shape_vec(IxDyn(&[snr.len()]), snr).unwrap(),
        );
        bundle.save(path).unwrap();
    }

    #[test]
    fn longitudes_are_shifted_by_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.gfab");
        write_swath(
            &path,
            vec![10.0, 10.5, 11.0, 11.5],
            vec![80.0, 80.5, 359.5, 180.0],
            vec![1.0, 2.0, 3.0, 4.0],
        );

        let set = read_file("cygnss", &path, LongitudeConvention::ZeroTo360).unwrap();
        let lons: Vec<f64> = set.records.iter().map(|r| r.longitude).collect();
        assert_eq!(lons, vec![-100.0, -99.5, 179.5, 0.0]);
    }

    #[test]
    fn swath_shape_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track.gfab");
        write_swath(
            &path,
            vec![10.0, 10.5, 11.0, 11.5],
            vec![80.0, 80.5, 81.0, 81.5],
            vec![1.0, 2.0, 3.0],
        );

        let err = read_file("cygnss", &path, LongitudeConvention::ZeroTo360).unwrap_err();
        assert!(err.to_string().contains("shape mismatch"));
    }

    #[test]
    fn files_concatenate_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        write_swath(&dir.path().join("b.gfab"), vec![2.0, 2.0], vec![182.0, 183.0], vec![2.0, 2.5]);
        write_swath(&dir.path().join("a.gfab"), vec![1.0, 1.0], vec![181.0, 181.5], vec![1.0, 1.5]);

        let spec = SourceSpec {
            source_id: "cygnss".into(),
            directory: dir.path().to_path_buf(),
            pattern: "*.gfab".into(),
            format: SourceFormat::Cygnss {
                lon_convention: LongitudeConvention::ZeroTo360,
            },
        };
        let set = ingest(&spec).unwrap();
        let snr: Vec<f64> = set.records.iter().map(|r| r.values[0]).collect();
        assert_eq!(snr, vec![1.0, 1.5, 2.0, 2.5]);
    }

    #[test]
    fn one_corrupt_file_fails_the_source() {
        let dir = tempfile::tempdir().unwrap();
        write_swath(&dir.path().join("a.gfab"), vec![1.0, 1.0], vec![181.0, 181.5], vec![1.0, 1.5]);
        std::fs::write(dir.path().join("b.gfab"), b"GFAB\x01").unwrap();

        let spec = SourceSpec {
            source_id: "cygnss".into(),
            directory: dir.path().to_path_buf(),
            pattern: "*.gfab".into(),
            format: SourceFormat::Cygnss {
                lon_convention: LongitudeConvention::ZeroTo360,
            },
        };
        let err = ingest(&spec).unwrap_err();
        assert!(err.to_string().contains("b.gfab"));
    }
}

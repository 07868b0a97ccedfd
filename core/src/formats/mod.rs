//! Format adapters: one per source kind, each producing a uniform [`PointSet`].

pub mod bundle;
pub mod cygnss;
pub mod ease2;
pub mod smap;

use crate::model::{PointRecord, PointSet};
use crate::prelude::{PipelineError, PipelineResult};
use crate::telemetry::StageLogger;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use bundle::{ArrayBundle, BundleError, DType};
pub use ease2::FlatGrid;

/// How a source encodes longitude on disk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LongitudeConvention {
    /// Values in `[0, 360)`; shifted by -180 during ingestion.
    #[default]
    ZeroTo360,
    /// Values already in `[-180, 180)`.
    Signed,
}

impl LongitudeConvention {
    pub fn apply(self, longitude: f64) -> f64 {
        match self {
            LongitudeConvention::ZeroTo360 => longitude - 180.0,
            LongitudeConvention::Signed => longitude,
        }
    }
}

/// Predicate a source's primary attribute must satisfy to count as a retrieval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Validity {
    /// Negative values are "no retrieval" sentinels.
    NonNegative,
    /// NaN or infinite values are fill.
    Finite,
}

impl Validity {
    pub fn accepts(self, value: f64) -> bool {
        match self {
            Validity::NonNegative => value >= 0.0,
            Validity::Finite => value.is_finite(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidityRule {
    pub field: String,
    pub validity: Validity,
}

/// Supported raw layouts, each with a fixed attribute schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceFormat {
    /// Hierarchical soil-moisture product with categorical landcover bands.
    Smap {
        #[serde(default = "smap::default_group")]
        group: String,
    },
    /// Specular-point swath arrays.
    Cygnss {
        #[serde(default)]
        lon_convention: LongitudeConvention,
    },
    /// Headerless latitude/longitude grids of a fixed shape. Anchor-only.
    Ease2 { rows: usize, cols: usize },
}

impl SourceFormat {
    pub fn schema(&self) -> Vec<String> {
        match self {
            SourceFormat::Smap { .. } => smap::FIELDS.iter().map(|f| f.to_string()).collect(),
            SourceFormat::Cygnss { .. } => cygnss::FIELDS.iter().map(|f| f.to_string()).collect(),
            SourceFormat::Ease2 { .. } => Vec::new(),
        }
    }

    pub fn validity_rule(&self) -> Option<ValidityRule> {
        match self {
            SourceFormat::Smap { .. } => Some(ValidityRule {
                field: smap::PRIMARY_FIELD.to_string(),
                validity: Validity::NonNegative,
            }),
            SourceFormat::Cygnss { .. } => Some(ValidityRule {
                field: cygnss::PRIMARY_FIELD.to_string(),
                validity: Validity::Finite,
            }),
            SourceFormat::Ease2 { .. } => None,
        }
    }
}

/// Where a source's raw files live and how to read them.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub source_id: String,
    pub directory: PathBuf,
    pub pattern: String,
    pub format: SourceFormat,
}

/// Parses every file of a source into one [`PointSet`], file order then in-file order.
///
/// Any unreadable or malformed file fails the whole source.
pub fn ingest(spec: &SourceSpec) -> PipelineResult<PointSet> {
    let logger = StageLogger::new(&spec.source_id);
    let files = matched_files(spec)?;

    let set = match &spec.format {
        SourceFormat::Ease2 { rows, cols } => {
            FlatGrid::from_files(&spec.source_id, &files, *rows, *cols)?.into_point_set()
        }
        SourceFormat::Smap { group } => concat_files(spec, &files, |path| {
            smap::read_file(&spec.source_id, path, group)
        })?,
        SourceFormat::Cygnss { lon_convention } => concat_files(spec, &files, |path| {
            cygnss::read_file(&spec.source_id, path, *lon_convention)
        })?,
    };

    logger.record(&format!(
        "ingested {} records from {} file(s)",
        set.len(),
        files.len()
    ));
    Ok(set)
}

fn concat_files<F>(spec: &SourceSpec, files: &[PathBuf], read: F) -> PipelineResult<PointSet>
where
    F: Fn(&Path) -> PipelineResult<PointSet>,
{
    let mut combined = PointSet::new(&spec.source_id, spec.format.schema());
    for path in files {
        let set = read(path.as_path())?;
        log::debug!("[{}] {} -> {} records", spec.source_id, path.display(), set.len());
        combined
            .append(set)
            .map_err(|reason| PipelineError::format(&spec.source_id, path, reason))?;
    }
    Ok(combined)
}

/// Files in the source directory matching its pattern, sorted by path.
pub fn matched_files(spec: &SourceSpec) -> PipelineResult<Vec<PathBuf>> {
    // Only the file pattern is a glob; the directory is matched literally.
    let directory = glob::Pattern::escape(&spec.directory.to_string_lossy());
    let pattern = Path::new(&directory)
        .join(&spec.pattern)
        .to_string_lossy()
        .into_owned();
    let glob_error = |reason: String| PipelineError::Glob {
        source_id: spec.source_id.clone(),
        pattern: pattern.clone(),
        reason,
    };

    let mut files = Vec::new();
    for entry in glob::glob(&pattern).map_err(|err| glob_error(err.to_string()))? {
        let path = entry.map_err(|err| glob_error(err.to_string()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(PipelineError::format(
            &spec.source_id,
            &spec.directory,
            format!("no files match pattern `{}`", spec.pattern),
        ));
    }
    Ok(files)
}

pub(crate) fn bundle_error(source_id: &str, path: &Path, err: BundleError) -> PipelineError {
    PipelineError::format(source_id, path, err.to_string())
}

pub(crate) fn require<'a>(
    source_id: &str,
    path: &Path,
    bundle: &'a ArrayBundle,
    name: &str,
) -> PipelineResult<&'a ArrayD<f64>> {
    bundle
        .get(name)
        .ok_or_else(|| PipelineError::format(source_id, path, format!("missing array `{}`", name)))
}

/// Flattens coordinate and attribute arrays in row-major order into records.
///
/// All arrays must flatten to the same length.
pub(crate) fn flatten_records<'a, I>(
    source_id: &str,
    path: &Path,
    latitude: &ArrayD<f64>,
    longitude: &ArrayD<f64>,
    attributes: I,
    lon_convention: LongitudeConvention,
) -> PipelineResult<Vec<PointRecord>>
where
    I: IntoIterator<Item = (&'a str, ndarray::ArrayViewD<'a, f64>)>,
{
    let expected = latitude.len();
    let mismatch = |name: &str, len: usize| {
        PipelineError::format(
            source_id,
            path,
            format!(
                "shape mismatch: `{}` flattens to {} values, latitude to {}",
                name, len, expected
            ),
        )
    };
    if longitude.len() != expected {
        return Err(mismatch("longitude", longitude.len()));
    }

    let attributes: Vec<(&str, ndarray::ArrayViewD<'a, f64>)> = attributes.into_iter().collect();
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(attributes.len());
    for (name, view) in &attributes {
        if view.len() != expected {
            return Err(mismatch(*name, view.len()));
        }
        columns.push(view.iter().copied().collect());
    }

    let records = latitude
        .iter()
        .zip(longitude.iter())
        .enumerate()
        .map(|(row, (&lat, &lon))| {
            let values = columns.iter().map(|column| column[row]).collect();
            PointRecord::new(lat, lon_convention.apply(lon), values)
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    #[test]
    fn zero_to_360_longitudes_shift_into_signed_range() {
        for step in 0..720 {
            let raw = 180.0 + step as f64 * 0.25;
            let shifted = LongitudeConvention::ZeroTo360.apply(raw);
            assert_eq!(shifted, raw - 180.0);
            assert!((-180.0..180.0).contains(&shifted));
        }
        assert_eq!(LongitudeConvention::Signed.apply(-75.5), -75.5);
    }

    #[test]
    fn flatten_rejects_shape_mismatch() {
        let lat = Array::from_shape_vec(IxDyn(&[2, 2]), vec![1.0; 4]).unwrap();
        let lon = Array::from_shape_vec(IxDyn(&[2, 2]), vec![2.0; 4]).unwrap();
        let snr = Array::from_shape_vec(IxDyn(&[3]), vec![0.0; 3]).unwrap();

        let err = flatten_records(
            "cygnss",
            Path::new("a.gfab"),
            &lat,
            &lon,
            [("ddm_snr", snr.view())],
            LongitudeConvention::Signed,
        )
        .unwrap_err();
        assert!(err.to_string().contains("shape mismatch"));
    }

    #[test]
    fn missing_files_fail_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let spec = SourceSpec {
            source_id: "smap".into(),
            directory: dir.path().to_path_buf(),
            pattern: "*.gfab".into(),
            format: SourceFormat::Smap {
                group: smap::default_group(),
            },
        };
        assert!(matches!(ingest(&spec), Err(PipelineError::Format { .. })));
    }

    #[test]
    fn directory_names_are_not_treated_as_globs() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("run[2024]");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.gfab"), b"").unwrap();
        std::fs::write(dir.join("b.txt"), b"").unwrap();

        let spec = SourceSpec {
            source_id: "cygnss".into(),
            directory: dir.clone(),
            pattern: "*.gfab".into(),
            format: SourceFormat::Cygnss {
                lon_convention: LongitudeConvention::ZeroTo360,
            },
        };
        assert_eq!(matched_files(&spec).unwrap(), vec![dir.join("a.gfab")]);
    }

    #[test]
    fn source_format_parses_tagged_yaml_shape() {
        let format: SourceFormat =
            serde_json::from_str(r#"{"kind": "ease2", "rows": 406, "cols": 964}"#).unwrap();
        assert_eq!(format, SourceFormat::Ease2 { rows: 406, cols: 964 });

        let format: SourceFormat = serde_json::from_str(r#"{"kind": "cygnss"}"#).unwrap();
        assert_eq!(
            format,
            SourceFormat::Cygnss {
                lon_convention: LongitudeConvention::ZeroTo360
            }
        );
    }
}

//! Headerless EASE-2 style grid: two files of little-endian `f64` holding the
//! latitude and longitude of every cell, `rows × cols` each.

use crate::model::{Coordinate, PointRecord, PointSet};
use crate::prelude::{PipelineError, PipelineResult};
use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::Array2;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const LATITUDE_TOKEN: &str = "lats";
pub const LONGITUDE_TOKEN: &str = "lons";

/// Fixed-shape coordinate grid with no attribute fields.
#[derive(Debug, Clone)]
pub struct FlatGrid {
    source_id: String,
    latitudes: Array2<f64>,
    longitudes: Array2<f64>,
}

impl FlatGrid {
    /// Picks the latitude and longitude files out of `files` by name token and
    /// reshapes both to `(rows, cols)`.
    pub fn from_files(
        source_id: &str,
        files: &[PathBuf],
        rows: usize,
        cols: usize,
    ) -> PipelineResult<Self> {
        let latitude_path = pick_file(source_id, files, LATITUDE_TOKEN)?;
        let longitude_path = pick_file(source_id, files, LONGITUDE_TOKEN)?;
        Ok(Self {
            source_id: source_id.to_string(),
            latitudes: read_grid(source_id, latitude_path, rows, cols)?,
            longitudes: read_grid(source_id, longitude_path, rows, cols)?,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.latitudes.dim()
    }

    /// Coordinate of a single grid cell.
    pub fn coordinate_at(&self, row: usize, col: usize) -> Option<Coordinate> {
        let latitude = *self.latitudes.get((row, col))?;
        let longitude = *self.longitudes.get((row, col))?;
        Some(Coordinate::new(latitude, longitude))
    }

    /// One record per cell, row-major.
    pub fn into_point_set(self) -> PointSet {
        let mut set = PointSet::new(self.source_id, Vec::new());
        set.records = self
            .latitudes
            .iter()
            .zip(self.longitudes.iter())
            .map(|(&lat, &lon)| PointRecord::new(lat, lon, Vec::new()))
            .collect();
        set
    }
}

fn pick_file<'a>(source_id: &str, files: &'a [PathBuf], token: &str) -> PipelineResult<&'a Path> {
    let mut candidates = files.iter().filter(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy().contains(token))
            .unwrap_or(false)
    });
    let first = candidates.next().ok_or_else(|| {
        PipelineError::format(
            source_id,
            files.first().and_then(|p| p.parent()).unwrap_or(Path::new(".")),
            format!("no grid file with `{}` in its name", token),
        )
    })?;
    if let Some(extra) = candidates.next() {
        return Err(PipelineError::format(
            source_id,
            extra,
            format!("more than one grid file with `{}` in its name", token),
        ));
    }
    Ok(first.as_path())
}

fn read_grid(source_id: &str, path: &Path, rows: usize, cols: usize) -> PipelineResult<Array2<f64>> {
    let cells = rows
        .checked_mul(cols)
        .ok_or_else(|| PipelineError::format(source_id, path, "grid shape overflows"))?;
    let expected_bytes = (cells as u64) * 8;
    let unreadable = |err: std::io::Error| PipelineError::format(source_id, path, err.to_string());
    let actual_bytes = std::fs::metadata(path).map_err(unreadable)?.len();
    if actual_bytes != expected_bytes {
        return Err(PipelineError::format(
            source_id,
            path,
            format!(
                "shape mismatch: {} bytes cannot hold a {}x{} f64 grid ({} bytes)",
                actual_bytes, rows, cols, expected_bytes
            ),
        ));
    }

    let file = File::open(path).map_err(unreadable)?;
    let mut reader = BufReader::new(file);
    let mut values = vec![0.0f64; cells];
    reader
        .read_f64_into::<LittleEndian>(&mut values)
        .map_err(unreadable)?;

    Array2::from_shape_vec((rows, cols), values)
        .map_err(|err| PipelineError::format(source_id, path, err.to_string()))
}

use crate::workflow::config::{RegionConfig, RunConfig, SourceEntry};
use anyhow::Context;
use byteorder::{LittleEndian, WriteBytesExt};
use fusioncore::formats::{smap, ArrayBundle, DType, LongitudeConvention, SourceFormat};
use fusioncore::sink::ensure_directory;
use ndarray::{Array, IxDyn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const REGION_NAME: &str = "Demo";

/// Shape of a synthetic scene: an anchor grid, overlapping soil-moisture
/// granules with sentinel cells, and reflectometry tracks in 0..360 longitudes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub rows: usize,
    pub cols: usize,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub spacing: f64,
    pub smap_granules: usize,
    pub sentinel_fraction: f64,
    pub cygnss_tracks: usize,
    pub samples_per_track: usize,
    pub max_match_distance: f64,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            rows: 12,
            cols: 16,
            origin_lat: 25.0,
            origin_lon: -110.0,
            spacing: 0.5,
            smap_granules: 2,
            sentinel_fraction: 0.2,
            cygnss_tracks: 2,
            samples_per_track: 200,
            max_match_distance: 0.5,
            seed: 0,
        }
    }
}

impl SceneConfig {
    fn cell(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_lat - row as f64 * self.spacing,
            self.origin_lon + col as f64 * self.spacing,
        )
    }

    fn extent(&self) -> ((f64, f64), (f64, f64)) {
        let (top, left) = self.cell(0, 0);
        let (bottom, right) = self.cell(self.rows.max(1) - 1, self.cols.max(1) - 1);
        ((bottom, top), (left, right))
    }
}

/// Writes raw source files, a boundary collection and a run config under `dir`.
/// Returns the config path.
pub fn write_scene(dir: &Path, config: &SceneConfig) -> anyhow::Result<PathBuf> {
    ensure_directory(dir).with_context(|| format!("creating scene {}", dir.display()))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    write_grid(&dir.join("ease2"), config)?;
    write_smap(&dir.join("smap"), config, &mut rng)?;
    write_cygnss(&dir.join("cygnss"), config, &mut rng)?;
    write_boundaries(&dir.join("boundaries.geojson"), config)?;

    let mut sources = BTreeMap::new();
    sources.insert(
        "ease2".to_string(),
        SourceEntry {
            directory: "ease2".into(),
            pattern: "*.double".into(),
            format: SourceFormat::Ease2 {
                rows: config.rows,
                cols: config.cols,
            },
        },
    );
    sources.insert(
        "smap".to_string(),
        SourceEntry {
            directory: "smap".into(),
            pattern: "SMAP_*.gfab".into(),
            format: SourceFormat::Smap {
                group: smap::default_group(),
            },
        },
    );
    sources.insert(
        "cygnss".to_string(),
        SourceEntry {
            directory: "cygnss".into(),
            pattern: "cyg_*.gfab".into(),
            format: SourceFormat::Cygnss {
                lon_convention: LongitudeConvention::ZeroTo360,
            },
        },
    );
    let run = RunConfig {
        sources,
        anchor: "ease2".into(),
        region: RegionConfig {
            mask_file: "boundaries.geojson".into(),
            name: REGION_NAME.into(),
            attribute: "name".into(),
        },
        max_match_distance: config.max_match_distance,
        output: PathBuf::from("Master").join("fused.geojson"),
        write_intermediates: false,
    };

    let config_path = dir.join("run.yaml");
    run.save(&config_path)?;
    Ok(config_path)
}

fn write_grid(dir: &Path, config: &SceneConfig) -> anyhow::Result<()> {
    ensure_directory(dir)?;
    let name = |axis: &str| format!("EASE2_demo.{}.{}x{}x1.double", axis, config.cols, config.rows);
    let mut lats = open(&dir.join(name("lats")))?;
    let mut lons = open(&dir.join(name("lons")))?;
    for row in 0..config.rows {
        for col in 0..config.cols {
            let (lat, lon) = config.cell(row, col);
            lats.write_f64::<LittleEndian>(lat)?;
            lons.write_f64::<LittleEndian>(lon)?;
        }
    }
    lats.flush()?;
    lons.flush()?;
    Ok(())
}

fn write_smap(dir: &Path, config: &SceneConfig, rng: &mut StdRng) -> anyhow::Result<()> {
    ensure_directory(dir)?;
    let group = smap::DEFAULT_GROUP;
    let cells = config.rows * config.cols;
    let shape = [config.rows, config.cols];

    // every granule covers the same cells, so later granules only contribute
    // where earlier ones held a sentinel
    for granule in 0..config.smap_granules {
        let mut lats = Vec::with_capacity(cells);
        let mut lons = Vec::with_capacity(cells);
        let mut moisture = Vec::with_capacity(cells);
        let mut landcover = Vec::with_capacity(cells * smap::LANDCOVER_BANDS);
        for row in 0..config.rows {
            for col in 0..config.cols {
                let (lat, lon) = config.cell(row, col);
                if rng.gen_bool(config.sentinel_fraction.clamp(0.0, 1.0)) {
                    lats.push(smap::FILL_VALUE);
                    lons.push(smap::FILL_VALUE);
                    moisture.push(smap::FILL_VALUE);
                } else {
                    lats.push(lat + config.spacing * 0.2);
                    lons.push(lon + config.spacing * 0.2);
                    moisture.push(rng.gen_range(0.02..0.5));
                }
                for _ in 0..smap::LANDCOVER_BANDS {
                    landcover.push(rng.gen_range(0..17) as f64);
                }
            }
        }

        let mut bundle = ArrayBundle::new();
        let grid = |values: Vec<f64>| Array::from_shape_vec(IxDyn(&shape), values);
        bundle.insert(format!("{group}/latitude"), DType::F32, grid(lats)?);
        bundle.insert(format!("{group}/longitude"), DType::F32, grid(lons)?);
        bundle.insert(format!("{group}/soil_moisture"), DType::F32, grid(moisture)?);
        bundle.insert(
            format!("{group}/landcover_class"),
            DType::U8,
            Array::from_shape_vec(
                IxDyn(&[config.rows, config.cols, smap::LANDCOVER_BANDS]),
                landcover,
            )?,
        );
        let path = dir.join(format!("SMAP_L3_demo_{:03}.gfab", granule));
        bundle
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn write_cygnss(dir: &Path, config: &SceneConfig, rng: &mut StdRng) -> anyhow::Result<()> {
    const DDM_CHANNELS: usize = 4;
    ensure_directory(dir)?;
    let ((lat_min, lat_max), (lon_min, lon_max)) = config.extent();
    let count = config.samples_per_track * DDM_CHANNELS;

    for track in 0..config.cygnss_tracks {
        let mut lats = Vec::with_capacity(count);
        let mut lons = Vec::with_capacity(count);
        let mut snr = Vec::with_capacity(count);
        for _ in 0..count {
            lats.push(rng.gen_range(lat_min..=lat_max));
            // stored in the 0..360 convention the adapter undoes
            lons.push(rng.gen_range(lon_min..=lon_max) + 180.0);
            snr.push(rng.gen_range(-2.0..12.0));
        }

        let shape = IxDyn(&[config.samples_per_track, DDM_CHANNELS]);
        let mut bundle = ArrayBundle::new();
        bundle.insert("sp_lat", DType::F32, Array::from_shape_vec(shape.clone(), lats)?);
        bundle.insert("sp_lon", DType::F32, Array::from_shape_vec(shape.clone(), lons)?);
        bundle.insert("ddm_snr", DType::F32, Array::from_shape_vec(shape, snr)?);
        let path = dir.join(format!("cyg_demo_{:03}.gfab", track));
        bundle
            .save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn write_boundaries(path: &Path, config: &SceneConfig) -> anyhow::Result<()> {
    let ((lat_min, lat_max), (lon_min, lon_max)) = config.extent();
    let lat_pad = (lat_max - lat_min) * 0.25;
    let lon_pad = (lon_max - lon_min) * 0.25;
    let ring = |south: f64, north: f64, west: f64, east: f64| {
        json!([[[west, south], [east, south], [east, north], [west, north], [west, south]]])
    };

    let collection = json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": REGION_NAME },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": ring(lat_min + lat_pad, lat_max - lat_pad, lon_min + lon_pad, lon_max - lon_pad)
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "Elsewhere" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": ring(-10.0, -5.0, 20.0, 25.0)
                }
            }
        ]
    });
    std::fs::write(path, serde_json::to_string_pretty(&collection)?)
        .with_context(|| format!("writing {}", path.display()))
}

fn open(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Number of anchor cells that fall inside `mask`.
#[cfg(test)]
pub fn anchors_inside(config: &SceneConfig, mask: &fusioncore::region::RegionMask) -> usize {
    use fusioncore::model::Coordinate;
    (0..config.rows)
        .flat_map(|row| (0..config.cols).map(move |col| (row, col)))
        .filter(|&(row, col)| {
            let (lat, lon) = config.cell(row, col);
            mask.contains(Coordinate::new(lat, lon))
        })
        .count()
}

use crate::workflow::config::RunConfig;
use anyhow::Context;
use fusioncore::formats::SourceSpec;
use fusioncore::model::PointSet;
use fusioncore::processing::{self, FusionReport, SpatialFuser};
use fusioncore::region::RegionMask;
use fusioncore::sink;
use fusioncore::telemetry::{MetricsRecorder, StageCount};
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::task::JoinSet;

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub fused_rows: usize,
    pub output: PathBuf,
    pub intermediates: Vec<PathBuf>,
    pub fusion: FusionReport,
    pub stages: Vec<StageCount>,
}

#[derive(Clone)]
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn load_mask(&self) -> anyhow::Result<RegionMask> {
        let region = &self.config.region;
        RegionMask::load(&region.mask_file, &region.attribute, &region.name)
            .with_context(|| format!("loading region `{}`", region.name))
    }

    /// Ingests every source concurrently, then fuses once all of them are ready.
    ///
    /// The first failing source aborts the run; no fused output is written.
    pub fn execute(&self) -> anyhow::Result<RunSummary> {
        let fuser =
            SpatialFuser::new(self.config.fusion_config()).context("configuring spatial fuser")?;
        let mask = Arc::new(self.load_mask()?);
        let metrics = Arc::new(MetricsRecorder::new());

        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating ingestion runtime")?;
        let ingested = runtime.block_on(ingest_all(
            self.config.source_specs(),
            mask.clone(),
            metrics.clone(),
        ));
        runtime.shutdown_background();
        let mut sets = ingested?;

        let anchor = sets
            .remove(&self.config.anchor)
            .with_context(|| format!("anchor source `{}` produced no set", self.config.anchor))?;
        let mut candidates = Vec::new();
        for id in self.config.candidate_ids() {
            let set = sets
                .remove(&id)
                .with_context(|| format!("source `{}` produced no set", id))?;
            candidates.push(set);
        }

        let intermediates = if self.config.write_intermediates {
            self.write_intermediates(&anchor, &candidates)?
        } else {
            Vec::new()
        };

        let (table, fusion) = fuser
            .fuse(&anchor, &candidates)
            .context("fusing sources onto anchor grid")?;
        sink::write_fused_table(&table, &self.config.output)
            .with_context(|| format!("writing {}", self.config.output.display()))?;
        info!(
            "wrote {} fused rows to {}",
            table.len(),
            self.config.output.display()
        );

        let (stages, _) = metrics.snapshot();
        Ok(RunSummary {
            fused_rows: table.len(),
            output: self.config.output.clone(),
            intermediates,
            fusion,
            stages,
        })
    }

    fn write_intermediates(
        &self,
        anchor: &PointSet,
        candidates: &[PointSet],
    ) -> anyhow::Result<Vec<PathBuf>> {
        let base = self
            .config
            .output
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let mut written = Vec::new();
        for set in std::iter::once(anchor).chain(candidates) {
            let path = base
                .join(&set.source_id)
                .join(format!("{}.geojson", set.source_id));
            sink::write_point_set(set, &path)
                .with_context(|| format!("writing clipped `{}`", set.source_id))?;
            written.push(path);
        }
        Ok(written)
    }
}

async fn ingest_all(
    specs: Vec<SourceSpec>,
    mask: Arc<RegionMask>,
    metrics: Arc<MetricsRecorder>,
) -> anyhow::Result<HashMap<String, PointSet>> {
    let mut tasks = JoinSet::new();
    for spec in specs {
        let mask = mask.clone();
        let metrics = metrics.clone();
        tasks.spawn_blocking(move || {
            processing::ingest_source(&spec, &mask, &metrics).map(|set| (spec.source_id, set))
        });
    }

    let mut sets = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        match joined.context("ingestion task failed to complete")? {
            Ok((source_id, set)) => {
                sets.insert(source_id, set);
            }
            Err(err) => {
                tasks.abort_all();
                return Err(err).context("ingesting sources");
            }
        }
    }
    Ok(sets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scene::{write_scene, SceneConfig};

    #[test]
    fn runner_fuses_generated_scene() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_scene(dir.path(), &SceneConfig::default()).unwrap();
        let mut cfg = RunConfig::load(&config_path).unwrap();
        cfg.write_intermediates = true;

        let runner = Runner::new(cfg.clone());
        let anchor_inside = runner
            .load_mask()
            .map(|mask| crate::generator::scene::anchors_inside(&SceneConfig::default(), &mask))
            .unwrap();
        let summary = runner.execute().unwrap();

        assert_eq!(summary.fused_rows, anchor_inside);
        assert!(summary.output.exists());
        assert_eq!(summary.intermediates.len(), 3);
        assert_eq!(summary.fusion.sources.len(), 2);
        assert!(summary.fusion.sources.iter().all(|s| s.matched > 0));
    }

    #[test]
    fn missing_region_aborts_before_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_scene(dir.path(), &SceneConfig::default()).unwrap();
        let mut cfg = RunConfig::load(&config_path).unwrap();
        cfg.region.name = "Atlantis".into();

        let err = Runner::new(cfg.clone()).execute().unwrap_err();
        assert!(format!("{:#}", err).contains("Atlantis"));
        assert!(!cfg.output.exists());
    }

    #[test]
    fn corrupt_source_fails_the_whole_run() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_scene(dir.path(), &SceneConfig::default()).unwrap();
        let cfg = RunConfig::load(&config_path).unwrap();
        let cygnss_dir = cfg.sources["cygnss"].directory.clone();
        std::fs::write(cygnss_dir.join("cyg_zz_corrupt.gfab"), b"not a bundle").unwrap();

        let err = Runner::new(cfg.clone()).execute().unwrap_err();
        assert!(format!("{:#}", err).contains("cyg_zz_corrupt.gfab"));
        assert!(!cfg.output.exists());
    }
}

use anyhow::{bail, Context};
use clap::Parser;
use generator::scene::{write_scene, SceneConfig};
use std::fs;
use std::path::PathBuf;
use workflow::config::RunConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Fuse remote-sensing sources onto an anchor grid")]
struct Args {
    /// Load a run config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the region name selected from the mask file
    #[arg(long)]
    region: Option<String>,
    /// Override the maximum nearest-neighbor match distance (degrees)
    #[arg(long)]
    max_match_distance: Option<f64>,
    /// Override the fused output path (relative paths resolve against the working directory, not the config file)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write the selected region alone to this GeoJSON file and exit
    #[arg(long)]
    extract_region: Option<PathBuf>,
    /// Write a synthetic demo scene (raw sources, mask, run.yaml) into this directory and exit
    #[arg(long)]
    generate: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(dir) = args.generate {
        let scene = SceneConfig {
            seed: args.seed,
            ..Default::default()
        };
        let config_path = write_scene(&dir, &scene)?;
        println!("Scene written -> {}", config_path.display());
        return Ok(());
    }

    let Some(config_path) = args.config else {
        bail!("--config is required unless --generate is given");
    };
    let mut config = RunConfig::load(&config_path)?;
    config.apply_overrides(args.region, args.max_match_distance, args.output);
    config.validate()?;
    let runner = Runner::new(config);

    if let Some(path) = args.extract_region {
        let mask = runner.load_mask()?;
        mask.write_geojson(&path)
            .with_context(|| format!("writing region to {}", path.display()))?;
        println!(
            "Region `{}` ({} polygons) -> {}",
            mask.name(),
            mask.polygon_count(),
            path.display()
        );
        return Ok(());
    }

    let summary = runner.execute()?;
    println!(
        "Fused {} anchor rows -> {}",
        summary.fused_rows,
        summary.output.display()
    );
    for source in &summary.fusion.sources {
        println!(
            "  {}: {} candidates, {} matched, {} beyond distance, mean distance {}",
            source.source_id,
            source.candidates,
            source.matched,
            source.beyond_distance,
            source
                .mean_distance
                .map(|d| format!("{:.4}", d))
                .unwrap_or_else(|| "n/a".into())
        );
    }

    let report_path = summary.output.with_extension("report.json");
    let report = serde_json::to_string_pretty(&summary).context("serializing run report")?;
    fs::write(&report_path, report)
        .with_context(|| format!("writing run report {}", report_path.display()))?;

    Ok(())
}

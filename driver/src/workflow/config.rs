use anyhow::{bail, Context};
use fusioncore::formats::{SourceFormat, SourceSpec};
use fusioncore::prelude::FusionConfig;
use fusioncore::region::DEFAULT_ATTRIBUTE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SourceEntry {
    pub directory: PathBuf,
    pub pattern: String,
    pub format: SourceFormat,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RegionConfig {
    pub mask_file: PathBuf,
    pub name: String,
    #[serde(default = "default_attribute")]
    pub attribute: String,
}

fn default_attribute() -> String {
    DEFAULT_ATTRIBUTE.to_string()
}

/// One fusion run: where every source lives, which one is the anchor grid,
/// the region to clip to and where the fused table goes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub sources: BTreeMap<String, SourceEntry>,
    pub anchor: String,
    pub region: RegionConfig,
    pub max_match_distance: f64,
    pub output: PathBuf,
    #[serde(default)]
    pub write_intermediates: bool,
}

impl RunConfig {
    /// Reads a YAML config. Relative paths are taken relative to the file's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading run config {}", path_ref.display()))?;
        let mut config: RunConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing run config {}", path_ref.display()))?;
        if let Some(base) = path_ref.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path_ref = path.as_ref();
        let contents = serde_yaml::to_string(self).context("serializing run config")?;
        fs::write(path_ref, contents)
            .with_context(|| format!("writing run config {}", path_ref.display()))
    }

    pub fn apply_overrides(
        &mut self,
        region: Option<String>,
        max_match_distance: Option<f64>,
        output: Option<PathBuf>,
    ) {
        if let Some(region) = region {
            self.region.name = region;
        }
        if let Some(distance) = max_match_distance {
            self.max_match_distance = distance;
        }
        if let Some(output) = output {
            self.output = output;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.sources.contains_key(&self.anchor) {
            bail!("anchor source `{}` is not listed under sources", self.anchor);
        }
        if self.sources.len() < 2 {
            bail!("at least one candidate source besides the anchor is required");
        }
        self.fusion_config()
            .validate()
            .context("validating fusion settings")?;
        Ok(())
    }

    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig::new(self.max_match_distance)
    }

    pub fn source_specs(&self) -> Vec<SourceSpec> {
        self.sources
            .iter()
            .map(|(name, entry)| SourceSpec {
                source_id: name.clone(),
                directory: entry.directory.clone(),
                pattern: entry.pattern.clone(),
                format: entry.format.clone(),
            })
            .collect()
    }

    /// Candidate sources in fusion order (sorted by name, anchor excluded).
    pub fn candidate_ids(&self) -> Vec<String> {
        self.sources
            .keys()
            .filter(|name| **name != self.anchor)
            .cloned()
            .collect()
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        for entry in self.sources.values_mut() {
            resolve(&mut entry.directory);
        }
        resolve(&mut self.region.mask_file);
        resolve(&mut self.output);
    }
}

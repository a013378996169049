use crate::config::schema::{MonitorConfig, OutputConfig};
use crate::error::{Error, Result};
use crate::output::{OutputHandler, console::ConsoleOutput, csv::CsvOutput, json::JsonOutput};
use crate::target::{LinkTarget, StaticTargets};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<MonitorConfig> {
        let path = path.as_ref();
        let mut visited = HashSet::new();
        Self::load_with_inheritance(path, &mut visited, false)
    }

    fn load_with_inheritance(
        path: &Path,
        visited: &mut HashSet<PathBuf>,
        is_parent_load: bool,
    ) -> Result<MonitorConfig> {
        let path = fs::canonicalize(path).map_err(|e| {
            Error::Config(format!("{}: {}", path.display(), e))
        })?;

        if visited.contains(&path) {
            return Err(Error::Config(format!(
                "Circular inheritance detected involving {}",
                path.display()
            )));
        }
        visited.insert(path.clone());

        let (config, keys) = Self::load_file(&path)?;

        let final_config = if let Some(parent_path_str) = &config.extends {
            let parent_path = path.parent()
                .ok_or_else(|| Error::Config(format!(
                    "Cannot determine parent directory for {}",
                    path.display()
                )))?
                .join(parent_path_str);

            let parent_config = Self::load_with_inheritance(&parent_path, visited, true)?;
            Self::merge_configs(parent_config, config, &keys)
        } else {
            config
        };

        if !is_parent_load {
            final_config.validate()?;
            if final_config.refresh_interval_secs == Some(0) {
                return Err(Error::Config(
                    "refresh_interval_secs must be at least 1".to_string(),
                ));
            }
        }

        Ok(final_config)
    }

    /// Parses a file and reports which top-level keys it sets explicitly.
    fn load_file(path: &Path) -> Result<(MonitorConfig, HashSet<String>)> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let value: serde_json::Value = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(Error::Config(format!(
                    "Unsupported file extension: {}",
                    path.display()
                )));
            }
        };

        let keys = value
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default();
        let config: MonitorConfig = serde_json::from_value(value)?;
        Ok((config, keys))
    }

    /// Applies every key the child file sets, even when it equals the default.
    fn merge_configs(
        mut parent: MonitorConfig,
        child: MonitorConfig,
        child_keys: &HashSet<String>,
    ) -> MonitorConfig {
        let set = |key: &str| child_keys.contains(key);

        if set("name") {
            parent.name = child.name;
        }
        if set("base_url") {
            parent.base_url = child.base_url;
        }
        if set("concurrency") {
            parent.concurrency = child.concurrency;
        }
        if set("request_timeout_ms") {
            parent.request_timeout_ms = child.request_timeout_ms;
        }
        if set("staleness_secs") {
            parent.staleness_secs = child.staleness_secs;
        }
        if set("refresh_interval_secs") {
            parent.refresh_interval_secs = child.refresh_interval_secs;
        }
        if set("bind") {
            parent.bind = child.bind;
        }
        if set("output") {
            parent.output = child.output;
        }

        for target in child.targets {
            match parent.targets.iter_mut().find(|t| t.url == target.url) {
                Some(existing) => *existing = target,
                None => parent.targets.push(target),
            }
        }

        parent.extends = None;
        parent
    }

    /// Resolves the registry to absolute, unique URLs. `base_url` overrides
    /// the configured one when given.
    pub fn resolve_targets(
        config: &MonitorConfig,
        base_url: Option<&str>,
    ) -> Result<Vec<LinkTarget>> {
        let base = base_url.or(config.base_url.as_deref());
        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(config.targets.len());

        for entry in &config.targets {
            let target = LinkTarget::from(entry.clone()).resolve(base)?;
            if !seen.insert(target.url.clone()) {
                return Err(Error::Config(format!("Duplicate target URL: {}", target.url)));
            }
            targets.push(target);
        }

        Ok(targets)
    }

    pub fn create_provider(
        config: &MonitorConfig,
        base_url: Option<&str>,
    ) -> Result<StaticTargets> {
        StaticTargets::new(Self::resolve_targets(config, base_url)?)
    }

    pub fn request_timeout(config: &MonitorConfig) -> Duration {
        Duration::from_millis(config.request_timeout_ms)
    }

    pub fn staleness(config: &MonitorConfig) -> Duration {
        Duration::from_secs(config.staleness_secs)
    }

    pub fn create_output(
        config: &MonitorConfig,
        multi: Option<Arc<indicatif::MultiProgress>>,
    ) -> Result<Box<dyn OutputHandler>> {
        let handler: Box<dyn OutputHandler> = match &config.output {
            Some(OutputConfig::Console) | None => Box::new(ConsoleOutput::new(multi)),
            Some(OutputConfig::Json { path }) => Box::new(JsonOutput::new(PathBuf::from(path))?),
            Some(OutputConfig::Csv { path }) => Box::new(CsvOutput::new(PathBuf::from(path))?),
        };
        Ok(handler)
    }
}

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Display tag attached to a target. Passed through to results untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Importance::Critical => "critical",
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        };
        f.write_str(tag)
    }
}

/// A single URL registered for health checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub url: String,
    pub label: String,
    pub context: String,
    pub importance: Importance,
}

impl LinkTarget {
    pub fn new(
        url: impl Into<String>,
        label: impl Into<String>,
        context: impl Into<String>,
        importance: Importance,
    ) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
            context: context.into(),
            importance,
        }
    }

    /// Resolves a registry entry into an absolute http(s) target.
    ///
    /// Entries starting with `/` are internal routes and are joined onto
    /// `base_url`; everything else must already be absolute.
    pub fn resolve(mut self, base_url: Option<&str>) -> Result<Self> {
        let url = if self.url.starts_with('/') {
            let base = base_url.ok_or_else(|| {
                Error::Config(format!(
                    "Target '{}' uses relative URL {} but no base_url is configured",
                    self.label, self.url
                ))
            })?;
            let base = Url::parse(base)
                .map_err(|e| Error::Config(format!("Invalid base_url {}: {}", base, e)))?;
            base.join(&self.url)
                .map_err(|e| Error::Config(format!("{}: {}", self.url, e)))?
        } else {
            Url::parse(&self.url).map_err(|e| {
                Error::Config(format!(
                    "Target '{}' has invalid URL {}: {}",
                    self.label, self.url, e
                ))
            })?
        };

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "Target '{}' uses unsupported scheme '{}'",
                    self.label, other
                )));
            }
        }

        self.url = url.to_string();
        Ok(self)
    }
}

/// Source of the registry checked on every cycle.
pub trait TargetProvider: Send + Sync {
    fn list_targets(&self) -> Result<Vec<LinkTarget>>;
}

/// Registry fixed at startup, typically built from the loaded config.
#[derive(Debug, Clone)]
pub struct StaticTargets {
    targets: Vec<LinkTarget>,
}

impl StaticTargets {
    pub fn new(targets: Vec<LinkTarget>) -> Result<Self> {
        if targets.is_empty() {
            return Err(Error::Config("Target registry is empty".to_string()));
        }
        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl TargetProvider for StaticTargets {
    fn list_targets(&self) -> Result<Vec<LinkTarget>> {
        Ok(self.targets.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_targets_join_the_base_url() {
        let target = LinkTarget::new("/api/clients", "Clients API", "API", Importance::Critical)
            .resolve(Some("http://localhost:5000"))
            .unwrap();
        assert_eq!(target.url, "http://localhost:5000/api/clients");
    }

    #[test]
    fn relative_target_without_base_is_rejected() {
        let err = LinkTarget::new("/dashboard", "Dashboard", "Menu", Importance::High)
            .resolve(None)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        let err = LinkTarget::new("ftp://files.example/", "Files", "External", Importance::Low)
            .resolve(None)
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn static_registry_is_deterministic() {
        let provider = StaticTargets::new(vec![
            LinkTarget::new("https://www.stf.jus.br", "STF", "Jurisprudence", Importance::High),
            LinkTarget::new("https://www.stj.jus.br", "STJ", "Jurisprudence", Importance::High),
        ])
        .unwrap();
        assert_eq!(provider.list_targets().unwrap(), provider.list_targets().unwrap());
        assert_eq!(provider.len(), 2);
    }

    #[test]
    fn empty_registry_is_a_configuration_failure() {
        assert!(matches!(StaticTargets::new(vec![]), Err(Error::Config(_))));
    }
}

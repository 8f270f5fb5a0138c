use anyhow::{Context, Result};
use fuse_broker_orchestrations::DeployerConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Namespace the broker itself runs in
    pub broker_namespace: String,
    pub deployer_id: String,
    pub route_suffix: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            broker_namespace: lookup("BROKER_NAMESPACE")
                .unwrap_or_else(|| "managed-services-broker".to_string()),
            deployer_id: lookup("DEPLOYER_ID").unwrap_or_else(|| "fuse-deployer".to_string()),
            route_suffix: lookup("ROUTE_SUFFIX"),
        })
    }

    pub fn deployer_config(&self) -> DeployerConfig {
        DeployerConfig::new(self.route_suffix.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.broker_namespace, "managed-services-broker");
        assert_eq!(config.deployer_id, "fuse-deployer");
        assert_eq!(config.deployer_config().route_suffix, None);
    }

    #[test]
    fn test_route_suffix_flows_into_deployer_config() {
        let config = config_from(&[("ROUTE_SUFFIX", "apps.example.com")]).unwrap();
        assert_eq!(
            config.deployer_config().route_suffix.as_deref(),
            Some("apps.example.com")
        );

        let config = config_from(&[("ROUTE_SUFFIX", "")]).unwrap();
        assert_eq!(config.deployer_config().route_suffix, None);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = config_from(&[("SERVER_PORT", "http")]).unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }
}

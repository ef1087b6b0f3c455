use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignerConfig {
    /// Minimum similarity (0-100) a token needs to be selected.
    pub threshold: u32,
    /// Half-height of the vertical value search band, in pixels.
    pub value_window: f64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            threshold: 50,
            value_window: 150.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    pub cache_capacity: usize,
    pub enrich_with_context: bool,
    pub context_hint: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 128,
            enrich_with_context: true,
            context_hint: "datasheet meaning".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    pub model: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub context_endpoint: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 60,
            context_endpoint: "https://api.duckduckgo.com/".to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn api_key(&self) -> AppResult<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(AppError::ProviderAuth)
    }
}

/// Entity and field names that drive identity linking and relationship building.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    pub root_entity: String,
    pub root_link_field: String,
    pub equipment_entity: String,
    pub equipment_link_field: String,
    pub equipment_tag_field: String,
    /// Fields that, with the tag, identify one equipment.
    pub equipment_discriminator_fields: Vec<String>,
    pub subpart_entity: String,
    pub subpart_link_field: String,
    pub subpart_name_field: String,
    pub nozzle_entity: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            root_entity: "metaData".to_string(),
            root_link_field: "dataSheetUuid".to_string(),
            equipment_entity: "equipments".to_string(),
            equipment_link_field: "equipmentUuid".to_string(),
            equipment_tag_field: "equipmentTag".to_string(),
            equipment_discriminator_fields: vec![
                "equipmentTypeName".to_string(),
                "subpartTypeName".to_string(),
            ],
            subpart_entity: "subparts".to_string(),
            subpart_link_field: "subpartUuid".to_string(),
            subpart_name_field: "subpartName".to_string(),
            nozzle_entity: "nozzles".to_string(),
        }
    }
}

impl GraphConfig {
    pub fn equipment_key_fields(&self) -> Vec<&str> {
        std::iter::once(self.equipment_tag_field.as_str())
            .chain(self.equipment_discriminator_fields.iter().map(String::as_str))
            .collect()
    }

    pub fn link_fields(&self) -> [&str; 3] {
        [
            self.root_link_field.as_str(),
            self.equipment_link_field.as_str(),
            self.subpart_link_field.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub coerce_numbers: bool,
    pub link_identities: bool,
    pub camel_case_keys: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            coerce_numbers: true,
            link_identities: true,
            camel_case_keys: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ReconConfig {
    pub aligner: AlignerConfig,
    pub resolver: ResolverConfig,
    pub provider: ProviderConfig,
    pub graph: GraphConfig,
    pub pipeline: PipelineConfig,
}

impl ReconConfig {
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> AppResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Applies `DATASHEET_RECON_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("DATASHEET_RECON_THRESHOLD") {
            let threshold = parse_override::<u32>("DATASHEET_RECON_THRESHOLD", &raw)?;
            if threshold > 100 {
                return Err(AppError::InvalidInput(format!(
                    "DATASHEET_RECON_THRESHOLD must be within 0..=100, got {threshold}"
                )));
            }
            self.aligner.threshold = threshold;
        }
        if let Some(raw) = lookup("DATASHEET_RECON_VALUE_WINDOW") {
            let window = parse_override::<f64>("DATASHEET_RECON_VALUE_WINDOW", &raw)?;
            if !window.is_finite() || window < 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "DATASHEET_RECON_VALUE_WINDOW must be a non-negative number, got {raw}"
                )));
            }
            self.aligner.value_window = window;
        }
        if let Some(raw) = lookup("DATASHEET_RECON_CACHE_CAPACITY") {
            self.resolver.cache_capacity =
                parse_override::<usize>("DATASHEET_RECON_CACHE_CAPACITY", &raw)?;
        }
        if let Some(raw) = lookup("DATASHEET_RECON_MODEL") {
            if !raw.trim().is_empty() {
                self.provider.model = raw.trim().to_string();
            }
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::InvalidInput(format!("{key} has an invalid value '{raw}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::ReconConfig;

    #[test]
    fn defaults_match_documented_values() {
        let config = ReconConfig::default();
        assert_eq!(config.aligner.threshold, 50);
        assert_eq!(config.aligner.value_window, 150.0);
        assert_eq!(config.resolver.cache_capacity, 128);
        assert_eq!(config.graph.nozzle_entity, "nozzles");
        assert!(config.pipeline.link_identities);
        assert_eq!(config.provider.model, "gemini-2.0-flash");
        assert_eq!(
            config.graph.equipment_discriminator_fields,
            vec!["equipmentTypeName", "subpartTypeName"]
        );
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = ReconConfig::from_toml(
            r#"
            [aligner]
            threshold = 70

            [graph]
            rootEntity = "header"
            "#,
        )
        .expect("toml should parse");
        assert_eq!(config.aligner.threshold, 70);
        assert_eq!(config.aligner.value_window, 150.0);
        assert_eq!(config.graph.root_entity, "header");
        assert_eq!(config.graph.equipment_link_field, "equipmentUuid");
    }

    #[test]
    fn env_overrides_are_validated() {
        let mut config = ReconConfig::default();
        let env: HashMap<&str, &str> = [
            ("DATASHEET_RECON_THRESHOLD", "65"),
            ("DATASHEET_RECON_VALUE_WINDOW", "80.5"),
        ]
        .into_iter()
        .collect();
        config
            .apply_overrides(|key| env.get(key).map(|value| value.to_string()))
            .expect("overrides apply");
        assert_eq!(config.aligner.threshold, 65);
        assert_eq!(config.aligner.value_window, 80.5);

        let err = config
            .apply_overrides(|key| (key == "DATASHEET_RECON_THRESHOLD").then(|| "250".to_string()))
            .expect_err("out of range");
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}

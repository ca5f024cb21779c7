use anyhow::Context;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::api::{ListBooksParams, DEFAULT_PAGE_SIZE};

pub const DEFAULT_API_BASE_URL: &str = "https://library-management-api-rrishiddh.vercel.app/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const CONFIG_FILE: &str = "config/library";
const ENV_PREFIX: &str = "LIBRARY";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CatalogSettings {
    pub page_size: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl CatalogSettings {
    /// Listing query for the catalog page, newest first
    pub fn list_params(&self) -> ListBooksParams {
        ListBooksParams {
            limit: Some(self.page_size),
            ..ListBooksParams::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct LibrarySettings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
}

impl LibrarySettings {
    /// Loads defaults, then `config/library.*` if present, then `LIBRARY__*`
    /// environment variables (e.g. `LIBRARY__API__BASE_URL`)
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(
            Config::builder().add_source(File::with_name(CONFIG_FILE).required(false)),
            environment(),
        )
    }

    fn load_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let settings = builder
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs as i64)?
            .set_default("catalog.page_size", i64::from(defaults.catalog.page_size))?
            .add_source(environment)
            .build()
            .context("Failed to build library settings")?;

        let settings: LibrarySettings = settings
            .try_deserialize()
            .context("Failed to deserialize library settings")?;
        tracing::info!("Library API base url: {}", settings.api.base_url);
        Ok(settings)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod settings_tests {
    use config::{Config, File, FileFormat, Map};

    use super::*;

    fn environment_with(vars: &[(&str, &str)]) -> Environment {
        let vars: Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        environment().source(Some(vars))
    }

    #[test]
    fn defaults_point_at_hosted_api() {
        let settings = LibrarySettings::load_from(Config::builder(), environment_with(&[]))
            .expect("Failed to load");
        assert_eq!(settings.api.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.catalog.page_size, 50);
    }

    #[test]
    fn file_values_override_defaults() {
        let builder = Config::builder().add_source(File::from_str(
            "[api]\nbase_url = \"http://127.0.0.1:8080\"\n\n[catalog]\npage_size = 20\n",
            FileFormat::Toml,
        ));
        let settings =
            LibrarySettings::load_from(builder, environment_with(&[])).expect("Failed to load");
        assert_eq!(settings.api.base_url, "http://127.0.0.1:8080");
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.catalog.page_size, 20);
        assert_eq!(settings.catalog.list_params().limit, Some(20));
    }

    #[test]
    fn environment_overrides_file() {
        let builder = Config::builder().add_source(File::from_str(
            "[api]\nbase_url = \"http://127.0.0.1:8080\"\n\n[catalog]\npage_size = 20\n",
            FileFormat::Toml,
        ));
        let environment = environment_with(&[
            ("LIBRARY__API__BASE_URL", "http://library.internal/api"),
            ("LIBRARY__API__TIMEOUT_SECS", "5"),
            ("OTHER__API__BASE_URL", "http://ignored"),
        ]);
        let settings = LibrarySettings::load_from(builder, environment).expect("Failed to load");
        assert_eq!(settings.api.base_url, "http://library.internal/api");
        assert_eq!(settings.api.timeout_secs, 5);
        assert_eq!(settings.catalog.page_size, 20);
    }
}

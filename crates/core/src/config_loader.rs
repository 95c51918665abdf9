use crate::config::StrategyConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads strategy configuration from `config/Config.toml`, environment
    /// variables, and an optional `config/Config.json` overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<StrategyConfig> {
        Self::load_from(std::path::Path::new("config/Config.toml"))
    }

    /// Loads strategy configuration from an explicit TOML path instead of
    /// the default `config/Config.toml` location.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn load_from(path: &std::path::Path) -> Result<StrategyConfig> {
        let config: StrategyConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FUNDING_ARB_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }

    /// Loads strategy configuration with a specific profile, merging
    /// `config/Config.{profile}.toml` over the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<StrategyConfig> {
        let config: StrategyConfig = Figment::new()
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed("FUNDING_ARB_").split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }
}

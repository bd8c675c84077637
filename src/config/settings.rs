use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Result};

use crate::{
    env::{load_env_file, process_env, EnvMap, AUTH_TOKEN_VAR, BASE_URL_VAR, RESULTS_DIR_VAR},
    http::DEFAULT_BASE_URL,
};

use super::loader::{LoadedConfig, ProfileConfig, SmokeConfig, CONFIG_FILE_NAME};

pub const DEFAULT_RESULTS_DIR: &str = "allure-results";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub auth_token: String,
    pub results_dir: PathBuf,
    pub timeout: Option<Duration>,
    pub profile_name: Option<String>,
    pub env_files: Vec<PathBuf>,
}

/// Values given on the command line. They beat every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub results_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SettingsBuilder {
    base_dir: PathBuf,
    config: Option<LoadedConfig>,
    requested_profile: Option<String>,
    explicit_env: Option<PathBuf>,
    overrides: Overrides,
}

impl SettingsBuilder {
    pub fn new(
        base_dir: PathBuf,
        config: Option<LoadedConfig>,
        requested_profile: Option<String>,
        explicit_env: Option<PathBuf>,
        overrides: Overrides,
    ) -> Self {
        Self {
            base_dir,
            config,
            requested_profile,
            explicit_env,
            overrides,
        }
    }

    pub fn build(&self) -> Result<Settings> {
        self.build_with(&process_env())
    }

    /// Resolution order: overrides, `process`, the dotenv file, the selected
    /// profile, the config root, then built-in defaults.
    pub fn build_with(&self, process: &EnvMap) -> Result<Settings> {
        let root = self.config.as_ref().map(|loaded| &loaded.config);
        let profile = match root {
            Some(config) => resolve_profile(config, self.requested_profile.as_deref())?,
            None => {
                if let Some(name) = &self.requested_profile {
                    bail!("Unknown profile: {name} (no {CONFIG_FILE_NAME} found)");
                }
                None
            }
        };
        let profile_config = profile.as_ref().map(|resolved| resolved.config);
        let config_dir = self
            .config
            .as_ref()
            .map(|loaded| loaded.dir.clone())
            .unwrap_or_else(|| self.base_dir.clone());

        let env_path = self.explicit_env.clone().or_else(|| {
            profile_config
                .and_then(|p| p.env.as_deref())
                .or_else(|| root.and_then(|r| r.env.as_deref()))
                .map(|value| resolve_relative(&config_dir, value))
        });

        let mut dotenv = EnvMap::new();
        let mut env_files = Vec::new();
        if let Some(path) = env_path {
            env_files.push(load_env_file(&path, &mut dotenv)?);
        }

        let from_env = |key: &str| {
            process
                .get(key)
                .or_else(|| dotenv.get(key))
                .cloned()
        };

        let base_url = self
            .overrides
            .base_url
            .clone()
            .or_else(|| from_env(BASE_URL_VAR))
            .or_else(|| profile_config.and_then(|p| p.base_url.clone()))
            .or_else(|| root.and_then(|r| r.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let auth_token = from_env(AUTH_TOKEN_VAR)
            .or_else(|| profile_config.and_then(|p| p.auth_token.clone()))
            .or_else(|| root.and_then(|r| r.auth_token.clone()))
            .unwrap_or_default();

        let results_dir = match &self.overrides.results_dir {
            Some(dir) => resolve_relative(&self.base_dir, &dir.to_string_lossy()),
            None => match from_env(RESULTS_DIR_VAR) {
                Some(dir) => resolve_relative(&self.base_dir, &dir),
                None => profile_config
                    .and_then(|p| p.results_dir.as_deref())
                    .or_else(|| root.and_then(|r| r.results_dir.as_deref()))
                    .map(|dir| resolve_relative(&config_dir, dir))
                    .unwrap_or_else(|| self.base_dir.join(DEFAULT_RESULTS_DIR)),
            },
        };

        let timeout = profile_config
            .and_then(|p| p.timeout_secs)
            .or_else(|| root.and_then(|r| r.timeout_secs))
            .map(Duration::from_secs);

        Ok(Settings {
            base_url,
            auth_token,
            results_dir,
            timeout,
            profile_name: profile.map(|resolved| resolved.name),
            env_files,
        })
    }
}

fn resolve_relative(base: &Path, value: &str) -> PathBuf {
    let candidate = Path::new(value);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}

struct ResolvedProfile<'a> {
    name: String,
    config: &'a ProfileConfig,
}

fn resolve_profile<'a>(
    config: &'a SmokeConfig,
    requested: Option<&str>,
) -> Result<Option<ResolvedProfile<'a>>> {
    if let Some(name) = requested {
        return match config.profiles.get(name) {
            Some(profile) => Ok(Some(ResolvedProfile {
                name: name.to_string(),
                config: profile,
            })),
            None => bail!("Unknown profile: {name}"),
        };
    }

    if let Some(default) = &config.default_profile {
        return match config.profiles.get(default) {
            Some(profile) => Ok(Some(ResolvedProfile {
                name: default.to_string(),
                config: profile,
            })),
            None => bail!("Default profile {default} is not defined"),
        };
    }

    Ok(None)
}

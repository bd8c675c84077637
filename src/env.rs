use std::{
    collections::HashMap,
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

pub type EnvMap = HashMap<String, String>;

pub const BASE_URL_VAR: &str = "API_BASE_URL";
pub const AUTH_TOKEN_VAR: &str = "AUTH_TOKEN";
pub const RESULTS_DIR_VAR: &str = "OBJSMOKE_RESULTS_DIR";

/// Reads a dotenv file into `env`; later keys win.
pub fn load_env_file(path: &Path, env: &mut EnvMap) -> Result<PathBuf> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading env file {}", path.display()))?;

    for item in dotenvy::from_read_iter(Cursor::new(content)) {
        let (key, value) = item.with_context(|| format!("parsing env file {}", path.display()))?;
        env.insert(key, value);
    }

    Ok(path.to_path_buf())
}

/// The process variables this tool reads, and nothing else.
pub fn process_env() -> EnvMap {
    [BASE_URL_VAR, AUTH_TOKEN_VAR, RESULTS_DIR_VAR]
        .into_iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn load_env_file_merges_values() -> Result<()> {
        let temp = tempdir()?;
        let env_path = temp.path().join("ci.env");
        fs::write(
            &env_path,
            "AUTH_TOKEN=abc\n# comment\nAPI_BASE_URL=\"http://localhost:8080\"\n",
        )?;

        let mut env = EnvMap::new();
        env.insert("AUTH_TOKEN".to_string(), "old".to_string());
        let loaded = load_env_file(&env_path, &mut env)?;

        assert_eq!(loaded, env_path);
        assert_eq!(env.get("AUTH_TOKEN"), Some(&"abc".to_string()));
        assert_eq!(
            env.get("API_BASE_URL"),
            Some(&"http://localhost:8080".to_string())
        );
        Ok(())
    }

    #[test]
    fn load_env_file_propagates_io_errors() {
        let mut env = EnvMap::new();
        let err = load_env_file(Path::new("does-not-exist.env"), &mut env).unwrap_err();
        assert!(err.to_string().contains("reading env file"));
    }
}

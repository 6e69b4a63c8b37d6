use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;

pub const CONFIG_DIR_ENV: &str = "MC_BOT_CONFIG_DIR";

/// TOML config loader for the runner.
///
/// Search order:
/// 1) `MC_BOT_CONFIG_DIR/<relative_path>`
/// 2) `./<relative_path>`
/// 3) `<workspace_root>/config/<relative_path>`
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn parse_from_file<T: DeserializeOwned>(relative_path: &str) -> anyhow::Result<T> {
        let path = Self::find(relative_path)
            .ok_or_else(|| anyhow::anyhow!("Config file not found for {relative_path:?}"))?;
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        Self::parse_from_string(&text)
            .with_context(|| format!("Invalid config at {}", path.display()))
    }

    pub fn parse_from_string<T: DeserializeOwned>(text: &str) -> anyhow::Result<T> {
        toml::from_str(text).context("Failed to parse TOML")
    }

    /// First existing candidate in search order, if any.
    pub fn find(relative_path: &str) -> Option<PathBuf> {
        Self::candidates(relative_path)
            .into_iter()
            .find(|p| p.is_file())
    }

    fn candidates(relative_path: &str) -> Vec<PathBuf> {
        let rel = Path::new(relative_path);
        let mut out = Vec::with_capacity(3);

        if let Some(root) = env::var_os(CONFIG_DIR_ENV) {
            out.push(PathBuf::from(root).join(rel));
        }
        if let Ok(cwd) = env::current_dir() {
            out.push(cwd.join(rel));
        }
        // This crate lives at <workspace_root>/crates/runner.
        if let Some(root) = Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2) {
            out.push(root.join("config").join(rel));
        }
        out
    }
}

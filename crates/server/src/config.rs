//! Server configuration.
//!
//! Every field has a default, so a config file only needs to list what it
//! changes. Command-line flags override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use classic_engine::world::position::Dimensions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub name: String,
    pub motd: String,
    /// Shared secret clients must present. Empty disables the check.
    pub verify_key: String,
    pub world_file: PathBuf,
    pub bans_file: PathBuf,
    pub ops_file: PathBuf,
    /// Size of a newly generated world, `[x, y, z]`.
    pub world_size: [usize; 3],
    pub autosave_secs: u64,
    pub max_players: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:25565".into(),
            name: "Classic Server".into(),
            motd: "Welcome!".into(),
            verify_key: String::new(),
            world_file: "save.ccc".into(),
            bans_file: "bans.txt".into(),
            ops_file: "OPs.txt".into(),
            world_size: [256, 64, 256],
            autosave_secs: 60,
            max_players: 127,
        }
    }
}

impl ServerConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Build the configuration from command-line arguments: `--config <file>`
    /// loads a base, then `--bind`, `--world`, and `--key` override it.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let flag = |name: &str| args.iter().skip_while(|a| *a != name).nth(1).cloned();

        let mut config = match flag("--config") {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        if let Some(bind) = flag("--bind") {
            config.bind = bind;
        }
        if let Some(world) = flag("--world") {
            config.world_file = world.into();
        }
        if let Some(key) = flag("--key") {
            config.verify_key = key;
        }
        Ok(config)
    }

    pub fn dimensions(&self) -> Result<Dimensions> {
        let [x, y, z] = self.world_size;
        Dimensions::new(x, y, z).with_context(|| {
            format!(
                "world size {}x{}x{} out of range (each axis 1..={})",
                x,
                y,
                z,
                Dimensions::MAX_AXIS
            )
        })
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "name": "Test", "max_players": 8 }"#).unwrap();
        assert_eq!(config.name, "Test");
        assert_eq!(config.max_players, 8);
        assert_eq!(config.world_size, [256, 64, 256]);
        assert_eq!(config.autosave_secs, 60);
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::from_args(&args(&[
            "classic-server",
            "--bind",
            "127.0.0.1:9000",
            "--key",
            "s3cret",
        ]))
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.verify_key, "s3cret");
        assert_eq!(config.world_file, PathBuf::from("save.ccc"));
    }

    #[test]
    fn config_file_then_flags() {
        let dir = std::env::temp_dir().join("classic_server_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config_then_flags.json");
        std::fs::write(&path, r#"{ "motd": "hi", "world_file": "a.ccc" }"#).unwrap();

        let config = ServerConfig::from_args(&args(&[
            "classic-server",
            "--config",
            path.to_str().unwrap(),
            "--world",
            "b.ccc",
        ]))
        .unwrap();
        assert_eq!(config.motd, "hi");
        assert_eq!(config.world_file, PathBuf::from("b.ccc"));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bad_world_size_is_an_error() {
        let config = ServerConfig {
            world_size: [0, 64, 64],
            ..ServerConfig::default()
        };
        assert!(config.dimensions().is_err());
    }
}

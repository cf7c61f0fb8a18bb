use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub base_url: Option<String>,
    #[serde(alias = "records_file")]
    pub records: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub toast_seconds: Option<u64>,
    pub toast_exit_ms: Option<u64>,
    #[serde(alias = "saved_feedback_ms")]
    pub feedback_ms: Option<u64>,
    pub filter_mode: Option<String>,
    pub no_color: Option<bool>,
    pub clipboard: Option<bool>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".prahari").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_yaml::from_str::<Option<ConfigFile>>(&contents)
            .map(Option::unwrap_or_default)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    r#"# Prahari console config
#
# Location (default):
#   ~/.prahari/config.yml

# Dashboard server
base_url: http://127.0.0.1:5000
# proxy: http://127.0.0.1:8080
# Request timeout in seconds (unset = wait indefinitely)
# timeout: 30

# Record snapshot (JSON or YAML) used by `list` and `console`
# records: ./grievances.json

# Notifications
toast_seconds: 4
toast_exit_ms: 300
feedback_ms: 2000

# Filters: last (most recent search or button wins) or combined
filter_mode: last

# Output styling
no_color: false

# Set to false on headless hosts
clipboard: true
"#
    .to_string()
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<(), String> {
    if path.exists() {
        return Ok(());
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(())
}

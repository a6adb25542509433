use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// User preferences persisted in `prefs.toml`.
#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub api_base: Option<String>,
}

impl Config {
  pub fn parse(content: &str) -> Option<Self> {
    toml::from_str(content).ok()
  }

  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "shortflix") {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(config_file)
        && let Some(config) = Self::parse(&content)
      {
        return config;
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "shortflix") {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_full_prefs() {
    let config = Config::parse("theme_name = \"paper\"\napi_base = \"http://shorts.local:8080\"\n").unwrap();
    assert_eq!(config.theme_name.as_deref(), Some("paper"));
    assert_eq!(config.api_base.as_deref(), Some("http://shorts.local:8080"));
  }

  #[test]
  fn parse_empty_prefs() {
    assert_eq!(Config::parse("").unwrap(), Config::default());
  }

  #[test]
  fn parse_rejects_garbage() {
    assert!(Config::parse("theme_name = [").is_none());
  }

  #[test]
  fn serialize_round_trips() {
    let config = Config { theme_name: Some("mono".into()), api_base: None };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(Config::parse(&text).unwrap(), config);
  }
}

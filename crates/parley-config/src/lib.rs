pub mod config;
pub mod manager;

pub use config::{
    Config, ConfigError, ConfigResult, LineConfig, LlmConfig, LoggingConfig, ServerConfig, SessionConfig,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 Parley 配置目录路径
pub fn parley_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".parley"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    parley_dir().map(|dir| dir.join("config.json"))
}

/// 命令行给出的路径（展开 ~），否则为默认路径
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    match explicit {
        Some(path) => expand_tilde(path),
        None => default_config_path(),
    }
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.to_string_lossy().contains(".parley"));
            assert!(path.ends_with("config.json"));
        }
    }

    #[test]
    fn test_resolve_config_path() {
        assert_eq!(
            resolve_config_path(Some("/srv/parley/config.json")),
            Some(PathBuf::from("/srv/parley/config.json"))
        );
        assert_eq!(resolve_config_path(None), default_config_path());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/etc/parley.json"), Some(PathBuf::from("/etc/parley.json")));
        if let Some(expanded) = expand_tilde("~/.parley/config.json") {
            assert!(!expanded.to_string_lossy().starts_with('~'));
        }
    }
}

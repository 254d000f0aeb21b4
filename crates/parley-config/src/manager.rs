use crate::config::{Config, ConfigError, ConfigResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// 配置管理器
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<RwLock<Config>>,
}

impl ConfigManager {
    /// 加载配置文件
    ///
    /// 文件不存在时写入默认配置。加载后依次应用环境变量覆盖和校验。
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = if path.exists() {
            info!("Loading config from {:?}", path);
            let content = tokio::fs::read_to_string(path).await?;
            let content = Self::expand_env_vars(&content)?;
            serde_json::from_str(&content)?
        } else {
            info!("Config file not found, creating default config at {:?}", path);
            let default_config = Config::default();
            // 确保父目录存在
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let content = serde_json::to_string_pretty(&default_config)?;
            tokio::fs::write(path, &content).await?;
            default_config
        };

        Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Self::validate(&config)?;

        Ok(Self {
            path: path.to_path_buf(),
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// 创建一个新的配置管理器（用于测试）
    pub fn new(config: Config, path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// 当前配置的副本
    pub async fn snapshot(&self) -> Config {
        self.config.read().await.clone()
    }

    /// 重新加载配置
    pub async fn reload(&self) -> ConfigResult<()> {
        if !self.path.exists() {
            return Err(ConfigError::InvalidPath(format!(
                "Config file not found: {:?}",
                self.path
            )));
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let content = Self::expand_env_vars(&content)?;
        let mut new_config: Config = serde_json::from_str(&content)?;
        Self::apply_env_overrides(&mut new_config, |key| std::env::var(key).ok());

        // 验证新配置
        Self::validate(&new_config)?;
        let new_config_warnings = new_config.warnings();

        let mut config = self.config.write().await;
        *config = new_config;
        drop(config);

        info!("Config reloaded from {:?}", self.path);
        for warning in new_config_warnings {
            warn!("{}", warning);
        }
        Ok(())
    }

    /// 验证配置
    pub fn validate(config: &Config) -> ConfigResult<()> {
        // 验证服务器端口
        if config.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        if config.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "LLM base_url cannot be empty".to_string(),
            ));
        }

        if let Some(t) = config.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::Validation(format!(
                    "LLM temperature must be between 0.0 and 2.0, got {}",
                    t
                )));
            }
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// `lookup` 通常是 `std::env::var`，测试中可以替换。
    pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("APP_HOST") {
            config.server.host = v;
        }
        if let Some(v) = parse_env(&get, "APP_PORT") {
            config.server.port = v;
        }
        if let Some(v) = get("LINE_CHANNEL_SECRET") {
            config.line.channel_secret = v;
        }
        if let Some(v) = get("LINE_CHANNEL_TOKEN") {
            config.line.channel_token = v;
        }
        if let Some(v) = get("LINE_API_BASE_URL") {
            config.line.api_base_url = v;
        }
        if let Some(v) = get("LMSTUDIO_BASE_URL") {
            config.llm.base_url = v;
        }
        if let Some(v) = get("LMSTUDIO_MODEL") {
            config.llm.model = Some(v);
        }
        if let Some(v) = parse_env(&get, "LMSTUDIO_TIMEOUT") {
            config.llm.timeout_seconds = v;
        }
        if let Some(v) = get("LMSTUDIO_SYSTEM_PROMPT") {
            config.llm.system_prompt = v;
        }
        if let Some(v) = parse_env(&get, "LMSTUDIO_TEMPERATURE") {
            config.llm.temperature = Some(v);
        }
        if let Some(v) = parse_env(&get, "SESSION_TIMEOUT") {
            config.session.timeout_minutes = v;
        }
        if let Some(v) = parse_env(&get, "SESSION_MAX_TURNS") {
            config.session.max_turns = v;
        }
        if let Some(v) = get("LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = parse_env(&get, "LOG_JSON") {
            config.logging.json = v;
        }
    }

    /// 展开环境变量 ${VAR} 或 ${VAR:-default}
    pub fn expand_env_vars(content: &str) -> ConfigResult<String> {
        Self::expand_env_vars_with(content, |key| std::env::var(key).ok())
    }

    pub fn expand_env_vars_with<F>(content: &str, lookup: F) -> ConfigResult<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let re = Regex::new(r"\$\{([^}]+)\}")?;
        let mut result = String::with_capacity(content.len());
        let mut last_end = 0;

        for cap in re.captures_iter(content) {
            let (Some(full_match), Some(var_expr)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            // 处理 ${VAR:-default} 语法
            let expr = var_expr.as_str();
            let (var_name, default_value) = match expr.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (expr, None),
            };

            let replacement = match (lookup(var_name), default_value) {
                (Some(val), _) => val,
                (None, Some(default)) => default.to_string(),
                (None, None) => return Err(ConfigError::EnvVarNotFound(var_name.to_string())),
            };

            result.push_str(&content[last_end..full_match.start()]);
            result.push_str(&replacement);
            last_end = full_match.end();
        }

        result.push_str(&content[last_end..]);
        Ok(result)
    }

    /// 获取配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_env<T, G>(get: &G, key: &str) -> Option<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn test_load_writes_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let manager = ConfigManager::load(&config_path).await.unwrap();
        assert!(config_path.exists());
        assert_eq!(manager.path(), config_path.as_path());

        let written: Config =
            serde_json::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(written, Config::default());
    }

    #[tokio::test]
    async fn test_load_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"server": {"port": 9090}, "llm": {"system_prompt": "${PARLEY_TEST_UNSET_PROMPT:-Be brief.}"}}"#,
        )
        .unwrap();

        let manager = ConfigManager::load(&config_path).await.unwrap();
        let config = manager.snapshot().await;
        assert_eq!(config.llm.system_prompt, "Be brief.");
    }

    #[tokio::test]
    async fn test_reload_missing_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(Config::default(), temp_dir.path().join("gone.json"));
        assert!(matches!(manager.reload().await, Err(ConfigError::InvalidPath(_))));
    }

    #[test]
    fn test_env_var_expansion() {
        let lookup = env(&[("TEST_VAR", "test_value")]);
        let content = r#"{"a": "${TEST_VAR}", "b": "${MISSING:-fallback}", "c": "plain"}"#;
        let expanded = ConfigManager::expand_env_vars_with(content, lookup).unwrap();
        assert_eq!(expanded, r#"{"a": "test_value", "b": "fallback", "c": "plain"}"#);
    }

    #[test]
    fn test_env_var_missing_without_default() {
        let err = ConfigManager::expand_env_vars_with("${NOPE}", env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(name) if name == "NOPE"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        ConfigManager::apply_env_overrides(
            &mut config,
            env(&[
                ("APP_PORT", "3000"),
                ("LINE_CHANNEL_SECRET", "secret"),
                ("LINE_CHANNEL_TOKEN", "token"),
                ("LMSTUDIO_BASE_URL", "http://gpu-box:1234"),
                ("LMSTUDIO_MODEL", "llama-3"),
                ("LMSTUDIO_TIMEOUT", "120"),
                ("SESSION_TIMEOUT", "0"),
                ("SESSION_MAX_TURNS", "not-a-number"),
                ("LOG_JSON", "true"),
            ]),
        );

        assert_eq!(config.server.port, 3000);
        assert!(config.line.has_credentials());
        assert_eq!(config.llm.base_url, "http://gpu-box:1234");
        assert_eq!(config.llm.model.as_deref(), Some("llama-3"));
        assert_eq!(config.llm.timeout_seconds, 120);
        assert_eq!(config.session.timeout_minutes, 0);
        assert_eq!(config.session.timeout().as_secs(), 30 * 60);
        // invalid number is ignored
        assert_eq!(config.session.max_turns, 10);
        assert!(config.logging.json);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(ConfigManager::validate(&config).is_err());

        config.server.port = 8080;
        assert!(ConfigManager::validate(&config).is_ok());

        config.llm.temperature = Some(3.5);
        assert!(ConfigManager::validate(&config).is_err());

        config.llm.temperature = None;
        config.llm.base_url = "  ".to_string();
        assert!(ConfigManager::validate(&config).is_err());
    }
}

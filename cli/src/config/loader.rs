//! Simple CLI configuration loader for newsdesk
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./newsdesk.json or ./.newsdesk/config.json
//! 3. XDG config: $XDG_CONFIG_HOME/newsdesk/config.json or ~/.config/newsdesk/config.json
//! 4. Environment variables only (no files)
//!
//! The MCP server URL comes from the chosen file, else from
//! `HF_SEARCH_MCP_SERVER_URL`; `--mcp-url` overrides both.

use anyhow::{anyhow, Context, Result};
use newsdesk_core::agent::DEFAULT_MAX_STEPS;
use newsdesk_core::{AgentConfig, McpServerConfig, ModelParams, Protocol, ResolvedLlmConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Model used when neither a file nor `OPENAI_MODEL` names one
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

const MCP_URL_ENV: &str = "HF_SEARCH_MCP_SERVER_URL";

/// Raw configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConfig {
    /// Protocol to use
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// API key (can be "env:VAR_NAME" for environment variable)
    pub api_key: String,
    /// Base URL (optional, uses protocol default if not specified)
    pub base_url: Option<String>,
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Model parameters (optional)
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers (optional)
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// MCP tool server (optional, falls back to the environment)
    #[serde(default)]
    pub mcp: Option<McpServerConfig>,
    /// Replacement system prompt (optional)
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum model requests per turn (optional)
    #[serde(default)]
    pub max_steps: Option<usize>,
}

fn default_protocol() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Everything the CLI needs to build an agent session
#[derive(Debug, Clone)]
pub struct NewsdeskConfig {
    pub llm: ResolvedLlmConfig,
    pub mcp: McpServerConfig,
    pub agent: AgentConfig,
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// CLI configuration loader
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
    mcp_url_override: Option<String>,
    working_dir: Option<PathBuf>,
    env: EnvLookup,
}

impl CliConfigLoader {
    /// Create a new loader reading the process environment
    pub fn new() -> Self {
        Self {
            config_override: None,
            api_key_override: None,
            base_url_override: None,
            model_override: None,
            mcp_url_override: None,
            working_dir: None,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Set API key override
    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    /// Set base URL override
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Set model override
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Set MCP server URL override
    pub fn with_mcp_url_override(mut self, url: String) -> Self {
        self.mcp_url_override = Some(url);
        self
    }

    /// Search this directory instead of the current one
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Read variables from `vars` instead of the process environment
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.env = Box::new(move |name| vars.get(name).cloned());
        self
    }

    fn env_var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|value| !value.trim().is_empty())
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<NewsdeskConfig> {
        // Step 1: Find and load base configuration
        let mut config = if let Some(override_path) = &self.config_override {
            self.load_from_path(override_path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(api_key) = &self.api_key_override {
            config.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url_override {
            config.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            config.model = model.clone();
        }

        // Step 3: Resolve to final configuration
        self.resolve_config(config)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<RawConfig> {
        if let Some(config) = self.try_load_cwd().await? {
            return Ok(config);
        }

        if let Some(config) = self.try_load_xdg().await? {
            return Ok(config);
        }

        self.try_load_env_only()
    }

    /// Try loading from the working directory
    async fn try_load_cwd(&self) -> Result<Option<RawConfig>> {
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        let newsdesk_json = cwd.join("newsdesk.json");
        if newsdesk_json.exists() {
            return Ok(Some(self.load_file(&newsdesk_json).await?));
        }

        let dir_config = cwd.join(".newsdesk").join("config.json");
        if dir_config.exists() {
            return Ok(Some(self.load_file(&dir_config).await?));
        }

        Ok(None)
    }

    /// Try loading from XDG config directory
    async fn try_load_xdg(&self) -> Result<Option<RawConfig>> {
        if let Some(config_dir) = self.get_xdg_config_dir() {
            let config_path = config_dir.join("newsdesk").join("config.json");
            if config_path.exists() {
                return Ok(Some(self.load_file(&config_path).await?));
            }
        }
        Ok(None)
    }

    /// Build configuration from environment variables only
    fn try_load_env_only(&self) -> Result<RawConfig> {
        let api_key = match (&self.api_key_override, self.env_var("OPENAI_API_KEY")) {
            (Some(key), _) => key.clone(),
            (None, Some(key)) => key,
            (None, None) => {
                return Err(anyhow!(
                    "No configuration found. Please create a newsdesk.json file or set OPENAI_API_KEY"
                ))
            }
        };

        Ok(RawConfig {
            protocol: default_protocol(),
            api_key,
            base_url: self.env_var("OPENAI_BASE_URL"),
            model: self.env_var("OPENAI_MODEL").unwrap_or_else(default_model),
            params: ModelParams::default(),
            headers: HashMap::new(),
            mcp: None,
            system_prompt: None,
            max_steps: None,
        })
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RawConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<RawConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get XDG config directory
    fn get_xdg_config_dir(&self) -> Option<PathBuf> {
        if let Some(xdg_config) = self.env_var("XDG_CONFIG_HOME") {
            Some(PathBuf::from(xdg_config))
        } else {
            self.env_var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
        }
    }

    /// Resolve the MCP server settings
    fn resolve_mcp(&self, configured: Option<McpServerConfig>) -> Result<McpServerConfig> {
        let mut mcp = match (configured, self.env_var(MCP_URL_ENV)) {
            (Some(mcp), _) if !mcp.url.is_empty() => mcp,
            (configured, Some(url)) => match configured {
                Some(mcp) => McpServerConfig { url, ..mcp },
                None => McpServerConfig::new(url),
            },
            (configured, None) => configured.unwrap_or_else(|| McpServerConfig::new("")),
        };

        if let Some(url) = &self.mcp_url_override {
            mcp.url = url.clone();
        }

        if mcp.url.is_empty() {
            return Err(anyhow!(
                "No MCP server URL configured. Set {} or pass --mcp-url",
                MCP_URL_ENV
            ));
        }

        mcp.validate()
            .map_err(|e| anyhow!("MCP configuration validation failed: {}", e))?;
        Ok(mcp)
    }

    /// Resolve raw config to the final configuration
    fn resolve_config(&self, config: RawConfig) -> Result<NewsdeskConfig> {
        let protocol: Protocol = config
            .protocol
            .parse()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        // Resolve API key (handle env: prefix)
        let api_key = match config.api_key.strip_prefix("env:") {
            Some(var_name) => self
                .env_var(var_name)
                .with_context(|| format!("Environment variable not found: {}", var_name))?,
            None => config.api_key,
        };

        let base_url = config
            .base_url
            .unwrap_or_else(|| protocol.default_base_url().to_string());

        let llm = ResolvedLlmConfig::new(protocol, base_url, api_key, config.model)
            .with_params(config.params.clone())
            .with_headers(config.headers);
        llm.validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        let mcp = self.resolve_mcp(config.mcp)?;

        let mut agent = AgentConfig {
            max_steps: config.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
            params: config.params,
            ..AgentConfig::default()
        };
        if let Some(system_prompt) = config.system_prompt {
            agent.system_prompt = system_prompt;
        }
        agent
            .validate()
            .map_err(|e| anyhow!("Agent configuration validation failed: {}", e))?;

        Ok(NewsdeskConfig { llm, mcp, agent })
    }
}

impl Default for CliConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_core::agent::NEWS_AGENT_SYSTEM_PROMPT;

    fn isolated(dir: &Path) -> CliConfigLoader {
        CliConfigLoader::new().with_working_dir(dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_env_only_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let config = isolated(dir.path())
            .with_env_vars([
                ("OPENAI_API_KEY", "sk-test"),
                ("HF_SEARCH_MCP_SERVER_URL", "http://localhost:8000/sse"),
            ])
            .load()
            .await
            .unwrap();

        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.mcp.url, "http://localhost:8000/sse");
        assert_eq!(config.mcp.connect_timeout_secs, 30);
        assert_eq!(config.mcp.read_timeout_secs, 600);
        assert_eq!(config.agent.system_prompt, NEWS_AGENT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_missing_mcp_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = isolated(dir.path())
            .with_env_vars([("OPENAI_API_KEY", "sk-test")])
            .load()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HF_SEARCH_MCP_SERVER_URL"));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = isolated(dir.path())
            .with_env_vars([("HF_SEARCH_MCP_SERVER_URL", "http://localhost:8000/sse")])
            .load()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_working_dir_file_with_env_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("newsdesk.json"),
            r#"{
                "api_key": "env:NEWS_KEY",
                "model": "gpt-4o",
                "mcp": {"url": "http://news.internal/sse", "read_timeout_secs": 120},
                "max_steps": 8
            }"#,
        )
        .unwrap();

        let config = isolated(dir.path())
            .with_env_vars([("NEWS_KEY", "sk-from-env")])
            .load()
            .await
            .unwrap();

        assert_eq!(config.llm.api_key, "sk-from-env");
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.mcp.url, "http://news.internal/sse");
        assert_eq!(config.mcp.read_timeout_secs, 120);
        assert_eq!(config.mcp.connect_timeout_secs, 30);
        assert_eq!(config.agent.max_steps, 8);
    }

    #[tokio::test]
    async fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"{"api_key": "sk-file", "system_prompt": "Only answer in haiku."}"#,
        )
        .unwrap();

        let config = isolated(dir.path())
            .with_env_vars([("HF_SEARCH_MCP_SERVER_URL", "http://env-server/sse")])
            .with_config_override(path)
            .with_api_key_override("sk-flag".to_string())
            .with_model_override("gpt-4.1".to_string())
            .with_base_url_override("http://proxy.local/v1".to_string())
            .with_mcp_url_override("http://flag-server/sse".to_string())
            .load()
            .await
            .unwrap();

        assert_eq!(config.llm.api_key, "sk-flag");
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.base_url, "http://proxy.local/v1");
        assert_eq!(config.mcp.url, "http://flag-server/sse");
        assert_eq!(config.agent.system_prompt, "Only answer in haiku.");
    }

    #[tokio::test]
    async fn test_missing_override_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = isolated(dir.path())
            .with_config_override(dir.path().join("nope.json"))
            .load()
            .await;
        assert!(result.is_err());
    }
}

use crate::core::scheduler::{SchedulerSettings, TransientErrorPolicy};
use crate::utils::error::{HarvestError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_ENDPOINT: &str =
    "https://registries.his.bg/api/V1/outpatientcare/getOutpatientCareByNumberForApiV1";

/// Full harvester configuration. Every section and field has a default, so
/// an empty TOML file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub source: SourceConfig,
    pub input: InputConfig,
    pub run: RunConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    pub query_param: String,
    pub timeout_seconds: u64,
    pub headers: BTreeMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        let headers = [
            ("accept", "*/*"),
            ("accept-language", "en-US,en;q=0.9,bg;q=0.8"),
            ("origin", "https://opendata.his.bg"),
            (
                "user-agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36",
            ),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            query_param: "number".to_string(),
            timeout_seconds: 10,
            headers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Identifier table: a workbook (`.xlsx`, `.xls`, `.ods`, first sheet)
    /// or a CSV export.
    pub path: String,
    /// Zero-based column holding the identifiers (1 = column B).
    pub id_column: usize,
    pub has_headers: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "registry_ids.csv".to_string(),
            id_column: 1,
            has_headers: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub time_budget_seconds: u64,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub on_transient_error: TransientErrorPolicy,
    /// Rewrite the run's output every N identifiers that produced rows.
    /// Rows of checkpointed identifiers not yet written are lost on a kill.
    pub flush_every: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            // 5h30m，留給 CI 單次執行的上限一些餘裕
            time_budget_seconds: 5 * 3600 + 30 * 60,
            min_delay_ms: 500,
            max_delay_ms: 1200,
            on_transient_error: TransientErrorPolicy::Checkpoint,
            flush_every: Some(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_path: String,
    /// Relative paths resolve against `output_path`.
    pub checkpoint_file: String,
    pub continuation_file: String,
    pub file_prefix: String,
    /// Bundle the three tables into one ZIP instead of three CSV files.
    pub compression: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            checkpoint_file: "processed_ids.txt".to_string(),
            continuation_file: "CONTINUE.json".to_string(),
            file_prefix: "registry_harvest".to_string(),
            compression: true,
        }
    }
}

impl OutputConfig {
    pub fn checkpoint_path(&self) -> PathBuf {
        Path::new(&self.output_path).join(&self.checkpoint_file)
    }
}

impl HarvestConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(&path).map_err(|e| HarvestError::ConfigError {
                message: format!("Failed to read '{}': {}", path.as_ref().display(), e),
            })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| HarvestError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${REGISTRY_ENDPOINT})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Scheduler settings with the budget measured from `started_at`.
    pub fn scheduler_settings(&self, started_at: Instant) -> SchedulerSettings {
        SchedulerSettings {
            time_budget: Duration::from_secs(self.run.time_budget_seconds),
            started_at,
            min_delay: Duration::from_millis(self.run.min_delay_ms),
            max_delay: Duration::from_millis(self.run.max_delay_ms),
            on_transient_error: self.run.on_transient_error,
            flush_every: self.run.flush_every,
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_non_empty_string("source.query_param", &self.source.query_param)?;
        validation::validate_positive_number("source.timeout_seconds", self.source.timeout_seconds, 1)?;
        for (name, value) in &self.source.headers {
            let field = format!("source.headers.{}", name);
            if reqwest::header::HeaderName::from_bytes(name.as_bytes()).is_err() {
                return Err(HarvestError::InvalidConfigValueError {
                    field,
                    value: name.clone(),
                    reason: "Invalid HTTP header name".to_string(),
                });
            }
            if reqwest::header::HeaderValue::from_str(value).is_err() {
                return Err(HarvestError::InvalidConfigValueError {
                    field,
                    value: value.clone(),
                    reason: "Invalid HTTP header value".to_string(),
                });
            }
        }

        validation::validate_path("input.path", &self.input.path)?;

        validation::validate_positive_number(
            "run.time_budget_seconds",
            self.run.time_budget_seconds,
            1,
        )?;
        validation::validate_bounds("run.min_delay_ms", self.run.min_delay_ms, self.run.max_delay_ms)?;
        if let Some(every) = self.run.flush_every {
            validation::validate_positive_number("run.flush_every", every as u64, 1)?;
        }

        validation::validate_path("output.output_path", &self.output.output_path)?;
        validation::validate_path("output.checkpoint_file", &self.output.checkpoint_file)?;
        validation::validate_path("output.continuation_file", &self.output.continuation_file)?;
        validation::validate_non_empty_string("output.file_prefix", &self.output.file_prefix)?;

        Ok(())
    }
}

impl Validate for HarvestConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

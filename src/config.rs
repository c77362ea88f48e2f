use crate::error::{AppError, AppResult, ConfigError};
use std::str::FromStr;
use std::time::Duration;

/// 调度器配置（限流、超时、重试）
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchConfig {
    /// 两次上游调用之间的最小间隔（全进程共享）
    pub min_interval: Duration,
    /// 单次调用的超时时间
    pub per_attempt_timeout: Duration,
    /// 每个问题最多尝试次数
    pub max_attempts: usize,
    /// 超时后的固定等待时间
    pub timeout_backoff: Duration,
    /// 限流错误的线性退避基数
    pub transient_backoff_base: Duration,
    /// 整批问题的总时限（可选，默认不限制）
    pub batch_deadline: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(12),
            per_attempt_timeout: Duration::from_secs(60),
            max_attempts: 3,
            timeout_backoff: Duration::from_secs(5),
            transient_backoff_base: Duration::from_secs(30),
            batch_deadline: None,
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    pub dispatch: DispatchConfig,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 待处理的批量问题文件（TOML）
    pub batch_file: String,
    /// 答案输出文件（JSON）
    pub answers_file: String,
    /// 失败问题记录文件
    pub warn_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatch: DispatchConfig::default(),
            verbose_logging: false,
            batch_file: "batch.toml".to_string(),
            answers_file: "answers.json".to_string(),
            warn_file: "warn.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置，解析失败的项使用默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        let d = &default.dispatch;
        Self {
            dispatch: DispatchConfig {
                min_interval: env_secs("MIN_INTERVAL_SECS")
                    .ok()
                    .flatten()
                    .unwrap_or(d.min_interval),
                per_attempt_timeout: env_secs("PER_ATTEMPT_TIMEOUT_SECS")
                    .ok()
                    .flatten()
                    .unwrap_or(d.per_attempt_timeout),
                max_attempts: env_parse("MAX_ATTEMPTS", "usize")
                    .ok()
                    .flatten()
                    .unwrap_or(d.max_attempts),
                timeout_backoff: env_secs("TIMEOUT_BACKOFF_SECS")
                    .ok()
                    .flatten()
                    .unwrap_or(d.timeout_backoff),
                transient_backoff_base: env_secs("TRANSIENT_BACKOFF_BASE_SECS")
                    .ok()
                    .flatten()
                    .unwrap_or(d.transient_backoff_base),
                batch_deadline: env_secs("BATCH_DEADLINE_SECS")
                    .ok()
                    .flatten()
                    .or(d.batch_deadline),
            },
            verbose_logging: std::env::var("VERBOSE_LOGGING")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.verbose_logging),
            batch_file: std::env::var("BATCH_FILE").unwrap_or(default.batch_file),
            answers_file: std::env::var("ANSWERS_FILE").unwrap_or(default.answers_file),
            warn_file: std::env::var("WARN_FILE").unwrap_or(default.warn_file),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL")
                .unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }

    /// 从环境变量加载配置，任何解析失败都会返回错误
    pub fn try_from_env() -> AppResult<Self> {
        let mut config = Self::from_env();
        let d = DispatchConfig::default();

        config.dispatch = DispatchConfig {
            min_interval: env_secs("MIN_INTERVAL_SECS")?.unwrap_or(d.min_interval),
            per_attempt_timeout: env_secs("PER_ATTEMPT_TIMEOUT_SECS")?
                .unwrap_or(d.per_attempt_timeout),
            max_attempts: env_parse("MAX_ATTEMPTS", "usize")?.unwrap_or(d.max_attempts),
            timeout_backoff: env_secs("TIMEOUT_BACKOFF_SECS")?.unwrap_or(d.timeout_backoff),
            transient_backoff_base: env_secs("TRANSIENT_BACKOFF_BASE_SECS")?
                .unwrap_or(d.transient_backoff_base),
            batch_deadline: env_secs("BATCH_DEADLINE_SECS")?,
        };
        if let Some(verbose) = env_parse::<bool>("VERBOSE_LOGGING", "bool")? {
            config.verbose_logging = verbose;
        }

        config.validate()?;
        Ok(config)
    }

    /// 校验配置项
    pub fn validate(&self) -> AppResult<()> {
        if self.dispatch.max_attempts == 0 {
            return Err(AppError::invalid_config("max_attempts", "至少需要尝试 1 次"));
        }
        if self.dispatch.per_attempt_timeout.is_zero() {
            return Err(AppError::invalid_config(
                "per_attempt_timeout",
                "超时时间必须大于 0",
            ));
        }
        Ok(())
    }
}

/// 读取并解析环境变量，未设置时返回 `Ok(None)`
fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// 以秒为单位读取时长（支持小数）
///
/// 负数、NaN、无穷大以及超出 `Duration` 范围的值都视为解析失败。
fn env_secs(var_name: &str) -> Result<Option<Duration>, ConfigError> {
    let secs: Option<f64> = env_parse(var_name, "非负秒数")?;
    secs.map(|s| {
        Duration::try_from_secs_f64(s).map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: s.to_string(),
            expected_type: "非负秒数".to_string(),
        })
    })
    .transpose()
}

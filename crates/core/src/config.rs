use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Load a specific env file. Missing files are reported.
pub fn load_env_file(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path)
        .map(|_| ())
        .map_err(|e| ConfigError::EnvFile(format!("{}: {e}", path.display())))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Unparseable numbers fall back to the default and are recorded in
/// `errors` so `validate()` can report them.
fn profiled_env_num(profile: &str, key: &str, default: u64, errors: &mut Vec<String>) -> u64 {
    match profiled_env_opt(profile, key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            errors.push(format!("not a number: {key}={raw}"));
            default
        }),
        None => default,
    }
}

fn profiled_env_bool(profile: &str, key: &str) -> bool {
    matches!(
        profiled_env_opt(profile, key).as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    pub scheduling: SchedulingConfig,
    pub api: ApiConfig,
    pub analysis: AnalysisConfig,
    pub object_store: ObjectStoreConfig,
    /// Local working directory holding the transient artifact folders.
    pub work_dir: PathBuf,
    /// Values present in the environment that failed to parse.
    #[serde(skip)]
    pub parse_errors: Vec<String>,
}

impl WorkerConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `REPLAY_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("REPLAY_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let mut parse_errors = Vec::new();
        Self {
            profile: p.to_string(),
            scheduling: SchedulingConfig::from_env_profiled(p, &mut parse_errors),
            api: ApiConfig::from_env_profiled(p, &mut parse_errors),
            analysis: AnalysisConfig::from_env_profiled(p, &mut parse_errors),
            object_store: ObjectStoreConfig::from_env_profiled(p),
            work_dir: PathBuf::from(profiled_env_or(p, "WORK_DIR", "temp")),
            parse_errors,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Check every required value and numeric setting, reporting all
    /// problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        let mut invalid = self.parse_errors.clone();

        if self.api.jobs_url.is_empty() {
            missing.push("JOBS_URL");
        }
        if self.api.ingest_url.is_empty() {
            missing.push("INGEST_URL");
        }
        if self.api.api_key.is_empty() {
            missing.push("API_KEY");
        }
        if self.analysis.executable.as_os_str().is_empty() {
            missing.push("ANALYSIS_EXECUTABLE");
        }
        if self.object_store.endpoint.is_empty() {
            missing.push("OBJECT_STORE_ENDPOINT");
        }
        if self.object_store.access_key.is_empty() {
            missing.push("OBJECT_STORE_ACCESS_KEY");
        }
        if self.object_store.secret_key.is_empty() {
            missing.push("OBJECT_STORE_SECRET_KEY");
        }

        let s = &self.scheduling;
        if s.process_limit == 0 {
            invalid.push("PROCESS_LIMIT must be at least 1".into());
        }
        if s.query_limit == 0 {
            invalid.push("QUERY_LIMIT must be at least 1".into());
        }
        if s.queue_capacity == 0 {
            invalid.push("QUEUE_CAPACITY must be at least 1".into());
        }
        if s.short_interval.is_zero() || s.long_interval.is_zero() {
            invalid.push("tick intervals must be non-zero".into());
        }
        if self.analysis.timeout.is_zero() {
            invalid.push("ANALYSIS_TIMEOUT_SECS must be non-zero".into());
        }

        if missing.is_empty() && invalid.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid {
                missing: missing.into_iter().map(String::from).collect(),
                invalid,
            })
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        let s = &self.scheduling;
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  scheduling:   process_limit={}, query_limit={}, queue_capacity={}, short={:?}, long={:?}, drain={}",
            s.process_limit, s.query_limit, s.queue_capacity, s.short_interval, s.long_interval, s.drain
        );
        tracing::info!("  api:          jobs={}, ingest={}", self.api.jobs_url, self.api.ingest_url);
        tracing::info!(
            "  analysis:     executable={}, timeout={:?}",
            self.analysis.executable.display(),
            self.analysis.timeout
        );
        tracing::info!(
            "  object store: endpoint={}, raw={}, results={}",
            self.object_store.endpoint, self.object_store.raw_bucket, self.object_store.results_bucket
        );
        tracing::info!("  work dir:     {}", self.work_dir.display());
    }
}

// ── Scheduling ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Maximum number of concurrently running pipelines.
    pub process_limit: usize,
    /// Number of candidates requested per admission call.
    pub query_limit: usize,
    /// Hard cap on the local admission queue.
    pub queue_capacity: usize,
    pub short_interval: Duration,
    pub long_interval: Duration,
    /// Exit once both the queue and the in-flight table are empty.
    pub drain: bool,
}

impl SchedulingConfig {
    fn from_env_profiled(p: &str, errors: &mut Vec<String>) -> Self {
        let mut num = |key: &str, default: u64| profiled_env_num(p, key, default, errors);
        let process_limit = num("PROCESS_LIMIT", 1) as usize;
        let query_limit = num("QUERY_LIMIT", 1) as usize;
        let queue_capacity = num("QUEUE_CAPACITY", process_limit as u64) as usize;
        let short_interval = Duration::from_millis(num("SHORT_INTERVAL_MS", 1_000));
        let long_interval = Duration::from_millis(num("LONG_INTERVAL_MS", 60_000));
        Self {
            process_limit,
            query_limit,
            queue_capacity,
            short_interval,
            long_interval,
            drain: profiled_env_bool(p, "DRAIN_MODE"),
        }
    }

    /// How long a completed session is remembered to suppress re-admission.
    pub fn retention(&self) -> Duration {
        self.long_interval * 2
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            process_limit: 1,
            query_limit: 1,
            queue_capacity: 1,
            short_interval: Duration::from_secs(1),
            long_interval: Duration::from_secs(60),
            drain: false,
        }
    }
}

// ── Job source / ingestion API ────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub jobs_url: String,
    pub ingest_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub request_timeout: Duration,
}

impl ApiConfig {
    fn from_env_profiled(p: &str, errors: &mut Vec<String>) -> Self {
        let timeout = profiled_env_num(p, "HTTP_TIMEOUT_SECS", 30, errors);
        Self {
            jobs_url: profiled_env_or(p, "JOBS_URL", ""),
            ingest_url: profiled_env_or(p, "INGEST_URL", ""),
            api_key: profiled_env_or(p, "API_KEY", ""),
            request_timeout: Duration::from_secs(timeout),
        }
    }
}

// ── Analysis executable ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub executable: PathBuf,
    pub timeout: Duration,
}

impl AnalysisConfig {
    fn from_env_profiled(p: &str, errors: &mut Vec<String>) -> Self {
        let timeout = profiled_env_num(p, "ANALYSIS_TIMEOUT_SECS", 60, errors);
        Self {
            executable: PathBuf::from(profiled_env_or(p, "ANALYSIS_EXECUTABLE", "")),
            timeout: Duration::from_secs(timeout),
        }
    }
}

// ── Object storage (S3 / MinIO) ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub access_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub region: String,
    pub raw_bucket: String,
    pub results_bucket: String,
    /// Extension of raw artifact keys and local files (without the dot).
    pub raw_extension: String,
}

impl ObjectStoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            endpoint: profiled_env_or(p, "OBJECT_STORE_ENDPOINT", ""),
            access_key: profiled_env_or(p, "OBJECT_STORE_ACCESS_KEY", ""),
            secret_key: profiled_env_or(p, "OBJECT_STORE_SECRET_KEY", ""),
            region: profiled_env_or(p, "OBJECT_STORE_REGION", "us-east-1"),
            raw_bucket: profiled_env_or(p, "RAW_BUCKET", "demoblobs"),
            results_bucket: profiled_env_or(p, "RESULTS_BUCKET", "jsonblobs"),
            raw_extension: profiled_env_or(p, "RAW_EXTENSION", "dem")
                .trim_start_matches('.')
                .to_string(),
        }
    }

    /// Endpoint with a scheme; plain host:port values are treated as http.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://") {
            self.endpoint.clone()
        } else {
            format!("http://{}", self.endpoint)
        }
    }
}

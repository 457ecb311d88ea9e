use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load environment variables from a .env file.
/// Variables already present in the environment win over the file.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            // SAFETY: called first thing in main on a current-thread runtime,
            // before any other thread exists
            unsafe { std::env::set_var(key, value) };
        }
    }
}

/// Split .env content into key/value pairs, skipping blanks and comments
/// and stripping one layer of matching quotes.
fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let mut value = value.trim();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }
            pairs.push((key.trim(), value));
        }
    }
    pairs
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub firebase: FirebaseConfig,
    pub monitor: MonitorConfig,
    pub simulation: SimulationConfig,
    pub tester: TesterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Realtime Database root, e.g. `https://<project>-default-rtdb.<region>.firebasedatabase.app`
    pub database_url: String,
    /// Service-account key, or a database secret / ID token sent as `?auth=`.
    pub credentials_path: Option<PathBuf>,
    /// Collection that receives one pushed record per tick.
    pub sample_path: String,
    /// Location of the shared conversation flag.
    pub trigger_path: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub tick_interval_ms: u64,
    pub cooldown_secs: u64,
    pub settle_delay_secs: u64,
    pub error_backoff_secs: u64,
    /// Log a status line every N cycles (0 disables it).
    pub status_every: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub motion_probability: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesterConfig {
    pub repeat_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            firebase: FirebaseConfig {
                database_url: "http://localhost:9000".to_string(),
                credentials_path: None,
                sample_path: "test".to_string(),
                trigger_path: "conversation_trigger".to_string(),
                request_timeout_secs: 10,
            },
            monitor: MonitorConfig {
                tick_interval_ms: 1000,
                cooldown_secs: 10,
                settle_delay_secs: 3,
                error_backoff_secs: 5,
                status_every: 10,
            },
            simulation: SimulationConfig {
                motion_probability: 0.25,
                humidity: 55.0,
            },
            tester: TesterConfig {
                repeat_interval_secs: 10,
            },
        }
    }
}

impl MonitorConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

impl FirebaseConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from defaults overridden by whatever `lookup` returns.
    /// Unparseable numeric values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("FIREBASE_DATABASE_URL") {
            config.firebase.database_url = url;
        }
        if let Some(path) = lookup("FIREBASE_CREDENTIALS") {
            config.firebase.credentials_path = Some(PathBuf::from(path));
        }
        if let Some(path) = lookup("FIREBASE_SAMPLE_PATH") {
            config.firebase.sample_path = path;
        }
        if let Some(path) = lookup("FIREBASE_TRIGGER_PATH") {
            config.firebase.trigger_path = path;
        }
        if let Some(v) = lookup("FIREBASE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.firebase.request_timeout_secs = v;
        }

        // Monitor timing
        if let Some(v) = lookup("MONITOR_TICK_MS").and_then(|v| v.parse().ok()) {
            config.monitor.tick_interval_ms = v;
        }
        if let Some(v) = lookup("TRIGGER_COOLDOWN_SECS").and_then(|v| v.parse().ok()) {
            config.monitor.cooldown_secs = v;
        }
        if let Some(v) = lookup("TRIGGER_SETTLE_SECS").and_then(|v| v.parse().ok()) {
            config.monitor.settle_delay_secs = v;
        }
        if let Some(v) = lookup("MONITOR_ERROR_BACKOFF_SECS").and_then(|v| v.parse().ok()) {
            config.monitor.error_backoff_secs = v;
        }
        if let Some(v) = lookup("MONITOR_STATUS_EVERY").and_then(|v| v.parse().ok()) {
            config.monitor.status_every = v;
        }

        // Simulation
        if let Some(p) = lookup("SIM_MOTION_PROBABILITY").and_then(|v| v.parse::<f64>().ok())
            && (0.0..=1.0).contains(&p)
        {
            config.simulation.motion_probability = p;
        }
        if let Some(v) = lookup("SIM_HUMIDITY").and_then(|v| v.parse().ok()) {
            config.simulation.humidity = v;
        }

        if let Some(v) = lookup("TESTER_REPEAT_SECS").and_then(|v| v.parse().ok()) {
            config.tester.repeat_interval_secs = v;
        }

        config
    }
}

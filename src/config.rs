use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use threadlab::demos::WaitTiming;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub log_level: Option<String>,
    pub wait: WaitConfig,
    pub interrupt: InterruptConfig,
    pub sleep: SleepConfig,
    pub join: JoinConfig,
    pub counter: CounterConfig,
    pub flag: FlagConfig,
    pub once: OnceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WaitConfig {
    pub producer_delay_ms: u64,
    pub consumer_delay_ms: u64,
    pub value: String,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            producer_delay_ms: 2000,
            consumer_delay_ms: 1000,
            value: "ABC".to_string(),
        }
    }
}

impl WaitConfig {
    /// Timing with command-line delays taking precedence
    pub fn timing_with(&self, producer_ms: Option<u64>, consumer_ms: Option<u64>) -> WaitTiming {
        WaitTiming {
            producer_delay: Duration::from_millis(producer_ms.unwrap_or(self.producer_delay_ms)),
            consumer_delay: Duration::from_millis(consumer_ms.unwrap_or(self.consumer_delay_ms)),
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct InterruptConfig {
    pub limit: u64,
    pub step_us: u64,
    pub interrupt_after_ms: u64,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            limit: 1_000_000,
            step_us: 10,
            interrupt_after_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SleepConfig {
    pub scratch_dir: PathBuf,
    pub files: usize,
    pub sleep_ms: u64,
    pub cancel_after_ms: Option<u64>,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("threadlab"),
            files: 3,
            sleep_ms: 10_000,
            cancel_after_ms: Some(3000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct JoinConfig {
    pub delay_ms: u64,
    pub spawn_prefix: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            spawn_prefix: "Thread".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CounterConfig {
    pub threads: usize,
    pub increments: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            increments: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FlagConfig {
    pub run_ms: u64,
}

impl Default for FlagConfig {
    fn default() -> Self {
        Self { run_ms: 1000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OnceConfig {
    pub threads: usize,
    pub init_delay_ms: u64,
}

impl Default for OnceConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            init_delay_ms: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            wait: WaitConfig::default(),
            interrupt: InterruptConfig::default(),
            sleep: SleepConfig::default(),
            join: JoinConfig::default(),
            counter: CounterConfig::default(),
            flag: FlagConfig::default(),
            once: OnceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.wait.value.is_empty() {
            eyre::bail!("wait.value must not be empty");
        }
        if self.counter.threads == 0 {
            eyre::bail!("counter.threads must be > 0");
        }
        if self.counter.increments == 0 {
            eyre::bail!("counter.increments must be > 0");
        }
        if self.once.threads == 0 {
            eyre::bail!("once.threads must be > 0");
        }
        Ok(())
    }

    /// Thread count for the counter demo, preferring a command-line override
    pub fn counter_threads(&self, threads: Option<usize>) -> Result<usize> {
        let threads = threads.unwrap_or(self.counter.threads);
        eyre::ensure!(threads > 0, "counter threads must be > 0");
        Ok(threads)
    }

    /// Thread count for the once demo, preferring a command-line override
    pub fn once_threads(&self, threads: Option<usize>) -> Result<usize> {
        let threads = threads.unwrap_or(self.once.threads);
        eyre::ensure!(threads > 0, "once threads must be > 0");
        Ok(threads)
    }
}

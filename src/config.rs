use crate::prelude::*;

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ups: Ups,

    #[serde(default)]
    pub mqtt: Mqtt,

    #[serde(default)]
    pub scheduler: Scheduler,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Ups {{{
#[serde_as]
#[derive(Clone, Debug, Deserialize)]
pub struct Ups {
    #[serde(default)]
    pub port: String,

    #[serde(default = "Config::default_baud_rate")]
    pub baud_rate: u32,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "read_timeout_ms", default = "Config::default_read_timeout")]
    pub read_timeout: Duration,

    #[serde(default, deserialize_with = "de_device_number")]
    pub device_number: String,
}
impl Default for Ups {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: Config::default_baud_rate(),
            read_timeout: Config::default_read_timeout(),
            device_number: String::new(),
        }
    }
}
impl Ups {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn device_number(&self) -> &str {
        &self.device_number
    }
} // }}}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Mqtt {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub host: String,
    #[serde(default = "Config::default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "Config::default_mqtt_namespace")]
    pub namespace: String,

    #[serde(default = "Config::default_mqtt_client_id")]
    pub client_id: String,
}
impl Default for Mqtt {
    fn default() -> Self {
        Self {
            enabled: Config::default_enabled(),
            host: String::new(),
            port: Config::default_mqtt_port(),
            username: None,
            password: None,
            namespace: Config::default_mqtt_namespace(),
            client_id: Config::default_mqtt_client_id(),
        }
    }
}
impl Mqtt {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
} // }}}

// Scheduler {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Scheduler {
    #[serde(default = "Config::default_interval_secs")]
    pub interval_secs: u64,
}
impl Default for Scheduler {
    fn default() -> Self {
        Self {
            interval_secs: Config::default_interval_secs(),
        }
    }
}
impl Scheduler {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
} // }}}

pub struct ConfigWrapper {
    config: Arc<Mutex<Config>>,
}

impl Clone for ConfigWrapper {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
        }
    }
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        Ok(Self::from_config(Config::new(file)?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
        }
    }

    // config is never left half-written, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ups(&self) -> Ups {
        self.lock().ups.clone()
    }

    pub fn mqtt(&self) -> Mqtt {
        self.lock().mqtt.clone()
    }

    pub fn scheduler(&self) -> Scheduler {
        self.lock().scheduler.clone()
    }

    pub fn loglevel(&self) -> String {
        self.lock().loglevel.clone()
    }
}

/// Environment variables that take precedence over the config file.
pub const ENV_SERIAL_PORT: &str = "SERIAL_PORT";
pub const ENV_DEVICE_NUMBER: &str = "DEVICE_NUMBER";
pub const ENV_MQTT_IP: &str = "MQTT_IP";
pub const ENV_MQTT_PORT: &str = "MQTT_PORT";

impl Config {
    pub fn new(file: String) -> Result<Self> {
        info!("Reading configuration from {}", file);
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("config.rs:error reading {}: {}", file, err))?;

        let mut config = Self::from_yaml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.log_summary();
        config.validate()?;

        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|err| anyhow!("config.rs:invalid config: {}", err))
    }

    /// Overlay values looked up by environment variable name.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_SERIAL_PORT) {
            self.ups.port = port;
        }
        if let Some(device_number) = lookup(ENV_DEVICE_NUMBER) {
            self.ups.device_number = device_number;
        }
        if let Some(host) = lookup(ENV_MQTT_IP) {
            self.mqtt.host = host;
        }
        if let Some(port) = lookup(ENV_MQTT_PORT) {
            self.mqtt.port = port
                .parse()
                .map_err(|err| anyhow!("config.rs:{}={:?}: {}", ENV_MQTT_PORT, port, err))?;
        }

        Ok(())
    }

    fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  UPS:");
        info!("    Port: {}", self.ups.port);
        info!("    Baud Rate: {}", self.ups.baud_rate);
        info!("    Read Timeout: {}ms", self.ups.read_timeout.as_millis());
        info!("    Device Number: {}", self.ups.device_number);

        info!("  MQTT: {}", if self.mqtt.enabled { "enabled" } else { "disabled" });
        if self.mqtt.enabled {
            info!("    Host: {}", self.mqtt.host);
            info!("    Port: {}", self.mqtt.port);
            info!("    Namespace: {}", self.mqtt.namespace);
        }

        info!("  Poll Interval: {}s", self.scheduler.interval_secs);
        info!("  Log Level: {}", self.loglevel);
    }

    pub fn validate(&self) -> Result<()> {
        if self.ups.port.is_empty() {
            bail!("ups.port cannot be empty (set it or {})", ENV_SERIAL_PORT);
        }
        if self.ups.baud_rate == 0 {
            bail!("ups.baud_rate must be greater than 0");
        }
        if self.ups.read_timeout.is_zero() {
            return Err(anyhow!("config.rs:Invalid read timeout: 0"));
        }
        if self.ups.device_number.is_empty() {
            bail!("ups.device_number cannot be empty (set it or {})", ENV_DEVICE_NUMBER);
        }
        if self.ups.device_number.contains(['/', '+', '#']) {
            bail!("ups.device_number {:?} is not a valid topic level", self.ups.device_number);
        }

        if self.mqtt.enabled {
            if self.mqtt.port == 0 {
                bail!("mqtt.port must be between 1 and 65535");
            }
            if self.mqtt.host.is_empty() {
                return Err(anyhow!("config.rs:MQTT host cannot be empty"));
            }
        }

        if self.scheduler.interval_secs == 0 {
            bail!("scheduler.interval_secs must be greater than 0");
        }

        if self.loglevel.parse::<log::LevelFilter>().is_err() {
            bail!("loglevel {:?} is not one of off, error, warn, info, debug, trace", self.loglevel);
        }

        Ok(())
    }

    fn default_baud_rate() -> u32 {
        2400
    }

    fn default_read_timeout() -> Duration {
        Duration::from_secs(1)
    }

    fn default_mqtt_port() -> u16 {
        1883
    }

    fn default_mqtt_namespace() -> String {
        "UPS".to_string()
    }

    fn default_mqtt_client_id() -> String {
        "delta-ups-bridge".to_string()
    }

    fn default_interval_secs() -> u64 {
        5
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}

// device numbers are often written bare in YAML, accept them as numbers too
fn de_device_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DeviceNumber {
        Text(String),
        Number(u64),
    }

    Ok(match DeviceNumber::deserialize(deserializer)? {
        DeviceNumber::Text(s) => s,
        DeviceNumber::Number(n) => n.to_string(),
    })
}

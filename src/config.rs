//! Application configuration
//!
//! Loaded from TOML. Every field has a default, so an empty or missing
//! file yields a working 16 kHz / 20 ms voice setup.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::codec::CodecParams;
use crate::constants::*;
use crate::error::{Error, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "LAN_VOICE_LINK_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seconds between statistics log lines in the executables
    pub stats_interval_secs: u64,
    pub audio: AudioConfig,
    pub codec: CodecConfig,
    pub network: NetworkConfig,
    pub buffers: BufferConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Input device name; the host default when unset
    pub input_device: Option<String>,
    /// Output device name; the host default when unset
    pub output_device: Option<String>,
    /// Ask the driver for callbacks of exactly one frame
    pub fixed_buffer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub bitrate: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local address the receiver binds to
    pub bind_address: IpAddr,
    /// SO_RCVBUF size in bytes
    pub recv_buffer_size: usize,
    pub read_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Jitter buffer capacity in packets
    pub packet_queue_capacity: usize,
    /// Sender-side queue capacity in packets
    pub outbound_queue_capacity: usize,
    /// Playback buffer cap; older samples are dropped past this
    pub max_playback_latency_ms: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: 5,
            audio: AudioConfig::default(),
            codec: CodecConfig::default(),
            network: NetworkConfig::default(),
            buffers: BufferConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            input_device: None,
            output_device: None,
            fixed_buffer: false,
        }
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            bitrate: DEFAULT_BITRATE,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            recv_buffer_size: 64 * 1024,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            packet_queue_capacity: DEFAULT_PACKET_QUEUE_CAPACITY,
            outbound_queue_capacity: DEFAULT_PACKET_QUEUE_CAPACITY,
            max_playback_latency_ms: DEFAULT_MAX_PLAYBACK_LATENCY_MS,
        }
    }
}

impl AppConfig {
    /// Load from `$LAN_VOICE_LINK_CONFIG`, then the per-user config file,
    /// falling back to defaults when neither exists.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load_from(Path::new(&path));
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/config.toml` for this application
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "lan-voice-link")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.codec_params().validate()?;

        if self.buffers.packet_queue_capacity == 0 || self.buffers.outbound_queue_capacity == 0 {
            return Err(Error::Config("queue capacities must be non-zero".into()));
        }
        if self.sample_queue_capacity() < self.frame_len() {
            return Err(Error::Config(format!(
                "max_playback_latency_ms {} is shorter than one {} ms frame",
                self.buffers.max_playback_latency_ms, FRAME_DURATION_MS
            )));
        }
        if self.network.poll_interval_ms == 0 || self.network.read_timeout_ms == 0 {
            return Err(Error::Config(
                "poll_interval_ms and read_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn codec_params(&self) -> CodecParams {
        CodecParams {
            sample_rate: self.audio.sample_rate,
            channels: CHANNELS,
            bitrate: self.codec.bitrate,
        }
    }

    /// Samples per 20 ms frame
    pub fn frame_len(&self) -> usize {
        self.codec_params().frame_len()
    }

    /// Playback buffer capacity in samples
    pub fn sample_queue_capacity(&self) -> usize {
        (self.audio.sample_rate as u64 * self.buffers.max_playback_latency_ms as u64 / 1000) as usize
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.network.poll_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.network.read_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.frame_len(), 320);
        assert_eq!(config.sample_queue_capacity(), 16000);
        assert_eq!(config.poll_interval(), Duration::from_millis(5));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            stats_interval_secs = 10

            [audio]
            sample_rate = 48000
            output_device = "USB Headset"

            [buffers]
            max_playback_latency_ms = 200
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.sample_rate, 48000);
        assert_eq!(config.audio.output_device.as_deref(), Some("USB Headset"));
        assert_eq!(config.frame_len(), 960);
        assert_eq!(config.sample_queue_capacity(), 9600);
        assert_eq!(config.codec.bitrate, DEFAULT_BITRATE);
        assert_eq!(config.stats_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_unsupported_rate() {
        let result = AppConfig::from_toml_str("[audio]\nsample_rate = 44100\n");
        assert!(matches!(result, Err(Error::Codec(_))));
    }

    #[test]
    fn test_rejects_latency_below_one_frame() {
        let result = AppConfig::from_toml_str("[buffers]\nmax_playback_latency_ms = 5\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = AppConfig::from_toml_str("[buffers]\npacket_queue_capacity = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = AppConfig::default();
        config.network.read_timeout_ms = 50;
        let text = config.to_toml_string().unwrap();
        assert_eq!(AppConfig::from_toml_str(&text).unwrap(), config);
    }
}

//! Configuration for the result writer.

use serde::{Deserialize, Serialize};

/// Configuration for the result writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Compression codec for the head array chunks.
    pub compression: ZarrCompression,

    /// Compression level (1-9).
    pub compression_level: u8,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression: ZarrCompression::None,
            compression_level: 1,
        }
    }
}

impl WriterConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.compression_level == 0 || self.compression_level > 9 {
            return Err("compression_level must be 1-9".to_string());
        }
        Ok(())
    }
}

/// Compression codec for the head array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZarrCompression {
    /// Raw little-endian chunks.
    #[default]
    None,
    /// Gzip.
    Gzip,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive). Unknown values disable compression.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "gzip" | "gz" | "zlib" => Self::Gzip,
            _ => Self::None,
        }
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
        }
    }
}

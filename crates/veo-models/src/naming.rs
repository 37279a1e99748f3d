//! Output filename settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where the prefix goes relative to the sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum NamingPosition {
    /// `prefix001.mp4`
    #[default]
    After,
    /// `001prefix.mp4`
    Before,
}

impl NamingPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            NamingPosition::After => "after",
            NamingPosition::Before => "before",
        }
    }
}

impl fmt::Display for NamingPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NamingPosition {
    type Err = NamingPositionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "after" => Ok(NamingPosition::After),
            "before" => Ok(NamingPosition::Before),
            _ => Err(NamingPositionParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown naming position: {0}, expected 'before' or 'after'")]
pub struct NamingPositionParseError(String);

/// User-configured naming for exported videos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NamingSettings {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_start_number")]
    start_number: u32,
    #[serde(default)]
    pub position: NamingPosition,
}

fn default_prefix() -> String {
    "video_".to_string()
}

fn default_start_number() -> u32 {
    1
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            start_number: default_start_number(),
            position: NamingPosition::default(),
        }
    }
}

impl NamingSettings {
    pub fn new(prefix: impl Into<String>, start_number: u32, position: NamingPosition) -> Self {
        Self {
            prefix: prefix.into(),
            start_number: start_number.max(1),
            position,
        }
    }

    /// First sequence number, always at least 1.
    pub fn start_number(&self) -> u32 {
        self.start_number.max(1)
    }

    pub fn set_start_number(&mut self, start_number: u32) {
        self.start_number = start_number.max(1);
    }

    /// Render the filename for a sequence number.
    pub fn format(&self, number: u64) -> String {
        let padded = format!("{:03}", number);
        match self.position {
            NamingPosition::After => format!("{}{}.mp4", self.prefix, padded),
            NamingPosition::Before => format!("{}{}.mp4", padded, self.prefix),
        }
    }

    /// Filename the first completed video would get.
    pub fn preview(&self) -> String {
        self.format(u64::from(self.start_number()))
    }
}

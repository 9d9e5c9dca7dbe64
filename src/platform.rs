// src/platform.rs

//! Target platform strings (`os/arch[/variant]`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ElementalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: Arch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }

    /// Suffix used by the shim EFI binaries (`shimx64.efi`, `shimaa64.efi`).
    pub fn efi_suffix(&self) -> &'static str {
        match self {
            Arch::Amd64 => "x64",
            Arch::Arm64 => "aa64",
        }
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "amd64" | "x86_64" => Ok(Arch::Amd64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            other => Err(format!("unsupported architecture {other:?}")),
        }
    }
}

impl Platform {
    /// Platform of the running host.
    pub fn host() -> Self {
        let arch = match std::env::consts::ARCH {
            "aarch64" => Arch::Arm64,
            _ => Arch::Amd64,
        };
        Self {
            os: "linux".to_string(),
            arch,
            variant: None,
        }
    }

    /// Default `--platform` value for the current host.
    pub fn host_string() -> String {
        Self::host().to_string()
    }

    pub fn parse(s: &str) -> crate::errors::Result<Self> {
        s.parse()
    }
}

impl FromStr for Platform {
    type Err = ElementalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: String| {
            ElementalError::ConfigError(format!("malformed platform {s:?}: {reason}"))
        };

        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() < 2 || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(malformed("expected <os>/<arch>[/<variant>]".to_string()));
        }

        if parts[0] != "linux" {
            return Err(malformed(format!("unsupported operating system {:?}", parts[0])));
        }

        let arch = parts[1].parse::<Arch>().map_err(malformed)?;

        Ok(Platform {
            os: parts[0].to_string(),
            arch,
            variant: parts.get(2).map(|v| v.to_string()),
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch.as_str())?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

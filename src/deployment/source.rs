// src/deployment/source.rs

//! Typed references to where an OS tree (or an overlay) comes from.
//!
//! Accepted URIs:
//! - `oci://<reference>` or a bare `<registry>/<repo>:<tag>` reference,
//! - `dir://<path>` for an unpacked tree,
//! - `raw://<path>` for a raw filesystem image,
//! - `tar://<path>` for a tarball.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static OCI_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9]+(?:[._-][a-z0-9]+)*(?::[0-9]+)?(?:/[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*)*(?::[A-Za-z0-9_][A-Za-z0-9_.-]{0,127})?(?:@sha256:[0-9a-f]{64})?$",
    )
    .expect("OCI reference pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ImageSource {
    Oci(String),
    Dir(PathBuf),
    Raw(PathBuf),
    Tar(PathBuf),
}

impl ImageSource {
    /// Parse a source URI. The error is a human readable reason.
    pub fn from_uri(uri: &str) -> Result<Self, String> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err("empty source URI".to_string());
        }

        let Some((scheme, rest)) = uri.split_once("://") else {
            return Self::oci(uri);
        };

        match scheme.to_lowercase().as_str() {
            "oci" => Self::oci(rest),
            "dir" => Self::path(rest).map(ImageSource::Dir),
            "raw" => Self::path(rest).map(ImageSource::Raw),
            "tar" => Self::path(rest).map(ImageSource::Tar),
            other => Err(format!("image source type not supported: {other:?}")),
        }
    }

    pub fn is_oci(&self) -> bool {
        matches!(self, ImageSource::Oci(_))
    }

    fn oci(reference: &str) -> Result<Self, String> {
        if OCI_REFERENCE.is_match(reference) {
            Ok(ImageSource::Oci(reference.to_string()))
        } else {
            Err(format!("invalid image reference {reference:?}"))
        }
    }

    fn path(path: &str) -> Result<PathBuf, String> {
        if path.is_empty() {
            Err("missing path in source URI".to_string())
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Oci(r) => write!(f, "oci://{r}"),
            ImageSource::Dir(p) => write!(f, "dir://{}", p.display()),
            ImageSource::Raw(p) => write!(f, "raw://{}", p.display()),
            ImageSource::Tar(p) => write!(f, "tar://{}", p.display()),
        }
    }
}

impl FromStr for ImageSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

impl TryFrom<String> for ImageSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_uri(&value)
    }
}

impl From<ImageSource> for String {
    fn from(src: ImageSource) -> Self {
        src.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_reference_is_oci() {
        let src = ImageSource::from_uri("my.registry.org/my/image:test").unwrap();
        assert_eq!(src, ImageSource::Oci("my.registry.org/my/image:test".into()));
        assert_eq!(src.to_string(), "oci://my.registry.org/my/image:test");
    }

    #[test]
    fn registry_with_port_and_digest() {
        let digest = format!("localhost:5000/os@sha256:{}", "a".repeat(64));
        assert!(ImageSource::from_uri(&digest).unwrap().is_oci());
    }

    #[test]
    fn path_schemes() {
        assert_eq!(
            ImageSource::from_uri("dir:///srv/os").unwrap(),
            ImageSource::Dir(PathBuf::from("/srv/os"))
        );
        assert_eq!(
            ImageSource::from_uri("TAR:///tmp/os.tar").unwrap(),
            ImageSource::Tar(PathBuf::from("/tmp/os.tar"))
        );
        assert!(ImageSource::from_uri("raw://").is_err());
    }

    #[test]
    fn unsupported_scheme() {
        let err = ImageSource::from_uri("https://example.com/my/image").unwrap_err();
        assert!(err.contains("image source type not supported"));
    }

    #[test]
    fn malformed_reference() {
        assert!(ImageSource::from_uri("Not A Reference").is_err());
        assert!(ImageSource::from_uri("oci://").is_err());
    }

    #[test]
    fn deserializes_from_uri_string() {
        let src: ImageSource = serde_yaml::from_str("dir:///srv/os").unwrap();
        assert_eq!(src, ImageSource::Dir(PathBuf::from("/srv/os")));
        assert!(serde_yaml::from_str::<ImageSource>("ftp://nope").is_err());
    }
}

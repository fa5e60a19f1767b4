use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A PHP version identifier as Homebrew names them.
///
/// `Numbered` covers the suffixed formulae (`php@8.1`); `Default` is the
/// unsuffixed `php` formula, which Homebrew points at whatever it currently
/// ships as the main release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhpVersion {
    Default,
    Numbered { major: u32, minor: u32 },
}

impl PhpVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32) -> Self {
        Self::Numbered { major, minor }
    }

    /// The canonical Homebrew formula name for this identifier.
    #[must_use]
    pub fn formula(&self) -> String {
        match self {
            Self::Default => "php".to_string(),
            Self::Numbered { major, minor } => format!("php@{major}.{minor}"),
        }
    }
}

impl Ord for PhpVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Default, Self::Default) => Ordering::Equal,
            // The unsuffixed formula tracks the newest release, so it sorts
            // after every pinned version.
            (Self::Default, Self::Numbered { .. }) => Ordering::Greater,
            (Self::Numbered { .. }, Self::Default) => Ordering::Less,
            (
                Self::Numbered { major, minor },
                Self::Numbered {
                    major: other_major,
                    minor: other_minor,
                },
            ) => major.cmp(other_major).then(minor.cmp(other_minor)),
        }
    }
}

impl PartialOrd for PhpVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PhpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Numbered { major, minor } => write!(f, "{major}.{minor}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y, php@X.Y, php, or default, got: {input}")]
    InvalidFormat { input: String },
    #[error("Invalid {component} version: {value}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
    },
}

impl FromStr for PhpVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.eq_ignore_ascii_case("php") || s.eq_ignore_ascii_case("default") {
            return Ok(Self::Default);
        }

        let s = s.strip_prefix("php@").unwrap_or(s);

        let Some((major_str, minor_str)) = s.split_once('.') else {
            return Err(VersionParseError::InvalidFormat {
                input: s.to_string(),
            });
        };
        if minor_str.contains('.') {
            return Err(VersionParseError::InvalidFormat {
                input: s.to_string(),
            });
        }

        let major = major_str
            .parse()
            .map_err(|_| VersionParseError::InvalidComponent {
                component: VersionComponent::Major,
                value: major_str.to_string(),
            })?;
        let minor = minor_str
            .parse()
            .map_err(|_| VersionParseError::InvalidComponent {
                component: VersionComponent::Minor,
                value: minor_str.to_string(),
            })?;

        Ok(Self::new(major, minor))
    }
}

/// A snapshot of one installed PHP formula, recomputed on demand from
/// Homebrew and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPhp {
    pub version: PhpVersion,
    pub formula: String,
    pub opt_prefix: PathBuf,
    pub linked: bool,
}

impl InstalledPhp {
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.opt_prefix.join("bin")
    }

    /// php-fpm lives under sbin, so switching has to put it on PATH too.
    #[must_use]
    pub fn sbin_dir(&self) -> PathBuf {
        self.opt_prefix.join("sbin")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailablePhp {
    pub version: PhpVersion,
    pub installed: bool,
}

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Bash,
    Zsh,
    Fish,
    Unknown,
}

impl ShellKind {
    /// Detect the user's login shell from `$SHELL`.
    #[must_use]
    pub fn detect() -> Self {
        std::env::var("SHELL")
            .map(|shell| Self::from_shell_path(&shell))
            .unwrap_or(Self::Unknown)
    }

    #[must_use]
    pub fn from_shell_path(shell: &str) -> Self {
        match Path::new(shell).file_name().and_then(|name| name.to_str()) {
            Some("bash") => Self::Bash,
            Some("zsh") => Self::Zsh,
            Some("fish") => Self::Fish,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
            Self::Unknown => "unknown",
        }
    }

    /// The startup file this shell reads; unknown shells fall back to the
    /// generic `.profile`.
    #[must_use]
    pub fn startup_file(&self, home: &Path) -> PathBuf {
        match self {
            Self::Bash => home.join(".bashrc"),
            Self::Zsh => home.join(".zshrc"),
            Self::Fish => home.join(".config").join("fish").join("config.fish"),
            Self::Unknown => home.join(".profile"),
        }
    }
}

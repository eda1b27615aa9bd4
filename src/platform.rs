//! Host platform detection and platform-dependent executable names.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Posix,
}

impl Platform {
    /// Classify an OS type string (`Windows_NT`, `Linux`, `Darwin`, ...).
    pub fn from_os_type(os_type: &str) -> Self {
        if os_type.to_ascii_lowercase().starts_with("windows") {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// The platform this process runs on.
    pub fn host() -> Self {
        Self::from_os_type(std::env::consts::OS)
    }

    /// Executable file name for `name` on this platform.
    pub fn executable_name(self, name: &str) -> String {
        match self {
            Platform::Windows => format!("{}.exe", name),
            Platform::Posix => name.to_string(),
        }
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Posix => write!(f, "posix"),
        }
    }
}

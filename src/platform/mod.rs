//! Platform resolution for manifest selection and process launching.
//!
//! A [`Platform`] is the *target* platform a session updates for. It is a
//! single explicit parameter carried by the session, never inferred from the
//! runtime host: the same machine may manage favorites for several targets.
//! The resolver is pure data: a total mapping from each label to an
//! executable-suffix token (used to filter `executable:` manifest
//! directives) and to the naming convention the process launcher uses.

use std::fmt;
use std::str::FromStr;

use crate::core::QupError;

/// Target platform for a session, drawn from a fixed enumerated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Debian GNU/Linux on AMD64.
    DebianAmd64,
    /// Debian GNU/Linux on ARM64.
    DebianArm64,
    /// FreeBSD on AMD64.
    FreeBsdAmd64,
    /// macOS (application-bundle packaging).
    MacOs,
    /// Raspberry Pi OS, 32-bit ARM.
    PiOsArm32,
    /// Raspberry Pi OS, 64-bit ARM.
    PiOsArm64,
    /// Ubuntu on AMD64.
    UbuntuAmd64,
    /// Windows 11 on AMD64.
    Windows11Amd64,
}

impl Platform {
    /// Every platform, in label order. Used by the CLI for `--platform` help
    /// and by the favorites UI layer to populate its selector.
    pub const ALL: [Self; 8] = [
        Self::DebianAmd64,
        Self::DebianArm64,
        Self::FreeBsdAmd64,
        Self::MacOs,
        Self::PiOsArm32,
        Self::PiOsArm64,
        Self::UbuntuAmd64,
        Self::Windows11Amd64,
    ];

    /// Human-readable label, as persisted in favorites.
    pub const fn label(self) -> &'static str {
        match self {
            Self::DebianAmd64 => "Debian AMD64",
            Self::DebianArm64 => "Debian ARM64",
            Self::FreeBsdAmd64 => "FreeBSD AMD64",
            Self::MacOs => "MacOS",
            Self::PiOsArm32 => "PiOS ARM32",
            Self::PiOsArm64 => "PiOS ARM64",
            Self::UbuntuAmd64 => "Ubuntu AMD64",
            Self::Windows11Amd64 => "Windows 11 AMD64",
        }
    }

    /// Token matched against `executable:<token>=` manifest directives.
    ///
    /// The mapping is total over the enumerated set; a directive whose token
    /// matches no platform simply never activates.
    pub const fn executable_token(self) -> &'static str {
        match self {
            Self::DebianAmd64 => "debian_amd64",
            Self::DebianArm64 => "debian_arm64",
            Self::FreeBsdAmd64 => "freebsd_amd64",
            Self::MacOs => "macos",
            Self::PiOsArm32 => "pios_arm32",
            Self::PiOsArm64 => "pios_arm64",
            Self::UbuntuAmd64 => "ubuntu_amd64",
            Self::Windows11Amd64 => "windows_11_amd64",
        }
    }

    /// Executable-name suffix for plain `executable=` directives.
    ///
    /// Empty for every platform except Windows, so unsuffixed names match
    /// everywhere and `.exe` names match only the Windows targets.
    pub const fn executable_suffix(self) -> &'static str {
        match self {
            Self::Windows11Amd64 => ".exe",
            _ => "",
        }
    }

    /// Whether the `[Unix]` manifest section applies to this platform.
    ///
    /// macOS is excluded despite being Unix-like: its GUI packaging is
    /// bundle-based and ships through the `[General]` section instead.
    pub const fn is_unix_family(self) -> bool {
        !matches!(self, Self::MacOs | Self::Windows11Amd64)
    }

    /// Library extensions that are irrelevant on this platform.
    ///
    /// A plain `file=` entry ending in one of these is silently skipped
    /// during parsing.
    pub const fn excluded_library_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Windows11Amd64 => &["so", "dylib"],
            Self::MacOs => &["so", "dll"],
            _ => &["dll", "dylib"],
        }
    }

    /// File name of the product's installed executable.
    ///
    /// The macOS launcher opens an application bundle instead; see
    /// [`crate::launch`].
    pub fn executable_file_name(self, product: &str) -> String {
        match self {
            Self::Windows11Amd64 => format!("{product}.exe"),
            _ => product.to_string(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = QupError;

    /// Parses either the human label (`"Windows 11 AMD64"`) or the
    /// executable token (`"windows_11_amd64"`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| {
                p.label().to_ascii_lowercase() == needle || p.executable_token() == needle
            })
            .ok_or(QupError::UnknownPlatform { label: s.trim().to_string() })
    }
}

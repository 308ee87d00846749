//! Build metadata stamped by `build.rs`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildMetadata {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub timestamp: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

impl BuildMetadata {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_hash: option_env!("BIZSIM_BUILD_HASH").unwrap_or("unknown"),
            timestamp: option_env!("BIZSIM_BUILD_TIMESTAMP").unwrap_or("unknown"),
            profile: option_env!("BIZSIM_BUILD_PROFILE").unwrap_or("unknown"),
            rustc: option_env!("BIZSIM_BUILD_RUSTC").unwrap_or("unknown"),
        }
    }
}

impl fmt::Display for BuildMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "bizsim {}", self.version)?;
        writeln!(f, "commit:   {}", self.git_hash)?;
        writeln!(f, "built:    {}", self.timestamp)?;
        writeln!(f, "profile:  {}", self.profile)?;
        write!(f, "rustc:    {}", self.rustc)
    }
}

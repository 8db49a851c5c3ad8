//! Flag sets used by presets and build requests

use crate::error::{BuildToolError, BuildToolResult};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Toggles layered on top of a preset when a build is invoked
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ExtraFlags: u32 {
        const CODE_COVERAGE = 0x0001;
        const USE_PROFILER = 0x0002;
        const STRICT_MODE = 0x0004;
        const WAIT_FOR_CONNECTION = 0x0010;
        const CONNECT_TO_HOST = 0x0020;
        const DETAILED_REPORT = 0x0040;
        const SYMLINK_SOURCES = 0x0080;
    }
}

impl ExtraFlags {
    /// Parse a comma separated list such as `USE_PROFILER,strict-mode`
    ///
    /// Names are matched case-insensitively with `-` treated as `_`. An empty
    /// string or `none` yields the empty set.
    pub fn parse_list(list: &str) -> BuildToolResult<Self> {
        let mut flags = ExtraFlags::empty();
        for part in list.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let normalized = part.replace('-', "_").to_ascii_uppercase();
            if normalized == "NONE" {
                continue;
            }
            let flag = ExtraFlags::from_name(&normalized).ok_or_else(|| {
                BuildToolError::invalid_argument_named(format!("unknown extra flag: {}", part), "flags")
            })?;
            flags |= flag;
        }
        Ok(flags)
    }

    /// Names of the set flags, in declaration order
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

bitflags! {
    /// Player build options, using the editor's numeric values
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct BuildOptions: u32 {
        const DEVELOPMENT = 1 << 0;
        const AUTO_RUN_PLAYER = 1 << 2;
        const SHOW_BUILT_PLAYER = 1 << 3;
        const CLEAN_BUILD_CACHE = 1 << 7;
        const CONNECT_WITH_PROFILER = 1 << 8;
        const ALLOW_DEBUGGING = 1 << 9;
        const SYMLINK_SOURCES = 1 << 10;
        const CONNECT_TO_HOST = 1 << 12;
        const BUILD_SCRIPTS_ONLY = 1 << 15;
        const COMPRESS_WITH_LZ4_HC = 1 << 19;
        const STRICT_MODE = 1 << 21;
        const WAIT_FOR_PLAYER_CONNECTION = 1 << 25;
        const ENABLE_CODE_COVERAGE = 1 << 26;
        const ENABLE_DEEP_PROFILING_SUPPORT = 1 << 28;
        const DETAILED_BUILD_REPORT = 1 << 29;
    }
}

bitflags! {
    /// CPU architectures included in an Android player
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct AndroidArchitecture: u32 {
        const ARMV7 = 1 << 0;
        const ARM64 = 1 << 1;
        const X86 = 1 << 2;
        const X86_64 = 1 << 3;
    }
}

impl Default for AndroidArchitecture {
    fn default() -> Self {
        AndroidArchitecture::all()
    }
}

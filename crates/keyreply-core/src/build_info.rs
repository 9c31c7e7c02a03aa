//! Build metadata embedded by the build script, reported by `/health` and
//! `keyreply --version`.

/// Short git commit hash, or `unknown` outside a checkout.
pub const GIT_HASH: &str = env!("KEYREPLY_GIT_HASH");

/// Unix epoch seconds at build time.
pub const BUILD_TIMESTAMP: &str = env!("KEYREPLY_BUILD_TIMESTAMP");

/// Cargo profile (`debug` or `release`).
pub const BUILD_PROFILE: &str = env!("KEYREPLY_BUILD_PROFILE");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `"0.1.0 (abc1234, debug)"`
pub fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH}, {BUILD_PROFILE})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_string() {
        let v = version_string();
        assert!(v.starts_with(VERSION));
        assert!(v.contains(GIT_HASH));
    }

    #[test]
    fn test_build_timestamp_is_numeric() {
        assert!(BUILD_TIMESTAMP.parse::<u64>().is_ok());
    }

    #[test]
    fn test_build_profile_in_tests() {
        assert_eq!(BUILD_PROFILE, "debug");
    }
}

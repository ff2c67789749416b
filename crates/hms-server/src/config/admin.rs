//! Reserved admin endpoint paths.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AdminConfig {
    /// Register a new expectation (POST)
    #[serde(default = "default_expect_path")]
    pub expect_path: String,
    /// Verify and reset all expectations
    #[serde(default = "default_check_path")]
    pub check_path: String,
    /// Stop the server
    #[serde(default = "default_shutdown_path")]
    pub shutdown_path: String,
}

fn default_expect_path() -> String {
    "/__expect".to_string()
}

fn default_check_path() -> String {
    "/__check".to_string()
}

fn default_shutdown_path() -> String {
    "/__shutdown".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            expect_path: default_expect_path(),
            check_path: default_check_path(),
            shutdown_path: default_shutdown_path(),
        }
    }
}

impl AdminConfig {
    /// True if `path` is one of the reserved paths.
    pub fn is_reserved(&self, path: &str) -> bool {
        path == self.expect_path || path == self.check_path || path == self.shutdown_path
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let paths = [
            ("expect_path", &self.expect_path),
            ("check_path", &self.check_path),
            ("shutdown_path", &self.shutdown_path),
        ];

        for (name, path) in paths {
            if !path.starts_with('/') {
                anyhow::bail!("admin.{name} must start with '/', got '{path}'");
            }
        }

        if self.expect_path == self.check_path
            || self.expect_path == self.shutdown_path
            || self.check_path == self.shutdown_path
        {
            anyhow::bail!("admin paths must be distinct");
        }

        Ok(())
    }
}

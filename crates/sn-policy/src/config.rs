//! Policy configuration.

use serde::{Deserialize, Serialize};

/// Approval policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Run MODERATE-risk actions without waiting for approval.
    ///
    /// SAFE actions never need approval and CRITICAL actions always do,
    /// whatever this is set to.
    #[serde(default = "default_auto_approve_moderate")]
    pub auto_approve_moderate: bool,
}

fn default_auto_approve_moderate() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_approve_moderate: default_auto_approve_moderate(),
        }
    }
}

impl PolicyConfig {
    /// Policy that holds every MODERATE action for approval.
    pub fn strict() -> Self {
        Self {
            auto_approve_moderate: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(PolicyConfig::default().auto_approve_moderate);
        assert!(!PolicyConfig::strict().auto_approve_moderate);
    }

    #[test]
    fn test_yaml_defaults_missing_fields() {
        let config: PolicyConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, PolicyConfig::default());

        let config: PolicyConfig = serde_yaml::from_str("auto_approve_moderate: false").unwrap();
        assert_eq!(config, PolicyConfig::strict());
    }
}

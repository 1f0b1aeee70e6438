//! Bulk transfer shape shared by the runner and both endpoints.

use interop_core::codec::{StreamLayout, ONE_MB, SEGMENTS_PER_GB};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Environment prefix under which the runner forwards this section to children.
const ENV_PREFIX: &str = "INTEROP_TRANSFER__";

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Overrides the nominal size of every bulk transfer step.
    #[serde(default)]
    pub gigabytes: Option<u64>,

    #[validate(range(min = 1))]
    pub segment_len: usize,

    #[validate(range(min = 1))]
    pub segments_per_group: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            gigabytes: None,
            segment_len: ONE_MB,
            segments_per_group: SEGMENTS_PER_GB,
        }
    }
}

impl TransferConfig {
    pub fn layout(&self) -> StreamLayout {
        StreamLayout {
            segment_len: self.segment_len,
            segments_per_group: self.segments_per_group,
        }
    }

    /// Environment variables that reproduce this section in a child process.
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut vars = vec![
            (
                format!("{ENV_PREFIX}SEGMENT_LEN"),
                self.segment_len.to_string(),
            ),
            (
                format!("{ENV_PREFIX}SEGMENTS_PER_GROUP"),
                self.segments_per_group.to_string(),
            ),
        ];
        if let Some(gigabytes) = self.gigabytes {
            vars.push((format!("{ENV_PREFIX}GIGABYTES"), gigabytes.to_string()));
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominal_layout_by_default() {
        assert_eq!(TransferConfig::default().layout(), StreamLayout::NOMINAL);
    }

    #[test]
    fn env_omits_unset_size_override() {
        let vars = TransferConfig::default().to_env();
        assert_eq!(vars.len(), 2);
        assert!(vars.iter().all(|(k, _)| k.starts_with("INTEROP_TRANSFER__")));

        let sized = TransferConfig {
            gigabytes: Some(2),
            ..TransferConfig::default()
        };
        assert!(sized
            .to_env()
            .contains(&("INTEROP_TRANSFER__GIGABYTES".to_string(), "2".to_string())));
    }
}

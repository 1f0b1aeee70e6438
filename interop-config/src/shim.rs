//! Settings of the in-repo endpoints.
//!
//! Endpoints are launched with only `<scenario_id> <port>` on the command line,
//! so everything else comes from compiled defaults and `INTEROP_*` variables.

use std::path::PathBuf;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ConfigError, TransferConfig};

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ShimConfig {
    /// Directory holding the PEM trust material.
    pub pem_dir: PathBuf,

    /// Host name clients connect to and verify.
    #[validate(length(min = 1))]
    pub host: String,

    #[validate(nested)]
    pub transfer: TransferConfig,
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            pem_dir: PathBuf::from("."),
            host: "localhost".into(),
            transfer: TransferConfig::default(),
        }
    }
}

impl ShimConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Figment::from(Serialized::defaults(ShimConfig::default()))
            .merge(Env::prefixed("INTEROP_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_section_comes_from_the_environment() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INTEROP_TRANSFER__GIGABYTES", "2");
            jail.set_env("INTEROP_TRANSFER__SEGMENT_LEN", "4096");
            jail.set_env("INTEROP_PEM_DIR", "certs");

            let config = ShimConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.transfer.gigabytes, Some(2));
            assert_eq!(config.transfer.segment_len, 4096);
            assert_eq!(config.transfer.segments_per_group, 1000);
            assert_eq!(config.pem_dir, PathBuf::from("certs"));
            assert_eq!(config.host, "localhost");
            Ok(())
        });
    }

    #[test]
    fn zero_segment_len_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("INTEROP_TRANSFER__SEGMENT_LEN", "0");
            assert!(matches!(ShimConfig::load(), Err(ConfigError::Validation(_))));
            Ok(())
        });
    }
}

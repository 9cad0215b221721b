//! Client configuration: credentials, network selection, slippage,
//! logging, and the builder-fee tri-state.

use crate::domain::{Address, Decimal};
use crate::error::RouteError;
use crate::venue::hyperliquid::{MAINNET_API_URL, TESTNET_API_URL};
use alloy::signers::local::PrivateKeySigner;
use std::collections::HashMap;
use std::str::FromStr;

/// Builder address credited when the user does not configure one.
pub const DEFAULT_BUILDER_ADDRESS: &str = "0x1924b8561eef20e70eca82f0e94dc9a5e8e1a96c";

/// Fee for the default builder, in basis points.
pub const DEFAULT_BUILDER_FEE_BPS: u32 = 1;

/// Upper bound for a configured builder fee, in basis points.
pub const MAX_BUILDER_FEE_BPS: u32 = 10;

/// Environment variable the CLI reads the private key from by default.
pub const DEFAULT_KEY_ENV: &str = "HP_PRIVATE_KEY";

/// Optional environment variables recognized alongside the key.
pub const WALLET_ADDRESS_ENV: &str = "HP_WALLET_ADDRESS";
pub const TESTNET_ENV: &str = "HP_TESTNET";
pub const SLIPPAGE_ENV: &str = "HP_SLIPPAGE";
pub const LOG_LEVEL_ENV: &str = "HP_LOG_LEVEL";

/// Default slippage tolerance applied to quote limit prices.
pub fn default_slippage() -> Decimal {
    Decimal::scaled(1, 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Silent,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(format!(
                "log level must be debug, info, warn, error, or silent, got {}",
                other
            )),
        }
    }
}

impl LogLevel {
    /// Directive understood by tracing-subscriber's EnvFilter, or None
    /// when logging is disabled entirely.
    pub fn directive(&self) -> Option<&'static str> {
        match self {
            LogLevel::Debug => Some("debug"),
            LogLevel::Info => Some("info"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Error => Some("error"),
            LogLevel::Silent => None,
        }
    }
}

/// A custom builder-fee arrangement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    pub address: Address,
    pub fee_bps: u32,
}

/// Builder-fee tri-state: unset, explicitly disabled, or custom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BuilderSetting {
    /// No user choice: credit the system builder at the default fee.
    #[default]
    Default,
    /// Explicitly disabled: submissions carry no builder.
    Disabled,
    Custom(BuilderConfig),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Enables writes when present.
    pub private_key: Option<String>,
    /// Derived from the key when absent.
    pub wallet_address: Option<Address>,
    pub testnet: bool,
    pub default_slippage: Decimal,
    pub log_level: LogLevel,
    pub builder: BuilderSetting,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            private_key: None,
            wallet_address: None,
            testnet: false,
            default_slippage: default_slippage(),
            log_level: LogLevel::default(),
            builder: BuilderSetting::default(),
        }
    }
}

impl Config {
    /// Build a configuration from the process environment. The signing
    /// key is read from the variable named by `key_env`.
    pub fn from_env(key_env: &str) -> Result<Self, RouteError> {
        Self::from_env_map(key_env, std::env::vars().collect())
    }

    /// Build a configuration from an explicit environment map.
    ///
    /// The result is not yet validated: callers layer their own overrides
    /// on top and then run [`Config::validated`].
    ///
    /// # Errors
    /// `InvalidConfig` when a recognized variable holds an unparseable
    /// value.
    pub fn from_env_map(
        key_env: &str,
        env_map: HashMap<String, String>,
    ) -> Result<Self, RouteError> {
        let private_key = env_map.get(key_env).cloned();

        let wallet_address = match env_map.get(WALLET_ADDRESS_ENV) {
            Some(raw) => Some(raw.parse::<Address>().map_err(|e| {
                RouteError::InvalidConfig(format!("{}: {}", WALLET_ADDRESS_ENV, e))
            })?),
            None => None,
        };

        let testnet = match env_map.get(TESTNET_ENV) {
            None => false,
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(RouteError::InvalidConfig(format!(
                        "{} must be a boolean, got {}",
                        TESTNET_ENV, other
                    )))
                }
            },
        };

        let default_slippage = match env_map.get(SLIPPAGE_ENV) {
            Some(raw) => Decimal::from_str_canonical(raw).map_err(|_| {
                RouteError::InvalidConfig(format!("{} must be a decimal, got {}", SLIPPAGE_ENV, raw))
            })?,
            None => default_slippage(),
        };

        let log_level = match env_map.get(LOG_LEVEL_ENV) {
            Some(raw) => raw.parse().map_err(RouteError::InvalidConfig)?,
            None => LogLevel::default(),
        };

        Ok(Config {
            private_key,
            wallet_address,
            testnet,
            default_slippage,
            log_level,
            builder: BuilderSetting::default(),
        })
    }

    /// Check invariants and derive the wallet address from the key when
    /// one was not given explicitly.
    ///
    /// # Errors
    /// `InvalidConfig` on a malformed key, an out-of-range builder fee, or
    /// an unusable slippage value.
    pub fn validated(mut self) -> Result<Self, RouteError> {
        if let BuilderSetting::Custom(builder) = &self.builder {
            if builder.fee_bps > MAX_BUILDER_FEE_BPS {
                return Err(RouteError::InvalidConfig(format!(
                    "builder fee must be within [0, {}] bps, got {}",
                    MAX_BUILDER_FEE_BPS, builder.fee_bps
                )));
            }
        }

        if self.default_slippage.is_negative() || self.default_slippage >= Decimal::one() {
            return Err(RouteError::InvalidConfig(format!(
                "slippage must be in [0, 1), got {}",
                self.default_slippage
            )));
        }

        if let Some(key) = &self.private_key {
            let signer: PrivateKeySigner = key
                .trim_start_matches("0x")
                .parse()
                .map_err(|_| RouteError::InvalidConfig("malformed private key".to_string()))?;
            if self.wallet_address.is_none() {
                self.wallet_address = Some(Address::new(format!("{:#x}", signer.address())));
            }
        }

        Ok(self)
    }

    pub fn api_url(&self) -> &'static str {
        if self.testnet {
            TESTNET_API_URL
        } else {
            MAINNET_API_URL
        }
    }

    /// The builder to credit on submissions, with the tri-state resolved.
    pub fn resolved_builder(&self) -> Option<BuilderConfig> {
        match &self.builder {
            BuilderSetting::Default => Some(BuilderConfig {
                address: Address::new(DEFAULT_BUILDER_ADDRESS.to_string()),
                fee_bps: DEFAULT_BUILDER_FEE_BPS,
            }),
            BuilderSetting::Disabled => None,
            BuilderSetting::Custom(builder) => Some(builder.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0x0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_env_map_defaults() {
        let config = Config::from_env_map(DEFAULT_KEY_ENV, env(&[])).unwrap();
        assert!(config.private_key.is_none());
        assert!(config.wallet_address.is_none());
        assert!(!config.testnet);
        assert_eq!(config.default_slippage, default_slippage());
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_from_env_map_reads_recognized_variables() {
        let config = Config::from_env_map(
            "CUSTOM_KEY",
            env(&[
                ("CUSTOM_KEY", TEST_KEY),
                (WALLET_ADDRESS_ENV, "0x2222222222222222222222222222222222222222"),
                (TESTNET_ENV, "true"),
                (SLIPPAGE_ENV, "0.02"),
                (LOG_LEVEL_ENV, "warn"),
            ]),
        )
        .unwrap();

        assert_eq!(config.private_key.as_deref(), Some(TEST_KEY));
        assert_eq!(
            config.wallet_address.unwrap().as_str(),
            "0x2222222222222222222222222222222222222222"
        );
        assert!(config.testnet);
        assert_eq!(config.default_slippage, Decimal::scaled(2, 2));
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_from_env_map_ignores_key_under_other_name() {
        let config =
            Config::from_env_map(DEFAULT_KEY_ENV, env(&[("CUSTOM_KEY", TEST_KEY)])).unwrap();
        assert!(config.private_key.is_none());
    }

    #[test]
    fn test_from_env_map_rejects_bad_testnet() {
        let result = Config::from_env_map(DEFAULT_KEY_ENV, env(&[(TESTNET_ENV, "maybe")]));
        match result {
            Err(RouteError::InvalidConfig(msg)) => assert!(msg.contains(TESTNET_ENV)),
            other => panic!("expected InvalidConfig, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_from_env_map_rejects_bad_wallet() {
        let result =
            Config::from_env_map(DEFAULT_KEY_ENV, env(&[(WALLET_ADDRESS_ENV, "0x123")]));
        assert!(matches!(result, Err(RouteError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_env_map_rejects_bad_slippage() {
        let result = Config::from_env_map(DEFAULT_KEY_ENV, env(&[(SLIPPAGE_ENV, "lots")]));
        assert!(matches!(result, Err(RouteError::InvalidConfig(_))));
    }

    #[test]
    fn test_default_builder_resolution() {
        let config = Config::default();
        let builder = config.resolved_builder().unwrap();
        assert_eq!(builder.address.as_str(), DEFAULT_BUILDER_ADDRESS);
        assert_eq!(builder.fee_bps, DEFAULT_BUILDER_FEE_BPS);
    }

    #[test]
    fn test_disabled_builder_resolution() {
        let config = Config {
            builder: BuilderSetting::Disabled,
            ..Config::default()
        };
        assert!(config.resolved_builder().is_none());
    }

    #[test]
    fn test_builder_fee_out_of_range_rejected() {
        let config = Config {
            builder: BuilderSetting::Custom(BuilderConfig {
                address: Address::new(DEFAULT_BUILDER_ADDRESS.to_string()),
                fee_bps: 11,
            }),
            ..Config::default()
        };
        match config.validated() {
            Err(RouteError::InvalidConfig(msg)) => assert!(msg.contains("builder fee")),
            other => panic!("expected InvalidConfig, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_wallet_derived_from_key() {
        let config = Config {
            private_key: Some(TEST_KEY.to_string()),
            ..Config::default()
        };
        let validated = config.validated().unwrap();
        let address = validated.wallet_address.expect("address not derived");
        assert_eq!(address.as_str().len(), 42);
        assert!(address.as_str().starts_with("0x"));
    }

    #[test]
    fn test_malformed_key_rejected() {
        let config = Config {
            private_key: Some("not-a-key".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            config.validated(),
            Err(RouteError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_slippage_bounds() {
        let config = Config {
            default_slippage: Decimal::one(),
            ..Config::default()
        };
        assert!(matches!(
            config.validated(),
            Err(RouteError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("SILENT".parse::<LogLevel>().unwrap(), LogLevel::Silent);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_testnet_selects_url() {
        let config = Config {
            testnet: true,
            ..Config::default()
        };
        assert!(config.api_url().contains("testnet"));
    }
}

pub mod app_config;
pub mod category;
pub mod config;
pub mod ledger;
pub mod product;
pub mod profile;

use thiserror::Error;

pub use app_config::AppConfig;
pub use category::{slugify, CategoryNode};
pub use config::{load_app_config, load_app_config_from_env};
pub use ledger::{Ledger, LedgerError};
pub use product::{
    external_id_from_url, AttributeValues, ImageRef, OptionKey, Product, ProductKind, Variant,
};
pub use profile::{load_profile, Profile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read profile file {path}: {source}")]
    ProfileFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile file: {0}")]
    ProfileFileParse(#[from] serde_yaml::Error),

    #[error("profile validation failed: {0}")]
    Validation(String),
}

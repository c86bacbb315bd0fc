use thiserror::Error;

pub mod ads;
pub mod app_config;
pub mod brands;
pub mod config;
pub mod fingerprint;
pub mod merge;
pub mod url;

pub use ads::{infer_mime_type, NormalizedAd, NormalizedAsset, ROLE_PRIMARY};
pub use app_config::{AppConfig, Environment};
pub use brands::{
    load_brand_catalog, normalize_brand_name, BrandCatalog, BrandConfig, ChannelIdentityConfig,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use fingerprint::{
    copy_fingerprint, creative_fingerprint, media_fingerprint, CreativeCopy, MediaIdentity,
    FINGERPRINT_ALGO,
};
pub use merge::merge_metadata;
pub use url::{derive_primary_domain, normalize_url, strip_tracking_params};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read brand catalog at {path}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse brand catalog")]
    CatalogParse(#[from] serde_yaml::Error),

    #[error("invalid brand catalog: {0}")]
    Validation(String),
}

//! Environment configuration for the storefront client and the backend.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use anyhow::Context;

/// What happens to a guest cart when a user signs in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GuestCartPolicy {
    /// Push guest lines into the user's cart, then drop the guest cart.
    #[default]
    Merge,
    /// Show only the user's cart; the guest cart stays in local storage.
    Replace,
}

impl FromStr for GuestCartPolicy {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => anyhow::bail!("unknown guest cart policy: {other}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub api_base_url: String,
    pub storage_dir: PathBuf,
    pub guest_cart_policy: GuestCartPolicy,
    pub image_cache_capacity: usize,
    pub image_concurrency: usize,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            storage_dir: PathBuf::from(".storefront"),
            guest_cart_policy: GuestCartPolicy::Merge,
            image_cache_capacity: 256,
            image_concurrency: 3,
        }
    }
}

impl StorefrontConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            api_base_url: env::var("STOREFRONT_API_URL").unwrap_or(defaults.api_base_url),
            storage_dir: env::var("STOREFRONT_STORAGE_DIR").map(PathBuf::from).unwrap_or(defaults.storage_dir),
            guest_cart_policy: parse_var("STOREFRONT_GUEST_CART_POLICY")?.unwrap_or(defaults.guest_cart_policy),
            image_cache_capacity: parse_var("STOREFRONT_IMAGE_CACHE_CAPACITY")?.unwrap_or(defaults.image_cache_capacity),
            image_concurrency: parse_var("STOREFRONT_IMAGE_CONCURRENCY")?.unwrap_or(defaults.image_concurrency),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: parse_var("PORT")?.unwrap_or(5000),
            nats_url: env::var("NATS_URL").ok().filter(|u| !u.is_empty()),
        })
    }
}

fn parse_var<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map(Some).map_err(|e| anyhow::anyhow!("invalid {name}={raw}: {e}")),
        Err(_) => Ok(None),
    }
}

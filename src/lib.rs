//! `estate-client` is a resilient async API client for the estate listing
//! backend.
//!
//! Every call goes through [`ApiClient::send`], which:
//! - injects `Authorization: Bearer <token>` from the stored user record,
//! - retries transient failures on the current host with linear backoff,
//! - falls back to the other configured hosts and promotes the first one
//!   that answers.
//!
//! Typed helpers cover the backend's endpoints, e.g. [`ApiClient::sign_in`]
//! and [`ApiClient::listings`].

mod client;
mod endpoints;
mod error;
mod hosts;
mod options;
mod request;
mod token;
mod types;
mod wire;

pub use client::ApiClient;
pub use endpoints::{CREATE_LISTING, LISTINGS, LISTING_STATS, SIGN_IN, SIGN_OUT, SIGN_UP};
pub use error::ApiError;
pub use hosts::{HostList, HOSTS_ENV_VAR};
pub use options::{ClientOptions, DEFAULT_HEALTH_PATH};
pub use request::ApiRequest;
#[cfg(not(target_arch = "wasm32"))]
pub use token::FileTokenStore;
pub use token::{MemoryTokenStore, TokenStore, TokenStoreError, USER_KEY};
pub use types::{HealthStatus, ListingQuery};

pub use reqwest::Method;

pub type Result<T> = std::result::Result<T, ApiError>;

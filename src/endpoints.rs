//! Typed wrappers for the listing backend's endpoints.

use serde_json::Value as JsonValue;

use crate::{
    wire::{SignInRequest, SignUpRequest},
    ApiClient, ApiRequest, ListingQuery, Result, TokenStore,
};

pub const SIGN_IN: &str = "/auth/signin";
pub const SIGN_UP: &str = "/auth/signup";
pub const SIGN_OUT: &str = "/auth/signout";
pub const LISTINGS: &str = "/listing/get";
pub const CREATE_LISTING: &str = "/listing/create";
pub const LISTING_STATS: &str = "/listing/stats";

impl ApiClient {
    /// Signs in and stores the returned user record, so later calls carry
    /// its token.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<JsonValue> {
        let request = ApiRequest::post(SIGN_IN).json_from(&SignInRequest { email, password })?;
        let user = self.send(request).await?;
        self.token_store().save_user(&user.to_string())?;

        #[cfg(feature = "tracing")]
        tracing::info!("signed in; user record stored");

        Ok(user)
    }

    pub async fn sign_up(&self, username: &str, email: &str, password: &str) -> Result<JsonValue> {
        let request = ApiRequest::post(SIGN_UP).json_from(&SignUpRequest {
            username,
            email,
            password,
        })?;
        self.send(request).await
    }

    /// Signs out. The stored user record is removed even if the call fails.
    ///
    /// When both the call and the removal fail, the call's error is returned
    /// and the store failure is only logged.
    pub async fn sign_out(&self) -> Result<JsonValue> {
        let result = self.send(ApiRequest::get(SIGN_OUT)).await;
        let removed = self.token_store().remove_user();

        match (result, removed) {
            (Ok(body), Ok(())) => Ok(body),
            (Ok(_), Err(store_err)) => Err(store_err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(_store_err)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_store_err, "failed to remove stored user record on sign-out");
                Err(err)
            }
        }
    }

    /// Searches listings. Unset filters are left out of the query string.
    pub async fn listings(&self, query: &ListingQuery) -> Result<JsonValue> {
        let request = ApiRequest::get(LISTINGS).query_from(query)?;
        self.send(request).await
    }

    pub async fn create_listing(&self, listing: JsonValue) -> Result<JsonValue> {
        self.send(ApiRequest::post(CREATE_LISTING).json(listing))
            .await
    }

    pub async fn listing_stats(&self) -> Result<JsonValue> {
        self.send(ApiRequest::get(LISTING_STATS)).await
    }
}

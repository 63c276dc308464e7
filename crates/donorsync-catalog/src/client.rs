//! REST client for the remote catalog.
//!
//! Paths follow the WooCommerce v3 surface (`wp-json/wc/v3`). Every call
//! authenticates with the consumer key pair over HTTP basic auth and maps
//! the response status to a typed [`CatalogError`] before deserializing.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use donorsync_core::AppConfig;

use crate::api::CatalogApi;
use crate::error::CatalogError;
use crate::types::{
    ProductPayload, RemoteAttribute, RemoteBrand, RemoteCategory, RemoteProduct, RemoteTerm,
    RemoteVariant, VariantPayload,
};

const API_PREFIX: &str = "wp-json/wc/v3";
const PAGE_SIZE: u32 = 100;

pub struct RestCatalogClient {
    client: Client,
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl RestCatalogClient {
    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &AppConfig) -> Result<Self, CatalogError> {
        Self::with_base_url(
            &config.remote_base_url,
            &config.consumer_key,
            &config.consumer_secret,
            config.request_timeout_secs,
            &config.user_agent,
            config.max_retries,
            config.retry_backoff_base_secs,
        )
    }

    /// Creates a client against an explicit base URL. Tests point this at
    /// a mock server.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the HTTP client cannot be built.
    #[allow(clippy::too_many_arguments)]
    pub fn with_base_url(
        base_url: &str,
        consumer_key: &str,
        consumer_secret: &str,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            consumer_key: consumer_key.to_owned(),
            consumer_secret: consumer_secret.to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{API_PREFIX}/{path}", self.base_url)
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = self.url(path);
        retry_transient(self.max_retries, self.backoff_base_secs, || {
            let url = url.clone();
            let method = method.clone();
            async move {
                let mut request = self
                    .client
                    .request(method, &url)
                    .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
                    .query(query);
                if let Some(body) = body {
                    request = request.json(body);
                }
                let response = request.send().await?;
                Self::decode(response, &url).await
            }
        })
        .await
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, CatalogError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(CatalogError::RateLimited { retry_after_secs });
        }

        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound {
                entity: "remote resource".to_owned(),
                reference: url.to_owned(),
            });
        }

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        if !status.is_success() {
            return Err(CatalogError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CatalogError::Deserialize {
            url: url.to_owned(),
            message: e.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        self.request::<T, ()>(Method::GET, path, query, None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogError> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogError> {
        self.request(Method::PUT, path, &[], Some(body)).await
    }
}

#[async_trait]
impl CatalogApi for RestCatalogClient {
    async fn find_attribute(&self, slug: &str) -> Result<Option<RemoteAttribute>, CatalogError> {
        // The attribute endpoint has no slug filter; the list is small.
        let attributes: Vec<RemoteAttribute> = self.get("products/attributes", &[]).await?;
        Ok(attributes.into_iter().find(|a| a.slug == slug))
    }

    async fn create_attribute(
        &self,
        name: &str,
        slug: &str,
    ) -> Result<RemoteAttribute, CatalogError> {
        self.post(
            "products/attributes",
            &serde_json::json!({ "name": name, "slug": slug, "type": "select" }),
        )
        .await
    }

    async fn list_terms(&self, attribute_id: i64) -> Result<Vec<RemoteTerm>, CatalogError> {
        self.get(
            &format!("products/attributes/{attribute_id}/terms"),
            &[("per_page", PAGE_SIZE.to_string())],
        )
        .await
    }

    async fn create_term(
        &self,
        attribute_id: i64,
        name: &str,
    ) -> Result<RemoteTerm, CatalogError> {
        self.post(
            &format!("products/attributes/{attribute_id}/terms"),
            &serde_json::json!({ "name": name }),
        )
        .await
    }

    async fn find_category(
        &self,
        slug: &str,
        parent: i64,
    ) -> Result<Option<RemoteCategory>, CatalogError> {
        let matches: Vec<RemoteCategory> = self
            .get("products/categories", &[("slug", slug.to_owned())])
            .await?;
        Ok(matches.into_iter().find(|c| c.parent == parent))
    }

    async fn create_category(
        &self,
        name: &str,
        slug: &str,
        parent: i64,
    ) -> Result<RemoteCategory, CatalogError> {
        self.post(
            "products/categories",
            &serde_json::json!({ "name": name, "slug": slug, "parent": parent }),
        )
        .await
    }

    async fn find_brand(&self, slug: &str) -> Result<Option<RemoteBrand>, CatalogError> {
        let matches: Vec<RemoteBrand> = self
            .get("products/brands", &[("slug", slug.to_owned())])
            .await?;
        Ok(matches.into_iter().next())
    }

    async fn create_brand(&self, name: &str, slug: &str) -> Result<RemoteBrand, CatalogError> {
        self.post(
            "products/brands",
            &serde_json::json!({ "name": name, "slug": slug }),
        )
        .await
    }

    async fn find_product_by_sku(
        &self,
        sku: &str,
    ) -> Result<Option<RemoteProduct>, CatalogError> {
        let matches: Vec<RemoteProduct> =
            self.get("products", &[("sku", sku.to_owned())]).await?;
        Ok(matches.into_iter().next())
    }

    async fn create_product(
        &self,
        payload: &ProductPayload,
    ) -> Result<RemoteProduct, CatalogError> {
        self.post("products", payload).await
    }

    async fn update_product(
        &self,
        product_id: i64,
        payload: &ProductPayload,
    ) -> Result<RemoteProduct, CatalogError> {
        self.put(&format!("products/{product_id}"), payload).await
    }

    async fn list_variants(&self, product_id: i64) -> Result<Vec<RemoteVariant>, CatalogError> {
        self.get(
            &format!("products/{product_id}/variations"),
            &[("per_page", PAGE_SIZE.to_string())],
        )
        .await
    }

    async fn create_variant(
        &self,
        product_id: i64,
        payload: &VariantPayload,
    ) -> Result<RemoteVariant, CatalogError> {
        self.post(&format!("products/{product_id}/variations"), payload)
            .await
    }

    async fn update_variant(
        &self,
        product_id: i64,
        variant_id: i64,
        payload: &VariantPayload,
    ) -> Result<RemoteVariant, CatalogError> {
        self.put(
            &format!("products/{product_id}/variations/{variant_id}"),
            payload,
        )
        .await
    }
}

/// Retries `operation` on transient errors with exponential backoff.
async fn retry_transient<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, CatalogError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatalogError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= max_retries {
                    return Err(err);
                }
                err
            }
        };

        let delay_secs = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
        tracing::warn!(
            attempt,
            max_retries,
            delay_secs,
            error = %err,
            "transient catalog error, retrying after backoff"
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        attempt += 1;
    }
}

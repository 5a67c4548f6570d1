use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            service_key: config.supabase_service_key.clone(),
        }
    }

    fn get_headers(&self, bearer: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key).unwrap());
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = bearer {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
            );
        }

        headers
    }

    async fn dispatch<T>(&self, method: Method, path: &str, bearer: Option<&str>,
                         body: Option<Value>, extra_headers: Option<HeaderMap>)
                         -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(bearer);
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Request authenticated with the caller's token (RLS applies).
    pub async fn request<T>(&self, method: Method, path: &str,
                            auth_token: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        self.dispatch(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         auth_token: Option<&str>, body: Option<Value>,
                                         headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        self.dispatch(method, path, auth_token, body, headers).await
    }

    /// Request authenticated with the service-role key. Used by the stores,
    /// which run after the handlers have done their access-control work.
    pub async fn service_request<T>(&self, method: Method, path: &str,
                                    body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        self.dispatch(method, path, Some(self.service_key.as_str()), body, None).await
    }

    pub async fn service_request_with_headers<T>(&self, method: Method, path: &str,
                                                 body: Option<Value>,
                                                 headers: Option<HeaderMap>)
                                                 -> Result<T>
    where T: DeserializeOwned {
        self.dispatch(method, path, Some(self.service_key.as_str()), body, headers).await
    }
}

/// Header set requesting PostgREST to echo the written rows back.
pub fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

//! Checkout provider client.
//!
//! Creating a checkout is a strictly sequential two-call chain: a
//! client-credentials exchange against the identity endpoint, then an order
//! submission authenticated with the resulting bearer token. Tokens are used
//! once and dropped; nothing is cached and nothing is retried.

use crate::config::{OrderResponseMode, ProviderConfig, TokenEncoding};
use crate::dtos::OrderRequest;
use crate::error::OrderError;
use crate::services::diagnostics::{payload_from_body, scrub, transport_payload};
use crate::services::metrics::{record_order, record_token_request};
use crate::services::redirect::{OrderResponseParts, RedirectExtractor};
use anyhow::Result;
use reqwest::{header, redirect::Policy, Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::sync::Arc;

/// Short-lived bearer credential for a single order submission.
pub struct AccessToken(Secret<String>);

impl AccessToken {
    pub fn new(token: String) -> Self {
        Self(Secret::new(token))
    }
}

impl ExposeSecret<String> for AccessToken {
    fn expose_secret(&self) -> &String {
        self.0.expose_secret()
    }
}

/// Body of the client-credentials exchange, sent as JSON or form fields.
#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audience: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<Value>,
}

/// Order submitted to the provider.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload<'a> {
    pub amount: &'a Number,
    pub currency: &'a str,
    pub description: &'a str,
    pub ally_slug: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<&'a str>,
}

/// Provider client shared by all requests.
///
/// Holds two HTTP clients: one for the token exchange, which always follows
/// redirects, and one for order submission whose redirect policy depends on
/// the configured [`OrderResponseMode`].
#[derive(Clone)]
pub struct ProviderClient {
    token_client: Client,
    order_client: Client,
    extractor: RedirectExtractor,
    config: Arc<ProviderConfig>,
}

impl ProviderClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let token_client = Client::builder().timeout(config.timeout()).build()?;

        let order_policy = match config.order_response_mode {
            OrderResponseMode::Body => Policy::default(),
            OrderResponseMode::Redirect => Policy::none(),
        };
        let order_client = Client::builder()
            .timeout(config.timeout())
            .redirect(order_policy)
            .build()?;

        Ok(Self {
            token_client,
            order_client,
            extractor: RedirectExtractor::new(&config),
            config: Arc::new(config),
        })
    }

    /// Check if the provider credentials are configured.
    pub fn is_configured(&self) -> bool {
        self.config.missing_credentials().is_empty()
    }

    /// Run the full checkout flow and return the redirect destination.
    pub async fn create_checkout(&self, request: &OrderRequest) -> Result<String, OrderError> {
        let token = self.fetch_access_token().await;
        record_token_request(outcome(&token));
        let token = token?;

        let redirect_url = self.create_order(&token, request).await;
        record_order(outcome(&redirect_url));
        redirect_url
    }

    /// Exchange the client credentials for a bearer token.
    pub async fn fetch_access_token(&self) -> Result<AccessToken, OrderError> {
        let secret = self.config.client_secret.expose_secret().as_str();
        let payload = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.config.client_id,
            client_secret: secret,
            audience: self.config.audience.as_deref(),
        };

        let request = self
            .token_client
            .post(&self.config.token_url)
            .header(header::ACCEPT, "application/json");
        let request = match self.config.token_encoding {
            TokenEncoding::Json => request.json(&payload),
            TokenEncoding::Form => request.form(&payload),
        };

        tracing::debug!(
            token_url = %self.config.token_url,
            encoding = %self.config.token_encoding,
            "Requesting provider access token"
        );

        let response = request.send().await.map_err(|e| {
            let detail = scrub(transport_payload(&e), &[secret]);
            tracing::error!(detail = %detail, "Provider token request failed");
            OrderError::Upstream {
                status: None,
                detail,
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            let detail = scrub(transport_payload(&e), &[secret]);
            tracing::error!(status = %status, detail = %detail, "Failed to read token response");
            OrderError::Upstream {
                status: Some(status.as_u16()),
                detail,
            }
        })?;

        if !status.is_success() {
            let detail = scrub(payload_from_body(&body), &[secret]);
            tracing::error!(status = %status, detail = %detail, "Provider token endpoint returned an error");
            return Err(OrderError::Upstream {
                status: Some(status.as_u16()),
                detail,
            });
        }

        let token = serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .and_then(|r| r.access_token)
            .and_then(|t| t.as_str().map(str::to_string))
            .filter(|t| !t.is_empty());

        match token {
            Some(token) => {
                tracing::debug!("Provider access token acquired");
                Ok(AccessToken::new(token))
            }
            None => {
                let detail = scrub(payload_from_body(&body), &[secret]);
                tracing::error!(detail = %detail, "No access token in provider response");
                Err(OrderError::NoToken { detail })
            }
        }
    }

    /// Submit an order and extract the redirect destination from the response.
    pub async fn create_order(
        &self,
        token: &AccessToken,
        request: &OrderRequest,
    ) -> Result<String, OrderError> {
        let (amount, description) = match (&request.amount, request.description.as_deref()) {
            (Some(amount), Some(description)) => (amount, description),
            _ => return Err(OrderError::InvalidRequest),
        };

        let payload = OrderPayload {
            amount,
            currency: &self.config.currency,
            description,
            ally_slug: &self.config.ally_slug,
            return_url: request
                .return_url()
                .or(self.config.default_return_url.as_deref()),
        };

        let secrets = [
            self.config.client_secret.expose_secret().as_str(),
            token.expose_secret().as_str(),
        ];

        let response = self
            .order_client
            .post(&self.config.order_url)
            .bearer_auth(token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let detail = scrub(transport_payload(&e), &secrets);
                tracing::error!(detail = %detail, "Provider order request failed");
                OrderError::Upstream {
                    status: None,
                    detail,
                }
            })?;

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| {
            let detail = scrub(transport_payload(&e), &secrets);
            tracing::error!(status = %status, detail = %detail, "Failed to read order response");
            OrderError::Upstream {
                status: Some(status.as_u16()),
                detail,
            }
        })?;
        let body = payload_from_body(&body);

        tracing::debug!(status = %status, "Provider create_order response");

        if !self.is_candidate_status(status) {
            let detail = scrub(body, &secrets);
            if status.is_client_error() || status.is_server_error() {
                tracing::error!(status = %status, detail = %detail, "Provider order endpoint returned an error");
                return Err(OrderError::Upstream {
                    status: Some(status.as_u16()),
                    detail,
                });
            }
            tracing::error!(
                status = %status,
                mode = %self.config.order_response_mode,
                detail = %detail,
                "Unexpected order response status"
            );
            return Err(OrderError::NoRedirectUrl { detail });
        }

        let parts = OrderResponseParts {
            body: Some(&body),
            location: location.as_deref(),
        };

        match self.extractor.extract(&parts) {
            Some((strategy, redirect_url)) => {
                tracing::info!(
                    status = %status,
                    strategy = ?strategy,
                    amount = %amount,
                    currency = %self.config.currency,
                    "Provider order created"
                );
                Ok(redirect_url)
            }
            None => {
                let detail = scrub(body, &secrets);
                tracing::error!(status = %status, detail = %detail, "Unexpected order response");
                Err(OrderError::NoRedirectUrl { detail })
            }
        }
    }

    /// Whether `status` may carry a redirect destination in the configured mode.
    fn is_candidate_status(&self, status: StatusCode) -> bool {
        match self.config.order_response_mode {
            OrderResponseMode::Body => status.is_success(),
            OrderResponseMode::Redirect => status.is_redirection(),
        }
    }
}

fn outcome<T>(result: &Result<T, OrderError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(e) => e.tag(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    fn provider_config(vars: &[(&str, &str)]) -> ProviderConfig {
        let vars: std::collections::HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
            .unwrap()
            .provider
    }

    #[test]
    fn test_is_configured() {
        let client = ProviderClient::new(provider_config(&[
            ("PROVIDER_CLIENT_ID", "client"),
            ("PROVIDER_CLIENT_SECRET", "secret"),
            ("PROVIDER_ALLY_SLUG", "shop-ecommerce"),
        ]))
        .unwrap();
        assert!(client.is_configured());

        let client = ProviderClient::new(provider_config(&[])).unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn token_request_omits_absent_audience() {
        let payload = TokenRequest {
            grant_type: "client_credentials",
            client_id: "client",
            client_secret: "secret",
            audience: None,
        };

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "grant_type": "client_credentials",
                "client_id": "client",
                "client_secret": "secret"
            })
        );
    }

    #[test]
    fn order_payload_keeps_integer_amounts() {
        let amount = Number::from(150000);
        let payload = OrderPayload {
            amount: &amount,
            currency: "COP",
            description: "Pedido #1",
            ally_slug: "shop-ecommerce",
            return_url: None,
        };

        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"amount":150000,"currency":"COP","description":"Pedido #1","allySlug":"shop-ecommerce"}"#
        );
    }

    #[test]
    fn candidate_status_depends_on_mode() {
        let body_client = ProviderClient::new(provider_config(&[])).unwrap();
        assert!(body_client.is_candidate_status(StatusCode::OK));
        assert!(!body_client.is_candidate_status(StatusCode::MOVED_PERMANENTLY));

        let redirect_client = ProviderClient::new(provider_config(&[(
            "PROVIDER_ORDER_RESPONSE_MODE",
            "redirect",
        )]))
        .unwrap();
        assert!(redirect_client.is_candidate_status(StatusCode::MOVED_PERMANENTLY));
        assert!(redirect_client.is_candidate_status(StatusCode::FOUND));
        assert!(!redirect_client.is_candidate_status(StatusCode::OK));
    }
}

#![allow(dead_code)]

use order_proxy_service::config::{
    Config, CorsConfig, OrderResponseMode, ProviderConfig, ServerConfig, TokenEncoding,
};
use order_proxy_service::startup::Application;
use secrecy::Secret;
use serde_json::Value;
use wiremock::MockServer;

pub const TEST_CLIENT_ID: &str = "test_client_id";
pub const TEST_CLIENT_SECRET: &str = "test_client_secret";
pub const TEST_ALLY_SLUG: &str = "test-shop-ecommerce";
pub const TOKEN_PATH: &str = "/auth/oauth/token";
pub const ORDER_PATH: &str = "/payments/v1/orders";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    /// Stub of both provider endpoints (token and orders).
    pub provider: MockServer,
    pub client: reqwest::Client,
}

pub fn test_config(provider_uri: &str) -> Config {
    Config {
        server: ServerConfig { port: 0 },
        provider: ProviderConfig {
            token_url: format!("{}{}", provider_uri, TOKEN_PATH),
            order_url: format!("{}{}", provider_uri, ORDER_PATH),
            client_id: TEST_CLIENT_ID.to_string(),
            client_secret: Secret::new(TEST_CLIENT_SECRET.to_string()),
            ally_slug: TEST_ALLY_SLUG.to_string(),
            audience: None,
            token_encoding: TokenEncoding::Json,
            order_response_mode: OrderResponseMode::Body,
            currency: "COP".to_string(),
            redirect_field: "redirectUrl".to_string(),
            redirect_wrapper: "data".to_string(),
            default_return_url: None,
            timeout_seconds: 10,
        },
        cors: CorsConfig {
            allowed_origins: vec!["*".to_string()],
        },
        service_name: "order-proxy-service-test".to_string(),
        log_level: "debug".to_string(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn the application with a config tweaked by `configure`.
    pub async fn spawn_with<F>(configure: F) -> Self
    where
        F: FnOnce(&mut Config),
    {
        let provider = MockServer::start().await;

        let mut config = test_config(&provider.uri());
        configure(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            provider,
            client,
        }
    }

    pub async fn post_order(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/create-order", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Number of requests the provider stub received on `path`.
    pub async fn provider_calls(&self, path: &str) -> usize {
        self.provider
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == path)
            .count()
    }
}

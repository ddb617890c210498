#![allow(dead_code)]

use course_service::config::{
    CorsSettings, CourseConfig, ObservabilitySettings, WorkflowSettings,
};
use course_service::startup::Application;
use secrecy::Secret;
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::time::Duration;

pub const TEST_ORIGIN: &str = "http://localhost:5173";

pub fn workflow_settings(api_url: &str) -> WorkflowSettings {
    WorkflowSettings {
        api_url: api_url.to_string(),
        api_key: Secret::new("test-key".to_string()),
        api_secret: Secret::new("test-secret".to_string()),
        outline_flow_id: "flow-outline".to_string(),
        detail_flow_id: "flow-detail".to_string(),
        timeout: Duration::from_secs(5),
    }
}

pub fn test_config(api_url: &str) -> CourseConfig {
    CourseConfig {
        // Use random port for testing (port 0)
        common: CoreConfig { port: 0 },
        workflow: workflow_settings(api_url),
        cors: CorsSettings {
            allowed_origins: vec![TEST_ORIGIN.to_string()],
        },
        observability: ObservabilitySettings::default(),
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(config: CourseConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let address = format!("http://127.0.0.1:{}", app.http_port());

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp { address, client }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use poegate::server::{AppState, build_router};
use poegate_core::{Actuator, CoreError, Port, PortId, PortRegistry, PowerController, SchedulerConfig};
use secrecy::SecretString;
use tower::ServiceExt;

pub const TOKEN: &str = "s3cret";

/// Records every switch port it is asked to cycle.
#[derive(Debug, Default)]
pub struct FakeActuator {
    pub calls: Mutex<Vec<u32>>,
    pub fail: AtomicBool,
}

impl FakeActuator {
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Actuator for FakeActuator {
    async fn cycle_port(&self, switch_port: u32) -> Result<(), CoreError> {
        self.calls.lock().unwrap().push(switch_port);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::Actuator {
                message: "port is not PoE capable".into(),
                status: Some(400),
                transient: false,
            });
        }
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub actuator: Arc<FakeActuator>,
    pub controller: PowerController,
}

fn registry() -> PortRegistry {
    PortRegistry::new((1..=2).map(|n| Port {
        id: PortId::new(n.to_string()),
        switch_port: n + 4,
        label: format!("pi-node-{n}"),
        ip: Some(format!("172.16.254.{}", 100 + n).parse().unwrap()),
    }))
    .unwrap()
}

fn scheduler() -> SchedulerConfig {
    SchedulerConfig {
        power_cycle_delay: Duration::from_secs(60),
        ..SchedulerConfig::default()
    }
}

/// Router over two ports (`1` → switch port 5, `2` → 6), with the given
/// auth token.
pub fn build_test_app_with_token(token: Option<&str>) -> TestApp {
    let actuator = Arc::new(FakeActuator::default());
    let controller = PowerController::new(registry(), scheduler(), actuator.clone());
    let state = AppState::new(
        controller.clone(),
        token.map(|t| SecretString::from(t.to_owned())),
    );
    TestApp {
        router: build_router(state, Duration::from_secs(30)),
        actuator,
        controller,
    }
}

pub fn build_test_app() -> TestApp {
    build_test_app_with_token(Some(TOKEN))
}

pub async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
    app.router.clone().oneshot(request).await.unwrap()
}

/// Authenticated GET.
pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header("authorization", format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Debug, Serialize)]
struct PortInfo {
    name: String,
    ip: Option<IpAddr>,
    switch_port: u32,
}

#[derive(Debug, Serialize)]
struct PortsResponse {
    ports: BTreeMap<String, PortInfo>,
    webhook_endpoints: BTreeMap<&'static str, &'static str>,
}

/// Configured ports and the URL templates an orchestrator should call.
async fn list_ports(State(state): State<AppState>) -> Json<PortsResponse> {
    let ports = state
        .controller
        .ports()
        .map(|p| {
            (
                p.id.to_string(),
                PortInfo {
                    name: p.label.clone(),
                    ip: p.ip,
                    switch_port: p.switch_port,
                },
            )
        })
        .collect();

    let webhook_endpoints = BTreeMap::from([
        ("power_on", "/power/on/{port}"),
        ("power_off", "/power/off/{port}"),
        ("power_cycle", "/power/cycle/{port}"),
        ("power_status", "/power/status/{port}"),
    ]);

    Json(PortsResponse {
        ports,
        webhook_endpoints,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ports", get(list_ports))
}

//! Machine catalog endpoint

use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use super::ApiState;
use crate::api::envelope::ApiResponse;
use crate::api::session_auth::SessionAuth;
use crate::service::ServiceError;
use crate::types::{Machine, Shift};

#[derive(Debug, Serialize)]
pub struct ParameterView {
    pub name: String,
    pub min: f64,
    pub max: f64,
    /// Form label, e.g. `Temperature (Spec: 20-30)`
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct MachineView {
    pub id: i64,
    pub name: String,
    pub parameters: Vec<ParameterView>,
}

impl From<Machine> for MachineView {
    fn from(machine: Machine) -> Self {
        Self {
            id: machine.id,
            name: machine.name,
            parameters: machine
                .parameters
                .iter()
                .map(|p| ParameterView {
                    name: p.name().to_string(),
                    min: p.min(),
                    max: p.max(),
                    label: p.label(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MachinesResponse {
    pub machines: Vec<MachineView>,
    pub shifts: [Shift; 3],
}

/// GET /api/v1/machines - Catalog plus the selectable shifts
pub async fn list_machines(State(state): State<ApiState>, auth: SessionAuth) -> Result<Response, ServiceError> {
    let ctx = auth.session.lock().await;
    let machines = state.service.list_machines(&ctx).await?;
    Ok(ApiResponse::ok(MachinesResponse {
        machines: machines.into_iter().map(MachineView::from).collect(),
        shifts: Shift::ALL,
    }))
}

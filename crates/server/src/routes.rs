//! Chain handlers for `/api/madarachains`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use hashirama_api::ChainGateway;
use hashirama_core::{ChainRecord, ChainRequest, MadaraChain};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub name: Option<String>,
}

/// List chains with derived health.
pub async fn list_chains(State(gw): State<ChainGateway>) -> ApiResult<Json<Vec<ChainRecord>>> {
    Ok(Json(gw.list().await?))
}

pub async fn get_chain(State(gw): State<ChainGateway>, Path(name): Path<String>) -> ApiResult<Json<ChainRecord>> {
    Ok(Json(gw.get(&name).await?))
}

/// Create a chain from `{ name, chainID, replicas? }`.
pub async fn create_chain(
    State(gw): State<ChainGateway>,
    body: Result<Json<ChainRequest>, JsonRejection>,
) -> ApiResult<Json<MadaraChain>> {
    let Json(req) = body?;
    Ok(Json(gw.create(req).await?))
}

/// Request deletion of `?name=`; returns the orchestrator's acknowledgement.
/// A missing name is a 500 with `kind: "NotFound"`.
pub async fn delete_chain(State(gw): State<ChainGateway>, Query(q): Query<DeleteQuery>) -> ApiResult<Json<serde_json::Value>> {
    let name = q.name.unwrap_or_default();
    let ack = gw.delete(&name).await.map_err(ApiError::on_collection)?;
    Ok(Json(ack))
}

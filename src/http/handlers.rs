//! Route handlers. Each one is a thin translation between JSON and the
//! attestation service.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::attestation::VerifyTarget;
use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::record::{HarvestRecord, SubmissionRequest};
use crate::store::{parse_bound, DayBound, RecordFilter};

/// Default page size for one farmer's records.
pub const DEFAULT_FARMER_PAGE: usize = 50;
/// Default page size for the all-records listing.
pub const DEFAULT_LIST_PAGE: usize = 100;
/// Largest page a client may request.
pub const MAX_PAGE: usize = 1000;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let service = &state.service;
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "blockchain": {
            "enabled": service.anchoring_enabled(),
            "network": service.network().to_string(),
        }
    }))
}

pub async fn submit_harvest(
    State(state): State<AppState>,
    body: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;

    // Detached so a dropped request cannot cancel persistence after a
    // transaction has been submitted.
    let service = state.service.clone();
    let receipt = tokio::spawn(async move { service.submit(&request).await })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Submission task failed");
            ApiError::Internal {
                error: "Failed to process harvest submission".to_string(),
                details: e.to_string(),
                transaction_id: None,
            }
        })??;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Harvest record submitted successfully",
            "data": receipt.record,
            "blockchain": {
                "submitted": receipt.anchor.is_anchored(),
                "transactionHash": receipt.anchor.transaction_id,
                "error": receipt.anchor.error.map(|e| e.to_string()),
            }
        })),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub record_id: Option<u64>,
    pub transaction_hash: Option<String>,
}

pub async fn verify_harvest(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let target = match (request.record_id, request.transaction_hash) {
        (Some(id), _) => VerifyTarget::RecordId(id),
        (None, Some(tx)) if !tx.is_empty() => VerifyTarget::TransactionId(tx),
        _ => return Err(ApiError::bad_request("Either recordId or transactionHash is required")),
    };

    let report = state.service.verify(&target).await?;
    let record = &report.record;

    Ok(Json(json!({
        "success": true,
        "record": {
            "id": record.id,
            "farmerId": record.record.farmer_id,
            "cropType": record.record.crop_type,
            "weightKg": record.record.weight_kg,
            "timestamp": record.record.timestamp,
            "farmerAddress": record.farmer_address,
        },
        "verification": {
            "signatureValid": report.signature_valid,
            "blockchainIndexed": report.blockchain_indexed,
            "blockchainValid": report.blockchain_valid,
            "transactionHash": report.transaction_id,
            "metadataMatches": report.metadata_matches,
            "mismatchedFields": report.mismatched_fields,
            "chainError": report.chain_error,
        },
        "metadata": report.metadata,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn records_by_farmer(
    State(state): State<AppState>,
    Path(farmer_id): Path<String>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(page) = query?;
    let limit = page.limit.unwrap_or(DEFAULT_FARMER_PAGE).min(MAX_PAGE);
    let offset = page.offset.unwrap_or(0);

    let result = state.service.store().list_by_farmer(&farmer_id, limit, offset).await?;

    Ok(Json(json!({
        "success": true,
        "data": result.items,
        "pagination": { "total": result.total, "limit": result.limit, "offset": result.offset },
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsQuery {
    pub crop_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn all_records(
    State(state): State<AppState>,
    query: Result<Query<RecordsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;

    let start = match query.start_date.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(parse_bound(s, DayBound::Start).ok_or_else(|| ApiError::bad_request("startDate is not a valid date"))?),
        None => None,
    };
    let end = match query.end_date.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(parse_bound(s, DayBound::End).ok_or_else(|| ApiError::bad_request("endDate is not a valid date"))?),
        None => None,
    };

    let filter = RecordFilter {
        crop_type: query.crop_type.filter(|c| !c.is_empty()),
        start,
        end,
        limit: query.limit.unwrap_or(DEFAULT_LIST_PAGE).min(MAX_PAGE),
        offset: query.offset.unwrap_or(0),
    };
    let result = state.service.store().list(&filter).await?;

    Ok(Json(json!({
        "success": true,
        "data": result.items,
        "pagination": { "total": result.total, "limit": result.limit, "offset": result.offset },
    })))
}

pub async fn farmer_stats(
    State(state): State<AppState>,
    Path(farmer_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.service.store().farmer_stats(&farmer_id).await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeysRequest {
    pub seed_input: Option<String>,
    /// Harvest fields to sign with the new key.
    pub harvest_data: Option<Value>,
    #[serde(default)]
    pub include_private_key: bool,
}

pub async fn generate_keys(
    State(state): State<AppState>,
    body: Result<Json<GenerateKeysRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = body?;
    let seed = request.seed_input.unwrap_or_default();

    let harvest = match request.harvest_data {
        Some(value) => match serde_json::from_value::<HarvestRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unparseable harvestData");
                None
            }
        },
        None => None,
    };

    let identity = state
        .service
        .generate_identity(&seed, harvest.as_ref(), request.include_private_key)?;

    let mut body = json!({ "success": true });
    if let (Value::Object(out), Ok(Value::Object(fields))) = (&mut body, serde_json::to_value(&identity)) {
        out.extend(fields);
    }
    Ok(Json(body))
}

pub async fn wallet(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let wallet = state
        .service
        .wallet()
        .ok_or_else(|| ApiError::Unavailable("Company wallet not configured".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "address": wallet.address().as_str(),
        "network": wallet.network().to_string(),
    })))
}

//! HTTP request handlers

use std::sync::Arc;
use axum::{
    extract::{Multipart, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ClassifierError;
use crate::missions::{explain, Variant};
use crate::registry::{BundleInfo, Identity};
use crate::training::{ModelBundle, ModelKind, TrainEngine, TrainingParams};
use crate::utils::SUPPORTED_EXTENSIONS;

use super::error::{Result, ServerError};
use super::state::AppState;

/// Header carrying the tenant id of the custom variant
const USER_HEADER: &str = "x-user-id";
const DEFAULT_TENANT: &str = "default";

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    user_id: Option<String>,
}

// ============================================================================
// Identity helpers
// ============================================================================

/// Header first, then the request's own `user_id`, then the shared default
fn tenant(headers: &HeaderMap, fallback: Option<&str>) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(fallback)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_TENANT)
        .to_string()
}

fn identity_for(variant: Variant, tenant: &str) -> Identity {
    if variant.is_custom() {
        Identity::Tenant(tenant.to_string())
    } else {
        Identity::Global
    }
}

fn not_trained(variant: Variant, tenant: &str) -> ServerError {
    if variant.is_custom() {
        ClassifierError::NoModel(format!(" for user '{}'. Please train a model first.", tenant)).into()
    } else {
        ServerError::BadRequest(format!(
            "{} Model not trained. Please train the model first.",
            variant.label()
        ))
    }
}

fn live_bundle(state: &AppState, tenant: &str) -> Result<Arc<ModelBundle>> {
    let variant = state.variant();
    state
        .registry
        .get(&identity_for(variant, tenant))
        .ok_or_else(|| not_trained(variant, tenant))
}

// ============================================================================
// Health
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let variant = state.variant();
    if variant.is_custom() {
        return Json(json!({
            "status": "healthy",
            "service": "Custom Model",
            "active_users": state.registry.len(),
            "timestamp": Utc::now().to_rfc3339(),
        }));
    }

    let loaded = state.registry.get(&Identity::Global).is_some();
    Json(json!({
        "status": "healthy",
        "model_loaded": loaded,
        "preprocessor_loaded": loaded,
        "model_type": variant.label(),
    }))
}

// ============================================================================
// Training
// ============================================================================

/// Fields of a `/train` multipart upload
#[derive(Debug, Default)]
struct TrainUpload {
    file: Option<(String, Vec<u8>)>,
    target_column: Option<String>,
    model_type: Option<String>,
    training_params: Option<String>,
    user_id: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Result<TrainUpload> {
    let mut upload = TrainUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                upload.file = Some((file_name, data.to_vec()));
            }
            "target_column" | "model_type" | "training_params" | "user_id" => {
                let text = field.text().await.map_err(|e| ServerError::BadRequest(e.to_string()))?;
                let text = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                match name.as_str() {
                    "target_column" => upload.target_column = text,
                    "model_type" => upload.model_type = text,
                    "training_params" => upload.training_params = text,
                    _ => upload.user_id = text,
                }
            }
            _ => {}
        }
    }
    Ok(upload)
}

pub async fn train(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let variant = state.variant();
    let upload = read_upload(multipart).await?;

    let (file_name, bytes) = upload
        .file
        .ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    if file_name.is_empty() {
        return Err(ServerError::BadRequest("No file selected".to_string()));
    }

    let kind = upload.model_type.as_deref().map(str::parse::<ModelKind>).transpose()?;
    let params = TrainingParams::from_json(upload.training_params.as_deref().unwrap_or_default())?;

    let mut plan = variant.training_plan(kind);
    params.apply(&mut plan.model);
    if upload.target_column.is_some() {
        plan = plan.with_target(upload.target_column);
    }

    let tenant = tenant(&headers, upload.user_id.as_deref());
    info!(
        variant = %variant,
        tenant = %tenant,
        file = %file_name,
        bytes = bytes.len(),
        model_type = %plan.model.kind,
        "Training requested"
    );

    let loader = state.loader.clone();
    let store = state.store.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let df = loader.load_upload(&file_name, bytes)?;
        let outcome = TrainEngine::new(plan).train(&df)?;
        if let Some(store) = store {
            if let Err(e) = store.save(&outcome.bundle) {
                warn!(error = %e, "Model trained but artifacts could not be saved");
            }
        }
        Ok::<_, ClassifierError>(outcome)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("Training task failed: {}", e)))??;

    let bundle = state.registry.set(identity_for(variant, &tenant), outcome.bundle);
    let class_names = bundle.class_names().to_vec();

    if !variant.is_custom() {
        return Ok(Json(json!({
            "success": true,
            "message": format!("{} Model trained successfully", variant.label()),
            "evaluation": bundle.metadata.evaluation,
            "class_names": class_names,
        })));
    }

    let mut response = json!({
        "success": true,
        "message": "Custom model trained successfully",
        "user_id": tenant,
        "model_info": BundleInfo::from(bundle.as_ref()),
        "class_names": class_names,
        "feature_columns": bundle.schema.feature_columns,
        "target_column": bundle.schema.target_column,
        "warnings": outcome.warnings,
    });
    if let Some(cv) = &bundle.metadata.cross_validation {
        response["cross_validation"] = json!(cv);
    }
    Ok(Json(response))
}

// ============================================================================
// Inference
// ============================================================================

fn predict_one(variant: Variant, bundle: &ModelBundle, sample: &Value) -> Value {
    let timestamp = Utc::now().to_rfc3339();
    let result = match sample.as_object() {
        Some(record) => bundle.predict_record(record).map(|p| {
            let explanation = explain(variant, &p.predicted_class, p.confidence, record);
            (p, explanation)
        }),
        None => Err(ClassifierError::InvalidValue {
            column: "record".to_string(),
            reason: "expected a JSON object".to_string(),
        }),
    };

    match result {
        Ok((prediction, explanation)) => json!({
            "predicted_class": prediction.predicted_class,
            "confidence": prediction.confidence,
            "probabilities": prediction.probabilities,
            "explanation": explanation,
            "input_features": sample,
            "timestamp": timestamp,
        }),
        Err(e) => json!({
            "error": e.to_string(),
            "input_features": sample,
            "timestamp": timestamp,
        }),
    }
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let variant = state.variant();

    let (samples, is_batch) = match body {
        Value::Object(_) => (vec![body], false),
        Value::Array(items) => (items, true),
        _ => {
            return Err(ServerError::BadRequest(
                "Invalid data format. Expected object or array.".to_string(),
            ))
        }
    };
    if samples.is_empty() {
        return Err(ServerError::BadRequest("No data provided".to_string()));
    }

    let body_user = if is_batch {
        None
    } else {
        samples[0].get("user_id").and_then(Value::as_str)
    };
    let tenant = tenant(&headers, body_user);
    let bundle = live_bundle(&state, &tenant)?;

    // Batches can be large; keep the runtime's workers free
    let predictions: Vec<Value> = tokio::task::spawn_blocking(move || {
        samples
            .iter()
            .map(|sample| predict_one(variant, &bundle, sample))
            .collect()
    })
    .await
    .map_err(|e| ServerError::Internal(format!("Prediction task failed: {}", e)))?;

    let mut response = json!({
        "success": true,
        "is_batch": is_batch,
        "total_predictions": predictions.len(),
        "model_type": variant.label(),
    });
    if variant.is_custom() {
        response["user_id"] = json!(tenant);
    }
    if !is_batch {
        response["prediction"] = predictions[0].clone();
    }
    response["predictions"] = Value::Array(predictions);
    Ok(Json(response))
}

// ============================================================================
// Model management
// ============================================================================

pub async fn model_info(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>> {
    let variant = state.variant();
    let tenant = tenant(&headers, query.user_id.as_deref());
    let bundle = live_bundle(&state, &tenant)?;

    if variant.is_custom() {
        return Ok(Json(json!({
            "success": true,
            "user_id": tenant,
            "has_model": true,
            "model_info": BundleInfo::from(bundle.as_ref()),
        })));
    }

    Ok(Json(json!({
        "is_trained": true,
        "model_type": variant.label(),
        "algorithm": bundle.model_type(),
        "feature_columns": bundle.schema.feature_columns,
        "selected_features": bundle.selected_features(),
        "class_names": bundle.class_names(),
        "target_column": bundle.schema.target_column,
        "preprocessor_available": true,
        "metadata": bundle.metadata,
    })))
}

pub async fn delete_model(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Json<Value> {
    let tenant = tenant(&headers, query.user_id.as_deref());
    let deleted = state.registry.delete(&identity_for(state.variant(), &tenant));
    Json(json!({
        "success": true,
        "message": if deleted { "Model deleted successfully" } else { "No model to delete" },
        "user_id": tenant,
    }))
}

pub async fn features(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>> {
    let tenant = tenant(&headers, query.user_id.as_deref());
    let bundle = live_bundle(&state, &tenant)?;
    Ok(Json(json!({
        "success": true,
        "expected_features": bundle.schema.feature_columns,
        "target_column": bundle.schema.target_column,
        "feature_types": {
            "numeric": bundle.schema.numeric_features,
            "categorical": bundle.schema.categorical_features,
        },
    })))
}

pub async fn supported_formats() -> Json<Value> {
    Json(json!({
        "success": true,
        "supported_formats": SUPPORTED_EXTENSIONS,
        "description": "CSV with a header row ('#' lines are skipped), or an Excel workbook whose first sheet has a header row.",
    }))
}

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::errors::ServiceError;
use crate::models::note::{NewNoteRequest, DEFAULT_TTL_SECS};
use crate::AppState;

/// Per-process cap on note creation, on top of the per-peer governor
/// middleware.
const CREATE_MAX_ATTEMPTS: usize = 5;
const CREATE_WINDOW_MS: u64 = 60_000;

pub async fn new(
    input: web::Json<NewNoteRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let decision = state
        .limiter
        .check("create_note", CREATE_MAX_ATTEMPTS, CREATE_WINDOW_MS);
    if !decision.allowed {
        return Err(ServiceError::RateLimited {
            retry_after_secs: decision.retry_after_secs,
        });
    }

    // content arrives opaque: an encrypted note was sealed before it was
    // posted, and this server never learns the passphrase
    let receipt = state.store.create(
        &input.content,
        input.lifetime_in_secs.unwrap_or(DEFAULT_TTL_SECS),
        input.is_encrypted.unwrap_or(false),
    )?;

    Ok(HttpResponse::Created().json(json!(receipt)))
}

pub async fn consume(
    note_id: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let note = state.store.retrieve(&note_id)?;
    Ok(HttpResponse::Ok().json(json!({
        "content": note.content,
        "is_encrypted": note.is_encrypted,
    })))
}

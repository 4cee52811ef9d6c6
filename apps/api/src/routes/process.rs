use axum::{
    extract::{
        multipart::{Field, MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::BytesMut;
use tracing::{debug, error, warn};

use crate::errors::AppError;
use crate::processing::{
    file_too_large, validate_request, ProcessForm, ProcessResponse, UploadedFile,
};
use crate::state::AppState;
use crate::webhook::WebhookError;

/// POST /api/v1/process
///
/// Precondition failures answer 400 and skip the webhook. Anything that gets
/// past validation is reported both to the caller and to the webhook:
/// 200 when completed, 500 when failed.
pub async fn handle_process(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let max_file_size = state.config.max_file_size;
    let mut multipart = multipart
        .map_err(|e| AppError::Validation(format!("Failed to parse form: {}", e.body_text())))?;

    let form = read_form(&mut multipart, max_file_size).await?;
    let request = validate_request(form, max_file_size)?;

    let response = state.processor.process(request).await;
    notify(&state, &response).await;

    let status = if response.is_completed() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((status, Json(response)).into_response())
}

/// Collects the known form fields. The file part is streamed chunk by chunk
/// and abandoned as soon as it grows past `max_file_size`.
async fn read_form(multipart: &mut Multipart, max_file_size: u64) -> Result<ProcessForm, AppError> {
    let mut form = ProcessForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| form_error(e, max_file_size))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match name.as_str() {
            "file" => form.file = Some(read_file(field, max_file_size).await?),
            "mode" => form.mode = Some(read_text(field, max_file_size).await?),
            "jobDescription" => form.job_description = Some(read_text(field, max_file_size).await?),
            "output" => form.output = Some(read_text(field, max_file_size).await?),
            "documentId" => form.document_id = Some(read_text(field, max_file_size).await?),
            other => debug!("Ignoring unknown form field '{other}'"),
        }
    }

    Ok(form)
}

async fn read_file(mut field: Field<'_>, max_file_size: u64) -> Result<UploadedFile, AppError> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let mut bytes = BytesMut::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| form_error(e, max_file_size))?
    {
        if (bytes.len() + chunk.len()) as u64 > max_file_size {
            warn!("Upload '{filename}' exceeds {max_file_size} bytes; aborting");
            return Err(file_too_large(max_file_size));
        }
        bytes.extend_from_slice(&chunk);
    }

    debug!("Received '{filename}': {} bytes", bytes.len());
    Ok(UploadedFile {
        filename,
        bytes: bytes.freeze(),
    })
}

async fn read_text(field: Field<'_>, max_file_size: u64) -> Result<String, AppError> {
    field.text().await.map_err(|e| form_error(e, max_file_size))
}

fn form_error(e: MultipartError, max_file_size: u64) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return file_too_large(max_file_size);
    }
    AppError::Validation(format!("Failed to parse form: {}", e.body_text()))
}

/// Delivery problems are logged and never change the HTTP response.
async fn notify(state: &AppState, response: &ProcessResponse) {
    match state.webhook.dispatch(response).await {
        Ok(()) => {}
        Err(WebhookError::NotConfigured) => warn!(
            "WEBHOOK_URL not set; skipping webhook for document {}",
            response.document_id
        ),
        Err(e) => error!("Webhook for document {} failed: {e}", response.document_id),
    }
}

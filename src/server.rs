//! HTTP boundary over the CA store and the issuance service.
//!
//! Routes:
//! * `GET /cas` lists CAs ordered by name.
//! * `POST /cas` with `{"name"}` creates a CA.
//! * `POST /certificates` with `{"caName", "clientName", "password"?}` issues a
//!   client certificate.
//!
//! Failures are answered with `{"error": "..."}`. Server-side failures get a
//! generic message; the full error only goes to the log.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use tracing::{error, info};

use crate::error::CertDeskError;
use crate::issuance::{ClientCertificateBundle, IssuanceService};
use crate::store::{CaRepository, CaStore, CaSummary};

// --- Structs for API --- //

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCaRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CaResponse {
    pub name: String,
    /// RFC 3339 `notBefore` of the CA certificate.
    pub created: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCertificateRequest {
    pub ca_name: String,
    pub client_name: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BundleFilesResponse {
    pub cert: String,
    pub key: String,
    pub csr: String,
    pub p12: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCertificateResponse {
    pub client_name: String,
    pub ca_name: String,
    pub serial_number: String,
    pub certificate_pem: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<BundleFilesResponse>,
    /// The PKCS#12 package, standard base64.
    pub package_base64: String,
    pub export_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// --- App State --- //

pub struct AppState<R> {
    pub store: Arc<CaStore<R>>,
    pub issuance: IssuanceService<R>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        AppState {
            store: Arc::clone(&self.store),
            issuance: self.issuance.clone(),
        }
    }
}

impl<R: CaRepository> AppState<R> {
    pub fn new(store: Arc<CaStore<R>>) -> Self {
        AppState {
            issuance: IssuanceService::new(Arc::clone(&store)),
            store,
        }
    }
}

pub fn router<R: CaRepository + 'static>(store: Arc<CaStore<R>>) -> Router {
    Router::new()
        .route("/cas", get(list_cas::<R>).post(create_ca::<R>))
        .route("/certificates", post(issue_certificate::<R>))
        .with_state(AppState::new(store))
}

// --- Axum Handlers --- //

pub async fn list_cas<R: CaRepository + 'static>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<CaResponse>>, ApiError> {
    let store = Arc::clone(&state.store);
    let summaries = blocking(move || store.list_cas()).await?;
    let cas = summaries
        .iter()
        .map(ca_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(cas))
}

pub async fn create_ca<R: CaRepository + 'static>(
    State(state): State<AppState<R>>,
    payload: Result<Json<CreateCaRequest>, JsonRejection>,
) -> Result<Json<CaResponse>, ApiError> {
    let Json(payload) = payload?;
    info!(ca = ?payload.name, "received CA creation request");

    let store = Arc::clone(&state.store);
    let summary = blocking(move || store.create_ca(&payload.name)?.summary()).await?;
    Ok(Json(ca_response(&summary)?))
}

pub async fn issue_certificate<R: CaRepository + 'static>(
    State(state): State<AppState<R>>,
    payload: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    info!(
        ca = ?payload.ca_name,
        client = ?payload.client_name,
        "received certificate issuance request"
    );

    let issuance = state.issuance.clone();
    let bundle = blocking(move || match payload.password.as_deref() {
        Some(password) => issuance.issue_client_certificate_with_password(
            &payload.ca_name,
            &payload.client_name,
            password,
        ),
        None => issuance.issue_client_certificate(&payload.ca_name, &payload.client_name),
    })
    .await?;

    let response = issue_response(&bundle)?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(response)).into_response())
}

fn ca_response(summary: &CaSummary) -> Result<CaResponse, ApiError> {
    let created = summary
        .created
        .format(&Rfc3339)
        .map_err(|e| ApiError::Internal(format!("formatting creation time: {e}")))?;
    Ok(CaResponse {
        name: summary.name.clone(),
        created,
    })
}

fn issue_response(bundle: &ClientCertificateBundle) -> Result<IssueCertificateResponse, ApiError> {
    let files = bundle.files().map(|paths| BundleFilesResponse {
        cert: paths.certificate.display().to_string(),
        key: paths.key.display().to_string(),
        csr: paths.csr.display().to_string(),
        p12: paths.package.display().to_string(),
    });
    Ok(IssueCertificateResponse {
        client_name: bundle.client_name().to_string(),
        ca_name: bundle.ca_name().to_string(),
        serial_number: bundle.certificate().serial_hex(),
        certificate_pem: bundle.certificate().to_pem()?,
        files,
        package_base64: BASE64.encode(bundle.package()),
        export_password: bundle.export_password().to_string(),
    })
}

/// Runs a core operation on the blocking pool; RSA key generation can take
/// seconds.
async fn blocking<T, F>(operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

// --- Error Handling --- //

#[derive(Debug)]
pub enum ApiError {
    Core(CertDeskError),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Core(err @ CertDeskError::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Core(err @ CertDeskError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }
            ApiError::Core(err @ CertDeskError::AlreadyExists(_)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ApiError::Core(err) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Operation failed".to_string())
            }
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(detail) => {
                error!(error = %detail, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Operation failed".to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<CertDeskError> for ApiError {
    fn from(err: CertDeskError) -> Self {
        ApiError::Core(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

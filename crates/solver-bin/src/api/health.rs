use axum::http::StatusCode;

/// Liveness probe. Touches no auction state, matching the design note that
/// `/health` is outside the solve path entirely.
pub async fn health() -> StatusCode {
    StatusCode::OK
}

use {
    super::AppState,
    crate::dto::{self, AuctionDto, DtoError, SolveResponseDto},
    axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json},
    futures::FutureExt,
    std::{panic::AssertUnwindSafe, time::{SystemTime, UNIX_EPOCH}},
    tokio_util::sync::CancellationToken,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("malformed auction: {0}")]
    Malformed(#[from] DtoError),
    #[error("auction id must not be empty")]
    EmptyId,
    #[error("deadline is not a valid RFC 3339 timestamp")]
    InvalidDeadline,
    #[error("solve panicked")]
    Panicked,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Malformed(_) | Self::EmptyId | Self::InvalidDeadline => StatusCode::BAD_REQUEST,
            Self::Panicked => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

fn now_unix() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        .try_into()
        .unwrap_or(u32::MAX)
}

/// `POST /solve`: parses the JSON auction, runs the driver under a fresh
/// cancellation token, and reports 408 specifically when the driver's own
/// deadline fired rather than folding that into an ordinary empty solution
/// list.
pub async fn solve(State(state): State<AppState>, Json(auction): Json<AuctionDto>) -> Response {
    if let Err(err) = validate(&auction) {
        return err.into_response();
    }

    let parsed = match dto::to_domain(auction) {
        Ok(parsed) => parsed,
        Err(err) => return ApiError::Malformed(err).into_response(),
    };

    let request = solver_core::Request {
        orders: parsed.orders,
        pools: parsed.pools,
        native_prices: parsed.native_prices,
        gas_price: parsed.gas_price,
        now: now_unix(),
    };

    let outcome = AssertUnwindSafe(state.driver.solve(request, CancellationToken::new()))
        .catch_unwind()
        .await;

    match outcome {
        Ok(response) if response.deadline_exceeded => {
            (StatusCode::REQUEST_TIMEOUT, "solve deadline exceeded").into_response()
        }
        Ok(response) => Json(response_to_dto(response)).into_response(),
        Err(_) => ApiError::Panicked.into_response(),
    }
}

fn response_to_dto(response: solver_core::Response) -> SolveResponseDto {
    dto::from_domain(response)
}

fn validate(auction: &AuctionDto) -> Result<(), ApiError> {
    if auction.id.is_empty() {
        return Err(ApiError::EmptyId);
    }
    chrono::DateTime::parse_from_rfc3339(&auction.deadline).map_err(|_| ApiError::InvalidDeadline)?;
    Ok(())
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use stockline_ledger::{
    ChainValidator, InventoryProjection, LedgerError, LedgerReader, LedgerStore, LedgerWriter,
    ProjectionBuilder, StatusWorkflow,
};
use stockline_types::Block;
use tracing::info;

use crate::auth::AuthUser;
use crate::dto::{
    AppendRequest, ClearResponse, HealthResponse, LoginRequest, LoginResponse, MeResponse,
    StatusRequest, VerifyResponse,
};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub type ApiResult<T> = Result<T, ApiError>;

/// Run a ledger mutation on the blocking pool.
async fn with_ledger<T, F>(state: &AppState, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn LedgerStore) -> Result<T, LedgerError> + Send + 'static,
{
    let ledger = state.ledger.clone();
    let result = tokio::task::spawn_blocking(move || op(&*ledger))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "ledger task failed");
            ApiError::Storage("Ledger task failed".into())
        })?;
    Ok(result?)
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: state.version,
    })
}

pub async fn get_chain(State(state): State<AppState>) -> ApiResult<Json<Vec<Block>>> {
    let chain = state.ledger.chain()?;
    Ok(Json(chain.to_vec()))
}

pub async fn get_pending(State(state): State<AppState>) -> ApiResult<Json<Vec<Block>>> {
    let chain = state.ledger.chain()?;
    Ok(Json(
        chain
            .iter()
            .filter(|b| !b.status().is_terminal())
            .cloned()
            .collect(),
    ))
}

pub async fn verify_chain(State(state): State<AppState>) -> ApiResult<Json<VerifyResponse>> {
    let report = ChainValidator::verify(&*state.ledger)?;
    Ok(Json(VerifyResponse::from(&report)))
}

pub async fn append_block(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<AppendRequest>,
) -> ApiResult<Json<Block>> {
    let entry = body.into_entry(&auth.identity.username)?;
    let block = with_ledger(&state, move |ledger| ledger.append(entry)).await?;
    info!(
        index = block.index,
        product = %block.payload.product,
        change = block.payload.quantity_delta,
        user = %auth.identity.username,
        "block appended"
    );
    Ok(Json(block))
}

pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(index): Path<String>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> ApiResult<Json<Block>> {
    let raw = body.status.unwrap_or_default();
    let target = StatusWorkflow::parse_target(&raw)?;
    let index: u64 = index
        .parse()
        .map_err(|_| ApiError::NotFound("Block not found".into()))?;

    let block = with_ledger(&state, move |ledger| ledger.resolve(index, target)).await?;
    info!(index, status = %target, user = %auth.identity.username, "block resolved");
    Ok(Json(block))
}

pub async fn clear_chain(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ClearResponse>> {
    let genesis = with_ledger(&state, |ledger| ledger.clear()).await?;
    info!(user = %auth.identity.username, "ledger cleared");
    Ok(Json(ClearResponse {
        message: "Ledger cleared",
        genesis,
    }))
}

pub async fn inventory_summary(
    State(state): State<AppState>,
) -> ApiResult<Json<InventoryProjection>> {
    let projection = ProjectionBuilder::inventory(&*state.ledger, &state.projection)?;
    Ok(Json(projection))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(ApiError::Unauthorized("Invalid username or password".into()));
    };

    let session = state
        .auth
        .login(&username, &password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid username or password".into()))?;

    Ok(Json(LoginResponse {
        token: session.token,
        username: session.username,
    }))
}

pub async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        username: auth.identity.username,
    })
}

pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<StatusCode> {
    state.auth.logout(&auth.token).await?;
    info!(user = %auth.identity.username, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

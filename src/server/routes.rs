//! Route handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::response::{ApiError, ApiResult, ok};
use crate::adapters::{Company, ExchangeRates};
use crate::gateway::{AiOptions, SentimentResult};
use crate::providers::ModelCatalog;
use crate::stats::{EndpointActivity, StatsSnapshot};
use crate::types::{Confirmation, ProviderResult};
use crate::HuginnError;

type Body<T> = std::result::Result<Json<T>, JsonRejection>;

fn body<T>(payload: Body<T>) -> std::result::Result<T, ApiError> {
    payload.map(|Json(b)| b).map_err(ApiError::from)
}

// ---- stats ----

pub async fn stats(State(state): State<AppState>) -> ApiResult<StatsSnapshot> {
    ok(state.huginn.stats.stats().await)
}

pub async fn reset_stats(State(state): State<AppState>) -> ApiResult<Confirmation> {
    state.huginn.stats.reset().await?;
    ok(Confirmation {
        message: "Statistics reset".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct EndpointQuery {
    path: String,
    #[serde(default)]
    method: Option<String>,
}

pub async fn endpoint_activity(
    State(state): State<AppState>,
    query: std::result::Result<Query<EndpointQuery>, QueryRejection>,
) -> ApiResult<EndpointActivity> {
    let Query(query) = query?;
    let method = query.method.as_deref().unwrap_or("GET");
    ok(state
        .huginn
        .stats
        .endpoint_activity(&query.path, method)
        .await?)
}

// ---- ai ----

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    name: String,
    configured: bool,
    #[serde(flatten)]
    catalog: ModelCatalog,
}

#[derive(Debug, Serialize)]
pub struct ProvidersView {
    /// Chain order; the first entry is the primary.
    providers: Vec<ProviderInfo>,
    deadline_secs: Option<f64>,
}

pub async fn providers(State(state): State<AppState>) -> ApiResult<ProvidersView> {
    let registry = state.huginn.ai.registry();
    ok(ProvidersView {
        providers: registry
            .providers()
            .iter()
            .map(|p| ProviderInfo {
                name: p.name().to_string(),
                configured: p.is_configured(),
                catalog: p.catalog().clone(),
            })
            .collect(),
        deadline_secs: registry.deadline().map(|d| d.as_secs_f64()),
    })
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    message: String,
    #[serde(default)]
    system: Option<String>,
    #[serde(flatten)]
    options: AiOptions,
}

pub async fn chat(State(state): State<AppState>, payload: Body<ChatBody>) -> ApiResult<ProviderResult> {
    let req = body(payload)?;
    ok(state
        .huginn
        .ai
        .chat(&req.message, req.system.as_deref(), &req.options)
        .await?)
}

#[derive(Debug, Deserialize)]
pub struct TextBody {
    text: String,
    #[serde(flatten)]
    options: AiOptions,
}

pub async fn summarize(State(state): State<AppState>, payload: Body<TextBody>) -> ApiResult<ProviderResult> {
    let req = body(payload)?;
    ok(state.huginn.ai.summarize(&req.text, &req.options).await?)
}

#[derive(Debug, Deserialize)]
pub struct TranslateBody {
    text: String,
    target: String,
    #[serde(flatten)]
    options: AiOptions,
}

pub async fn translate(
    State(state): State<AppState>,
    payload: Body<TranslateBody>,
) -> ApiResult<ProviderResult> {
    let req = body(payload)?;
    ok(state
        .huginn
        .ai
        .translate(&req.text, &req.target, &req.options)
        .await?)
}

pub async fn sentiment(
    State(state): State<AppState>,
    payload: Body<TextBody>,
) -> ApiResult<SentimentResult> {
    let req = body(payload)?;
    ok(state.huginn.ai.sentiment(&req.text, &req.options).await?)
}

#[derive(Debug, Deserialize)]
pub struct CodeBody {
    prompt: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(flatten)]
    options: AiOptions,
}

pub async fn code(State(state): State<AppState>, payload: Body<CodeBody>) -> ApiResult<ProviderResult> {
    let req = body(payload)?;
    ok(state
        .huginn
        .ai
        .code(&req.prompt, req.language.as_deref(), &req.options)
        .await?)
}

// ---- adapters ----

pub async fn company(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Company> {
    ok(state.huginn.company.lookup(&id).await?)
}

pub async fn rates(State(state): State<AppState>, Path(base): Path<String>) -> ApiResult<ExchangeRates> {
    ok(state.huginn.rates.latest(&base).await?)
}

pub async fn not_found() -> ApiError {
    ApiError(HuginnError::NotFound("no such route".to_string()))
}

use crate::error::ApiError;
use crate::server::AppState;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use dinerank_core::{RestaurantId, RestaurantInput, Score};
use dinerank_engine::SearchQuery;
use serde::Deserialize;
use serde_json::{Value, json};

type ApiResult<T> = Result<T, ApiError>;

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "DineRank",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready whenever the engine is up. A down cache store only degrades.
pub async fn readyz(State(state): State<AppState>) -> Json<Value> {
    let available = state.service.cache_available().await;
    let stats = state.service.cache_stats();
    Json(json!({
        "status": "ready",
        "cache": {
            "mode": stats.mode,
            "available": available,
        }
    }))
}

pub async fn metrics() -> Response {
    match crate::metrics::render_metrics() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics not initialized").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct TopParams {
    pub k: Option<usize>,
    pub active_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub cuisine: Option<String>,
    pub min_score: Option<f64>,
    pub active_only: Option<bool>,
    pub limit: Option<usize>,
}

pub async fn list_restaurants(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.list_all().await?))
}

pub async fn create_restaurant(
    State(state): State<AppState>,
    body: Result<Json<RestaurantInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = body?;
    let created = state.service.create(input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn top_restaurants(
    State(state): State<AppState>,
    params: Result<Query<TopParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    Ok(Json(
        state.service.top_k(params.k, params.active_only).await?,
    ))
}

pub async fn ranking_stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.service.stats().await?))
}

pub async fn search_restaurants(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params?;
    let mut query = SearchQuery::new(params.limit.unwrap_or(state.service.default_k()))
        .active_only(params.active_only.unwrap_or(false));
    if let Some(term) = params.q {
        query = query.with_term(term);
    }
    if let Some(cuisine) = params.cuisine {
        query = query.with_cuisine(cuisine);
    }
    if let Some(min_score) = params.min_score {
        query = query.with_min_score(Score::from_f64(min_score)?);
    }
    Ok(Json(state.service.search(query).await?))
}

pub async fn get_restaurant(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    Ok(Json(state.service.get(RestaurantId(id)).await?))
}

pub async fn update_restaurant(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<RestaurantInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(input) = body?;
    Ok(Json(state.service.update(RestaurantId(id), input).await?))
}

pub async fn deactivate_restaurant(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    Ok(Json(state.service.deactivate(RestaurantId(id)).await?))
}

pub async fn restaurant_percentile(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    Ok(Json(state.service.percentile(RestaurantId(id)).await?))
}

pub async fn cache_stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.service.cache_stats()))
}

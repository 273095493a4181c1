// crates/edge/src/web.rs
//
// Thin HTTP face over the query engine: one JSON search endpoint.

use crate::db::Store;
use crate::{query, Error, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use domain::doc::SearchHit;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    10
}

pub fn router(store: Store) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/search", get(search_handler))
        .with_state(store)
}

async fn home_handler(
    State(store): State<Store>,
) -> std::result::Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match store.count_documents().await {
        Ok(documents) => Ok(Json(json!({
            "name": "glean",
            "version": env!("CARGO_PKG_VERSION"),
            "documents": documents,
        }))),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": e.to_string() })),
        )),
    }
}

async fn search_handler(
    State(store): State<Store>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<Vec<SearchHit>>, (StatusCode, Json<serde_json::Value>)> {
    match query::search(&store, &params.query, params.limit).await {
        Ok(hits) => Ok(Json(hits)),
        Err(Error::Query(detail)) => {
            Err((StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))))
        }
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": e.to_string() })),
        )),
    }
}

pub async fn serve(store: Store, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("serving search on http://{addr}");

    axum::serve(listener, router(store)).await?;
    Ok(())
}

//! Query endpoint

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// Message returned for any body without a string `query`
pub const MISSING_QUERY_MESSAGE: &str = "JSON body with a 'query' key is required.";

/// Successful answer body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Extract the `query` string from a raw request body
pub fn parse_query(body: &[u8]) -> Result<String> {
    let invalid = || Error::InvalidRequest(MISSING_QUERY_MESSAGE.to_string());

    let value: Value = serde_json::from_slice(body).map_err(|_| invalid())?;
    match value.get("query") {
        Some(Value::String(query)) => Ok(query.clone()),
        _ => Err(invalid()),
    }
}

/// POST / - answer a question from the indexed document
pub async fn handle_query(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<QueryResponse>> {
    let query = parse_query(&body)?;

    let start = Instant::now();
    tracing::info!("Query: \"{}\"", query);

    match state.cache().answer(&query).await {
        Ok(response) => {
            tracing::info!("Answered in {}ms", start.elapsed().as_millis());
            Ok(Json(QueryResponse { response }))
        }
        Err(e) => {
            tracing::error!("Failed to process the request: {}", e);
            Err(e)
        }
    }
}

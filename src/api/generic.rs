//! API structures, handlers and server

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use warp::{filters::BoxedFilter, http::StatusCode, Filter, Rejection, Reply};

use crate::config::Config;
use crate::error::SwapError;
use crate::info::{InfoAggregator, Nonce};
use crate::schema;

/// Largest accepted request body.
const MAX_BODY_BYTES: u64 = 16 * 1024;

const INVALID_NONCE_MSG: &str = "Invalid request body (nonce)";

// ============================================================================
// SHARED RESPONSE STRUCTURES
// ============================================================================

/// Error body for malformed requests, backend faults and rejections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub msg: String,
}

impl ErrorResponse {
    fn reply(msg: impl Into<String>, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
        warp::reply::with_status(warp::reply::json(&ErrorResponse { msg: msg.into() }), status)
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Maps a fault to its HTTP answer.
///
/// Business faults are part of normal operation: 400 with `{code, msg, data}`
/// and no error log. Anything else is logged and hidden behind a 500.
fn fault_reply(err: SwapError) -> warp::reply::WithStatus<warp::reply::Json> {
    match err {
        SwapError::Business(fault) => {
            info!("Rejected with business fault: {}", fault);
            warp::reply::with_status(warp::reply::json(&fault), StatusCode::BAD_REQUEST)
        }
        other => {
            error!("Request failed: {}", other);
            ErrorResponse::reply("Internal server error", StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Handler for the info endpoint.
///
/// # Arguments
///
/// * `body` - Raw request body, expected to be `{"nonce": "<hex>"}`
/// * `aggregator` - Builds and signs the envelope
///
/// # Returns
///
/// * `200` - Signed envelope with the per-chain signature map
/// * `400` - Invalid nonce, or a business fault
/// * `500` - A signer or handler failed
pub async fn info_handler(
    body: warp::hyper::body::Bytes,
    aggregator: Arc<InfoAggregator>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, Rejection> {
    let request: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!("Info request is not valid JSON: {}", e);
            return Ok(ErrorResponse::reply(INVALID_NONCE_MSG, StatusCode::BAD_REQUEST));
        }
    };

    let nonce = match schema::validate(&request, &InfoAggregator::info_request_schema())
        .and_then(|validated| validated.str("nonce").and_then(Nonce::parse))
    {
        Some(nonce) => nonce,
        None => return Ok(ErrorResponse::reply(INVALID_NONCE_MSG, StatusCode::BAD_REQUEST)),
    };

    match aggregator.handle(&nonce).await {
        Ok(response) => Ok(warp::reply::with_status(
            warp::reply::json(&response),
            StatusCode::OK,
        )),
        Err(e) => Ok(fault_reply(e)),
    }
}

// ============================================================================
// WARP FILTER HELPERS
// ============================================================================

/// Creates a warp filter that provides access to the info aggregator.
pub fn with_aggregator(
    aggregator: Arc<InfoAggregator>,
) -> impl Filter<Extract = (Arc<InfoAggregator>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || aggregator.clone())
}

/// Matches the configured path prefix, one path segment at a time.
///
/// An empty prefix (or `"/"`) matches every path.
fn path_prefix(prefix: &str) -> BoxedFilter<()> {
    prefix
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(warp::any().boxed(), |filter, segment| {
            filter.and(warp::path(segment.to_string())).boxed()
        })
}

// ============================================================================
// REJECTION HANDLER
// ============================================================================

/// Global rejection handler for all API routes.
pub async fn handle_rejection(rej: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if rej.is_not_found() {
        (StatusCode::NOT_FOUND, "Endpoint not found".to_string())
    } else if rej.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large".to_string())
    } else if rej.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(ErrorResponse::reply(message, status))
}

// ============================================================================
// API SERVER IMPLEMENTATION
// ============================================================================

/// REST API server for the swap intermediary.
pub struct ApiServer {
    /// Service configuration
    config: Arc<Config>,
    /// Builds and signs info envelopes
    aggregator: Arc<InfoAggregator>,
}

impl ApiServer {
    /// Creates a new API server.
    ///
    /// # Arguments
    ///
    /// * `config` - Service configuration
    /// * `aggregator` - Info aggregator with every chain signer loaded
    pub fn new(config: Config, aggregator: InfoAggregator) -> Self {
        Self {
            config: Arc::new(config),
            aggregator: Arc::new(aggregator),
        }
    }

    /// Starts the API server and begins handling HTTP requests.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Server stopped
    /// * `Err(anyhow::Error)` - Invalid bind address
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting API server on {}:{} (prefix '{}')",
            self.config.api.host, self.config.api.port, self.config.api.path_prefix
        );

        let routes = self.create_routes();

        let addr: std::net::SocketAddr = format!("{}:{}", self.config.api.host, self.config.api.port)
            .parse()
            .context("Failed to parse API server address")?;

        warp::serve(routes).run(addr).await;

        Ok(())
    }

    /// Creates all API routes for the server.
    pub(crate) fn create_routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        // Health check endpoint - always at the root
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| {
                warp::reply::json(&serde_json::json!({
                    "status": "ok",
                    "service": "swap-intermediary",
                }))
            });

        // Info endpoint - nonce-bound envelope signed by every chain
        let info = path_prefix(&self.config.api.path_prefix)
            .and(warp::path("info"))
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_BODY_BYTES))
            .and(warp::body::bytes())
            .and(with_aggregator(self.aggregator.clone()))
            .and_then(info_handler);

        health.or(info).recover(handle_rejection)
    }

    /// Public method for testing - exposes routes for integration tests
    #[allow(dead_code)] // Used by tests
    pub fn test_routes(&self) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone {
        self.create_routes()
    }
}

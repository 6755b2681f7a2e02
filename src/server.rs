use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context as _;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::{GlazeError, GlazeResult},
    fetch::{build_client, fetch_image},
    filter::{ResolvedFilter, list_filters},
    pipeline,
};

/// Process-wide read-only state: the overlay asset directory and the shared
/// fetch client. Everything per-request is owned by the request.
#[derive(Clone)]
pub struct AppState {
    pub assets_dir: PathBuf,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(assets_dir: PathBuf, fetch_timeout: Duration) -> GlazeResult<Self> {
        Ok(Self {
            assets_dir,
            client: build_client(fetch_timeout)?,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/filter", get(list_route))
        .route("/filter/{name}", get(apply_route))
        .with_state(state)
}

/// Bind and serve until ctrl-c.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, assets_dir = %state.assets_dir.display(), "listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("serve")?;
    Ok(())
}

async fn list_route(State(state): State<AppState>) -> Json<Vec<String>> {
    let hints = list_filters(&state.assets_dir)
        .into_iter()
        .map(|name| format!("GET filter/{name}?<image:url>"))
        .collect();
    Json(hints)
}

#[derive(Deserialize)]
struct ApplyParams {
    image: Option<String>,
}

async fn apply_route(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<ApplyParams>,
) -> Result<Response, ApiError> {
    let image_url = params
        .image
        .ok_or_else(|| GlazeError::input("You must provide an image"))?;

    // Resolve before fetching: an unknown filter 404s without a round trip.
    let filter = {
        let mut rng = rand::rng();
        ResolvedFilter::resolve(&name, &state.assets_dir, &mut rng)
    }?;

    let bytes = fetch_image(&state.client, &image_url).await?;

    // The transform/encode leg is CPU-bound; keep it off the async workers.
    let rendered = tokio::task::spawn_blocking(move || pipeline::render(&bytes, &filter))
        .await
        .map_err(|e| GlazeError::Other(anyhow::anyhow!("render task failed: {e}")))??;

    let headers = [
        (header::CONTENT_TYPE, rendered.format.mime().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "inline; filename=\"filter.{}\"",
                rendered.format.extension()
            ),
        ),
    ];
    Ok((headers, rendered.bytes).into_response())
}

/// Boundary mapping of the error taxonomy onto HTTP statuses.
struct ApiError(GlazeError);

impl From<GlazeError> for ApiError {
    fn from(err: GlazeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GlazeError::Input(_) | GlazeError::Policy(_) => StatusCode::BAD_REQUEST,
            GlazeError::NotFound(_) => StatusCode::NOT_FOUND,
            GlazeError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "request rejected");
        }
        (status, self.0.to_string()).into_response()
    }
}

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;
use url::Url;

use stash_types::api::{Claims, CreateLinkRequest, LinkQuery, MessageResponse, ReorderRequest};
use stash_types::models::{Link, LinkId, NewLink, distinct_tags, normalize_tags};

use crate::auth::AppState;
use crate::blocking;
use crate::error::{ApiError, LINK_NOT_FOUND};

/// GET /api/links: the caller's links in their saved order, optionally
/// narrowed to those carrying `?tag=`.
pub async fn list_links(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<LinkQuery>,
) -> Result<Json<Vec<Link>>, ApiError> {
    let repo = state.repo.clone();
    let mut links = blocking(move || repo.links_for_user(claims.id)).await?;

    if let Some(tag) = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        links.retain(|l| l.has_tag(tag));
    }

    Ok(Json(links))
}

/// GET /api/links/tags
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<String>>, ApiError> {
    let repo = state.repo.clone();
    let links = blocking(move || repo.links_for_user(claims.id)).await?;
    Ok(Json(distinct_tags(&links)))
}

/// POST /api/links: enrich the URL, then persist it at the end of the
/// caller's list. Enrichment never fails the request.
pub async fn create_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateLinkRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = req.url.trim();
    if raw.is_empty() {
        return Err(ApiError::Validation("URL is required.".into()));
    }
    let url = parse_link_url(raw)?;

    let enrichment = state.enricher.enrich(raw, &url).await;
    let new_link = NewLink {
        url: raw.to_string(),
        title: enrichment.title,
        favicon: enrichment.favicon,
        summary: enrichment.summary,
        tags: normalize_tags(req.tags),
    };

    let repo = state.repo.clone();
    let user_id = claims.id;
    let link = blocking(move || repo.insert_link(user_id, new_link)).await?;
    info!(user_id, link_id = link.id, order = link.order, "Saved link {}", link.url);

    Ok((StatusCode::CREATED, Json(link)))
}

/// DELETE /api/links/{id}
pub async fn delete_link(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(link_id), _): WithRejection<Path<LinkId>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = state.repo.clone();
    let removed = blocking(move || repo.delete_link(claims.id, link_id)).await?;
    if !removed {
        return Err(ApiError::NotFound(LINK_NOT_FOUND.into()));
    }

    info!(link_id, "Deleted link");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/links/reorder. `orderedLinkIds` must list every one of the
/// caller's links exactly once.
pub async fn reorder_links(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<ReorderRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = state.repo.clone();
    let count = req.ordered_link_ids.len();
    blocking(move || repo.reorder_links(claims.id, &req.ordered_link_ids)).await?;

    info!(count, "Reordered links");
    Ok(Json(MessageResponse::new("Links reordered successfully.")))
}

/// Absolute http(s) URL with a host.
fn parse_link_url(raw: &str) -> Result<Url, ApiError> {
    let invalid = || ApiError::Validation("Please enter a valid URL starting with http:// or https://".into());

    let url = Url::parse(raw).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }
    Ok(url)
}

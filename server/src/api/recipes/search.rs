use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use super::with_store;
use crate::api::error::ApiError;
use crate::api::ErrorResponse;
use crate::models::Recipe;
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Tag to look for. Matches whole tags, ignoring case.
    pub tag: Option<String>,
}

#[utoipa::path(
    get,
    path = "/recipes/search",
    tag = "recipes",
    params(SearchParams),
    responses(
        (status = 200, description = "Recipes carrying the tag", body = [Recipe]),
        (status = 404, description = "No recipe carries the tag, or no tag was given", body = ErrorResponse),
        (status = 500, description = "Recipe store failure", body = ErrorResponse),
        (status = 503, description = "Recipe store timed out", body = ErrorResponse)
    )
)]
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    // Nothing can carry an absent tag, so skip the store
    let Some(tag) = params.tag.filter(|tag| !tag.trim().is_empty()) else {
        return Err(ApiError::NotFound("No recipe found"));
    };

    let recipes = with_store(&state, "search recipes", move |store| store.find_by_tag(&tag)).await?;

    if recipes.is_empty() {
        return Err(ApiError::NotFound("No recipe found"));
    }

    Ok(Json(recipes))
}

use axum::{
    extract::{Path, State},
    Json,
};

use super::with_store;
use crate::api::error::ApiError;
use crate::api::ErrorResponse;
use crate::models::Recipe;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = String, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = Recipe),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Recipe store failure", body = ErrorResponse),
        (status = 503, description = "Recipe store timed out", body = ErrorResponse)
    )
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    with_store(&state, "fetch recipe", move |store| store.find_by_id(&id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Recipe not found"))
}

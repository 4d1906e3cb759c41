use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::with_store_write;
use crate::api::error::ApiError;
use crate::api::ErrorResponse;
use crate::models::{Recipe, RecipeFields};
use crate::AppState;

/// Shared body validation for create and update.
pub(crate) fn validate(
    payload: Result<Json<RecipeFields>, JsonRejection>,
) -> Result<RecipeFields, ApiError> {
    let Json(fields) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    Ok(fields)
}

#[utoipa::path(
    post,
    path = "/recipes",
    tag = "recipes",
    request_body = RecipeFields,
    responses(
        (status = 200, description = "Recipe created; id and publishedAt assigned by the server", body = Recipe),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Recipe store failure", body = ErrorResponse)
    )
)]
pub async fn create_recipe(
    State(state): State<AppState>,
    payload: Result<Json<RecipeFields>, JsonRejection>,
) -> Result<Json<Recipe>, ApiError> {
    let fields = validate(payload)?;

    let recipe =
        with_store_write(&state, "create recipe", move |store| store.insert(fields)).await?;
    tracing::info!(id = %recipe.id, "Created recipe");

    Ok(Json(recipe))
}

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::create::validate;
use super::with_store_write;
use crate::api::error::ApiError;
use crate::api::ErrorResponse;
use crate::models::{Recipe, RecipeFields};
use crate::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpdateRecipeResponse {
    pub message: String,
    pub recipe: Recipe,
}

/// Replaces name, tags, ingredients and instructions. `id` and
/// `publishedAt` never change.
#[utoipa::path(
    put,
    path = "/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = String, Path, description = "Recipe ID")
    ),
    request_body = RecipeFields,
    responses(
        (status = 200, description = "Recipe updated successfully", body = UpdateRecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Recipe store failure", body = ErrorResponse)
    )
)]
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<RecipeFields>, JsonRejection>,
) -> Result<Json<UpdateRecipeResponse>, ApiError> {
    let fields = validate(payload)?;

    let recipe = with_store_write(&state, "update recipe", move |store| {
        store.update_by_id(&id, fields)
    })
    .await?
    .ok_or(ApiError::NotFound("Recipe not found"))?;

    tracing::info!(id = %recipe.id, "Updated recipe");

    Ok(Json(UpdateRecipeResponse {
        message: "Recipe has been updated".to_string(),
        recipe,
    }))
}

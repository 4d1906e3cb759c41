use axum::{extract::State, Json};

use super::with_store;
use crate::api::error::ApiError;
use crate::api::ErrorResponse;
use crate::models::Recipe;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/recipes",
    tag = "recipes",
    responses(
        (status = 200, description = "Every stored recipe, oldest first", body = [Recipe]),
        (status = 500, description = "Recipe store failure", body = ErrorResponse),
        (status = 503, description = "Recipe store timed out", body = ErrorResponse)
    )
)]
pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = with_store(&state, "list recipes", |store| store.find_all()).await?;
    Ok(Json(recipes))
}

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::with_store_write;
use crate::api::error::ApiError;
use crate::api::ErrorResponse;
use crate::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteRecipeResponse {
    /// Number of recipes removed: 1, or 0 when the id matched nothing
    pub deleted: u64,
}

#[utoipa::path(
    delete,
    path = "/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = String, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Deletion count", body = DeleteRecipeResponse),
        (status = 500, description = "Recipe store failure", body = ErrorResponse)
    )
)]
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteRecipeResponse>, ApiError> {
    let deleted =
        with_store_write(&state, "delete recipe", move |store| store.delete_by_id(&id)).await?;

    if deleted > 0 {
        tracing::info!(deleted, "Deleted recipe");
    }

    Ok(Json(DeleteRecipeResponse { deleted }))
}

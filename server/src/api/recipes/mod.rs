pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod search;
pub mod update;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::task::{JoinError, JoinHandle};
use utoipa::OpenApi;

use crate::api::error::ApiError;
use crate::store::{RecipeStore, StoreError};
use crate::AppState;

/// Returns the router for /recipes endpoints (mounted at /recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list::list_recipes).post(create::create_recipe))
        .route("/search", get(search::search_recipes))
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
}

fn spawn_store_call<T, F>(
    state: &AppState,
    action: &'static str,
    op: F,
) -> JoinHandle<Result<T, StoreError>>
where
    T: Send + 'static,
    F: FnOnce(&dyn RecipeStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    // Opened here, not on the blocking thread, so the request's counter sees it
    let span = tracing::info_span!("store.call", action);

    tokio::task::spawn_blocking(move || span.in_scope(|| op(store.as_ref())))
}

fn store_result<T>(
    action: &'static str,
    joined: Result<Result<T, StoreError>, JoinError>,
) -> Result<T, ApiError> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(ApiError::Store { action, source }),
        Err(source) => Err(ApiError::Task { action, source }),
    }
}

/// Run a read-only store operation on the blocking pool under the configured
/// deadline. `action` names the operation in logs and error messages.
///
/// A read that misses the deadline is abandoned and reported as 503; it has
/// no effects to lose.
pub(crate) async fn with_store<T, F>(
    state: &AppState,
    action: &'static str,
    op: F,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn RecipeStore) -> Result<T, StoreError> + Send + 'static,
{
    let task = spawn_store_call(state, action, op);

    match tokio::time::timeout(state.store_timeout, task).await {
        Ok(joined) => store_result(action, joined),
        Err(_) => Err(ApiError::Timeout(action)),
    }
}

/// Run a mutating store operation on the blocking pool and wait for its
/// outcome.
///
/// The handler never gives up on a write, so the response always matches
/// what the store did. The deadline is enforced inside the store instead:
/// PostgreSQL connections carry `statement_timeout`, and a timed-out
/// statement rolls back and surfaces as a store error.
pub(crate) async fn with_store_write<T, F>(
    state: &AppState,
    action: &'static str,
    op: F,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn RecipeStore) -> Result<T, StoreError> + Send + 'static,
{
    store_result(action, spawn_store_call(state, action, op).await)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_recipe,
        list::list_recipes,
        get::get_recipe,
        search::search_recipes,
        update::update_recipe,
        delete::delete_recipe,
    ),
    components(schemas(
        crate::models::Recipe,
        crate::models::RecipeFields,
        update::UpdateRecipeResponse,
        delete::DeleteRecipeResponse,
    ))
)]
pub struct ApiDoc;

pub mod error;
pub mod health;
pub mod recipes;

use axum::{middleware, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::telemetry;
use crate::AppState;

/// Shared error response used by all endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// All API routes with the store-call counting middleware applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/recipes", recipes::router())
        .merge(health::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            telemetry::store_call_count_header_middleware,
        ))
        .layer(middleware::from_fn(
            telemetry::store_call_counting_middleware,
        ))
        .with_state(state)
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    #[derive(OpenApi)]
    #[openapi(
        info(title = "Recipes API", description = "Create, list, search, update and delete recipes"),
        components(schemas(ErrorResponse))
    )]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    let modules: Vec<utoipa::openapi::OpenApi> =
        vec![health::ApiDoc::openapi(), recipes::ApiDoc::openapi()];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);

        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let spec = openapi();
        let paths: Vec<&String> = spec.paths.paths.keys().collect();

        for expected in [
            "/health",
            "/recipes",
            "/recipes/search",
            "/recipes/{id}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected} in {paths:?}"
            );
        }

        let schemas = &spec.components.as_ref().unwrap().schemas;
        assert!(schemas.contains_key("Recipe"));
        assert!(schemas.contains_key("ErrorResponse"));
    }
}

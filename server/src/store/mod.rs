//! Persistence for recipe records.
//!
//! [`RecipeStore`] is the seam between the HTTP handlers and whatever holds
//! the records. Two implementations exist: [`memory::MemoryStore`] keeps
//! everything in process memory (optionally seeded from a JSON file) and
//! [`postgres::PgRecipeStore`] persists to PostgreSQL through diesel.

pub mod memory;
pub mod postgres;

use diesel::r2d2::PoolError;
use thiserror::Error;

use crate::models::{Recipe, RecipeFields};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Recipe store unavailable: {0}")]
    Unavailable(#[from] PoolError),

    #[error("Recipe store query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Recipe store lock poisoned")]
    Poisoned,
}

/// Storage operations for recipes.
///
/// Ids are passed as the raw strings received from clients. An id that is
/// not a valid UUID behaves exactly like an id that does not exist.
/// Not-found is never an error: lookups return `None`, deletes return 0.
pub trait RecipeStore: Send + Sync {
    /// Store a new recipe. The returned record carries the assigned id and
    /// publication timestamp.
    fn insert(&self, fields: RecipeFields) -> Result<Recipe, StoreError>;

    /// All recipes, oldest first.
    fn find_all(&self) -> Result<Vec<Recipe>, StoreError>;

    fn find_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError>;

    /// Recipes carrying `tag`, compared case-insensitively against whole tags.
    fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError>;

    /// Replace name, tags, ingredients and instructions. Returns the updated
    /// record, or `None` when no recipe has this id.
    fn update_by_id(&self, id: &str, fields: RecipeFields) -> Result<Option<Recipe>, StoreError>;

    /// Remove a recipe, returning how many records were deleted (0 or 1).
    fn delete_by_id(&self, id: &str) -> Result<u64, StoreError>;
}

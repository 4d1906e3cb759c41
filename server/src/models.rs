use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A stored recipe. `id` and `published_at` are assigned by the store on
/// insert and never change afterwards.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

impl Recipe {
    /// Build a new record from client fields, assigning id and timestamp.
    pub fn new(fields: RecipeFields) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: fields.name,
            tags: fields.tags,
            ingredients: fields.ingredients,
            instructions: fields.instructions,
            published_at: Utc::now(),
        }
    }

    /// Replace the client-editable fields, keeping `id` and `published_at`.
    pub fn apply(&mut self, fields: RecipeFields) {
        self.name = fields.name;
        self.tags = fields.tags;
        self.ingredients = fields.ingredients;
        self.instructions = fields.instructions;
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let needle = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == needle)
    }
}

/// Client-supplied recipe content, used for both create and update.
/// Any `id` or `publishedAt` in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema, AsChangeset)]
#[diesel(table_name = crate::schema::recipes)]
pub struct RecipeFields {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// Entry in a JSON seed file. Missing ids and timestamps are assigned on load.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRecipe {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub fields: RecipeFields,
    #[serde(default, rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
}

impl From<SeedRecipe> for Recipe {
    fn from(seed: SeedRecipe) -> Self {
        let mut recipe = Recipe::new(seed.fields);
        if let Some(id) = seed.id {
            recipe.id = id;
        }
        if let Some(published_at) = seed.published_at {
            recipe.published_at = published_at;
        }
        recipe
    }
}

/// Parse a path id. Anything that is not a UUID is treated as an unknown id.
pub fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

//! In-process recipe store.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use uuid::Uuid;

use super::{RecipeStore, StoreError};
use crate::models::{parse_id, Recipe, RecipeFields, SeedRecipe};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Duplicate recipe id in seed data: {0}")]
    DuplicateId(Uuid),
}

/// Recipes held in memory behind a read-write lock.
///
/// Records are kept in insertion order. Writers hold the lock for the whole
/// mutation; readers clone what they return so no guard escapes.
///
/// Operations do no I/O and never wait on anything but the lock, so writes
/// carry no deadline of their own.
#[derive(Debug, Default)]
pub struct MemoryStore {
    recipes: RwLock<Vec<Recipe>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of records. Ids must be unique.
    pub fn with_recipes(recipes: Vec<Recipe>) -> Result<Self, SeedError> {
        let mut seen = HashSet::with_capacity(recipes.len());
        for recipe in &recipes {
            if !seen.insert(recipe.id) {
                return Err(SeedError::DuplicateId(recipe.id));
            }
        }

        Ok(Self {
            recipes: RwLock::new(recipes),
        })
    }

    /// Load records from a JSON array of recipes.
    pub fn from_seed_file(path: &Path) -> Result<Self, SeedError> {
        let content = fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let seeds: Vec<SeedRecipe> =
            serde_json::from_str(&content).map_err(|source| SeedError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let store = Self::with_recipes(seeds.into_iter().map(Recipe::from).collect())?;
        tracing::info!(path = %path.display(), count = store.len(), "Loaded seed recipes");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.recipes.read().map(|r| r.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Recipe>>, StoreError> {
        self.recipes.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Recipe>>, StoreError> {
        self.recipes.write().map_err(|_| StoreError::Poisoned)
    }
}

impl RecipeStore for MemoryStore {
    fn insert(&self, fields: RecipeFields) -> Result<Recipe, StoreError> {
        let recipe = Recipe::new(fields);
        self.write()?.push(recipe.clone());
        Ok(recipe)
    }

    fn find_all(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.read()?.clone())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        Ok(self.read()?.iter().find(|r| r.id == id).cloned())
    }

    fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError> {
        Ok(self
            .read()?
            .iter()
            .filter(|r| r.has_tag(tag))
            .cloned()
            .collect())
    }

    fn update_by_id(&self, id: &str, fields: RecipeFields) -> Result<Option<Recipe>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };

        let mut recipes = self.write()?;
        Ok(recipes.iter_mut().find(|r| r.id == id).map(|recipe| {
            recipe.apply(fields);
            recipe.clone()
        }))
    }

    fn delete_by_id(&self, id: &str) -> Result<u64, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(0);
        };

        let mut recipes = self.write()?;
        let before = recipes.len();
        recipes.retain(|r| r.id != id);
        Ok((before - recipes.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::io::Write;
    use std::sync::Arc;

    fn fields(name: &str, tags: &[&str]) -> RecipeFields {
        RecipeFields {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: vec!["water".to_string()],
            instructions: vec!["boil".to_string()],
        }
    }

    fn sorted_ids(recipes: &[Recipe]) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_insert_assigns_id_and_timestamp() {
        let store = MemoryStore::new();
        let other = store.insert(fields("Soup", &["lunch"])).unwrap();

        let before = Utc::now();
        let pasta = store.insert(fields("Pasta", &["dinner"])).unwrap();
        let after = Utc::now();

        assert!(!pasta.id.to_string().is_empty());
        assert_ne!(pasta.id, other.id);
        assert!(pasta.published_at >= before && pasta.published_at <= after);
        assert_eq!(pasta.name, "Pasta");
        assert_eq!(pasta.tags, vec!["dinner"]);
    }

    #[test]
    fn test_find_by_id_returns_each_record() {
        let store = MemoryStore::new();
        let inserted: Vec<Recipe> = ["A", "B", "C"]
            .iter()
            .map(|name| store.insert(fields(name, &[])).unwrap())
            .collect();

        for recipe in &inserted {
            let found = store.find_by_id(&recipe.id.to_string()).unwrap();
            assert_eq!(found.as_ref(), Some(recipe));
        }

        let unseen = Uuid::new_v4().to_string();
        assert!(store.find_by_id(&unseen).unwrap().is_none());
    }

    #[test]
    fn test_find_by_id_treats_malformed_id_as_missing() {
        let store = MemoryStore::new();
        store.insert(fields("Pasta", &[])).unwrap();

        assert!(store.find_by_id("507f1f77bcf86cd799439011").unwrap().is_none());
        assert!(store.find_by_id("").unwrap().is_none());
    }

    #[test]
    fn test_find_by_tag_matches_whole_tags_ignoring_case() {
        let store = MemoryStore::new();
        let quick = store.insert(fields("Stir fry", &["dinner", "quick"])).unwrap();
        store.insert(fields("Roast", &["dinnertime"])).unwrap();
        let dessert = store.insert(fields("Cake", &["Dessert", "Vegan"])).unwrap();

        let dinner = store.find_by_tag("Dinner").unwrap();
        assert_eq!(dinner, vec![quick]);

        let sweets = store.find_by_tag("dessert").unwrap();
        assert_eq!(sweets, vec![dessert]);

        assert!(store.find_by_tag("breakfast").unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_content_only() {
        let store = MemoryStore::new();
        let original = store.insert(fields("Pasta", &["dinner"])).unwrap();

        let updated = store
            .update_by_id(
                &original.id.to_string(),
                RecipeFields {
                    name: "Baked pasta".to_string(),
                    tags: vec!["oven".to_string()],
                    ingredients: vec!["penne".to_string()],
                    instructions: vec!["bake".to_string()],
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.published_at, original.published_at);
        assert_eq!(updated.name, "Baked pasta");
        assert_eq!(updated.tags, vec!["oven"]);
        assert_eq!(updated.ingredients, vec!["penne"]);
        assert_eq!(updated.instructions, vec!["bake"]);

        let stored = store.find_by_id(&original.id.to_string()).unwrap();
        assert_eq!(stored, Some(updated));
    }

    #[test]
    fn test_update_missing_id_leaves_store_untouched() {
        let store = MemoryStore::new();
        store.insert(fields("Pasta", &["dinner"])).unwrap();
        let before = store.find_all().unwrap();

        let result = store
            .update_by_id(&Uuid::new_v4().to_string(), fields("Ghost", &[]))
            .unwrap();
        assert!(result.is_none());

        let malformed = store.update_by_id("nope", fields("Ghost", &[])).unwrap();
        assert!(malformed.is_none());

        assert_eq!(store.find_all().unwrap(), before);
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let store = MemoryStore::new();
        let keep = store.insert(fields("Keep", &[])).unwrap();
        let gone = store.insert(fields("Gone", &[])).unwrap();

        assert_eq!(store.delete_by_id(&gone.id.to_string()).unwrap(), 1);
        assert!(store.find_by_id(&gone.id.to_string()).unwrap().is_none());
        assert_eq!(store.find_all().unwrap(), vec![keep]);

        assert_eq!(store.delete_by_id(&gone.id.to_string()).unwrap(), 0);
        assert_eq!(store.delete_by_id("garbage").unwrap(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_tracks_mixed_operations() {
        let store = MemoryStore::new();
        let a = store.insert(fields("A", &[])).unwrap();
        let b = store.insert(fields("B", &[])).unwrap();
        let c = store.insert(fields("C", &[])).unwrap();

        store.delete_by_id(&b.id.to_string()).unwrap();
        let c = store
            .update_by_id(&c.id.to_string(), fields("C2", &["x"]))
            .unwrap()
            .unwrap();
        let d = store.insert(fields("D", &[])).unwrap();

        let listed = store.find_all().unwrap();
        assert_eq!(sorted_ids(&listed), sorted_ids(&[a, c.clone(), d]));
        assert!(listed.contains(&c));
    }

    #[test]
    fn test_concurrent_inserts_keep_every_record() {
        let store = Arc::new(MemoryStore::new());
        let writers = 8;
        let per_writer = 50;

        std::thread::scope(|scope| {
            for w in 0..writers {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..per_writer {
                        store.insert(fields(&format!("{w}-{i}"), &[])).unwrap();
                    }
                });
            }
        });

        let all = store.find_all().unwrap();
        assert_eq!(all.len(), writers * per_writer);

        let unique: HashSet<Uuid> = all.iter().map(|r| r.id).collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_with_recipes_rejects_duplicate_ids() {
        let first = Recipe::new(fields("A", &[]));
        let mut second = Recipe::new(fields("B", &[]));
        second.id = first.id;

        let err = MemoryStore::with_recipes(vec![first.clone(), second]).unwrap_err();
        assert!(matches!(err, SeedError::DuplicateId(id) if id == first.id));
    }

    #[test]
    fn test_from_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "6f1c1f4e-4f38-4e43-9f5e-2a4b3c1d0e9f", "name": "Oats",
                  "tags": ["breakfast"], "publishedAt": "2021-03-04T05:06:07Z"}},
                {{"name": "Toast", "tags": ["Breakfast"], "ingredients": ["bread"]}}
            ]"#
        )
        .unwrap();

        let store = MemoryStore::from_seed_file(file.path()).unwrap();
        assert_eq!(store.len(), 2);

        let oats = store
            .find_by_id("6f1c1f4e-4f38-4e43-9f5e-2a4b3c1d0e9f")
            .unwrap()
            .unwrap();
        assert_eq!(oats.name, "Oats");

        assert_eq!(store.find_by_tag("breakfast").unwrap().len(), 2);
    }

    #[test]
    fn test_bundled_seed_file_loads() {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/recipes.json"));
        let store = MemoryStore::from_seed_file(path).unwrap();

        assert_eq!(store.len(), 3);
        let breakfast = store.find_by_tag("breakfast").unwrap();
        assert_eq!(breakfast.len(), 1);
        assert_eq!(breakfast[0].name, "Overnight Oats");
    }

    #[test]
    fn test_from_seed_file_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = MemoryStore::from_seed_file(file.path()).unwrap_err();
        assert!(matches!(err, SeedError::Parse { .. }));

        let missing = MemoryStore::from_seed_file(Path::new("/nonexistent/recipes.json"));
        assert!(matches!(missing, Err(SeedError::Io { .. })));
    }
}

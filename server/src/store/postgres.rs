//! PostgreSQL-backed recipe store.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

use super::{RecipeStore, StoreError};
use crate::db::DbPool;
use crate::models::{parse_id, Recipe, RecipeFields};
use crate::schema::recipes;
use crate::tag_in_array;

type PgConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Recipe store over a shared diesel connection pool.
///
/// The pool is the only shared state; each call checks out its own
/// connection, so no local locking is needed.
#[derive(Clone)]
pub struct PgRecipeStore {
    pool: DbPool,
}

impl PgRecipeStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PgConn, StoreError> {
        Ok(self.pool.get()?)
    }
}

impl RecipeStore for PgRecipeStore {
    fn insert(&self, fields: RecipeFields) -> Result<Recipe, StoreError> {
        let mut conn = self.conn()?;
        let recipe = Recipe::new(fields);

        let stored = diesel::insert_into(recipes::table)
            .values(&recipe)
            .returning(Recipe::as_returning())
            .get_result(&mut conn)?;

        Ok(stored)
    }

    fn find_all(&self) -> Result<Vec<Recipe>, StoreError> {
        let mut conn = self.conn()?;

        let all = recipes::table
            .select(Recipe::as_select())
            .order((recipes::published_at.asc(), recipes::id.asc()))
            .load(&mut conn)?;

        Ok(all)
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let mut conn = self.conn()?;

        let recipe = recipes::table
            .find(id)
            .select(Recipe::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(recipe)
    }

    fn find_by_tag(&self, tag: &str) -> Result<Vec<Recipe>, StoreError> {
        let mut conn = self.conn()?;

        let matching = recipes::table
            .filter(tag_in_array!(tag))
            .select(Recipe::as_select())
            .order((recipes::published_at.asc(), recipes::id.asc()))
            .load(&mut conn)?;

        Ok(matching)
    }

    fn update_by_id(&self, id: &str, fields: RecipeFields) -> Result<Option<Recipe>, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        let mut conn = self.conn()?;

        // RETURNING yields no row when the id matched nothing
        let updated = diesel::update(recipes::table.find(id))
            .set(&fields)
            .returning(Recipe::as_returning())
            .get_result(&mut conn)
            .optional()?;

        Ok(updated)
    }

    fn delete_by_id(&self, id: &str) -> Result<u64, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(0);
        };
        let mut conn = self.conn()?;

        let deleted = diesel::delete(recipes::table.find(id)).execute(&mut conn)?;

        Ok(deleted as u64)
    }
}

#[cfg(test)]
mod tests {
    //! These run against a real database:
    //! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`

    use super::*;
    use crate::db;
    use diesel::sql_types::Text;
    use std::time::Duration;
    use uuid::Uuid;

    fn pool(timeout: Duration) -> db::DbPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        db::create_pool(&url, timeout).unwrap()
    }

    fn store() -> PgRecipeStore {
        PgRecipeStore::new(pool(Duration::from_secs(5)))
    }

    #[derive(QueryableByName)]
    struct Setting {
        #[diesel(sql_type = Text)]
        statement_timeout: String,
    }

    fn fields(name: &str, tags: &[&str]) -> RecipeFields {
        RecipeFields {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ingredients: vec![],
            instructions: vec![],
        }
    }

    #[test]
    #[ignore]
    fn test_round_trip_against_postgres() {
        let store = store();
        let created = store.insert(fields("Pasta", &["Dinner", "quick"])).unwrap();
        let id = created.id.to_string();

        let found = store.find_by_id(&id).unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.tags, vec!["Dinner", "quick"]);

        let updated = store
            .update_by_id(&id, fields("Pasta bake", &["oven"]))
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Pasta bake");

        assert_eq!(store.delete_by_id(&id).unwrap(), 1);
        assert!(store.find_by_id(&id).unwrap().is_none());
        assert_eq!(store.delete_by_id(&id).unwrap(), 0);
    }

    #[test]
    #[ignore]
    fn test_tag_search_against_postgres() {
        let store = store();
        let marker = format!("tag-{}", Uuid::new_v4());
        let upper = marker.to_uppercase();
        let suffixed = format!("{marker}-suffix");
        let hit = store.insert(fields("Hit", &[upper.as_str()])).unwrap();
        let miss = store.insert(fields("Miss", &[suffixed.as_str()])).unwrap();

        let found = store.find_by_tag(&marker).unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![hit.id]);

        store.delete_by_id(&hit.id.to_string()).unwrap();
        store.delete_by_id(&miss.id.to_string()).unwrap();
    }

    #[test]
    #[ignore]
    fn test_update_missing_id_against_postgres() {
        let store = store();
        let result = store
            .update_by_id(&Uuid::new_v4().to_string(), fields("Ghost", &[]))
            .unwrap();
        assert!(result.is_none());
        assert!(store.update_by_id("not-an-id", fields("Ghost", &[])).unwrap().is_none());
    }

    #[test]
    #[ignore]
    fn test_statements_past_the_deadline_are_cancelled() {
        let pool = pool(Duration::from_millis(250));
        let mut conn = pool.get().unwrap();

        let setting: Setting = diesel::sql_query("SHOW statement_timeout")
            .get_result(&mut conn)
            .unwrap();
        assert_eq!(setting.statement_timeout, "250ms");

        let slow = diesel::sql_query("SELECT pg_sleep(2)").execute(&mut conn);
        assert!(slow.is_err());
    }

    #[test]
    #[ignore]
    fn test_tag_search_folds_non_ascii_case() {
        let store = store();
        let marker = format!("crème-{}", Uuid::new_v4());
        let hit = store.insert(fields("Brûlée", &[marker.to_uppercase().as_str()])).unwrap();

        let found = store.find_by_tag(&marker).unwrap();
        assert_eq!(found.iter().map(|r| r.id).collect::<Vec<_>>(), vec![hit.id]);

        store.delete_by_id(&hit.id.to_string()).unwrap();
    }
}

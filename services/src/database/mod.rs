//! Relational storage for the recipe catalogue and the per-user relations.
//!
//! [`SqlStorage`] is implemented by [`PgStorage`] (PostgreSQL through sqlx)
//! and by [`MockSqlStorage`] for tests. Favorite, shopping-cart and follow
//! writes are idempotent: the unique constraints decide whether a row was
//! created or removed, so callers never check before acting.

mod mock;
mod pg;
mod types;

pub use mock::MockSqlStorage;
pub use pg::PgStorage;
pub use types::{
    IngredientAmount, IngredientRow, Presence, RecipeCreate, RecipeFilter, RecipeFlags,
    RecipeIngredientRow, RecipeRelation, RecipeRow, RecipeUpdate, Removal, SqlStorageError,
    TagRow,
};

use crate::config::Config;
use crate::shopping::IngredientLine;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;

/// Initialize a PostgreSQL connection pool
pub async fn create_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(config.database_url())
        .await?;

    tracing::info!("Database connection pool established");

    Ok(pool)
}

pub trait SqlStorage: Clone + Send + Sync + 'static {
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// All tags ordered by id.
    fn tags_list(&self) -> impl Future<Output = Result<Vec<TagRow>, SqlStorageError>> + Send;

    fn tags_get(&self, id: i64)
    -> impl Future<Output = Result<Option<TagRow>, SqlStorageError>> + Send;

    /// Tags for the ids that exist; unknown ids are skipped.
    fn tags_get_many(
        &self,
        ids: &[i64],
    ) -> impl Future<Output = Result<Vec<TagRow>, SqlStorageError>> + Send;

    /// Ingredients whose name starts with `prefix` (case-insensitive), ordered by name.
    fn ingredients_search(
        &self,
        prefix: Option<&str>,
    ) -> impl Future<Output = Result<Vec<IngredientRow>, SqlStorageError>> + Send;

    fn ingredients_get(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<IngredientRow>, SqlStorageError>> + Send;

    fn ingredients_get_many(
        &self,
        ids: &[i64],
    ) -> impl Future<Output = Result<Vec<IngredientRow>, SqlStorageError>> + Send;

    /// Inserts the `(name, measurement_unit)` pair unless it exists.
    /// Returns `true` when a row was created.
    fn ingredients_upsert(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    /// One page of recipes, newest first, plus the total match count.
    fn recipes_list(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<(Vec<RecipeRow>, i64), SqlStorageError>> + Send;

    fn recipes_get(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<Option<RecipeRow>, SqlStorageError>> + Send;

    /// Writes the recipe, its tags and its ingredient lines atomically.
    fn recipes_create(
        &self,
        input: RecipeCreate,
    ) -> impl Future<Output = Result<RecipeRow, SqlStorageError>> + Send;

    /// Applies `update`; given tag or ingredient sets replace the stored ones.
    fn recipes_update(
        &self,
        id: i64,
        update: RecipeUpdate,
    ) -> impl Future<Output = Result<RecipeRow, SqlStorageError>> + Send;

    /// Returns `true` when the recipe existed.
    fn recipes_delete(&self, id: i64) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    /// Newest recipes of an author, at most `limit` when given.
    fn recipes_for_author(
        &self,
        author_id: i64,
        limit: Option<i64>,
    ) -> impl Future<Output = Result<Vec<RecipeRow>, SqlStorageError>> + Send;

    fn recipes_count_for_author(
        &self,
        author_id: i64,
    ) -> impl Future<Output = Result<i64, SqlStorageError>> + Send;

    /// Tags of a recipe in display order.
    fn recipe_tags(
        &self,
        recipe_id: i64,
    ) -> impl Future<Output = Result<Vec<TagRow>, SqlStorageError>> + Send;

    fn recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> impl Future<Output = Result<Vec<RecipeIngredientRow>, SqlStorageError>> + Send;

    fn recipe_flags(
        &self,
        viewer_id: i64,
        recipe_id: i64,
    ) -> impl Future<Output = Result<RecipeFlags, SqlStorageError>> + Send;

    fn recipe_relation_add(
        &self,
        relation: RecipeRelation,
        user_id: i64,
        recipe_id: i64,
    ) -> impl Future<Output = Result<Presence, SqlStorageError>> + Send;

    fn recipe_relation_remove(
        &self,
        relation: RecipeRelation,
        user_id: i64,
        recipe_id: i64,
    ) -> impl Future<Output = Result<Removal, SqlStorageError>> + Send;

    /// Ingredient lines of every recipe in the user's cart, ordered by
    /// ingredient name then unit.
    fn shopping_cart_ingredients(
        &self,
        user_id: i64,
    ) -> impl Future<Output = Result<Vec<IngredientLine>, SqlStorageError>> + Send;

    /// Self-follow is rejected with [`SqlStorageError::Conflict`].
    fn follows_add(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> impl Future<Output = Result<Presence, SqlStorageError>> + Send;

    fn follows_remove(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> impl Future<Output = Result<Removal, SqlStorageError>> + Send;

    fn follows_exists(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> impl Future<Output = Result<bool, SqlStorageError>> + Send;

    /// Followed author ids in subscription order, plus the total.
    fn follows_list(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<(Vec<i64>, i64), SqlStorageError>> + Send;
}

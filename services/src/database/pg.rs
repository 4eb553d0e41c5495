use super::SqlStorage;
use super::types::{
    IngredientAmount, IngredientRow, Presence, RecipeCreate, RecipeFilter, RecipeFlags,
    RecipeIngredientRow, RecipeRelation, RecipeRow, RecipeUpdate, Removal, SqlStorageError,
    TagRow,
};
use crate::shopping::IngredientLine;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.created_at";

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Starts a recipe query with `select` and appends the WHERE clause for `filter`.
fn filtered_recipes(select: &str, filter: &RecipeFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(select);
    builder.push(" FROM recipes r WHERE TRUE");

    if let Some(author_id) = filter.author_id {
        builder.push(" AND r.author_id = ").push_bind(author_id);
    }
    if !filter.tag_slugs.is_empty() {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tag_slugs.clone())
            .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM shopping_cart c WHERE c.recipe_id = r.id AND c.user_id = ",
            )
            .push_bind(user_id)
            .push(")");
    }

    builder
}

async fn replace_tags(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    tag_ids: &[i64],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        "INSERT INTO recipe_tags (recipe_id, tag_id, sort_order) \
         SELECT $1, t.tag_id, t.ord FROM UNNEST($2::bigint[]) WITH ORDINALITY AS t(tag_id, ord)",
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn replace_ingredients(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    ingredients: &[IngredientAmount],
) -> Result<(), sqlx::Error> {
    let ids: Vec<i64> = ingredients.iter().map(|i| i.ingredient_id).collect();
    let amounts: Vec<i32> = ingredients.iter().map(|i| i.amount).collect();

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) \
         SELECT $1, i.ingredient_id, i.amount FROM UNNEST($2::bigint[], $3::int[]) AS i(ingredient_id, amount)",
    )
    .bind(recipe_id)
    .bind(ids)
    .bind(amounts)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

impl SqlStorage for PgStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn tags_list(&self) -> Result<Vec<TagRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, TagRow>("SELECT id, name, color, slug FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn tags_get(&self, id: i64) -> Result<Option<TagRow>, SqlStorageError> {
        let row = sqlx::query_as::<_, TagRow>("SELECT id, name, color, slug FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn tags_get_many(&self, ids: &[i64]) -> Result<Vec<TagRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT id, name, color, slug FROM tags WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ingredients_search(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<IngredientRow>, SqlStorageError> {
        let rows = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => {
                sqlx::query_as::<_, IngredientRow>(
                    "SELECT id, name, measurement_unit FROM ingredients \
                     WHERE starts_with(lower(name), lower($1)) ORDER BY name, id",
                )
                .bind(prefix)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, IngredientRow>(
                    "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn ingredients_get(&self, id: i64) -> Result<Option<IngredientRow>, SqlStorageError> {
        let row = sqlx::query_as::<_, IngredientRow>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn ingredients_get_many(&self, ids: &[i64]) -> Result<Vec<IngredientRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, IngredientRow>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ingredients_upsert(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<bool, SqlStorageError> {
        let created = sqlx::query_scalar::<_, i64>(
            "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) \
             ON CONFLICT (name, measurement_unit) DO NOTHING RETURNING id",
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created.is_some())
    }

    async fn recipes_list(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RecipeRow>, i64), SqlStorageError> {
        let total = filtered_recipes("SELECT COUNT(*)", filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut builder = filtered_recipes(&format!("SELECT {RECIPE_COLUMNS}"), filter);
        builder
            .push(" ORDER BY r.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = builder
            .build_query_as::<RecipeRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn recipes_get(&self, id: i64) -> Result<Option<RecipeRow>, SqlStorageError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn recipes_create(&self, input: RecipeCreate) -> Result<RecipeRow, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        let recipe = sqlx::query_as::<_, RecipeRow>(
            "INSERT INTO recipes (author_id, name, text, image, cooking_time) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, author_id, name, text, image, cooking_time, created_at",
        )
        .bind(input.author_id)
        .bind(&input.name)
        .bind(&input.text)
        .bind(&input.image)
        .bind(input.cooking_time)
        .fetch_one(&mut *tx)
        .await?;

        replace_tags(&mut tx, recipe.id, &input.tag_ids).await?;
        replace_ingredients(&mut tx, recipe.id, &input.ingredients).await?;

        tx.commit().await?;
        Ok(recipe)
    }

    async fn recipes_update(
        &self,
        id: i64,
        update: RecipeUpdate,
    ) -> Result<RecipeRow, SqlStorageError> {
        let mut tx = self.pool.begin().await?;

        let recipe = sqlx::query_as::<_, RecipeRow>(
            "UPDATE recipes SET \
               name = COALESCE($2, name), \
               text = COALESCE($3, text), \
               image = COALESCE($4, image), \
               cooking_time = COALESCE($5, cooking_time) \
             WHERE id = $1 \
             RETURNING id, author_id, name, text, image, cooking_time, created_at",
        )
        .bind(id)
        .bind(update.name)
        .bind(update.text)
        .bind(update.image)
        .bind(update.cooking_time)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| SqlStorageError::NotFound(format!("recipe {id}")))?;

        if let Some(tag_ids) = &update.tag_ids {
            replace_tags(&mut tx, id, tag_ids).await?;
        }
        if let Some(ingredients) = &update.ingredients {
            replace_ingredients(&mut tx, id, ingredients).await?;
        }

        tx.commit().await?;
        Ok(recipe)
    }

    async fn recipes_delete(&self, id: i64) -> Result<bool, SqlStorageError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn recipes_for_author(
        &self,
        author_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<RecipeRow>, SqlStorageError> {
        // LIMIT NULL is LIMIT ALL in PostgreSQL
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.author_id = $1 ORDER BY r.id DESC LIMIT $2"
        ))
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recipes_count_for_author(&self, author_id: i64) -> Result<i64, SqlStorageError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn recipe_tags(&self, recipe_id: i64) -> Result<Vec<TagRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, TagRow>(
            "SELECT t.id, t.name, t.color, t.slug FROM recipe_tags rt \
             JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = $1 ORDER BY rt.sort_order",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeIngredientRow>, SqlStorageError> {
        let rows = sqlx::query_as::<_, RecipeIngredientRow>(
            "SELECT i.id, i.name, i.measurement_unit, ri.amount FROM recipe_ingredients ri \
             JOIN ingredients i ON i.id = ri.ingredient_id WHERE ri.recipe_id = $1 ORDER BY ri.id",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recipe_flags(
        &self,
        viewer_id: i64,
        recipe_id: i64,
    ) -> Result<RecipeFlags, SqlStorageError> {
        let flags = sqlx::query_as::<_, RecipeFlags>(
            "SELECT \
               EXISTS (SELECT 1 FROM favorites WHERE user_id = $1 AND recipe_id = $2) AS is_favorited, \
               EXISTS (SELECT 1 FROM shopping_cart WHERE user_id = $1 AND recipe_id = $2) AS is_in_shopping_cart",
        )
        .bind(viewer_id)
        .bind(recipe_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(flags)
    }

    async fn recipe_relation_add(
        &self,
        relation: RecipeRelation,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<Presence, SqlStorageError> {
        let inserted = sqlx::query_scalar::<_, i64>(&format!(
            "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, recipe_id) DO NOTHING RETURNING id",
            relation.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(_) => Presence::Created,
            None => Presence::AlreadyPresent,
        })
    }

    async fn recipe_relation_remove(
        &self,
        relation: RecipeRelation,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<Removal, SqlStorageError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
            relation.table()
        ))
        .bind(user_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() > 0 {
            Removal::Deleted
        } else {
            Removal::AlreadyAbsent
        })
    }

    async fn shopping_cart_ingredients(
        &self,
        user_id: i64,
    ) -> Result<Vec<IngredientLine>, SqlStorageError> {
        let rows = sqlx::query_as::<_, IngredientLine>(
            "SELECT i.name, i.measurement_unit, ri.amount FROM shopping_cart c \
             JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id \
             JOIN ingredients i ON i.id = ri.ingredient_id \
             WHERE c.user_id = $1 ORDER BY i.name, i.measurement_unit",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn follows_add(&self, user_id: i64, author_id: i64) -> Result<Presence, SqlStorageError> {
        let inserted = sqlx::query_scalar::<_, i64>(
            "INSERT INTO follows (user_id, author_id) VALUES ($1, $2) \
             ON CONFLICT (user_id, author_id) DO NOTHING RETURNING id",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match inserted {
            Some(_) => Presence::Created,
            None => Presence::AlreadyPresent,
        })
    }

    async fn follows_remove(&self, user_id: i64, author_id: i64) -> Result<Removal, SqlStorageError> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = $1 AND author_id = $2")
            .bind(user_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
            Removal::Deleted
        } else {
            Removal::AlreadyAbsent
        })
    }

    async fn follows_exists(&self, user_id: i64, author_id: i64) -> Result<bool, SqlStorageError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn follows_list(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<i64>, i64), SqlStorageError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let author_ids = sqlx::query_scalar::<_, i64>(
            "SELECT author_id FROM follows WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((author_ids, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_builds_any_tag_clause() {
        let filter = RecipeFilter {
            author_id: Some(3),
            tag_slugs: vec!["breakfast".to_owned(), "lunch".to_owned()],
            favorited_by: Some(1),
            in_cart_of: None,
        };
        let builder = filtered_recipes("SELECT COUNT(*)", &filter);
        let sql = builder.sql();

        assert!(sql.starts_with("SELECT COUNT(*) FROM recipes r WHERE TRUE"));
        assert!(sql.contains("r.author_id = $1"));
        assert!(sql.contains("t.slug = ANY($2)"));
        assert!(sql.contains("f.user_id = $3"));
        assert!(!sql.contains("shopping_cart"));
    }

    #[test]
    fn empty_filter_has_no_conditions() {
        let builder = filtered_recipes("SELECT COUNT(*)", &RecipeFilter::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM recipes r WHERE TRUE");
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a migrated PostgreSQL"]
    async fn postgres_round_trip() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("connect");
        let storage = PgStorage::new(pool);

        assert!(storage.is_connected().await);
        let tags = storage.tags_list().await.expect("tags");
        assert!(tags.iter().any(|t| t.slug == "breakfast"));
    }
}

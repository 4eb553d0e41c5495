//! In-memory `SqlStorage` for tests.

use super::SqlStorage;
use super::types::{
    IngredientAmount, IngredientRow, Presence, RecipeCreate, RecipeFilter, RecipeFlags,
    RecipeIngredientRow, RecipeRelation, RecipeRow, RecipeUpdate, Removal, SqlStorageError,
    TagRow,
};
use crate::shopping::IngredientLine;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

/// In-memory mock mirroring the constraints of the PostgreSQL schema.
#[derive(Clone)]
pub struct MockSqlStorage {
    connected: bool,
    data: Arc<RwLock<MockData>>,
}

#[derive(Default)]
struct MockData {
    next_id: i64,
    tags: BTreeMap<i64, TagRow>,
    ingredients: BTreeMap<i64, IngredientRow>,
    recipes: BTreeMap<i64, MockRecipe>,
    favorites: BTreeSet<(i64, i64)>,
    shopping_cart: BTreeSet<(i64, i64)>,
    // (user_id, author_id) in subscription order
    follows: Vec<(i64, i64)>,
}

struct MockRecipe {
    row: RecipeRow,
    tag_ids: Vec<i64>,
    ingredients: Vec<IngredientAmount>,
}

impl MockData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn relation(&self, relation: RecipeRelation) -> &BTreeSet<(i64, i64)> {
        match relation {
            RecipeRelation::Favorite => &self.favorites,
            RecipeRelation::ShoppingCart => &self.shopping_cart,
        }
    }

    fn relation_mut(&mut self, relation: RecipeRelation) -> &mut BTreeSet<(i64, i64)> {
        match relation {
            RecipeRelation::Favorite => &mut self.favorites,
            RecipeRelation::ShoppingCart => &mut self.shopping_cart,
        }
    }

    fn check_references(
        &self,
        tag_ids: &[i64],
        ingredients: &[IngredientAmount],
    ) -> Result<(), SqlStorageError> {
        if let Some(id) = tag_ids.iter().find(|id| !self.tags.contains_key(id)) {
            return Err(SqlStorageError::ForeignKey(format!("tag {id}")));
        }
        if let Some(line) = ingredients
            .iter()
            .find(|line| !self.ingredients.contains_key(&line.ingredient_id))
        {
            return Err(SqlStorageError::ForeignKey(format!(
                "ingredient {}",
                line.ingredient_id
            )));
        }
        let mut seen = BTreeSet::new();
        if let Some(line) = ingredients
            .iter()
            .find(|line| !seen.insert(line.ingredient_id))
        {
            return Err(SqlStorageError::Conflict(format!(
                "duplicate ingredient {}",
                line.ingredient_id
            )));
        }
        Ok(())
    }

    fn matches(&self, recipe: &MockRecipe, filter: &RecipeFilter) -> bool {
        let id = recipe.row.id;
        filter.author_id.is_none_or(|author| recipe.row.author_id == author)
            && (filter.tag_slugs.is_empty()
                || recipe.tag_ids.iter().any(|tag_id| {
                    self.tags
                        .get(tag_id)
                        .is_some_and(|tag| filter.tag_slugs.contains(&tag.slug))
                }))
            && filter
                .favorited_by
                .is_none_or(|user| self.favorites.contains(&(user, id)))
            && filter
                .in_cart_of
                .is_none_or(|user| self.shopping_cart.contains(&(user, id)))
    }
}

impl Default for MockSqlStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSqlStorage {
    pub fn new() -> Self {
        Self {
            connected: true,
            data: Arc::new(RwLock::new(MockData::default())),
        }
    }

    /// A storage whose health check fails.
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    /// Adds a tag; ids are assigned sequentially starting at 1, shared
    /// across all entity kinds.
    pub fn with_tag(self, name: &str, color: &str, slug: &str) -> Self {
        {
            let mut data = self.data.write().expect("lock poisoned");
            let id = data.next_id();
            data.tags.insert(
                id,
                TagRow {
                    id,
                    name: name.to_owned(),
                    color: color.to_owned(),
                    slug: slug.to_owned(),
                },
            );
        }
        self
    }

    pub fn with_ingredient(self, name: &str, measurement_unit: &str) -> Self {
        {
            let mut data = self.data.write().expect("lock poisoned");
            let id = data.next_id();
            data.ingredients.insert(
                id,
                IngredientRow {
                    id,
                    name: name.to_owned(),
                    measurement_unit: measurement_unit.to_owned(),
                },
            );
        }
        self
    }

    pub fn tag_id(&self, slug: &str) -> Option<i64> {
        let data = self.data.read().expect("lock poisoned");
        data.tags.values().find(|t| t.slug == slug).map(|t| t.id)
    }

    pub fn ingredient_id(&self, name: &str, measurement_unit: &str) -> Option<i64> {
        let data = self.data.read().expect("lock poisoned");
        data.ingredients
            .values()
            .find(|i| i.name == name && i.measurement_unit == measurement_unit)
            .map(|i| i.id)
    }

    pub fn recipes_len(&self) -> usize {
        self.data.read().expect("lock poisoned").recipes.len()
    }
}

impl SqlStorage for MockSqlStorage {
    async fn is_connected(&self) -> bool {
        self.connected
    }

    async fn tags_list(&self) -> Result<Vec<TagRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data.tags.values().cloned().collect())
    }

    async fn tags_get(&self, id: i64) -> Result<Option<TagRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data.tags.get(&id).cloned())
    }

    async fn tags_get_many(&self, ids: &[i64]) -> Result<Vec<TagRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data
            .tags
            .values()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn ingredients_search(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<IngredientRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let prefix = prefix.map(str::to_lowercase).unwrap_or_default();
        let mut rows: Vec<IngredientRow> = data
            .ingredients
            .values()
            .filter(|i| i.name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    async fn ingredients_get(&self, id: i64) -> Result<Option<IngredientRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data.ingredients.get(&id).cloned())
    }

    async fn ingredients_get_many(&self, ids: &[i64]) -> Result<Vec<IngredientRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data
            .ingredients
            .values()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    async fn ingredients_upsert(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<bool, SqlStorageError> {
        let mut data = self.data.write().expect("lock poisoned");
        if data
            .ingredients
            .values()
            .any(|i| i.name == name && i.measurement_unit == measurement_unit)
        {
            return Ok(false);
        }
        let id = data.next_id();
        data.ingredients.insert(
            id,
            IngredientRow {
                id,
                name: name.to_owned(),
                measurement_unit: measurement_unit.to_owned(),
            },
        );
        Ok(true)
    }

    async fn recipes_list(
        &self,
        filter: &RecipeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<RecipeRow>, i64), SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let matching: Vec<RecipeRow> = data
            .recipes
            .values()
            .rev()
            .filter(|r| data.matches(r, filter))
            .map(|r| r.row.clone())
            .collect();
        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let page = matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok((page, total))
    }

    async fn recipes_get(&self, id: i64) -> Result<Option<RecipeRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data.recipes.get(&id).map(|r| r.row.clone()))
    }

    async fn recipes_create(&self, input: RecipeCreate) -> Result<RecipeRow, SqlStorageError> {
        let mut data = self.data.write().expect("lock poisoned");
        data.check_references(&input.tag_ids, &input.ingredients)?;

        let id = data.next_id();
        let row = RecipeRow {
            id,
            author_id: input.author_id,
            name: input.name,
            text: input.text,
            image: input.image,
            cooking_time: input.cooking_time,
            created_at: Utc::now(),
        };
        data.recipes.insert(
            id,
            MockRecipe {
                row: row.clone(),
                tag_ids: input.tag_ids,
                ingredients: input.ingredients,
            },
        );
        Ok(row)
    }

    async fn recipes_update(
        &self,
        id: i64,
        update: RecipeUpdate,
    ) -> Result<RecipeRow, SqlStorageError> {
        let mut data = self.data.write().expect("lock poisoned");
        if !data.recipes.contains_key(&id) {
            return Err(SqlStorageError::NotFound(format!("recipe {id}")));
        }
        data.check_references(
            update.tag_ids.as_deref().unwrap_or_default(),
            update.ingredients.as_deref().unwrap_or_default(),
        )?;

        let recipe = data
            .recipes
            .get_mut(&id)
            .ok_or_else(|| SqlStorageError::NotFound(format!("recipe {id}")))?;
        if let Some(name) = update.name {
            recipe.row.name = name;
        }
        if let Some(text) = update.text {
            recipe.row.text = text;
        }
        if let Some(image) = update.image {
            recipe.row.image = image;
        }
        if let Some(cooking_time) = update.cooking_time {
            recipe.row.cooking_time = cooking_time;
        }
        if let Some(tag_ids) = update.tag_ids {
            recipe.tag_ids = tag_ids;
        }
        if let Some(ingredients) = update.ingredients {
            recipe.ingredients = ingredients;
        }
        Ok(recipe.row.clone())
    }

    async fn recipes_delete(&self, id: i64) -> Result<bool, SqlStorageError> {
        let mut data = self.data.write().expect("lock poisoned");
        let existed = data.recipes.remove(&id).is_some();
        // ON DELETE CASCADE
        data.favorites.retain(|&(_, recipe_id)| recipe_id != id);
        data.shopping_cart.retain(|&(_, recipe_id)| recipe_id != id);
        Ok(existed)
    }

    async fn recipes_for_author(
        &self,
        author_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<RecipeRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0));
        Ok(data
            .recipes
            .values()
            .rev()
            .filter(|r| r.row.author_id == author_id)
            .take(take)
            .map(|r| r.row.clone())
            .collect())
    }

    async fn recipes_count_for_author(&self, author_id: i64) -> Result<i64, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let count = data
            .recipes
            .values()
            .filter(|r| r.row.author_id == author_id)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn recipe_tags(&self, recipe_id: i64) -> Result<Vec<TagRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let Some(recipe) = data.recipes.get(&recipe_id) else {
            return Ok(Vec::new());
        };
        Ok(recipe
            .tag_ids
            .iter()
            .filter_map(|id| data.tags.get(id).cloned())
            .collect())
    }

    async fn recipe_ingredients(
        &self,
        recipe_id: i64,
    ) -> Result<Vec<RecipeIngredientRow>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let Some(recipe) = data.recipes.get(&recipe_id) else {
            return Ok(Vec::new());
        };
        Ok(recipe
            .ingredients
            .iter()
            .filter_map(|line| {
                data.ingredients
                    .get(&line.ingredient_id)
                    .map(|i| RecipeIngredientRow {
                        id: i.id,
                        name: i.name.clone(),
                        measurement_unit: i.measurement_unit.clone(),
                        amount: line.amount,
                    })
            })
            .collect())
    }

    async fn recipe_flags(
        &self,
        viewer_id: i64,
        recipe_id: i64,
    ) -> Result<RecipeFlags, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(RecipeFlags {
            is_favorited: data.favorites.contains(&(viewer_id, recipe_id)),
            is_in_shopping_cart: data.shopping_cart.contains(&(viewer_id, recipe_id)),
        })
    }

    async fn recipe_relation_add(
        &self,
        relation: RecipeRelation,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<Presence, SqlStorageError> {
        let mut data = self.data.write().expect("lock poisoned");
        if !data.recipes.contains_key(&recipe_id) {
            return Err(SqlStorageError::ForeignKey(format!("recipe {recipe_id}")));
        }
        Ok(if data.relation_mut(relation).insert((user_id, recipe_id)) {
            Presence::Created
        } else {
            Presence::AlreadyPresent
        })
    }

    async fn recipe_relation_remove(
        &self,
        relation: RecipeRelation,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<Removal, SqlStorageError> {
        let mut data = self.data.write().expect("lock poisoned");
        Ok(if data.relation_mut(relation).remove(&(user_id, recipe_id)) {
            Removal::Deleted
        } else {
            Removal::AlreadyAbsent
        })
    }

    async fn shopping_cart_ingredients(
        &self,
        user_id: i64,
    ) -> Result<Vec<IngredientLine>, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let mut lines: Vec<IngredientLine> = data
            .relation(RecipeRelation::ShoppingCart)
            .iter()
            .filter(|&&(user, _)| user == user_id)
            .filter_map(|(_, recipe_id)| data.recipes.get(recipe_id))
            .flat_map(|recipe| recipe.ingredients.iter())
            .filter_map(|line| {
                data.ingredients.get(&line.ingredient_id).map(|i| {
                    IngredientLine::new(i.name.clone(), i.measurement_unit.clone(), line.amount)
                })
            })
            .collect();
        lines.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
        });
        Ok(lines)
    }

    async fn follows_add(&self, user_id: i64, author_id: i64) -> Result<Presence, SqlStorageError> {
        if user_id == author_id {
            return Err(SqlStorageError::Conflict("self follow".to_owned()));
        }
        let mut data = self.data.write().expect("lock poisoned");
        if data.follows.contains(&(user_id, author_id)) {
            return Ok(Presence::AlreadyPresent);
        }
        data.follows.push((user_id, author_id));
        Ok(Presence::Created)
    }

    async fn follows_remove(&self, user_id: i64, author_id: i64) -> Result<Removal, SqlStorageError> {
        let mut data = self.data.write().expect("lock poisoned");
        let before = data.follows.len();
        data.follows.retain(|&pair| pair != (user_id, author_id));
        Ok(if data.follows.len() < before {
            Removal::Deleted
        } else {
            Removal::AlreadyAbsent
        })
    }

    async fn follows_exists(&self, user_id: i64, author_id: i64) -> Result<bool, SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        Ok(data.follows.contains(&(user_id, author_id)))
    }

    async fn follows_list(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<i64>, i64), SqlStorageError> {
        let data = self.data.read().expect("lock poisoned");
        let authors: Vec<i64> = data
            .follows
            .iter()
            .filter(|&&(user, _)| user == user_id)
            .map(|&(_, author)| author)
            .collect();
        let total = i64::try_from(authors.len()).unwrap_or(i64::MAX);
        let page = authors
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> MockSqlStorage {
        MockSqlStorage::new()
            .with_tag("Breakfast", "#E26C2D", "breakfast")
            .with_tag("Dinner", "#49B64E", "dinner")
            .with_ingredient("Flour", "g")
            .with_ingredient("Milk", "ml")
    }

    fn recipe(author_id: i64, tag_ids: Vec<i64>, ingredients: Vec<(i64, i32)>) -> RecipeCreate {
        RecipeCreate {
            author_id,
            name: "Pancakes".to_owned(),
            text: "Mix and fry.".to_owned(),
            image: "recipes/images/pancakes.png".to_owned(),
            cooking_time: 15,
            tag_ids,
            ingredients: ingredients
                .into_iter()
                .map(|(ingredient_id, amount)| IngredientAmount {
                    ingredient_id,
                    amount,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn relation_add_is_idempotent() {
        let storage = storage();
        let created = storage
            .recipes_create(recipe(7, vec![1], vec![(3, 200)]))
            .await
            .unwrap();

        let first = storage
            .recipe_relation_add(RecipeRelation::Favorite, 7, created.id)
            .await
            .unwrap();
        let second = storage
            .recipe_relation_add(RecipeRelation::Favorite, 7, created.id)
            .await
            .unwrap();
        assert_eq!(first, Presence::Created);
        assert_eq!(second, Presence::AlreadyPresent);

        let flags = storage.recipe_flags(7, created.id).await.unwrap();
        assert!(flags.is_favorited);
        assert!(!flags.is_in_shopping_cart);

        let removed = storage
            .recipe_relation_remove(RecipeRelation::Favorite, 7, created.id)
            .await
            .unwrap();
        let again = storage
            .recipe_relation_remove(RecipeRelation::Favorite, 7, created.id)
            .await
            .unwrap();
        assert_eq!(removed, Removal::Deleted);
        assert_eq!(again, Removal::AlreadyAbsent);
    }

    #[tokio::test]
    async fn relation_add_for_missing_recipe_is_foreign_key_error() {
        let result = storage()
            .recipe_relation_add(RecipeRelation::ShoppingCart, 1, 999)
            .await;
        assert!(matches!(result, Err(SqlStorageError::ForeignKey(_))));
    }

    #[tokio::test]
    async fn duplicate_ingredient_is_a_conflict() {
        let result = storage()
            .recipes_create(recipe(1, vec![1], vec![(3, 1), (3, 2)]))
            .await;
        assert!(matches!(result, Err(SqlStorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_filters_by_any_tag_and_orders_newest_first() {
        let storage = storage();
        let breakfast = storage
            .recipes_create(recipe(1, vec![1], vec![(3, 1)]))
            .await
            .unwrap();
        let dinner = storage
            .recipes_create(recipe(2, vec![2], vec![(4, 1)]))
            .await
            .unwrap();

        let (all, total) = storage
            .recipes_list(&RecipeFilter::default(), 10, 0)
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all[0].id, dinner.id);

        let filter = RecipeFilter {
            tag_slugs: vec!["breakfast".to_owned(), "lunch".to_owned()],
            ..RecipeFilter::default()
        };
        let (rows, total) = storage.recipes_list(&filter, 10, 0).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].id, breakfast.id);
    }

    #[tokio::test]
    async fn cart_ingredients_are_flattened_across_recipes() {
        let storage = storage();
        let a = storage
            .recipes_create(recipe(1, vec![1], vec![(3, 100), (4, 50)]))
            .await
            .unwrap();
        let b = storage
            .recipes_create(recipe(1, vec![1], vec![(3, 20)]))
            .await
            .unwrap();
        for id in [a.id, b.id] {
            storage
                .recipe_relation_add(RecipeRelation::ShoppingCart, 9, id)
                .await
                .unwrap();
        }

        let lines = storage.shopping_cart_ingredients(9).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.name == "Flour" || l.name == "Milk"));
        assert!(storage.shopping_cart_ingredients(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn self_follow_is_rejected() {
        let result = storage().follows_add(4, 4).await;
        assert!(matches!(result, Err(SqlStorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn upsert_skips_existing_pairs() {
        let storage = storage();
        assert!(!storage.ingredients_upsert("Flour", "g").await.unwrap());
        assert!(storage.ingredients_upsert("Flour", "kg").await.unwrap());
        let found = storage.ingredients_search(Some("fl")).await.unwrap();
        assert_eq!(found.len(), 2);
    }
}

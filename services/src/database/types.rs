use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IngredientRow {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub text: String,
    /// Storage path of the image, relative to the media root.
    pub image: String,
    pub cooking_time: i32,
    pub created_at: DateTime<Utc>,
}

/// Ingredient line of a recipe; `id` is the ingredient id.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RecipeIngredientRow {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: i64,
    pub amount: i32,
}

#[derive(Debug, Clone)]
pub struct RecipeCreate {
    pub author_id: i64,
    pub name: String,
    pub text: String,
    pub image: String,
    pub cooking_time: i32,
    /// Tag ids in display order.
    pub tag_ids: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
    pub cooking_time: Option<i32>,
    pub tag_ids: Option<Vec<i64>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

/// Recipe list filters. Empty `tag_slugs` means "any tag".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<i64>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i64>,
    pub in_cart_of: Option<i64>,
}

/// Per-viewer flags of one recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct RecipeFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

/// A user-to-recipe relation backed by its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeRelation {
    Favorite,
    ShoppingCart,
}

impl RecipeRelation {
    pub fn table(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::ShoppingCart => "shopping_cart",
        }
    }

    /// Human readable name used in client-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::ShoppingCart => "shopping cart",
        }
    }
}

/// Outcome of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Created,
    AlreadyPresent,
}

/// Outcome of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    AlreadyAbsent,
}

#[derive(Debug, thiserror::Error)]
pub enum SqlStorageError {
    #[error("database error: {0}")]
    Db(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Unique or check constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("foreign key violation: {0}")]
    ForeignKey(String),
}

impl From<sqlx::Error> for SqlStorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound("row".to_owned()),
            sqlx::Error::Database(db) if db.is_unique_violation() || db.is_check_violation() => {
                Self::Conflict(db.message().to_owned())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::ForeignKey(db.message().to_owned())
            }
            _ => Self::Db(err.to_string()),
        }
    }
}

//! Assembly of nested responses from storage rows.

use super::types::{RecipeResponse, RecipeShortResponse, SubscriptionResponse, UserResponse};
use crate::database::{RecipeFlags, RecipeRow, SqlStorage};
use crate::error::{ApiError, ApiResult};
use crate::state::Ctx;
use crate::users::storage::{StoredUser, UserStorage};

pub async fn user<S, U, F>(ctx: Ctx<'_, S, U, F>, user: StoredUser) -> ApiResult<UserResponse>
where
    S: SqlStorage,
    U: UserStorage,
{
    let is_subscribed = match ctx.viewer {
        Some(viewer) if viewer != user.id => {
            ctx.state.sql_storage.follows_exists(viewer, user.id).await?
        }
        _ => false,
    };
    Ok(UserResponse::new(user, is_subscribed))
}

pub async fn recipe<S, U, F>(ctx: Ctx<'_, S, U, F>, recipe: RecipeRow) -> ApiResult<RecipeResponse>
where
    S: SqlStorage,
    U: UserStorage,
{
    let storage = &ctx.state.sql_storage;

    let tags = storage.recipe_tags(recipe.id).await?;
    let ingredients = storage.recipe_ingredients(recipe.id).await?;
    let flags = match ctx.viewer {
        Some(viewer) => storage.recipe_flags(viewer, recipe.id).await?,
        None => RecipeFlags::default(),
    };
    let author = ctx
        .state
        .user_storage
        .get_user(recipe.author_id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("recipe {} has no author", recipe.id)))?;

    Ok(RecipeResponse {
        id: recipe.id,
        tags: tags.into_iter().map(Into::into).collect(),
        author: user(ctx, author).await?,
        ingredients: ingredients.into_iter().map(Into::into).collect(),
        is_favorited: flags.is_favorited,
        is_in_shopping_cart: flags.is_in_shopping_cart,
        name: recipe.name,
        image: ctx.config.media_url_for(&recipe.image),
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

pub async fn recipes<S, U, F>(
    ctx: Ctx<'_, S, U, F>,
    rows: Vec<RecipeRow>,
) -> ApiResult<Vec<RecipeResponse>>
where
    S: SqlStorage,
    U: UserStorage,
{
    let mut results = Vec::with_capacity(rows.len());
    for row in rows {
        results.push(recipe(ctx, row).await?);
    }
    Ok(results)
}

/// A followed author with their newest recipes.
pub async fn subscription<S, U, F>(
    ctx: Ctx<'_, S, U, F>,
    author: StoredUser,
    recipes_limit: Option<i64>,
) -> ApiResult<SubscriptionResponse>
where
    S: SqlStorage,
    U: UserStorage,
{
    let storage = &ctx.state.sql_storage;
    let recipes = storage
        .recipes_for_author(author.id, recipes_limit)
        .await?
        .into_iter()
        .map(|row| RecipeShortResponse::new(row, ctx.config))
        .collect();
    let recipes_count = storage.recipes_count_for_author(author.id).await?;

    Ok(SubscriptionResponse {
        user: user(ctx, author).await?,
        recipes,
        recipes_count,
    })
}

//! Recipe list, detail and write endpoints.

use super::present;
use super::types::RecipeResponse;
use crate::config::Config;
use crate::database::{IngredientAmount, RecipeCreate, RecipeFilter, RecipeRow, RecipeUpdate, SqlStorage};
use crate::error::{ApiError, ApiResult};
use crate::media::{FileStorage, FileUploadRequest, decode_data_url, recipe_image_path};
use crate::pagination::{Page, PageRequest, RequestUrl};
use crate::state::{AppState, Ctx};
use crate::users::session_auth::{MaybeAuth, RequireAuth};
use crate::users::storage::UserStorage;
use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use axum_extra::extract::{Query, WithRejection};
use serde::Deserialize;
use std::collections::HashSet;

const MAX_NAME_LEN: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub author: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "True"))
}

impl RecipeListQuery {
    /// Viewer-relative flags only apply to authenticated requests.
    fn filter(&self, viewer: Option<i64>) -> RecipeFilter {
        RecipeFilter {
            author_id: self.author,
            tag_slugs: self.tags.clone(),
            favorited_by: viewer.filter(|_| is_truthy(self.is_favorited.as_deref())),
            in_cart_of: viewer.filter(|_| is_truthy(self.is_in_shopping_cart.as_deref())),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountInput {
    pub id: i64,
    pub amount: i64,
}

/// Create / update payload. Every field is optional at the serde level so
/// missing fields produce field-keyed validation messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeWrite {
    pub ingredients: Option<Vec<IngredientAmountInput>>,
    pub tags: Option<Vec<i64>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

/// Write payload after validation; the image is still a data URL.
#[derive(Debug)]
struct ValidRecipe {
    ingredients: Vec<IngredientAmount>,
    tag_ids: Vec<i64>,
    image: Option<String>,
    name: Option<String>,
    text: Option<String>,
    cooking_time: Option<i32>,
}

fn required<T>(value: Option<T>, field: &str) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::field(field, "this field is required"))
}

fn validate_name(name: Option<String>) -> ApiResult<Option<String>> {
    let Some(name) = name else {
        return Ok(None);
    };
    let name = name.trim().to_owned();
    if name.is_empty() {
        return Err(ApiError::field("name", "must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::field(
            "name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(Some(name))
}

fn validate_text(text: Option<String>) -> ApiResult<Option<String>> {
    match text {
        Some(text) if text.trim().is_empty() => Err(ApiError::field("text", "must not be empty")),
        other => Ok(other),
    }
}

fn validate_cooking_time(cooking_time: Option<i64>) -> ApiResult<Option<i32>> {
    cooking_time
        .map(|minutes| {
            i32::try_from(minutes)
                .ok()
                .filter(|&minutes| minutes >= 1)
                .ok_or_else(|| ApiError::field("cooking_time", "must be at least 1"))
        })
        .transpose()
}

fn validate_tag_ids(tags: Vec<i64>) -> ApiResult<Vec<i64>> {
    if tags.is_empty() {
        return Err(ApiError::field("tags", "at least one tag is required"));
    }
    let mut seen = HashSet::new();
    if let Some(duplicate) = tags.iter().find(|&&id| !seen.insert(id)) {
        return Err(ApiError::field("tags", format!("duplicate tag {duplicate}")));
    }
    Ok(tags)
}

fn validate_ingredients(ingredients: Vec<IngredientAmountInput>) -> ApiResult<Vec<IngredientAmount>> {
    if ingredients.is_empty() {
        return Err(ApiError::field("ingredients", "at least one ingredient is required"));
    }
    let mut seen = HashSet::new();
    let mut lines = Vec::with_capacity(ingredients.len());
    for input in ingredients {
        if !seen.insert(input.id) {
            return Err(ApiError::field(
                "ingredients",
                format!("duplicate ingredient {}", input.id),
            ));
        }
        let amount = i32::try_from(input.amount)
            .ok()
            .filter(|&amount| amount >= 1)
            .ok_or_else(|| {
                ApiError::field(
                    "ingredients",
                    format!("amount of ingredient {} must be at least 1", input.id),
                )
            })?;
        lines.push(IngredientAmount {
            ingredient_id: input.id,
            amount,
        });
    }
    Ok(lines)
}

impl RecipeWrite {
    /// Shape checks that need no storage access. Tags and ingredients are
    /// required on both create and update; the rest only on create.
    fn validate(self, creating: bool) -> ApiResult<ValidRecipe> {
        let ingredients = validate_ingredients(required(self.ingredients, "ingredients")?)?;
        let tag_ids = validate_tag_ids(required(self.tags, "tags")?)?;
        let name = validate_name(self.name)?;
        let text = validate_text(self.text)?;
        let cooking_time = validate_cooking_time(self.cooking_time)?;

        if creating {
            required(self.image.as_ref(), "image")?;
            required(name.as_ref(), "name")?;
            required(text.as_ref(), "text")?;
            required(cooking_time.as_ref(), "cooking_time")?;
        }

        Ok(ValidRecipe {
            ingredients,
            tag_ids,
            image: self.image,
            name,
            text,
            cooking_time,
        })
    }
}

/// Checks that every referenced tag and ingredient exists.
async fn check_references<S: SqlStorage>(storage: &S, recipe: &ValidRecipe) -> ApiResult<()> {
    let found: HashSet<i64> = storage
        .tags_get_many(&recipe.tag_ids)
        .await?
        .into_iter()
        .map(|tag| tag.id)
        .collect();
    if let Some(missing) = recipe.tag_ids.iter().find(|id| !found.contains(id)) {
        return Err(ApiError::field("tags", format!("tag {missing} does not exist")));
    }

    let ids: Vec<i64> = recipe.ingredients.iter().map(|i| i.ingredient_id).collect();
    let found: HashSet<i64> = storage
        .ingredients_get_many(&ids)
        .await?
        .into_iter()
        .map(|ingredient| ingredient.id)
        .collect();
    if let Some(missing) = ids.iter().find(|id| !found.contains(id)) {
        return Err(ApiError::field(
            "ingredients",
            format!("ingredient {missing} does not exist"),
        ));
    }
    Ok(())
}

/// Decodes and stores a data-URL image, returning its storage path.
async fn store_image<F: FileStorage>(storage: &F, data_url: &str) -> ApiResult<String> {
    let image = decode_data_url(data_url)?;
    let path = recipe_image_path(image.extension);
    storage
        .upload_file(FileUploadRequest::new(
            path.clone(),
            image.content,
            image.content_type,
        ))
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store image {path}: {e}")))?;
    Ok(path)
}

/// Best effort; a leftover file is only logged.
async fn discard_image<F: FileStorage>(storage: &F, path: &str) {
    if let Err(e) = storage.delete_file(path).await {
        tracing::warn!(path, error = %e, "failed to delete recipe image");
    }
}

async fn load_recipe<S: SqlStorage>(storage: &S, id: i64) -> ApiResult<RecipeRow> {
    storage
        .recipes_get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Recipe not found."))
}

fn ensure_author(recipe: &RecipeRow, auth: &RequireAuth) -> ApiResult<()> {
    if recipe.author_id != auth.user_id() {
        return Err(ApiError::forbidden(
            "You do not have permission to perform this action.",
        ));
    }
    Ok(())
}

#[tracing::instrument(skip_all, fields(page = ?query.page))]
pub async fn list_recipes<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: MaybeAuth,
    url: RequestUrl,
    Query(query): Query<RecipeListQuery>,
) -> ApiResult<Json<Page<RecipeResponse>>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let viewer = auth.user_id();
    let page = PageRequest::new(query.page, query.limit, config.page_size())?;
    let filter = query.filter(viewer);

    let (rows, total) = state
        .sql_storage
        .recipes_list(&filter, page.limit(), page.offset())
        .await?;
    page.ensure_in_range(total)?;

    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer,
    };
    let results = present::recipes(ctx, rows).await?;
    Ok(Json(Page::new(results, total, page, &url)))
}

#[tracing::instrument(skip_all, fields(recipe_id = id))]
pub async fn get_recipe<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: MaybeAuth,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeResponse>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let recipe = load_recipe(&state.sql_storage, id).await?;
    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: auth.user_id(),
    };
    Ok(Json(present::recipe(ctx, recipe).await?))
}

#[tracing::instrument(skip_all, fields(user_id = auth.user_id()))]
pub async fn create_recipe<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    WithRejection(Json(payload), _): WithRejection<Json<RecipeWrite>, ApiError>,
) -> ApiResult<(StatusCode, Json<RecipeResponse>)>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let valid = payload.validate(true).inspect_err(|e| {
        tracing::warn!(error = %e, "rejected recipe payload");
    })?;
    check_references(&state.sql_storage, &valid).await?;

    let (Some(data_url), Some(name), Some(text), Some(cooking_time)) =
        (valid.image, valid.name, valid.text, valid.cooking_time)
    else {
        return Err(ApiError::bad_request("incomplete recipe"));
    };

    let image = store_image(&state.file_storage, &data_url).await?;
    let created = state
        .sql_storage
        .recipes_create(RecipeCreate {
            author_id: auth.user_id(),
            name,
            text,
            image: image.clone(),
            cooking_time,
            tag_ids: valid.tag_ids,
            ingredients: valid.ingredients,
        })
        .await;

    let recipe = match created {
        Ok(recipe) => recipe,
        Err(e) => {
            discard_image(&state.file_storage, &image).await;
            return Err(e.into());
        }
    };
    tracing::info!(recipe_id = recipe.id, "recipe created");

    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: Some(auth.user_id()),
    };
    Ok((StatusCode::CREATED, Json(present::recipe(ctx, recipe).await?)))
}

#[tracing::instrument(skip_all, fields(recipe_id = id, user_id = auth.user_id()))]
pub async fn update_recipe<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    Extension(config): Extension<Config>,
    auth: RequireAuth,
    Path(id): Path<i64>,
    WithRejection(Json(payload), _): WithRejection<Json<RecipeWrite>, ApiError>,
) -> ApiResult<Json<RecipeResponse>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let existing = load_recipe(&state.sql_storage, id).await?;
    ensure_author(&existing, &auth)?;

    let valid = payload.validate(false)?;
    check_references(&state.sql_storage, &valid).await?;

    let new_image = match &valid.image {
        Some(data_url) => Some(store_image(&state.file_storage, data_url).await?),
        None => None,
    };

    let updated = state
        .sql_storage
        .recipes_update(
            id,
            RecipeUpdate {
                name: valid.name,
                text: valid.text,
                image: new_image.clone(),
                cooking_time: valid.cooking_time,
                tag_ids: Some(valid.tag_ids),
                ingredients: Some(valid.ingredients),
            },
        )
        .await;

    let recipe = match (updated, new_image) {
        (Ok(recipe), Some(_)) => {
            discard_image(&state.file_storage, &existing.image).await;
            recipe
        }
        (Ok(recipe), None) => recipe,
        (Err(e), new_image) => {
            if let Some(path) = new_image {
                discard_image(&state.file_storage, &path).await;
            }
            return Err(e.into());
        }
    };
    tracing::info!("recipe updated");

    let ctx = Ctx {
        state: &state,
        config: &config,
        viewer: Some(auth.user_id()),
    };
    Ok(Json(present::recipe(ctx, recipe).await?))
}

#[tracing::instrument(skip_all, fields(recipe_id = id, user_id = auth.user_id()))]
pub async fn delete_recipe<S, U, F>(
    State(state): State<AppState<S, U, F>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    let existing = load_recipe(&state.sql_storage, id).await?;
    ensure_author(&existing, &auth)?;

    if !state.sql_storage.recipes_delete(id).await? {
        return Err(ApiError::not_found("Recipe not found."));
    }
    discard_image(&state.file_storage, &existing.image).await;
    tracing::info!("recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RecipeWrite {
        RecipeWrite {
            ingredients: Some(vec![IngredientAmountInput { id: 1, amount: 10 }]),
            tags: Some(vec![1]),
            image: Some("data:image/png;base64,aGVsbG8=".to_owned()),
            name: Some("Soup".to_owned()),
            text: Some("Boil.".to_owned()),
            cooking_time: Some(30),
        }
    }

    fn message(err: ApiError) -> String {
        err.to_string()
    }

    #[test]
    fn complete_payload_is_valid() {
        let valid = payload().validate(true).unwrap();
        assert_eq!(valid.tag_ids, vec![1]);
        assert_eq!(valid.cooking_time, Some(30));
    }

    #[test]
    fn duplicate_ingredients_are_rejected() {
        let mut write = payload();
        write.ingredients = Some(vec![
            IngredientAmountInput { id: 3, amount: 1 },
            IngredientAmountInput { id: 3, amount: 2 },
        ]);
        assert_eq!(
            message(write.validate(true).unwrap_err()),
            "ingredients: duplicate ingredient 3"
        );
    }

    #[test]
    fn zero_amount_and_cooking_time_are_rejected() {
        let mut write = payload();
        write.ingredients = Some(vec![IngredientAmountInput { id: 1, amount: 0 }]);
        assert!(message(write.validate(true).unwrap_err()).starts_with("ingredients:"));

        let mut write = payload();
        write.cooking_time = Some(0);
        assert!(message(write.validate(true).unwrap_err()).starts_with("cooking_time:"));
    }

    #[test]
    fn empty_tags_and_duplicate_tags_are_rejected() {
        let mut write = payload();
        write.tags = Some(Vec::new());
        assert!(message(write.validate(true).unwrap_err()).starts_with("tags:"));

        let mut write = payload();
        write.tags = Some(vec![2, 2]);
        assert_eq!(message(write.validate(true).unwrap_err()), "tags: duplicate tag 2");
    }

    #[test]
    fn image_is_required_only_on_create() {
        let mut write = payload();
        write.image = None;
        assert_eq!(
            message(write.clone().validate(true).unwrap_err()),
            "image: this field is required"
        );
        assert!(write.validate(false).is_ok());
    }

    #[test]
    fn long_names_are_rejected() {
        let mut write = payload();
        write.name = Some("x".repeat(MAX_NAME_LEN + 1));
        assert!(message(write.validate(true).unwrap_err()).starts_with("name:"));
    }

    #[test]
    fn flags_only_apply_to_authenticated_viewers() {
        let query = RecipeListQuery {
            is_favorited: Some("1".to_owned()),
            is_in_shopping_cart: Some("0".to_owned()),
            tags: vec!["lunch".to_owned()],
            ..RecipeListQuery::default()
        };

        let filter = query.filter(Some(5));
        assert_eq!(filter.favorited_by, Some(5));
        assert_eq!(filter.in_cart_of, None);
        assert_eq!(filter.tag_slugs, vec!["lunch".to_owned()]);

        let anonymous = query.filter(None);
        assert_eq!(anonymous.favorited_by, None);
    }
}

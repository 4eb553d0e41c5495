//! JSON API mounted under `/api`.

pub mod ingredients;
pub mod media;
pub mod present;
pub mod recipes;
pub mod relations;
pub mod shopping;
pub mod tags;
pub mod types;

use crate::database::SqlStorage;
use crate::media::FileStorage;
use crate::state::AppState;
use crate::users::{routes as users, storage::UserStorage, subscriptions};
use crate::media::MAX_IMAGE_BYTES;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Recipe writes carry a base64 image of up to [`MAX_IMAGE_BYTES`] plus the
/// rest of the JSON document.
pub const RECIPE_BODY_LIMIT: usize = MAX_IMAGE_BYTES / 3 * 4 + 1024 * 1024;

pub fn routes<S, U, F>() -> Router<AppState<S, U, F>>
where
    S: SqlStorage,
    U: UserStorage,
    F: FileStorage,
{
    Router::new()
        .route("/tags/", get(tags::list_tags::<S, U, F>))
        .route("/tags/{id}/", get(tags::get_tag::<S, U, F>))
        .route("/ingredients/", get(ingredients::list_ingredients::<S, U, F>))
        .route("/ingredients/{id}/", get(ingredients::get_ingredient::<S, U, F>))
        .route(
            "/recipes/",
            get(recipes::list_recipes::<S, U, F>)
                .post(recipes::create_recipe::<S, U, F>)
                .layer(DefaultBodyLimit::max(RECIPE_BODY_LIMIT)),
        )
        .route(
            "/recipes/download_shopping_cart/",
            get(shopping::download_shopping_cart::<S, U, F>),
        )
        .route(
            "/recipes/{id}/",
            get(recipes::get_recipe::<S, U, F>)
                .patch(recipes::update_recipe::<S, U, F>)
                .delete(recipes::delete_recipe::<S, U, F>)
                .layer(DefaultBodyLimit::max(RECIPE_BODY_LIMIT)),
        )
        .route(
            "/recipes/{id}/favorite/",
            post(relations::add_favorite::<S, U, F>).delete(relations::remove_favorite::<S, U, F>),
        )
        .route(
            "/recipes/{id}/shopping_cart/",
            post(relations::add_to_cart::<S, U, F>).delete(relations::remove_from_cart::<S, U, F>),
        )
        .route(
            "/users/",
            get(users::list_users::<S, U, F>).post(users::register::<S, U, F>),
        )
        .route("/users/me/", get(users::me::<S, U, F>))
        .route("/users/set_password/", post(users::set_password::<S, U, F>))
        .route(
            "/users/subscriptions/",
            get(subscriptions::list_subscriptions::<S, U, F>),
        )
        .route("/users/{id}/", get(users::get_user::<S, U, F>))
        .route(
            "/users/{id}/subscribe/",
            post(subscriptions::subscribe::<S, U, F>).delete(subscriptions::unsubscribe::<S, U, F>),
        )
        .route("/auth/token/login/", post(users::login::<S, U, F>))
        .route("/auth/token/logout/", post(users::logout))
}

//! Shared helpers for the HTTP integration tests.
//!
//! Every test runs the real router over the in-memory storages; the mock
//! handles share their state with the router, so a test can seed data
//! before building the server and inspect it afterwards.

#![allow(dead_code)]

use axum::http::StatusCode;
use axum_test::TestServer;
use foodgram_services::{
    config::Config, database::MockSqlStorage, media::MockFileStorage, routes,
    users::MockUserStorage,
};
use serde_json::{Value, json};

/// A 1x1 transparent PNG.
pub const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub const PASSWORD: &str = "Qwerty123!";

pub struct TestApp {
    pub server: TestServer,
    pub sql: MockSqlStorage,
    pub users: MockUserStorage,
    pub files: MockFileStorage,
}

/// Catalogue with two tags and a few ingredients, including the same name
/// under two units.
pub fn seeded_storage() -> MockSqlStorage {
    MockSqlStorage::new()
        .with_tag("Завтрак", "#E26C2D", "breakfast")
        .with_tag("Обед", "#49B64E", "lunch")
        .with_ingredient("мука", "г")
        .with_ingredient("яйца", "шт.")
        .with_ingredient("молоко", "мл")
        .with_ingredient("молоко", "стакан")
}

pub fn app_with(sql: MockSqlStorage) -> TestApp {
    let users = MockUserStorage::new();
    let files = MockFileStorage::new();
    let router = routes(
        sql.clone(),
        users.clone(),
        files.clone(),
        Config::new_for_test(),
    );
    TestApp {
        server: TestServer::new(router).unwrap(),
        sql,
        users,
        files,
    }
}

pub fn app() -> TestApp {
    app_with(seeded_storage())
}

impl TestApp {
    pub fn tag(&self, slug: &str) -> i64 {
        self.sql.tag_id(slug).unwrap()
    }

    pub fn ingredient(&self, name: &str, unit: &str) -> i64 {
        self.sql.ingredient_id(name, unit).unwrap()
    }

    /// Registers `username` and returns its id.
    pub async fn register(&self, username: &str) -> i64 {
        let response = self
            .server
            .post("/api/users/")
            .json(&json!({
                "email": format!("{username}@example.com"),
                "username": username,
                "first_name": "Test",
                "last_name": "User",
                "password": PASSWORD,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }

    pub async fn login(&self, username: &str) -> String {
        let response = self
            .server
            .post("/api/auth/token/login/")
            .json(&json!({
                "email": format!("{username}@example.com"),
                "password": PASSWORD,
            }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["auth_token"]
            .as_str()
            .unwrap()
            .to_owned()
    }

    /// Registers and logs in; returns `(user id, token)`.
    pub async fn sign_up(&self, username: &str) -> (i64, String) {
        let id = self.register(username).await;
        let token = self.login(username).await;
        (id, token)
    }

    /// Creates a recipe and returns its id.
    pub async fn create_recipe(
        &self,
        token: &str,
        name: &str,
        tags: &[i64],
        ingredients: &[(i64, i64)],
    ) -> i64 {
        let response = self
            .server
            .post("/api/recipes/")
            .authorization_bearer(token)
            .json(&recipe_payload(name, tags, ingredients))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }
}

pub fn recipe_payload(name: &str, tags: &[i64], ingredients: &[(i64, i64)]) -> Value {
    let ingredients: Vec<Value> = ingredients
        .iter()
        .map(|&(id, amount)| json!({ "id": id, "amount": amount }))
        .collect();
    json!({
        "ingredients": ingredients,
        "tags": tags,
        "image": PNG_DATA_URL,
        "name": name,
        "text": "Mix everything and cook.",
        "cooking_time": 15,
    })
}

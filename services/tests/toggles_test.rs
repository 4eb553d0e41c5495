mod common;

use axum::http::StatusCode;
use serde_json::Value;

async fn recipe_fixture(app: &common::TestApp) -> (String, i64) {
    let (_, author) = app.sign_up("chef").await;
    let (_, viewer) = app.sign_up("reader").await;
    let lunch = app.tag("lunch");
    let flour = app.ingredient("мука", "г");
    let id = app
        .create_recipe(&author, "Блины", &[lunch], &[(flour, 200)])
        .await;
    (viewer, id)
}

#[tokio::test]
async fn favorite_is_created_once_and_removed_once() {
    let app = common::app();
    let (token, id) = recipe_fixture(&app).await;
    let path = format!("/api/recipes/{id}/favorite/");

    let response = app.server.post(&path).authorization_bearer(&token).await;
    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["id"], id);
    assert_eq!(body["name"], "Блины");
    assert_eq!(body["cooking_time"], 15);
    assert!(body["image"].as_str().unwrap().starts_with("/media/"));

    let response = app.server.post(&path).authorization_bearer(&token).await;
    response.assert_status_bad_request();
    assert_eq!(
        response.json::<Value>()["message"],
        "Recipe is already in favorites."
    );

    let detail = app
        .server
        .get(&format!("/api/recipes/{id}/"))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(detail["is_favorited"], true);
    assert_eq!(detail["is_in_shopping_cart"], false);

    app.server
        .delete(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = app.server.delete(&path).authorization_bearer(&token).await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["message"], "Recipe is not in favorites.");
}

#[tokio::test]
async fn shopping_cart_toggle_mirrors_favorites() {
    let app = common::app();
    let (token, id) = recipe_fixture(&app).await;
    let path = format!("/api/recipes/{id}/shopping_cart/");

    app.server
        .post(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::CREATED);
    let response = app.server.post(&path).authorization_bearer(&token).await;
    response.assert_status_bad_request();
    assert_eq!(
        response.json::<Value>()["message"],
        "Recipe is already in shopping cart."
    );

    app.server
        .delete(&path)
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete(&path)
        .authorization_bearer(&token)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn toggles_need_an_existing_recipe_and_a_session() {
    let app = common::app();
    let (token, id) = recipe_fixture(&app).await;

    app.server
        .post(&format!("/api/recipes/{id}/favorite/"))
        .await
        .assert_status_unauthorized();

    let response = app
        .server
        .post("/api/recipes/9999/favorite/")
        .authorization_bearer(&token)
        .await;
    response.assert_status_not_found();
    assert_eq!(response.json::<Value>()["message"], "Recipe not found.");

    app.server
        .delete("/api/recipes/9999/shopping_cart/")
        .authorization_bearer(&token)
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn list_flags_filter_only_for_the_viewer() {
    let app = common::app();
    let (_, author) = app.sign_up("chef").await;
    let (_, viewer) = app.sign_up("reader").await;
    let lunch = app.tag("lunch");
    let flour = app.ingredient("мука", "г");
    let liked = app
        .create_recipe(&author, "liked", &[lunch], &[(flour, 1)])
        .await;
    app.create_recipe(&author, "other", &[lunch], &[(flour, 1)])
        .await;

    app.server
        .post(&format!("/api/recipes/{liked}/favorite/"))
        .authorization_bearer(&viewer)
        .await
        .assert_status(StatusCode::CREATED);

    let body = app
        .server
        .get("/api/recipes/")
        .add_query_param("is_favorited", 1)
        .authorization_bearer(&viewer)
        .await
        .json::<Value>();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["id"], liked);
    assert_eq!(body["results"][0]["is_favorited"], true);

    let body = app
        .server
        .get("/api/recipes/")
        .add_query_param("is_favorited", 1)
        .authorization_bearer(&author)
        .await
        .json::<Value>();
    assert_eq!(body["count"], 0);

    // Anonymous viewers get the unfiltered list
    let body = app
        .server
        .get("/api/recipes/")
        .add_query_param("is_favorited", 1)
        .await
        .json::<Value>();
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn deleting_a_recipe_clears_its_relations() {
    let app = common::app();
    let (_, author) = app.sign_up("chef").await;
    let (_, viewer) = app.sign_up("reader").await;
    let lunch = app.tag("lunch");
    let flour = app.ingredient("мука", "г");
    let id = app
        .create_recipe(&author, "Блины", &[lunch], &[(flour, 200)])
        .await;

    app.server
        .post(&format!("/api/recipes/{id}/shopping_cart/"))
        .authorization_bearer(&viewer)
        .await
        .assert_status(StatusCode::CREATED);
    app.server
        .delete(&format!("/api/recipes/{id}/"))
        .authorization_bearer(&author)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let body = app
        .server
        .get("/api/recipes/download_shopping_cart/")
        .authorization_bearer(&viewer)
        .await
        .text();
    assert!(!body.contains("мука"));
}

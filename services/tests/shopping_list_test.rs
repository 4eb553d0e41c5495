mod common;

use axum::http::StatusCode;
use chrono::Datelike;

const DOWNLOAD: &str = "/api/recipes/download_shopping_cart/";

fn footer() -> String {
    format!("Foodgram {}", chrono::Utc::now().year())
}

#[tokio::test]
async fn empty_cart_downloads_only_the_footer() {
    let app = common::app();
    let (_, token) = app.sign_up("reader").await;

    let response = app.server.get(DOWNLOAD).authorization_bearer(&token).await;
    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "text/plain; charset=utf-8"
    );
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"BuyList.txt\""
    );
    assert_eq!(response.text(), footer());
}

#[tokio::test]
async fn download_requires_a_session() {
    let app = common::app();
    app.server.get(DOWNLOAD).await.assert_status_unauthorized();
}

#[tokio::test]
async fn amounts_are_summed_per_name_and_unit() {
    let app = common::app();
    let (_, author) = app.sign_up("chef").await;
    let (_, viewer) = app.sign_up("reader").await;
    let lunch = app.tag("lunch");
    let flour = app.ingredient("мука", "г");
    let eggs = app.ingredient("яйца", "шт.");
    let milk_ml = app.ingredient("молоко", "мл");
    let milk_glass = app.ingredient("молоко", "стакан");

    let pancakes = app
        .create_recipe(
            &author,
            "Блины",
            &[lunch],
            &[(flour, 200), (eggs, 2), (milk_ml, 500)],
        )
        .await;
    let pie = app
        .create_recipe(
            &author,
            "Пирог",
            &[lunch],
            &[(flour, 300), (eggs, 3), (milk_glass, 1)],
        )
        .await;
    // Someone else's cart must not leak into the viewer's list
    let soup = app
        .create_recipe(&author, "Суп", &[lunch], &[(eggs, 10)])
        .await;

    for id in [pancakes, pie] {
        app.server
            .post(&format!("/api/recipes/{id}/shopping_cart/"))
            .authorization_bearer(&viewer)
            .await
            .assert_status(StatusCode::CREATED);
    }
    app.server
        .post(&format!("/api/recipes/{soup}/shopping_cart/"))
        .authorization_bearer(&author)
        .await
        .assert_status(StatusCode::CREATED);

    let text = app
        .server
        .get(DOWNLOAD)
        .authorization_bearer(&viewer)
        .await
        .text();

    let expected = format!(
        "* молоко: 500 мл\n* молоко: 1 стакан\n* мука: 500 г\n* яйца: 5 шт.\n{}",
        footer()
    );
    assert_eq!(text, expected);
}

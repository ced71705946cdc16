#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use common::{body_string, location, TestEnv};
use sea_orm::{EntityTrait, PaginatorTrait};
use yablog::orm::users;

#[actix_rt::test]
async fn signup_creates_a_user_without_logging_in() {
    let env = TestEnv::new().await;
    let app = test_app!(env);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/auth/signup/")
            .set_form(&[
                ("first_name", "Leo"),
                ("last_name", "Tolstoy"),
                ("username", "leo"),
                ("email", "leo@example.com"),
                ("password1", "war-and-peace"),
                ("password2", "war-and-peace"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(resp.response().cookies().find(|c| c.name() == "id").is_none());
    assert_eq!(users::Entity::find().count(env.db()).await.unwrap(), 1);

    let resp = test::call_service(&app, TestRequest::get().uri("/profile/leo/").to_request()).await;
    assert!(body_string(resp).await.contains("Leo Tolstoy"));

    // The new account can sign in.
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[("username", "leo"), ("password", "war-and-peace")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

#[actix_rt::test]
async fn signup_rejects_taken_names_and_bad_passwords() {
    let env = TestEnv::new().await;
    env.user("auth").await;
    let app = test_app!(env);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/auth/signup/")
            .set_form(&[
                ("username", "auth"),
                ("password1", "12345678"),
                ("password2", "12345678"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("A user with that username already exists."));
    assert!(body.contains("This password is entirely numeric."));
    assert_eq!(users::Entity::find().count(env.db()).await.unwrap(), 1);
}

#[actix_rt::test]
async fn login_honours_local_next_only() {
    let env = TestEnv::new().await;
    env.user("auth").await;
    let app = test_app!(env);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[
                ("username", "auth"),
                ("password", common::PASSWORD),
                ("next", "/create/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(location(&resp), "/create/");

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[
                ("username", "auth"),
                ("password", common::PASSWORD),
                ("next", "https://evil.example/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(location(&resp), "/");
}

#[actix_rt::test]
async fn wrong_password_redisplays_login() {
    let env = TestEnv::new().await;
    env.user("auth").await;
    let app = test_app!(env);

    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[("username", "auth"), ("password", "wrong-password")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.contains("Please enter a correct username and password."));
}

#[actix_rt::test]
async fn logout_ends_the_session() {
    let env = TestEnv::new().await;
    env.user("auth").await;
    let app = test_app!(env);
    let cookie = login!(app, "auth");

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/create/").cookie(cookie.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/auth/logout/")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    // The purged session comes back as an expired cookie.
    let cleared = resp
        .response()
        .cookies()
        .find(|c| c.name() == "id")
        .map(|c| c.into_owned())
        .expect("removal cookie");
    let body = body_string(resp).await;
    assert!(body.contains("You have been logged out"));
    assert!(!body.contains("/auth/logout/"));

    let resp = test::call_service(
        &app,
        TestRequest::get().uri("/create/").cookie(cleared).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
}

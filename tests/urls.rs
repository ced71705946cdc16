#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use common::{body_string, location, TestEnv};

#[actix_rt::test]
async fn public_pages_are_open_to_guests() {
    let env = TestEnv::new().await;
    let author = env.user("auth").await;
    let group = env.group("Test group", "test-slug").await;
    let post = env.post(author, Some(group.id), "Test post").await;
    let app = test_app!(env);

    for uri in [
        "/".to_owned(),
        "/group/test-slug/".to_owned(),
        "/profile/auth/".to_owned(),
        format!("/posts/{}/", post),
        "/about/author/".to_owned(),
        "/about/tech/".to_owned(),
        "/auth/login/".to_owned(),
        "/auth/signup/".to_owned(),
    ] {
        let resp = test::call_service(&app, TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", uri);
    }
}

#[actix_rt::test]
async fn unknown_things_are_not_found() {
    let env = TestEnv::new().await;
    env.user("auth").await;
    let app = test_app!(env);

    for uri in [
        "/unexisting_page/",
        "/group/nope/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/abc/",
    ] {
        let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {}", uri);
        let body = body_string(resp).await;
        assert!(body.contains("Page not found"), "GET {} rendered {}", uri, body);
    }

    // Signed-in users get 404s for missing posts too.
    let cookie = login!(app, "auth");
    let resp = test::call_service(
        &app,
        TestRequest::get()
            .uri("/posts/999/edit/")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn profile_lookup_is_exact() {
    let env = TestEnv::new().await;
    env.user("authority").await;
    let app = test_app!(env);

    let resp = test::call_service(&app, TestRequest::get().uri("/profile/auth/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn guests_are_sent_to_login() {
    let env = TestEnv::new().await;
    let author = env.user("auth").await;
    let post = env.post(author, None, "Test post").await;
    let app = test_app!(env);

    let edit = format!("/posts/{}/edit/", post);
    for uri in [
        "/create/",
        "/follow/",
        "/profile/auth/follow/",
        "/profile/auth/unfollow/",
        edit.as_str(),
    ] {
        let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "GET {}", uri);
        assert_eq!(location(&resp), format!("/auth/login/?next={}", uri));
    }

    let comment = format!("/posts/{}/comment/", post);
    let resp = test::call_service(
        &app,
        TestRequest::post()
            .uri(&comment)
            .set_form(&[("text", "hi")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/auth/login/?next={}", comment));
}

#[actix_rt::test]
async fn edit_page_is_for_the_author_only() {
    let env = TestEnv::new().await;
    let author = env.user("auth").await;
    env.user("not_auth").await;
    let post = env.post(author, None, "Test post").await;
    let app = test_app!(env);
    let edit = format!("/posts/{}/edit/", post);

    let cookie = login!(app, "not_auth");
    let resp = test::call_service(
        &app,
        TestRequest::get().uri(&edit).cookie(cookie.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post));

    let cookie = login!(app, "auth");
    let resp = test::call_service(
        &app,
        TestRequest::get().uri(&edit).cookie(cookie.clone()).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_string(resp).await;
    assert!(body.contains("Test post"));
    assert!(body.contains("Edit post"));
}

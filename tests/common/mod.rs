#![allow(dead_code)]

use actix_web::web::Data;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tempfile::TempDir;
use yablog::cache::ManualClock;
use yablog::config::Config;
use yablog::db::{create_schema, init_db};
use yablog::group::create_group;
use yablog::orm::groups;
use yablog::post::{insert_post, ImageChange, PostChanges};
use yablog::session::MainData;
use yablog::user::{insert_new_user, NewUser};

pub const PASSWORD: &str = "correct-horse-battery";

/// 1x2 GIF.
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00,
    0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

pub struct TestEnv {
    pub data: Data<MainData>,
    pub clock: Arc<ManualClock>,
    /// Keeps the media directory alive for the test.
    pub media: TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        let media = tempfile::tempdir().expect("tempdir");
        let pool = init_db("sqlite::memory:").await.expect("sqlite");
        create_schema(&pool).await.expect("schema");

        let mut config = Config::with_database("sqlite::memory:");
        config.media_root = media.path().to_owned();

        let clock = Arc::new(ManualClock::default());
        let data = Data::new(MainData::new(pool, config, clock.clone()));
        Self { data, clock, media }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.data.pool
    }

    pub async fn user(&self, username: &str) -> i32 {
        insert_new_user(
            self.db(),
            NewUser {
                username,
                email: "",
                first_name: "",
                last_name: "",
                password: PASSWORD,
            },
        )
        .await
        .expect("insert user")
        .id
    }

    pub async fn group(&self, title: &str, slug: &str) -> groups::Model {
        create_group(self.db(), title, slug, "Test description")
            .await
            .expect("insert group")
    }

    pub async fn post(&self, author_id: i32, group_id: Option<i32>, text: &str) -> i32 {
        insert_post(
            self.db(),
            author_id,
            PostChanges {
                text: text.to_owned(),
                group_id,
                image: ImageChange::Keep,
            },
        )
        .await
        .expect("insert post")
        .id
    }
}

/// Hand-built `multipart/form-data` body. Returns the content type and the body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> (String, Vec<u8>) {
    let boundary = "----yablogtestboundary";
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: image/gif\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

/// Builds the application the way the binary does, minus the logger and static files.
macro_rules! test_app {
    ($env:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($env.data.clone())
                .wrap(
                    actix_web::middleware::ErrorHandlers::new()
                        .handler(
                            actix_web::http::StatusCode::NOT_FOUND,
                            yablog::web::error::render_404,
                        )
                        .handler(
                            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                            yablog::web::error::render_500,
                        ),
                )
                .wrap(yablog::middleware::ClientCtx::default())
                .wrap(actix_session::SessionMiddleware::new(
                    actix_session::storage::CookieSessionStore::default(),
                    actix_web::cookie::Key::generate(),
                ))
                .configure(yablog::web::configure),
        )
        .await
    };
}

/// Logs `$username` in through the login form and returns the session cookie.
macro_rules! login {
    ($app:expr, $username:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/auth/login/")
            .set_form(&[
                ("username", $username),
                ("password", $crate::common::PASSWORD),
            ])
            .to_request();
        let resp = actix_web::test::call_service(&$app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::FOUND, "login failed");
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == "id")
            .map(|c| c.into_owned())
            .expect("session cookie");
        cookie
    }};
}

/// Location header of a redirect.
pub fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(actix_web::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

pub async fn body_string<B>(resp: actix_web::dev::ServiceResponse<B>) -> String
where
    B: actix_web::body::MessageBody,
{
    let bytes = actix_web::test::read_body(resp).await;
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Number of post cards in a feed page.
pub fn count_posts(body: &str) -> usize {
    body.matches("<article class=\"post\">").count()
}

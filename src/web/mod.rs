pub mod about;
pub mod account;
pub mod error;
pub mod group;
pub mod index;
pub mod post;
pub mod profile;

use actix_web::http::header;
use actix_web::HttpResponse;
use serde::Deserialize;

/// Configures the web app
///
/// @see https://docs.rs/actix-web/4.0.1/actix_web/struct.App.html#method.configure
pub fn configure(conf: &mut actix_web::web::ServiceConfig) {
    // Higher traffic routes first.
    index::configure(conf);
    post::configure(conf);
    group::configure(conf);
    profile::configure(conf);
    account::configure(conf);
    about::configure(conf);
}

/// `?page=` as sent by the paginator links.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

pub(crate) fn html(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body)
}

use super::{html, PageQuery};
use crate::cache::ResponseCache;
use crate::feed::{get_feed_page, FeedFilter};
use crate::middleware::ClientCtx;
use crate::paginator::{Page, Paginator};
use crate::post::PostForTemplate;
use crate::session::MainData;
use actix_web::{error, get, web, Error, HttpRequest, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};

/// Cache key prefix for rendered index pages.
pub const INDEX_CACHE_PREFIX: &str = "index_page";

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_index).service(view_follow_index);
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate<'a> {
    pub client: ClientCtx,
    pub page: &'a Page<PostForTemplate>,
    pub paginator: Paginator,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowIndexTemplate<'a> {
    pub client: ClientCtx,
    pub page: &'a Page<PostForTemplate>,
    pub paginator: Paginator,
}

/// Key for one rendered index page as seen by one visitor.
/// Only the page number matters; other query parameters share the entry.
pub fn index_cache_key(client: &ClientCtx, requested: Option<&str>) -> String {
    let identity = client
        .get_id()
        .map_or_else(|| "anon".to_owned(), |id| id.to_string());
    let page = match requested.map(|p| p.trim().parse::<i64>()) {
        None | Some(Err(_)) => "1".to_owned(),
        Some(Ok(n)) if n < 1 => "last".to_owned(),
        Some(Ok(n)) => n.to_string(),
    };
    ResponseCache::key(INDEX_CACHE_PREFIX, &format!("{}?page={}", identity, page))
}

#[get("/")]
pub async fn view_index(
    client: ClientCtx,
    data: web::Data<MainData>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, Error> {
    let key = index_cache_key(&client, query.page.as_deref());
    if let Some(body) = data.cache.get(&key) {
        log::debug!("view_index: cache hit for {}", key);
        return Ok(html(body));
    }

    let page = get_feed_page(
        &data.pool,
        FeedFilter::All,
        query.page.as_deref(),
        data.config.posts_per_page,
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    let body = IndexTemplate {
        paginator: Paginator::new("/", &page),
        client,
        page: &page,
    }
    .render()
    .map_err(error::ErrorInternalServerError)?;

    data.cache.insert(key, body.clone());
    Ok(html(body))
}

#[get("/follow/")]
pub async fn view_follow_index(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_user(&req)?;
    let page = get_feed_page(
        &data.pool,
        FeedFilter::FollowedBy(user_id),
        query.page.as_deref(),
        data.config.posts_per_page,
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(FollowIndexTemplate {
        paginator: Paginator::new("/follow/", &page),
        client,
        page: &page,
    }
    .to_response())
}

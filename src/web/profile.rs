use super::{redirect, PageQuery};
use crate::feed::{get_feed_page, FeedFilter};
use crate::follow::{follow_author, is_following, unfollow_author};
use crate::middleware::ClientCtx;
use crate::paginator::{Page, Paginator};
use crate::post::PostForTemplate;
use crate::session::MainData;
use crate::user::{get_profile_by_name, UserProfile};
use actix_web::{error, get, web, Error, HttpRequest, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_profile)
        .service(follow_profile)
        .service(unfollow_profile);
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate<'a> {
    pub client: ClientCtx,
    pub author: &'a UserProfile,
    pub page: &'a Page<PostForTemplate>,
    pub paginator: Paginator,
    pub following: bool,
}

/// Path of a user's profile page with the username percent-encoded.
pub fn profile_url(username: &str) -> String {
    let segment: String = url::form_urlencoded::byte_serialize(username.as_bytes()).collect();
    format!("/profile/{}/", segment)
}

async fn get_author_or_404(db: &DatabaseConnection, username: &str) -> Result<UserProfile, Error> {
    get_profile_by_name(db, username)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("User not found."))
}

#[get("/profile/{username}/")]
pub async fn view_profile(
    client: ClientCtx,
    data: web::Data<MainData>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let author = get_author_or_404(&data.pool, &path).await?;

    let page = get_feed_page(
        &data.pool,
        FeedFilter::Author(author.id),
        query.page.as_deref(),
        data.config.posts_per_page,
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    let following = match client.get_id() {
        Some(user_id) => is_following(&data.pool, user_id, author.id)
            .await
            .map_err(error::ErrorInternalServerError)?,
        None => false,
    };

    Ok(ProfileTemplate {
        paginator: Paginator::new(profile_url(&author.username), &page),
        client,
        author: &author,
        page: &page,
        following,
    }
    .to_response())
}

#[get("/profile/{username}/follow/")]
pub async fn follow_profile(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_user(&req)?;
    let author = get_author_or_404(&data.pool, &path).await?;

    if follow_author(&data.pool, user_id, author.id)
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        log::info!("user {} now follows {}", user_id, author.username);
    }

    Ok(redirect(&profile_url(&author.username)))
}

#[get("/profile/{username}/unfollow/")]
pub async fn unfollow_profile(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_user(&req)?;
    let author = get_author_or_404(&data.pool, &path).await?;

    if unfollow_author(&data.pool, user_id, author.id)
        .await
        .map_err(error::ErrorInternalServerError)?
    {
        log::info!("user {} unfollowed {}", user_id, author.username);
    }

    Ok(redirect(&profile_url(&author.username)))
}

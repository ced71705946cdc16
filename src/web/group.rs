use super::PageQuery;
use crate::feed::{get_feed_page, FeedFilter};
use crate::group::get_group_by_slug;
use crate::middleware::ClientCtx;
use crate::orm::groups;
use crate::paginator::{Page, Paginator};
use crate::post::PostForTemplate;
use crate::session::MainData;
use actix_web::{error, get, web, Error, Responder};
use askama_actix::{Template, TemplateToResponse};

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_group);
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate<'a> {
    pub client: ClientCtx,
    pub group: &'a groups::Model,
    pub page: &'a Page<PostForTemplate>,
    pub paginator: Paginator,
}

#[get("/group/{slug}/")]
pub async fn view_group(
    client: ClientCtx,
    data: web::Data<MainData>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let group = get_group_by_slug(&data.pool, &path)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Group not found."))?;

    let page = get_feed_page(
        &data.pool,
        FeedFilter::Group(group.id),
        query.page.as_deref(),
        data.config.posts_per_page,
    )
    .await
    .map_err(error::ErrorInternalServerError)?;

    Ok(GroupTemplate {
        paginator: Paginator::new(format!("/group/{}/", group.slug), &page),
        client,
        group: &group,
        page: &page,
    }
    .to_response())
}

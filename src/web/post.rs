use super::profile::profile_url;
use super::redirect;
use crate::comment::{get_comments_for_post, insert_comment, CommentForTemplate};
use crate::form::{CommentFormData, PostForm};
use crate::group::get_all_groups;
use crate::middleware::ClientCtx;
use crate::orm::groups;
use crate::post::{
    count_posts_by_author, get_post_for_template, insert_post, update_post, ImageChange,
    PostChanges, PostForTemplate,
};
use crate::session::MainData;
use actix_multipart::Multipart;
use actix_web::{error, get, post, web, Error, HttpRequest, HttpResponse, Responder};
use askama_actix::{Template, TemplateToResponse};
use sea_orm::DatabaseConnection;

pub(super) fn configure(conf: &mut actix_web::web::ServiceConfig) {
    conf.service(view_post)
        .service(create_post_form)
        .service(create_post)
        .service(edit_post)
        .service(update_post_form)
        .service(add_comment);
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate<'a> {
    pub client: ClientCtx,
    pub post: &'a PostForTemplate,
    pub comments: &'a [CommentForTemplate],
    pub author_post_count: u64,
}

/// Shared by create and edit; `post` is set when editing.
#[derive(Template)]
#[template(path = "posts/post_create.html")]
pub struct PostFormTemplate<'a> {
    pub client: ClientCtx,
    pub form: &'a PostForm,
    pub groups: &'a [groups::Model],
    pub post: Option<&'a PostForTemplate>,
}

impl PostFormTemplate<'_> {
    pub fn action(&self) -> String {
        match self.post {
            Some(post) => format!("/posts/{}/edit/", post.id),
            None => "/create/".to_owned(),
        }
    }
}

async fn get_post_or_404(db: &DatabaseConnection, id: i32) -> Result<PostForTemplate, Error> {
    get_post_for_template(db, id)
        .await
        .map_err(error::ErrorInternalServerError)?
        .ok_or_else(|| error::ErrorNotFound("Post not found."))
}

async fn render_post_form(
    db: &DatabaseConnection,
    client: ClientCtx,
    form: &PostForm,
    post: Option<&PostForTemplate>,
) -> Result<HttpResponse, Error> {
    let groups = get_all_groups(db)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostFormTemplate {
        client,
        form,
        groups: &groups,
        post,
    }
    .to_response())
}

/// Stores a new upload, or turns the clear checkbox into a removal.
async fn resolve_image_change(data: &MainData, form: PostForm) -> Result<PostChanges, Error> {
    let image = match form.image {
        Some(image) => ImageChange::Replace(data.media.save_post_image(image).await?),
        None if form.image_clear => ImageChange::Clear,
        None => ImageChange::Keep,
    };

    Ok(PostChanges {
        text: form.text,
        group_id: form.group_id,
        image,
    })
}

#[get("/posts/{post_id}/")]
pub async fn view_post(
    client: ClientCtx,
    data: web::Data<MainData>,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let post = get_post_or_404(&data.pool, path.into_inner()).await?;
    let comments = get_comments_for_post(&data.pool, post.id)
        .await
        .map_err(error::ErrorInternalServerError)?;
    let author_post_count = count_posts_by_author(&data.pool, post.author_id)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(PostDetailTemplate {
        client,
        post: &post,
        comments: &comments,
        author_post_count,
    }
    .to_response())
}

#[get("/create/")]
pub async fn create_post_form(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
) -> Result<impl Responder, Error> {
    client.require_user(&req)?;
    render_post_form(&data.pool, client, &PostForm::default(), None).await
}

#[post("/create/")]
pub async fn create_post(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
    fields: Multipart,
) -> Result<impl Responder, Error> {
    let user_id = client.require_user(&req)?;
    let form = PostForm::from_multipart(&data.pool, fields).await?;

    if !form.is_valid() {
        log::debug!("create_post: invalid form {:?}", form.errors);
        return render_post_form(&data.pool, client, &form, None).await;
    }

    let changes = resolve_image_change(&data, form).await?;
    let post = insert_post(&data.pool, user_id, changes)
        .await
        .map_err(error::ErrorInternalServerError)?;
    log::info!("user {} created post {}", user_id, post.id);

    Ok(redirect(&profile_url(&client.get_name())))
}

#[get("/posts/{post_id}/edit/")]
pub async fn edit_post(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
    path: web::Path<i32>,
) -> Result<impl Responder, Error> {
    client.require_user(&req)?;
    let post = get_post_or_404(&data.pool, path.into_inner()).await?;

    if !client.can_update_post(&post) {
        return Ok(redirect(&format!("/posts/{}/", post.id)));
    }

    render_post_form(&data.pool, client, &PostForm::from_post(&post), Some(&post)).await
}

#[post("/posts/{post_id}/edit/")]
pub async fn update_post_form(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
    path: web::Path<i32>,
    fields: Multipart,
) -> Result<impl Responder, Error> {
    let user_id = client.require_user(&req)?;
    let post = get_post_or_404(&data.pool, path.into_inner()).await?;

    if !client.can_update_post(&post) {
        log::info!("user {} may not edit post {}", user_id, post.id);
        return Ok(redirect(&format!("/posts/{}/", post.id)));
    }

    let form = PostForm::from_multipart(&data.pool, fields).await?;
    if !form.is_valid() {
        return render_post_form(&data.pool, client, &form, Some(&post)).await;
    }

    let changes = resolve_image_change(&data, form).await?;
    update_post(&data.pool, post.id, changes)
        .await
        .map_err(error::ErrorInternalServerError)?;

    Ok(redirect(&format!("/posts/{}/", post.id)))
}

#[post("/posts/{post_id}/comment/")]
pub async fn add_comment(
    client: ClientCtx,
    req: HttpRequest,
    data: web::Data<MainData>,
    path: web::Path<i32>,
    form: Option<web::Form<CommentFormData>>,
) -> Result<impl Responder, Error> {
    let user_id = client.require_user(&req)?;
    let post = get_post_or_404(&data.pool, path.into_inner()).await?;

    // Blank comments are dropped without telling the user.
    if let Some(text) = form.as_ref().and_then(|form| form.cleaned_text()) {
        insert_comment(&data.pool, post.id, user_id, text)
            .await
            .map_err(error::ErrorInternalServerError)?;
    }

    Ok(redirect(&format!("/posts/{}/", post.id)))
}

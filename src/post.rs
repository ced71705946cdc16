use crate::orm::{groups, posts, users};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult, PaginatorTrait};

/// Characters of text shown where a post is named in a single line.
pub const POST_EXCERPT_CHARS: usize = 15;

/// A fully joined struct representing the post model and its relational data.
#[derive(Clone, Debug, FromQueryResult)]
pub struct PostForTemplate {
    pub id: i32,
    pub text: String,
    pub created_at: chrono::NaiveDateTime,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
    // join users
    pub author_name: String,
    // join groups
    pub group_title: Option<String>,
    pub group_slug: Option<String>,
}

impl PostForTemplate {
    pub fn excerpt(&self) -> String {
        excerpt(&self.text)
    }

    /// Public URL of the attached image.
    pub fn image_url(&self) -> Option<String> {
        self.image.as_ref().map(|path| format!("/media/{}", path))
    }

    pub fn created_at_as_string(&self) -> String {
        self.created_at.format("%d %b %Y %H:%M").to_string()
    }
}

/// Fields written when a post is created or edited.
#[derive(Debug)]
pub struct PostChanges {
    pub text: String,
    pub group_id: Option<i32>,
    pub image: ImageChange,
}

/// What happens to the stored image on save.
#[derive(Debug, PartialEq, Eq)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(String),
}

pub fn excerpt(text: &str) -> String {
    text.chars().take(POST_EXCERPT_CHARS).collect()
}

/// Posts joined to the author's name and the group's title and slug.
pub fn select_posts_for_template() -> Select<posts::Entity> {
    posts::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "author_name")
        .left_join(groups::Entity)
        .column_as(groups::Column::Title, "group_title")
        .column_as(groups::Column::Slug, "group_slug")
}

pub async fn get_post_for_template(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<PostForTemplate>, DbErr> {
    select_posts_for_template()
        .filter(posts::Column::Id.eq(id))
        .into_model::<PostForTemplate>()
        .one(db)
        .await
}

pub async fn count_posts_by_author(db: &DatabaseConnection, author_id: i32) -> Result<u64, DbErr> {
    posts::Entity::find()
        .filter(posts::Column::AuthorId.eq(author_id))
        .count(db)
        .await
}

pub async fn insert_post(
    db: &DatabaseConnection,
    author_id: i32,
    changes: PostChanges,
) -> Result<posts::Model, DbErr> {
    let image = match changes.image {
        ImageChange::Replace(path) => Some(path),
        ImageChange::Keep | ImageChange::Clear => None,
    };

    posts::ActiveModel {
        text: Set(changes.text),
        created_at: Set(Utc::now().naive_utc()),
        author_id: Set(author_id),
        group_id: Set(changes.group_id),
        image: Set(image),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Applies an edit in place. Author and creation time never change.
pub async fn update_post(
    db: &DatabaseConnection,
    id: i32,
    changes: PostChanges,
) -> Result<posts::Model, DbErr> {
    let mut post = posts::ActiveModel {
        id: Unchanged(id),
        text: Set(changes.text),
        group_id: Set(changes.group_id),
        ..Default::default()
    };

    match changes.image {
        ImageChange::Keep => {}
        ImageChange::Clear => post.image = Set(None),
        ImageChange::Replace(path) => post.image = Set(Some(path)),
    }

    post.update(db).await
}

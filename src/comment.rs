use crate::orm::{comments, users};
use chrono::Utc;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, FromQueryResult};

#[derive(Clone, Debug, FromQueryResult)]
pub struct CommentForTemplate {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created_at: chrono::NaiveDateTime,
    pub author_name: String,
}

impl CommentForTemplate {
    pub fn created_at_as_string(&self) -> String {
        self.created_at.format("%d %b %Y %H:%M").to_string()
    }
}

/// Comments on a post, oldest first.
pub async fn get_comments_for_post(
    db: &DatabaseConnection,
    post_id: i32,
) -> Result<Vec<CommentForTemplate>, DbErr> {
    comments::Entity::find()
        .left_join(users::Entity)
        .column_as(users::Column::Username, "author_name")
        .filter(comments::Column::PostId.eq(post_id))
        .order_by_asc(comments::Column::Id)
        .into_model::<CommentForTemplate>()
        .all(db)
        .await
}

pub async fn insert_comment(
    db: &DatabaseConnection,
    post_id: i32,
    author_id: i32,
    text: &str,
) -> Result<comments::Model, DbErr> {
    comments::ActiveModel {
        post_id: Set(post_id),
        author_id: Set(author_id),
        text: Set(text.to_owned()),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(db)
    .await
}

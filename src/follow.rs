use crate::orm::follows;
use sea_orm::sea_query::OnConflict;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, PaginatorTrait};

/// Makes `user_id` follow `author_id`.
/// Following yourself is ignored, as is following someone twice.
/// Returns whether a new edge was written.
pub async fn follow_author(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    if user_id == author_id {
        log::debug!("follow_author: user {} tried to follow themselves", user_id);
        return Ok(false);
    }

    let res = follows::Entity::insert(follows::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
    })
    .on_conflict(
        OnConflict::columns([follows::Column::UserId, follows::Column::AuthorId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    Ok(res > 0)
}

/// Removes the edge if there is one. Returns whether anything was deleted.
pub async fn unfollow_author(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    let res = follows::Entity::delete_many()
        .filter(follows::Column::UserId.eq(user_id))
        .filter(follows::Column::AuthorId.eq(author_id))
        .exec(db)
        .await?;

    Ok(res.rows_affected > 0)
}

pub async fn is_following(
    db: &DatabaseConnection,
    user_id: i32,
    author_id: i32,
) -> Result<bool, DbErr> {
    Ok(follows::Entity::find_by_id((user_id, author_id))
        .count(db)
        .await?
        > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_schema, init_db};
    use crate::user::{insert_new_user, NewUser};

    async fn user(db: &DatabaseConnection, name: &str) -> i32 {
        insert_new_user(
            db,
            NewUser {
                username: name,
                email: "",
                first_name: "",
                last_name: "",
                password: "correct-horse",
            },
        )
        .await
        .unwrap()
        .id
    }

    #[actix_rt::test]
    async fn follow_state_machine() {
        let db = init_db("sqlite::memory:").await.unwrap();
        create_schema(&db).await.unwrap();
        let reader = user(&db, "reader").await;
        let author = user(&db, "author").await;

        assert!(!is_following(&db, reader, author).await.unwrap());
        assert!(follow_author(&db, reader, author).await.unwrap());
        assert!(!follow_author(&db, reader, author).await.unwrap());
        assert!(is_following(&db, reader, author).await.unwrap());
        assert_eq!(follows::Entity::find().count(&db).await.unwrap(), 1);

        assert!(unfollow_author(&db, reader, author).await.unwrap());
        assert!(!unfollow_author(&db, reader, author).await.unwrap());
        assert!(!is_following(&db, reader, author).await.unwrap());
    }

    #[actix_rt::test]
    async fn self_follow_writes_nothing() {
        let db = init_db("sqlite::memory:").await.unwrap();
        create_schema(&db).await.unwrap();
        let author = user(&db, "author").await;

        for _ in 0..3 {
            assert!(!follow_author(&db, author, author).await.unwrap());
        }
        assert_eq!(follows::Entity::find().count(&db).await.unwrap(), 0);
    }
}

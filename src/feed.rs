use crate::orm::{follows, posts};
use crate::paginator::{page_count, page_offset, resolve_page, Page};
use crate::post::{select_posts_for_template, PostForTemplate};
use sea_orm::sea_query::Query;
use sea_orm::{entity::*, query::*, DatabaseConnection, DbErr, PaginatorTrait};

/// Which posts a feed lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedFilter {
    All,
    Group(i32),
    Author(i32),
    /// Posts by every author the given user follows.
    FollowedBy(i32),
}

impl FeedFilter {
    fn apply(self, select: Select<posts::Entity>) -> Select<posts::Entity> {
        match self {
            FeedFilter::All => select,
            FeedFilter::Group(id) => select.filter(posts::Column::GroupId.eq(id)),
            FeedFilter::Author(id) => select.filter(posts::Column::AuthorId.eq(id)),
            FeedFilter::FollowedBy(id) => select.filter(
                posts::Column::AuthorId.in_subquery(
                    Query::select()
                        .column(follows::Column::AuthorId)
                        .from(follows::Entity)
                        .and_where(follows::Column::UserId.eq(id))
                        .to_owned(),
                ),
            ),
        }
    }
}

/// Loads one page of a feed, newest first.
/// `requested` is the raw `?page=` value, resolved by [`resolve_page`].
pub async fn get_feed_page(
    db: &DatabaseConnection,
    filter: FeedFilter,
    requested: Option<&str>,
    per_page: u64,
) -> Result<Page<PostForTemplate>, DbErr> {
    let count = filter.apply(posts::Entity::find()).count(db).await?;
    let num_pages = page_count(count, per_page);
    let number = resolve_page(requested, num_pages);

    let items = filter
        .apply(select_posts_for_template())
        .order_by_desc(posts::Column::CreatedAt)
        .order_by_desc(posts::Column::Id)
        .offset(page_offset(number, per_page))
        .limit(per_page)
        .into_model::<PostForTemplate>()
        .all(db)
        .await?;

    Ok(Page {
        items,
        number,
        num_pages,
        count,
    })
}

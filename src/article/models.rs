use chrono::NaiveDateTime;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Integer, Nullable, Text, Timestamp};
use diesel::sqlite::SqliteConnection;
use diesel::{delete, insert_into, select, sql_query, update};
use log::{debug, info};
use serde::Serialize;

use crate::db::schema::{articles, comments};
use crate::listing::ArticleQuery;
use crate::topic::Topic;
use crate::types::{vote_bounds, ApiError};
use crate::users::models::User;
use crate::utils::serialize_date;

pub const DEFAULT_IMAGE_URL: &str = "https://placehold.co/700x700";

static SELECT_ARTICLE: &str = "SELECT articles.author AS author,
       articles.title AS title,
       articles.article_id AS article_id,
       articles.topic AS topic,
       articles.created_at AS created_at,
       articles.votes AS votes,
       articles.article_img_url AS article_img_url,
       articles.body AS body,
       COUNT(comments.comment_id) AS comment_count
  FROM articles LEFT JOIN comments ON articles.article_id = comments.article_id
 WHERE articles.article_id = ?
 GROUP BY articles.article_id";

static SELECT_ARTICLE_SUMMARIES: &str = "SELECT articles.author AS author,
       articles.title AS title,
       articles.article_id AS article_id,
       articles.topic AS topic,
       articles.created_at AS created_at,
       articles.votes AS votes,
       articles.article_img_url AS article_img_url,
       COUNT(comments.comment_id) AS comment_count
  FROM articles LEFT JOIN comments ON articles.article_id = comments.article_id
 WHERE (? IS NULL OR articles.topic = ?)
 GROUP BY articles.article_id";

/// A stored article row, as returned after a vote patch.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = articles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Article {
    pub article_id: i32,
    pub title: String,
    pub topic: String,
    pub author: String,
    pub body: String,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
    pub votes: i64,
    pub article_img_url: String,
}

/// List view: everything but the body, plus the number of comments.
#[derive(Debug, QueryableByName, Serialize)]
pub struct ArticleSummary {
    #[diesel(sql_type = Text)]
    pub author: String,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Integer)]
    pub article_id: i32,
    #[diesel(sql_type = Text)]
    pub topic: String,
    #[diesel(sql_type = Timestamp)]
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
    #[diesel(sql_type = BigInt)]
    pub votes: i64,
    #[diesel(sql_type = Text)]
    pub article_img_url: String,
    #[diesel(sql_type = BigInt)]
    pub comment_count: i64,
}

#[derive(Debug, QueryableByName, Serialize)]
pub struct ArticleDetail {
    #[diesel(embed)]
    #[serde(flatten)]
    pub summary: ArticleSummary,
    #[diesel(sql_type = Text)]
    pub body: String,
}

impl From<Article> for ArticleDetail {
    fn from(article: Article) -> Self {
        ArticleDetail {
            summary: ArticleSummary {
                author: article.author,
                title: article.title,
                article_id: article.article_id,
                topic: article.topic,
                created_at: article.created_at,
                votes: article.votes,
                article_img_url: article.article_img_url,
                comment_count: 0,
            },
            body: article.body,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = articles)]
pub struct NewArticle {
    pub title: String,
    pub topic: String,
    pub author: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub article_img_url: String,
}

/// One page of the filtered, sorted listing plus the size of the whole filtered set.
pub fn list(
    connection: &mut SqliteConnection,
    query: &ArticleQuery,
) -> Result<(Vec<ArticleSummary>, i64), ApiError> {
    let topic = query.topic.as_deref();
    let statement = format!(
        "{} {} LIMIT ? OFFSET ?",
        SELECT_ARTICLE_SUMMARIES,
        query.order_clause()
    );

    let page = sql_query(statement)
        .bind::<Nullable<Text>, _>(topic)
        .bind::<Nullable<Text>, _>(topic)
        .bind::<BigInt, _>(query.pagination.limit)
        .bind::<BigInt, _>(query.pagination.offset())
        .load::<ArticleSummary>(connection)?;

    let mut matching = articles::table.into_boxed();
    if let Some(topic) = topic {
        matching = matching.filter(articles::topic.eq(topic));
    }
    let total_count = matching.count().get_result::<i64>(connection)?;

    Ok((page, total_count))
}

pub fn find(connection: &mut SqliteConnection, article_id: i32) -> Result<ArticleDetail, ApiError> {
    sql_query(SELECT_ARTICLE)
        .bind::<Integer, _>(article_id)
        .get_result::<ArticleDetail>(connection)
        .optional()?
        .ok_or_else(|| ApiError::not_found("article does not exist"))
}

pub fn ensure_exists(connection: &mut SqliteConnection, article_id: i32) -> Result<(), ApiError> {
    let found = select(exists(articles::table.find(article_id))).get_result::<bool>(connection)?;
    if found {
        Ok(())
    } else {
        Err(ApiError::not_found("article does not exist"))
    }
}

/// Adds `inc_votes` in a single UPDATE so concurrent patches never lose a vote.
/// The row only matches while the sum fits in an i64.
pub fn add_votes(
    connection: &mut SqliteConnection,
    article_id: i32,
    inc_votes: i64,
) -> Result<Article, ApiError> {
    let (low, high) = vote_bounds(inc_votes);
    let updated = update(
        articles::table
            .find(article_id)
            .filter(articles::votes.between(low, high)),
    )
    .set(articles::votes.eq(articles::votes + inc_votes))
    .returning(Article::as_returning())
    .get_result(connection)
    .optional()?;

    match updated {
        Some(article) => Ok(article),
        None => {
            ensure_exists(connection, article_id)?;
            debug!("vote of {} would overflow article {}", inc_votes, article_id);
            Err(ApiError::invalid_vote())
        }
    }
}

pub fn insert(
    connection: &mut SqliteConnection,
    new_article: &NewArticle,
) -> Result<ArticleDetail, ApiError> {
    Topic::ensure_exists(connection, &new_article.topic)?;
    User::ensure_exists(connection, &new_article.author)?;

    let article = insert_into(articles::table)
        .values(new_article)
        .returning(Article::as_returning())
        .get_result(connection)?;
    info!("created article {}", article.article_id);
    Ok(article.into())
}

/// Removes the article and its comments together.
pub fn remove(connection: &mut SqliteConnection, article_id: i32) -> Result<(), ApiError> {
    connection.transaction::<_, ApiError, _>(|conn| {
        let comments_removed =
            delete(comments::table.filter(comments::article_id.eq(article_id))).execute(conn)?;
        let removed = delete(articles::table.find(article_id)).execute(conn)?;
        if removed == 0 {
            return Err(ApiError::not_found("article does not exist"));
        }
        info!(
            "deleted article {} with {} comments",
            article_id, comments_removed
        );
        Ok(())
    })
}

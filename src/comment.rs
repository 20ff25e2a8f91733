use chrono::{NaiveDateTime, Utc};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{delete as diesel_delete, insert_into, select, update};
use log::{debug, info};
use rocket::response::status::NoContent;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post};
use serde::{Deserialize, Serialize};

use crate::article::models as articles;
use crate::db::schema::comments;
use crate::db::DbConnection;
use crate::listing::Pagination;
use crate::types::*;
use crate::users::models::User;
use crate::utils::serialize_date;

#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Comment {
    pub comment_id: i32,
    pub votes: i64,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
    pub author: String,
    pub body: String,
    pub article_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = comments)]
pub struct NewComment {
    article_id: i32,
    author: String,
    body: String,
    created_at: NaiveDateTime,
}

impl Comment {
    /// Newest first. The parent is checked before the comments are read so a
    /// missing article is a 404 rather than an empty page.
    pub fn for_article(
        connection: &mut SqliteConnection,
        article_id: i32,
        pagination: Pagination,
    ) -> Result<Vec<Comment>, ApiError> {
        articles::ensure_exists(connection, article_id)?;
        comments::table
            .filter(comments::article_id.eq(article_id))
            .select(Comment::as_select())
            .order((comments::created_at.desc(), comments::comment_id.desc()))
            .limit(pagination.limit)
            .offset(pagination.offset())
            .load(connection)
            .map_err(|e| e.into())
    }

    pub fn insert(
        connection: &mut SqliteConnection,
        article_id: i32,
        draft: CommentDraft,
    ) -> Result<Comment, ApiError> {
        articles::ensure_exists(connection, article_id)?;
        User::ensure_exists(connection, &draft.username)?;

        let new_comment = NewComment {
            article_id,
            author: draft.username,
            body: draft.body,
            created_at: Utc::now().naive_utc(),
        };
        let comment = insert_into(comments::table)
            .values(&new_comment)
            .returning(Comment::as_returning())
            .get_result(connection)?;
        info!("article {} got comment {}", article_id, comment.comment_id);
        Ok(comment)
    }

    pub fn add_votes(
        connection: &mut SqliteConnection,
        comment_id: i32,
        inc_votes: i64,
    ) -> Result<Comment, ApiError> {
        let (low, high) = vote_bounds(inc_votes);
        let updated = update(
            comments::table
                .find(comment_id)
                .filter(comments::votes.between(low, high)),
        )
        .set(comments::votes.eq(comments::votes + inc_votes))
        .returning(Comment::as_returning())
        .get_result(connection)
        .optional()?;

        match updated {
            Some(comment) => Ok(comment),
            None => {
                let found = select(exists(comments::table.find(comment_id)))
                    .get_result::<bool>(connection)?;
                if !found {
                    return Err(ApiError::not_found("comment does not exist"));
                }
                debug!("vote of {} would overflow comment {}", inc_votes, comment_id);
                Err(ApiError::invalid_vote())
            }
        }
    }

    pub fn remove(connection: &mut SqliteConnection, comment_id: i32) -> Result<(), ApiError> {
        let removed = diesel_delete(comments::table.find(comment_id)).execute(connection)?;
        if removed == 0 {
            return Err(ApiError::not_found("comment does not exist"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    username: Option<String>,
    body: Option<String>,
}

/// A comment body that passed validation but has not been stored yet.
#[derive(Debug, PartialEq)]
pub struct CommentDraft {
    username: String,
    body: String,
}

impl Validate for CommentBody {
    type Output = CommentDraft;

    fn validate(self) -> Result<CommentDraft, ApiError> {
        Ok(CommentDraft {
            username: required(self.username)?,
            body: required(self.body)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CommentContainer<T> {
    comment: T,
}

#[derive(Debug, Serialize)]
pub struct CommentsContainer<T> {
    comments: T,
}

#[derive(Debug, Serialize)]
pub struct UpdatedCommentContainer<T> {
    #[serde(rename = "updatedComment")]
    updated_comment: T,
}

#[get("/<article_id>/comments?<limit>&<p>")]
pub fn list(
    mut conn: DbConnection,
    article_id: &str,
    limit: Option<&str>,
    p: Option<&str>,
) -> ApiResult<CommentsContainer<Vec<Comment>>> {
    let article_id = parse_id(article_id)?;
    let pagination = Pagination::parse(limit, p)?;
    let comments = Comment::for_article(&mut conn, article_id, pagination)?;
    Ok(Json(CommentsContainer { comments }))
}

#[post("/<article_id>/comments", data = "<details>")]
pub fn add(
    mut conn: DbConnection,
    article_id: &str,
    details: Json<CommentBody>,
) -> CreatedResult<CommentContainer<Comment>> {
    let article_id = parse_id(article_id)?;
    let draft = details.into_inner().validate()?;
    let comment = Comment::insert(&mut conn, article_id, draft)?;
    Ok(created(CommentContainer { comment }))
}

#[patch("/<comment_id>", data = "<patch>")]
pub fn vote(
    mut conn: DbConnection,
    comment_id: &str,
    patch: Json<VotePatch>,
) -> ApiResult<UpdatedCommentContainer<Comment>> {
    let comment_id = parse_id(comment_id)?;
    let inc_votes = patch.into_inner().validate()?;
    let updated_comment = Comment::add_votes(&mut conn, comment_id, inc_votes)?;
    Ok(Json(UpdatedCommentContainer { updated_comment }))
}

#[delete("/<comment_id>")]
pub fn delete(mut conn: DbConnection, comment_id: &str) -> DeletedResult {
    let comment_id = parse_id(comment_id)?;
    Comment::remove(&mut conn, comment_id)?;
    Ok(NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_body_needs_username_and_body() {
        let only_username = CommentBody {
            username: Some("butter_bridge".into()),
            body: None,
        };
        assert!(only_username.validate().is_err());

        let complete = CommentBody {
            username: Some("butter_bridge".into()),
            body: Some("first!".into()),
        };
        assert_eq!(
            complete.validate().ok(),
            Some(CommentDraft {
                username: "butter_bridge".into(),
                body: "first!".into()
            })
        );
    }
}

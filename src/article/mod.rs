use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{delete, get, patch, post};
use serde::{Deserialize, Serialize};

use crate::db::DbConnection;
use crate::listing::ArticleQuery;
use crate::topic::Topic;
use crate::types::*;

pub mod models;

use self::models::{Article, ArticleDetail, ArticleSummary, NewArticle, DEFAULT_IMAGE_URL};

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    articles: Vec<ArticleSummary>,
    total_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    article: ArticleDetail,
}

#[derive(Debug, Serialize)]
pub struct UpdatedArticleResponse {
    #[serde(rename = "updatedArticle")]
    updated_article: Article,
}

#[derive(Debug, Deserialize)]
pub struct CreateArticle {
    author: Option<String>,
    title: Option<String>,
    body: Option<String>,
    topic: Option<String>,
    article_img_url: Option<String>,
}

impl Validate for CreateArticle {
    type Output = NewArticle;

    fn validate(self) -> Result<NewArticle, ApiError> {
        let article_img_url = match self.article_img_url {
            Some(url) if !url.trim().is_empty() => url,
            _ => DEFAULT_IMAGE_URL.to_string(),
        };
        Ok(NewArticle {
            author: required(self.author)?,
            title: required(self.title)?,
            body: required(self.body)?,
            topic: required(self.topic)?,
            created_at: Utc::now().naive_utc(),
            article_img_url,
        })
    }
}

#[get("/?<topic>&<sort_by>&<order>&<limit>&<p>")]
pub fn list(
    mut connection: DbConnection,
    topic: Option<&str>,
    sort_by: Option<&str>,
    order: Option<&str>,
    limit: Option<&str>,
    p: Option<&str>,
) -> ApiResult<ArticlesResponse> {
    let query = ArticleQuery::parse(topic, sort_by, order, limit, p)?;
    if let Some(topic) = &query.topic {
        Topic::ensure_exists(&mut connection, topic)?;
    }
    let (articles, total_count) = models::list(&mut connection, &query)?;
    Ok(Json(ArticlesResponse {
        articles,
        total_count,
    }))
}

#[post("/", data = "<create>")]
pub fn create(mut connection: DbConnection, create: Json<CreateArticle>) -> CreatedResult<ArticleResponse> {
    let new_article = create.into_inner().validate()?;
    let article = models::insert(&mut connection, &new_article)?;
    Ok(created(ArticleResponse { article }))
}

#[get("/<article_id>")]
pub fn get(mut connection: DbConnection, article_id: &str) -> ApiResult<ArticleResponse> {
    let article_id = parse_id(article_id)?;
    let article = models::find(&mut connection, article_id)?;
    Ok(Json(ArticleResponse { article }))
}

#[patch("/<article_id>", data = "<patch>")]
pub fn vote(
    mut connection: DbConnection,
    article_id: &str,
    patch: Json<VotePatch>,
) -> ApiResult<UpdatedArticleResponse> {
    let article_id = parse_id(article_id)?;
    let inc_votes = patch.into_inner().validate()?;
    let updated_article = models::add_votes(&mut connection, article_id, inc_votes)?;
    Ok(Json(UpdatedArticleResponse { updated_article }))
}

#[delete("/<article_id>")]
pub fn remove(mut connection: DbConnection, article_id: &str) -> DeletedResult {
    let article_id = parse_id(article_id)?;
    models::remove(&mut connection, article_id)?;
    Ok(rocket::response::status::NoContent)
}

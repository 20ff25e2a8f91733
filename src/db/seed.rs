//! Loads a fixed dataset into a fresh set of tables.

use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::insert_into;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::info;
use serde::Deserialize;

use super::schema::{articles, comments, topics, users};
use super::{create_schema, Error, Result};

static SAMPLE_DATA: &str = include_str!("../../data/sample-data.json");

static DROP_TABLES: &str = "DROP TABLE IF EXISTS comments;
DROP TABLE IF EXISTS articles;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS topics;";

#[derive(Debug, Deserialize, Insertable)]
#[diesel(table_name = topics)]
pub struct SeedTopic {
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Insertable)]
#[diesel(table_name = users)]
pub struct SeedUser {
    pub username: String,
    pub name: String,
    pub avatar_url: String,
}

#[derive(Debug, Deserialize, Insertable)]
#[diesel(table_name = articles)]
pub struct SeedArticle {
    pub title: String,
    pub topic: String,
    pub author: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub votes: i64,
    pub article_img_url: String,
}

/// `article_id` is the 1-based position of the article in the dataset.
#[derive(Debug, Deserialize, Insertable)]
#[diesel(table_name = comments)]
pub struct SeedComment {
    pub article_id: i32,
    pub author: String,
    pub body: String,
    #[serde(default)]
    pub votes: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct SeedData {
    pub topics: Vec<SeedTopic>,
    pub users: Vec<SeedUser>,
    pub articles: Vec<SeedArticle>,
    pub comments: Vec<SeedComment>,
}

impl SeedData {
    pub fn sample() -> Result<SeedData> {
        Ok(serde_json::from_str(SAMPLE_DATA)?)
    }
}

/// Drops every table, recreates the schema and inserts `data`, all in one transaction.
pub fn seed(connection: &mut SqliteConnection, data: &SeedData) -> Result<()> {
    connection.transaction::<_, Error, _>(|conn| {
        conn.batch_execute(DROP_TABLES)?;
        create_schema(conn)?;
        for topic in &data.topics {
            insert_into(topics::table).values(topic).execute(conn)?;
        }
        for user in &data.users {
            insert_into(users::table).values(user).execute(conn)?;
        }
        for article in &data.articles {
            insert_into(articles::table).values(article).execute(conn)?;
        }
        for comment in &data.comments {
            insert_into(comments::table).values(comment).execute(conn)?;
        }
        info!(
            "seeded {} topics, {} users, {} articles, {} comments",
            data.topics.len(),
            data.users.len(),
            data.articles.len(),
            data.comments.len()
        );
        Ok(())
    })
}

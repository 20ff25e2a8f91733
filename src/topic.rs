use diesel::dsl::{exists, sql};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;
use diesel::{insert_into, select};
use rocket::serde::json::Json;
use rocket::{get, post};
use serde::{Deserialize, Serialize};

use crate::db::schema::topics;
use crate::db::DbConnection;
use crate::types::*;

#[derive(Debug, Queryable, Selectable, Insertable, Serialize, PartialEq)]
#[diesel(table_name = topics)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Topic {
    pub slug: String,
    pub description: String,
}

impl Topic {
    /// All topics in the order they were created.
    pub fn load_all(connection: &mut SqliteConnection) -> Result<Vec<Topic>, ApiError> {
        topics::table
            .select(Topic::as_select())
            .order(sql::<BigInt>("topics.rowid"))
            .load(connection)
            .map_err(|e| e.into())
    }

    pub fn ensure_exists(connection: &mut SqliteConnection, slug: &str) -> Result<(), ApiError> {
        let found = select(exists(topics::table.find(slug))).get_result::<bool>(connection)?;
        if found {
            Ok(())
        } else {
            Err(ApiError::not_found("not a valid topic"))
        }
    }

    pub fn insert(connection: &mut SqliteConnection, topic: &Topic) -> Result<Topic, ApiError> {
        insert_into(topics::table)
            .values(topic)
            .returning(Topic::as_returning())
            .get_result(connection)
            .map_err(|e| e.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTopic {
    slug: Option<String>,
    description: Option<String>,
}

impl Validate for CreateTopic {
    type Output = Topic;

    fn validate(self) -> Result<Topic, ApiError> {
        Ok(Topic {
            slug: required(self.slug)?,
            description: required(self.description)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TopicResponse {
    topic: Topic,
}

#[get("/")]
pub fn list(mut connection: DbConnection) -> ApiResult<Vec<Topic>> {
    Ok(Json(Topic::load_all(&mut connection)?))
}

#[post("/", data = "<create>")]
pub fn create(mut connection: DbConnection, create: Json<CreateTopic>) -> CreatedResult<TopicResponse> {
    let topic = create.into_inner().validate()?;
    let topic = Topic::insert(&mut connection, &topic)?;
    Ok(created(TopicResponse { topic }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;

    #[test]
    fn create_topic_requires_slug_and_description() {
        let missing = CreateTopic {
            slug: Some("dogs".into()),
            description: None,
        };
        let (status, msg) = missing.validate().err().expect("invalid").translate();
        assert_eq!(status, Status::BadRequest);
        assert_eq!(msg, "bad request");

        let complete = CreateTopic {
            slug: Some("dogs".into()),
            description: Some("Not cats".into()),
        };
        assert_eq!(
            complete.validate().ok(),
            Some(Topic {
                slug: "dogs".into(),
                description: "Not cats".into()
            })
        );
    }
}

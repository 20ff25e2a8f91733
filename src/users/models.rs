use diesel::dsl::{exists, sql};
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use diesel::sqlite::SqliteConnection;
use diesel::{insert_into, select};
use serde::Serialize;

use crate::db::schema::users;
use crate::types::ApiError;

#[derive(Debug, Queryable, Selectable, Insertable, Serialize, PartialEq)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub username: String,
    pub name: String,
    pub avatar_url: String,
}

impl User {
    pub fn load_all(connection: &mut SqliteConnection) -> Result<Vec<User>, ApiError> {
        users::table
            .select(User::as_select())
            .order(sql::<BigInt>("users.rowid"))
            .load(connection)
            .map_err(|e| e.into())
    }

    pub fn load_by_name(name: &str, connection: &mut SqliteConnection) -> Result<User, ApiError> {
        users::table
            .find(name)
            .select(User::as_select())
            .first(connection)
            .optional()?
            .ok_or_else(|| ApiError::not_found("user does not exist"))
    }

    /// Referential pre-check for anything that names an author.
    pub fn ensure_exists(connection: &mut SqliteConnection, name: &str) -> Result<(), ApiError> {
        let found = select(exists(users::table.find(name))).get_result::<bool>(connection)?;
        if found {
            Ok(())
        } else {
            Err(ApiError::not_found("user does not exist"))
        }
    }

    pub fn insert(connection: &mut SqliteConnection, user: &User) -> Result<User, ApiError> {
        insert_into(users::table)
            .values(user)
            .returning(User::as_returning())
            .get_result(connection)
            .map_err(|e| e.into())
    }
}

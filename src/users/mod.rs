use log::info;
use rocket::serde::json::Json;
use rocket::{get, post};
use serde::{Deserialize, Serialize};

use crate::db::DbConnection;
use crate::types::*;

pub mod models;

use self::models::User;

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    user: User,
}

#[derive(Debug, Deserialize)]
pub struct Registration {
    username: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
}

impl Validate for Registration {
    type Output = User;

    fn validate(self) -> Result<User, ApiError> {
        Ok(User {
            username: required(self.username)?,
            name: required(self.name)?,
            avatar_url: required(self.avatar_url)?,
        })
    }
}

#[get("/")]
pub fn list(mut connection: DbConnection) -> ApiResult<UsersResponse> {
    let users = User::load_all(&mut connection)?;
    Ok(Json(UsersResponse { users }))
}

#[get("/<username>")]
pub fn profile(mut connection: DbConnection, username: &str) -> ApiResult<UserResponse> {
    let user = User::load_by_name(username, &mut connection)?;
    Ok(Json(UserResponse { user }))
}

#[post("/", data = "<registration>")]
pub fn register(
    mut connection: DbConnection,
    registration: Json<Registration>,
) -> CreatedResult<UserResponse> {
    let user = registration.into_inner().validate()?;
    let user = User::insert(&mut connection, &user)?;
    info!("registered user {}", user.username);
    Ok(created(UserResponse { user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_needs_every_field() {
        let registration = Registration {
            username: Some("lurker".into()),
            name: Some("do_nothing".into()),
            avatar_url: Some("".into()),
        };
        assert!(registration.validate().is_err());

        let registration = Registration {
            username: Some("lurker".into()),
            name: Some("do_nothing".into()),
            avatar_url: Some("https://example.com/lurker.png".into()),
        };
        let user = registration.validate().expect("valid");
        assert_eq!(user.username, "lurker");
    }
}

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::{debug, error};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::borrow::Cow;

use crate::utils::try_respond;

/// Turns a request payload into something that can be written to the store.
/// Runs before any database access.
pub trait Validate
where
    Self: Sized,
{
    type Output;
    fn validate(self) -> Result<Self::Output, ApiError>;
}

#[derive(Debug)]
pub enum ApiError {
    Diesel(DieselError),
    Custom {
        status: Status,
        msg: Cow<'static, str>,
    },
    Internal(String),
}

impl ApiError {
    pub fn new<M: Into<Cow<'static, str>>>(status: Status, msg: M) -> Self {
        ApiError::Custom {
            status,
            msg: msg.into(),
        }
    }

    pub fn bad_request() -> Self {
        ApiError::new(Status::BadRequest, "bad request")
    }

    pub fn not_found<M: Into<Cow<'static, str>>>(msg: M) -> Self {
        ApiError::new(Status::NotFound, msg)
    }

    pub fn invalid_vote() -> Self {
        ApiError::new(Status::BadRequest, "invalid vote")
    }

    /// Status and message for the response body. Database errors are classified
    /// first, then application errors, and whatever is left becomes a 500.
    pub fn translate(&self) -> (Status, Cow<'static, str>) {
        if let ApiError::Diesel(error) = self {
            match error {
                DieselError::DatabaseError(kind, _) => match kind {
                    DatabaseErrorKind::ForeignKeyViolation
                    | DatabaseErrorKind::NotNullViolation
                    | DatabaseErrorKind::CheckViolation => {
                        return (Status::BadRequest, Cow::Borrowed("bad request"))
                    }
                    DatabaseErrorKind::UniqueViolation => {
                        return (Status::Conflict, Cow::Borrowed("already exists"))
                    }
                    _ => {}
                },
                DieselError::NotFound => return (Status::NotFound, Cow::Borrowed("not found")),
                _ => {}
            }
        }

        if let ApiError::Custom { status, msg } = self {
            return (*status, msg.clone());
        }

        error!("unhandled error: {:?}", self);
        (
            Status::InternalServerError,
            Cow::Borrowed("internal server error"),
        )
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        ApiError::Diesel(err)
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub type CreatedResult<T> = Result<status::Custom<Json<T>>, ApiError>;

pub type DeletedResult = Result<status::NoContent, ApiError>;

pub fn created<T>(value: T) -> status::Custom<Json<T>> {
    status::Custom(Status::Created, Json(value))
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let (status, msg) = self.translate();
        let body = json!({ "msg": msg });
        try_respond(req, body, status)
    }
}

/// `{ "inc_votes": n }` for articles and comments. Kept loose so that a
/// non-integer delta is reported as an invalid vote rather than a bad body.
#[derive(Debug, Deserialize)]
pub struct VotePatch {
    pub inc_votes: Option<Value>,
}

impl Validate for VotePatch {
    type Output = i64;

    fn validate(self) -> Result<i64, ApiError> {
        self.inc_votes
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(ApiError::invalid_vote)
    }
}

/// Range the stored count must lie in for `votes + inc_votes` to fit in an i64.
pub fn vote_bounds(inc_votes: i64) -> (i64, i64) {
    if inc_votes >= 0 {
        (i64::MIN, i64::MAX - inc_votes)
    } else {
        (i64::MIN - inc_votes, i64::MAX)
    }
}

/// Path identifiers are positive-or-negative integers; anything else never reaches the store.
pub fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse::<i32>().map_err(|_| {
        debug!("rejected identifier {:?}", raw);
        ApiError::bad_request()
    })
}

/// Blank strings count as missing, the way a form would treat them.
pub fn required(field: Option<String>) -> Result<String, ApiError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApiError::bad_request()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::result::DatabaseErrorInformation;

    #[derive(Debug)]
    struct Info;

    impl DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            "constraint failed"
        }
        fn details(&self) -> Option<&str> {
            None
        }
        fn hint(&self) -> Option<&str> {
            None
        }
        fn table_name(&self) -> Option<&str> {
            None
        }
        fn column_name(&self) -> Option<&str> {
            None
        }
        fn constraint_name(&self) -> Option<&str> {
            None
        }
        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn database_error(kind: DatabaseErrorKind) -> ApiError {
        ApiError::Diesel(DieselError::DatabaseError(kind, Box::new(Info)))
    }

    #[test]
    fn foreign_key_violation_is_bad_request() {
        let (status, msg) = database_error(DatabaseErrorKind::ForeignKeyViolation).translate();
        assert_eq!(status, Status::BadRequest);
        assert_eq!(msg, "bad request");
    }

    #[test]
    fn unique_violation_is_conflict() {
        let (status, msg) = database_error(DatabaseErrorKind::UniqueViolation).translate();
        assert_eq!(status, Status::Conflict);
        assert_eq!(msg, "already exists");
    }

    #[test]
    fn custom_errors_keep_status_and_message() {
        let (status, msg) = ApiError::not_found("article does not exist").translate();
        assert_eq!(status, Status::NotFound);
        assert_eq!(msg, "article does not exist");
    }

    #[test]
    fn unclassified_errors_are_internal() {
        let (status, msg) = ApiError::Diesel(DieselError::RollbackTransaction).translate();
        assert_eq!(status, Status::InternalServerError);
        assert_eq!(msg, "internal server error");

        let (status, _) = ApiError::Internal("boom".into()).translate();
        assert_eq!(status, Status::InternalServerError);
    }

    #[test]
    fn parse_id_rejects_malformed_identifiers() {
        assert_eq!(parse_id("7").ok(), Some(7));
        assert_eq!(parse_id("-3").ok(), Some(-3));
        for raw in &["not-an-article", "1.5", "", "99999999999", " 7", "7 "] {
            let (status, msg) = parse_id(raw).err().expect("should fail").translate();
            assert_eq!(status, Status::BadRequest);
            assert_eq!(msg, "bad request");
        }
    }

    #[test]
    fn vote_patch_accepts_only_integers() {
        let delta = |body: Value| serde_json::from_value::<VotePatch>(body).map(|p| p.validate());
        assert_eq!(delta(json!({ "inc_votes": -200 })).ok().and_then(|r| r.ok()), Some(-200));
        for body in vec![
            json!({ "inc_votes": "ten" }),
            json!({ "inc_votes": 1.5 }),
            json!({ "inc_votes": null }),
            json!({}),
        ] {
            let (status, msg) = delta(body)
                .expect("deserializes")
                .err()
                .expect("invalid")
                .translate();
            assert_eq!(status, Status::BadRequest);
            assert_eq!(msg, "invalid vote");
        }
    }

    #[test]
    fn vote_bounds_keep_the_sum_in_range() {
        assert_eq!(vote_bounds(0), (i64::MIN, i64::MAX));
        assert_eq!(vote_bounds(5), (i64::MIN, i64::MAX - 5));
        assert_eq!(vote_bounds(-5), (i64::MIN + 5, i64::MAX));
        assert_eq!(vote_bounds(i64::MIN), (0, i64::MAX));
        assert_eq!(vote_bounds(i64::MAX), (i64::MIN, 0));
    }

    #[test]
    fn required_treats_blank_as_missing() {
        assert_eq!(required(Some("x".into())).ok(), Some("x".to_string()));
        assert!(required(Some("   ".into())).is_err());
        assert!(required(None).is_err());
    }
}

use rocket::get;
use rocket::serde::json::Json;
use serde_json::Value;

use crate::types::{ApiError, ApiResult};

static ENDPOINTS_JSON: &str = include_str!("../endpoints.json");

lazy_static! {
    static ref ENDPOINTS: Result<Value, String> =
        serde_json::from_str(ENDPOINTS_JSON).map_err(|e| e.to_string());
}

/// `GET /api`: describes every route the server offers.
#[get("/")]
pub fn index() -> ApiResult<Value> {
    match &*ENDPOINTS {
        Ok(endpoints) => Ok(Json(endpoints.clone())),
        Err(e) => Err(ApiError::Internal(format!("endpoint catalogue: {}", e))),
    }
}

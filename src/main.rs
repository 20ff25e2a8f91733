#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;

mod api;
mod article;
mod comment;
mod db;
mod listing;
mod topic;
mod types;
mod users;
mod utils;


use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::request::Request;
use rocket::serde::json::{json, Value};
use rocket::{catch, catchers, routes, Build, Rocket};

#[catch(404)]
fn not_found(_req: &Request) -> Value {
    json!({ "msg": "path not found" })
}

// Bodies that are not JSON, or JSON of the wrong shape.
#[catch(400)]
fn bad_request(_req: &Request) -> Value {
    json!({ "msg": "bad request" })
}

#[catch(422)]
fn unprocessable(_req: &Request) -> (Status, Value) {
    (Status::BadRequest, json!({ "msg": "bad request" }))
}

#[catch(500)]
fn internal_error(_req: &Request) -> Value {
    json!({ "msg": "internal server error" })
}

#[catch(default)]
fn fallback(status: Status, _req: &Request) -> Value {
    let msg = match status.code {
        503 => "service unavailable",
        _ => status.reason().unwrap_or("internal server error"),
    };
    json!({ "msg": msg.to_lowercase() })
}

pub fn app(pool: db::Pool) -> Rocket<Build> {
    rocket::build()
        .manage(pool)
        .attach(AdHoc::try_on_ignite("Database Schema", db::prepare))
        .mount("/api", routes![api::index])
        .mount("/api/topics", routes![topic::list, topic::create])
        .mount(
            "/api/articles",
            routes![
                article::list,
                article::create,
                article::get,
                article::vote,
                article::remove,
                comment::list,
                comment::add
            ],
        )
        .mount("/api/comments", routes![comment::vote, comment::delete])
        .mount(
            "/api/users",
            routes![users::list, users::profile, users::register],
        )
        .register(
            "/",
            catchers![not_found, bad_request, unprocessable, internal_error, fallback],
        )
}

#[rocket::main]
async fn main() -> Result<(), rocket::Error> {
    let pool = db::init_pool().expect("Failed to create database pool");
    let _rocket = app(pool).launch().await?;
    Ok(())
}

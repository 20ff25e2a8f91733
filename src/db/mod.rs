use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection};
use diesel::result::Error as DieselError;
use diesel::sqlite::SqliteConnection;
use dotenv::dotenv;
use log::{error, info};
use rocket::http::Status;
use rocket::outcome::{try_outcome, Outcome};
use rocket::request::{self, FromRequest};
use rocket::{Build, Request, Rocket, State};
use std::env;
use std::ops::{Deref, DerefMut};

pub mod schema;
pub mod seed;

static SCHEMA: &str = include_str!("schema.sql");

const DEFAULT_POOL_SIZE: u32 = 10;

// An alias to the type for a pool of Diesel SQLite connections.
pub type Pool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub struct DbConnection(pub r2d2::PooledConnection<ConnectionManager<SqliteConnection>>);

error_chain! {
    foreign_links {
        Var(::std::env::VarError);
        R2D2(r2d2::Error);
        Diesel(DieselError);
        Json(::serde_json::Error);
    }

    errors {
        PoolSize(value: String) {
            description("invalid pool size")
            display("invalid DATABASE_POOL_SIZE: '{}'", value)
        }
    }
}

/// Attempts to retrieve a single connection from the managed database pool. If
/// no pool is currently managed, fails with an `InternalServerError` status. If
/// no connections are available, fails with a `ServiceUnavailable` status.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConnection {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<DbConnection, ()> {
        let pool = try_outcome!(request.guard::<&State<Pool>>().await);
        match pool.get() {
            Ok(conn) => Outcome::Success(DbConnection(conn)),
            Err(e) => {
                error!("could not check out a database connection: {}", e);
                Outcome::Error((Status::ServiceUnavailable, ()))
            }
        }
    }
}

// For the convenience of using a &mut DbConnection as a &mut SqliteConnection.
impl Deref for DbConnection {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for DbConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Applied to every connection the pool hands out; SQLite keeps these per connection.
#[derive(Debug)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> ::std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn init_pool() -> Result<Pool> {
    dotenv().ok();
    let database_url = env::var("DATABASE_URL")?;
    let pool_size = match env::var("DATABASE_POOL_SIZE") {
        Ok(value) => value
            .trim()
            .parse::<u32>()
            .map_err(|_| Error::from(ErrorKind::PoolSize(value.clone())))?,
        Err(env::VarError::NotPresent) => DEFAULT_POOL_SIZE,
        Err(e) => return Err(e.into()),
    };
    connect(&database_url, pool_size)
}

pub fn connect(database_url: &str, pool_size: u32) -> Result<Pool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .max_size(pool_size)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)?;
    Ok(pool)
}

pub fn create_schema(connection: &mut SqliteConnection) -> Result<()> {
    connection.batch_execute(SCHEMA)?;
    Ok(())
}

pub fn seed_requested() -> bool {
    match env::var("SEED_DATABASE") {
        Ok(value) => matches!(value.trim(), "1" | "true" | "yes"),
        Err(_) => false,
    }
}

/// Ignite step: makes sure the tables exist and, when asked to, loads the sample dataset.
pub async fn prepare(rocket: Rocket<Build>) -> ::std::result::Result<Rocket<Build>, Rocket<Build>> {
    let outcome = rocket.state::<Pool>().map(|pool| {
        let mut conn = pool.get()?;
        create_schema(&mut conn)?;
        if seed_requested() {
            let data = seed::SeedData::sample()?;
            seed::seed(&mut conn, &data)?;
            info!("database seeded with sample data");
        }
        Ok::<(), Error>(())
    });

    match outcome {
        Some(Ok(())) => {
            info!("database schema ready");
            Ok(rocket)
        }
        Some(Err(e)) => {
            error!("database preparation failed: {}", e);
            Err(rocket)
        }
        None => {
            error!("no database pool is managed");
            Err(rocket)
        }
    }
}

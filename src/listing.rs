//! Query-string handling shared by the article and comment listings.
//!
//! Every value that ends up in an ORDER BY clause comes from one of the enums
//! below, so user input never reaches the SQL text.

use log::debug;

use crate::types::ApiError;

pub const DEFAULT_LIMIT: i64 = 10;
pub const DEFAULT_PAGE: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    CreatedAt,
    Votes,
    CommentCount,
    ArticleId,
}

impl SortBy {
    pub fn parse(raw: Option<&str>) -> Result<SortBy, ApiError> {
        match raw {
            None => Ok(SortBy::CreatedAt),
            Some("created_at") => Ok(SortBy::CreatedAt),
            Some("votes") => Ok(SortBy::Votes),
            Some("comment_count") => Ok(SortBy::CommentCount),
            Some("article_id") => Ok(SortBy::ArticleId),
            Some(other) => {
                debug!("rejected sort_by {:?}", other);
                Err(ApiError::bad_request())
            }
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortBy::CreatedAt => "articles.created_at",
            SortBy::Votes => "articles.votes",
            SortBy::CommentCount => "comment_count",
            SortBy::ArticleId => "articles.article_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    /// Case-sensitive; absent means descending.
    pub fn parse(raw: Option<&str>) -> Result<Order, ApiError> {
        match raw {
            None | Some("desc") => Ok(Order::Desc),
            Some("asc") => Ok(Order::Asc),
            Some(other) => {
                debug!("rejected order {:?}", other);
                Err(ApiError::bad_request())
            }
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// A 1-based page of `limit` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub page: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            limit: DEFAULT_LIMIT,
            page: DEFAULT_PAGE,
        }
    }
}

impl Pagination {
    pub fn parse(limit: Option<&str>, page: Option<&str>) -> Result<Pagination, ApiError> {
        let pagination = Pagination {
            limit: positive(limit, DEFAULT_LIMIT)?,
            page: positive(page, DEFAULT_PAGE)?,
        };
        // the offset has to fit as well
        pagination.checked_offset().ok_or_else(ApiError::bad_request)?;
        Ok(pagination)
    }

    fn checked_offset(&self) -> Option<i64> {
        (self.page - 1).checked_mul(self.limit)
    }

    pub fn offset(&self) -> i64 {
        self.checked_offset().unwrap_or(i64::MAX)
    }
}

fn positive(raw: Option<&str>, default: i64) -> Result<i64, ApiError> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(default),
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => {
            debug!("rejected page parameter {:?}", raw);
            Err(ApiError::bad_request())
        }
    }
}

/// `?topic=` and friends mean the same as leaving the parameter out.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.is_empty())
}

/// Parsed `GET /api/articles` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub topic: Option<String>,
    pub sort_by: SortBy,
    pub order: Order,
    pub pagination: Pagination,
}

impl ArticleQuery {
    pub fn parse(
        topic: Option<&str>,
        sort_by: Option<&str>,
        order: Option<&str>,
        limit: Option<&str>,
        page: Option<&str>,
    ) -> Result<ArticleQuery, ApiError> {
        Ok(ArticleQuery {
            topic: present(topic).map(str::to_owned),
            sort_by: SortBy::parse(present(sort_by))?,
            order: Order::parse(present(order))?,
            pagination: Pagination::parse(limit, page)?,
        })
    }

    /// Ties on the sort key fall back to article_id in the same direction.
    pub fn order_clause(&self) -> String {
        let direction = self.order.keyword();
        format!(
            "ORDER BY {} {}, articles.article_id {}",
            self.sort_by.column(),
            direction,
            direction
        )
    }
}

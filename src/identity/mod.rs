//! Visitor identity resolution
//!
//! Every browser carries an opaque visitor id in the `vid` cookie. A request
//! without one gets a fresh UUID v4; a request with one keeps it, and the ledger
//! is asked whether it has seen that id before. The cookie value is never
//! validated beyond "present and non-empty".

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::ledger::{Ledger, LedgerResult};

pub const VISITOR_COOKIE: &str = "vid";

/// One year
pub const VISITOR_COOKIE_MAX_AGE_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVisitor {
    pub id: String,
    /// The ledger has no record of this id. The ledger's own `is_new` from
    /// `record_visit` stays authoritative under concurrency.
    pub is_new_candidate: bool,
}

/// Derive the visitor id for a request
pub async fn resolve_visitor(jar: &CookieJar, ledger: &dyn Ledger) -> LedgerResult<ResolvedVisitor> {
    let existing = jar
        .get(VISITOR_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.trim().is_empty());

    match existing {
        None => Ok(ResolvedVisitor {
            id: Uuid::new_v4().to_string(),
            is_new_candidate: true,
        }),
        Some(id) => {
            let known = ledger.find_visitor(id).await?.is_some();
            if !known {
                tracing::info!(visitor_id = id, "visitor cookie has no ledger record, treating as new");
            }

            Ok(ResolvedVisitor {
                id: id.to_string(),
                is_new_candidate: !known,
            })
        }
    }
}

/// Cookie carrying the visitor id back to the browser. Readable from scripts.
pub fn visitor_cookie(visitor_id: String) -> Cookie<'static> {
    Cookie::build((VISITOR_COOKIE, visitor_id))
        .path("/")
        .same_site(SameSite::Lax)
        .http_only(false)
        .max_age(time::Duration::days(VISITOR_COOKIE_MAX_AGE_DAYS))
        .build()
}

//! Gateway-supplied identity for HTTP handlers.
//!
//! The upstream gateway authenticates the caller and forwards the user id
//! and role in request headers. [`AuthenticatedActor`] turns those headers
//! into a domain [`Actor`] so handlers never read raw headers themselves.

use actix_web::{FromRequest, HttpRequest, dev::Payload};
use futures_util::future::{Ready, ready};
use tracing::debug;

use crate::domain::{Actor, Error, UserId, UserRole};

/// Header carrying the authenticated user's UUID.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Extractor yielding the acting user or `401 Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedActor(pub Actor);

impl AuthenticatedActor {
    pub fn actor(&self) -> Actor {
        self.0
    }

    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }

    /// Require the administrator role or return `403 Forbidden`.
    pub fn require_admin(&self) -> Result<Actor, Error> {
        if self.0.is_admin() {
            Ok(self.0)
        } else {
            Err(Error::forbidden("administrator role required"))
        }
    }
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn actor_from_headers(req: &HttpRequest) -> Result<Actor, Error> {
    let raw_id = header(req, USER_ID_HEADER).ok_or_else(|| Error::unauthorized("login required"))?;
    let user_id = UserId::new(raw_id).map_err(|err| {
        debug!(error = %err, "rejecting malformed user id header");
        Error::unauthorized("login required")
    })?;
    let role = match header(req, USER_ROLE_HEADER) {
        Some(raw) => raw.parse::<UserRole>().map_err(|err| {
            debug!(error = %err, "rejecting unknown role header");
            Error::unauthorized("login required")
        })?,
        None => UserRole::Student,
    };
    Ok(Actor::new(user_id, role))
}

impl FromRequest for AuthenticatedActor {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(actor_from_headers(req).map(AuthenticatedActor))
    }
}

// src/utils/gate.rs

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{CookieJar, cookie::Cookie};

use crate::{
    error::AppError,
    utils::session::{LOGIN_PATH, Session, SessionError, TOKEN_COOKIE},
};

/// Who may reach a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Sign-in pages; signed-in users are sent home instead.
    GuestOnly,
    /// Page routes for any signed-in user.
    Member,
    /// Page routes for admins.
    Staff,
    /// JSON routes for any signed-in user.
    MemberApi,
    /// JSON routes for admins.
    StaffApi,
}

/// Outcome of the gate for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
    Reject(StatusCode),
}

/// `true` when `path` is `prefix` or lies below it.
fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub fn classify(path: &str) -> Access {
    if under(path, "/api/admin") {
        Access::StaffApi
    } else if under(path, "/api") {
        Access::MemberApi
    } else if under(path, "/dashboard") {
        Access::Staff
    } else if under(path, "/user-dashboard") {
        Access::Member
    } else if under(path, "/login") || under(path, "/register") {
        Access::GuestOnly
    } else {
        Access::Public
    }
}

pub fn decide(path: &str, session: &Result<Session, SessionError>) -> GateDecision {
    let role = session.as_ref().ok().map(Session::role);

    match (classify(path), role) {
        (Access::Public, _) => GateDecision::Allow,

        (Access::GuestOnly, None) => GateDecision::Allow,
        (Access::GuestOnly, Some(role)) => GateDecision::Redirect(role.home_path()),

        (Access::Member | Access::Staff, None) => GateDecision::Redirect(LOGIN_PATH),
        (Access::Member, Some(role)) if role.is_staff() => GateDecision::Redirect(role.home_path()),
        (Access::Member, Some(_)) => GateDecision::Allow,
        (Access::Staff, Some(role)) if role.is_staff() => GateDecision::Allow,
        (Access::Staff, Some(role)) => GateDecision::Redirect(role.home_path()),

        (Access::MemberApi | Access::StaffApi, None) => {
            GateDecision::Reject(StatusCode::UNAUTHORIZED)
        }
        (Access::MemberApi, Some(_)) => GateDecision::Allow,
        (Access::StaffApi, Some(role)) if role.is_staff() => GateDecision::Allow,
        (Access::StaffApi, Some(_)) => GateDecision::Reject(StatusCode::FORBIDDEN),
    }
}

/// Axum Middleware: Route gate.
///
/// Decodes the session once, redirects or rejects according to [`decide`],
/// and injects the `Session` into the request extensions for handlers.
/// A stale or broken token cookie is cleared on the way to the login page.
pub async fn route_gate(jar: CookieJar, mut req: Request<Body>, next: Next) -> Response {
    let session = Session::from_request(&jar, req.headers());
    let path = req.uri().path().to_string();

    match decide(&path, &session) {
        GateDecision::Allow => {
            if let Ok(session) = session {
                req.extensions_mut().insert(session);
            }
            next.run(req).await
        }
        GateDecision::Redirect(target) => {
            tracing::debug!(%path, to = target, "Route gate redirect");
            match session {
                Err(SessionError::Expired | SessionError::Malformed(_)) => {
                    let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/"));
                    (jar, Redirect::temporary(target)).into_response()
                }
                _ => Redirect::temporary(target).into_response(),
            }
        }
        GateDecision::Reject(status) => {
            let user_id = session.as_ref().ok().and_then(Session::user_id);
            tracing::debug!(%path, %status, user_id, "Route gate rejected request");
            let message = match &session {
                Err(err) => err.to_string(),
                Ok(_) => "Admin access required".to_string(),
            };
            if status == StatusCode::FORBIDDEN {
                AppError::Forbidden(message).into_response()
            } else {
                AppError::AuthError(message).into_response()
            }
        }
    }
}

//! Role guard for back-office screens.
//!
//! Each guarded request runs the same small state machine:
//!
//! ```text
//! Unknown --(no token)---------------------------> Denied { from }
//! Unknown --(role lookup ok, role present)-------> Allowed { roles }
//! Unknown --(lookup error, or role missing)------> Denied { from }
//! ```
//!
//! Roles are looked up fresh on every request (`GET /api/user-info/`) and
//! matched case-insensitively. Nothing is retried: any lookup failure denies.
//! A denial redirects home with the attempted location in `?from=`.

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use bindery_core::{Role, RoleSet};

use crate::api::ApiResult;
use crate::error::AppError;
use crate::middleware::auth::Shopper;
use crate::state::AppState;

/// Where a guarded request stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// Role lookup not yet resolved; nothing protected may render.
    Unknown { from: String },
    /// Redirect home, remembering the attempted location.
    Denied { from: String },
    /// Render the protected screen.
    Allowed { roles: RoleSet },
}

impl GuardState {
    /// Initial state for a request to `from`.
    #[must_use]
    pub fn start(has_token: bool, from: impl Into<String>) -> Self {
        let from = from.into();
        if has_token {
            Self::Unknown { from }
        } else {
            Self::Denied { from }
        }
    }

    /// Apply the role lookup. Only `Unknown` moves; other states are final.
    #[must_use]
    pub fn resolve(self, lookup: ApiResult<RoleSet>, required: Role) -> Self {
        let Self::Unknown { from } = self else {
            return self;
        };

        match lookup {
            Ok(roles) if roles.contains(required) => Self::Allowed { roles },
            Ok(_) => Self::Denied { from },
            Err(e) => {
                tracing::warn!(error = %e, required = %required, "Role lookup failed; denying");
                Self::Denied { from }
            }
        }
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }
}

/// Redirect target for a denied request.
#[must_use]
pub fn denied_location(from: &str) -> String {
    format!("/?from={}", urlencoding::encode(from))
}

/// Marker for the role a screen requires, and where its screens are mounted.
pub trait RequiredRole: Send + Sync + 'static {
    const ROLE: Role;
    const BASE_PATH: &'static str;
}

/// Role markers.
pub mod roles {
    use super::{RequiredRole, Role};

    pub struct ProductManager;
    pub struct SalesManager;
    pub struct Admin;

    impl RequiredRole for ProductManager {
        const ROLE: Role = Role::ProductManager;
        const BASE_PATH: &'static str = "/product-manager";
    }

    impl RequiredRole for SalesManager {
        const ROLE: Role = Role::SalesManager;
        const BASE_PATH: &'static str = "/sales-manager";
    }

    impl RequiredRole for Admin {
        const ROLE: Role = Role::Admin;
        const BASE_PATH: &'static str = "/admin";
    }
}

/// Extractor that only succeeds once the guard reaches `Allowed` for `R`.
pub struct RequireRole<R> {
    pub shopper: Shopper,
    pub roles: RoleSet,
    _role: PhantomData<fn() -> R>,
}

/// Rejection for [`RequireRole`].
pub enum GuardRejection {
    Denied { from: String },
    Failed(AppError),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Denied { from } => Redirect::to(&denied_location(&from)).into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

impl<S, R> FromRequestParts<S> for RequireRole<R>
where
    R: RequiredRole,
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Nested routers see a stripped URI; report the one the browser asked for.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);
        let from = uri
            .path_and_query()
            .map_or_else(|| uri.path().to_string(), |pq| pq.as_str().to_string());

        let shopper = Shopper::from_request_parts(parts, state)
            .await
            .map_err(GuardRejection::Failed)?;

        let mut guard = GuardState::start(shopper.session.access_token().is_some(), from);
        if guard.is_unknown() {
            let lookup = shopper
                .ctx
                .api()
                .user_info()
                .await
                .map(|info| info.role_set());
            guard = guard.resolve(lookup, R::ROLE);
        }

        match guard {
            GuardState::Allowed { roles } => Ok(Self {
                shopper,
                roles,
                _role: PhantomData,
            }),
            GuardState::Denied { from } | GuardState::Unknown { from } => {
                tracing::info!(required = %R::ROLE, from = %from, "Guarded route denied");
                Err(GuardRejection::Denied { from })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::api::ApiError;

    fn roles(names: &[&str]) -> RoleSet {
        RoleSet::from_names(names)
    }

    #[test]
    fn test_no_token_denies_immediately() {
        let state = GuardState::start(false, "/product-manager/products");
        assert_eq!(
            state,
            GuardState::Denied {
                from: "/product-manager/products".to_string()
            }
        );
    }

    #[test]
    fn test_token_starts_unknown() {
        assert!(GuardState::start(true, "/admin").is_unknown());
    }

    #[test]
    fn test_role_present_case_insensitive_allows() {
        let state = GuardState::start(true, "/sales-manager/discounts")
            .resolve(Ok(roles(&["Customer", "SALES MANAGER"])), Role::SalesManager);
        assert!(matches!(state, GuardState::Allowed { .. }));
    }

    #[test]
    fn test_role_missing_denies() {
        let state = GuardState::start(true, "/admin")
            .resolve(Ok(roles(&["customer", "product manager"])), Role::Admin);
        assert_eq!(
            state,
            GuardState::Denied {
                from: "/admin".to_string()
            }
        );
    }

    #[test]
    fn test_lookup_error_denies() {
        let err = ApiError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "boom".to_string(),
        };
        let state = GuardState::start(true, "/admin").resolve(Err(err), Role::Admin);
        assert!(matches!(state, GuardState::Denied { .. }));
    }

    #[test]
    fn test_resolve_does_not_leave_denied() {
        let state = GuardState::start(false, "/admin").resolve(Ok(roles(&["admin"])), Role::Admin);
        assert!(matches!(state, GuardState::Denied { .. }));
    }

    #[test]
    fn test_denied_location_encodes_from() {
        assert_eq!(
            denied_location("/admin/orders?page=2"),
            "/?from=%2Fadmin%2Forders%3Fpage%3D2"
        );
    }
}

//! Client-side route guards.
//!
//! Guards only decide what the client shows. The backend still checks every
//! request on its own.

use std::fmt;

use erpdesk_auth::Role;

use crate::session::Session;

/// Client routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Dashboard,
    Profile,
}

impl Route {
    pub const ALL: [Route; 3] = [Route::Login, Route::Dashboard, Route::Profile];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/",
            Route::Dashboard => "/dashboard",
            Route::Profile => "/profile",
        }
    }

    /// Parse a client path. A trailing slash is ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        Route::ALL.into_iter().find(|route| route.path() == normalized)
    }

    /// Where a signed-in user of `role` lands.
    pub fn home_for(role: Role) -> Route {
        if role.is_staff() {
            Route::Dashboard
        } else {
            Route::Profile
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of a single guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Session restore is still running; show a placeholder.
    Placeholder,
    Redirect(Route),
    Render,
}

pub trait RouteGuard: Send + Sync {
    fn check(&self, session: &Session) -> Navigation;
}

/// Requires a signed-in user whose role is in `allowed_roles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRoute {
    pub allowed_roles: Vec<Role>,
}

impl ProtectedRoute {
    pub fn new(allowed_roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: allowed_roles.into_iter().collect(),
        }
    }
}

impl RouteGuard for ProtectedRoute {
    fn check(&self, session: &Session) -> Navigation {
        if session.is_loading() {
            return Navigation::Placeholder;
        }
        match session.role() {
            None => Navigation::Redirect(Route::Login),
            Some(role) if !self.allowed_roles.contains(&role) => {
                Navigation::Redirect(Route::home_for(role))
            }
            Some(_) => Navigation::Render,
        }
    }
}

/// Only for signed-out users; signed-in users go to their home route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicRoute;

impl RouteGuard for PublicRoute {
    fn check(&self, session: &Session) -> Navigation {
        if session.is_loading() {
            return Navigation::Placeholder;
        }
        match session.role() {
            Some(role) => Navigation::Redirect(Route::home_for(role)),
            None => Navigation::Render,
        }
    }
}

/// Final answer of [`Router::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    Render(Route),
    NotFound,
}

const MAX_REDIRECTS: usize = 4;

/// Route table: each route with the guard that protects it.
pub struct Router {
    routes: Vec<(Route, Box<dyn RouteGuard>)>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder { routes: Vec::new() }
    }

    /// `/` is public, `/dashboard` is for staff, `/profile` for employees.
    pub fn standard() -> Self {
        Router::builder()
            .route(Route::Login, PublicRoute)
            .route(Route::Dashboard, ProtectedRoute::new([Role::Admin, Role::Manager]))
            .route(Route::Profile, ProtectedRoute::new([Role::Employee]))
            .build()
    }

    fn guard(&self, route: Route) -> Option<&dyn RouteGuard> {
        self.routes
            .iter()
            .find(|(r, _)| *r == route)
            .map(|(_, guard)| guard.as_ref())
    }

    /// Run the guards starting at `path`, following redirects.
    pub fn resolve(&self, path: &str, session: &Session) -> Resolution {
        let Some(mut route) = Route::from_path(path) else {
            return Resolution::NotFound;
        };

        for _ in 0..=MAX_REDIRECTS {
            let Some(guard) = self.guard(route) else {
                return Resolution::NotFound;
            };
            match guard.check(session) {
                Navigation::Placeholder => return Resolution::Pending,
                Navigation::Render => return Resolution::Render(route),
                Navigation::Redirect(next) => {
                    tracing::debug!(from = %route, to = %next, "route redirect");
                    route = next;
                }
            }
        }

        tracing::warn!(path, "redirect loop in route table");
        Resolution::NotFound
    }
}

pub struct RouterBuilder {
    routes: Vec<(Route, Box<dyn RouteGuard>)>,
}

impl RouterBuilder {
    /// Register `route`. A later registration replaces an earlier one.
    pub fn route(mut self, route: Route, guard: impl RouteGuard + 'static) -> Self {
        self.routes.retain(|(r, _)| *r != route);
        self.routes.push((route, Box::new(guard)));
        self
    }

    pub fn build(self) -> Router {
        Router {
            routes: self.routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erpdesk_auth::User;
    use erpdesk_core::UserId;

    fn signed_in(role: Role) -> Session {
        Session::resolved(Some(User {
            id: UserId::new(7),
            username: "someone".into(),
            email: "someone@erp.local".into(),
            first_name: "Some".into(),
            last_name: "One".into(),
            role,
        }))
    }

    #[test]
    fn paths_round_trip_and_ignore_trailing_slash() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(Route::from_path(""), Some(Route::Login));
        assert_eq!(Route::from_path("/reports"), None);
    }

    #[test]
    fn staff_land_on_dashboard_and_employees_on_profile() {
        assert_eq!(Route::home_for(Role::Admin), Route::Dashboard);
        assert_eq!(Route::home_for(Role::Manager), Route::Dashboard);
        assert_eq!(Route::home_for(Role::Employee), Route::Profile);
    }

    #[test]
    fn protected_route_decisions() {
        let guard = ProtectedRoute::new([Role::Employee]);
        assert_eq!(guard.check(&Session::loading()), Navigation::Placeholder);
        assert_eq!(
            guard.check(&Session::resolved(None)),
            Navigation::Redirect(Route::Login)
        );
        assert_eq!(
            guard.check(&signed_in(Role::Manager)),
            Navigation::Redirect(Route::Dashboard)
        );
        assert_eq!(guard.check(&signed_in(Role::Employee)), Navigation::Render);
    }

    #[test]
    fn public_route_decisions() {
        assert_eq!(PublicRoute.check(&Session::loading()), Navigation::Placeholder);
        assert_eq!(PublicRoute.check(&Session::resolved(None)), Navigation::Render);
        assert_eq!(
            PublicRoute.check(&signed_in(Role::Employee)),
            Navigation::Redirect(Route::Profile)
        );
    }

    #[test]
    fn router_sends_each_role_home() {
        let router = Router::standard();

        assert_eq!(
            router.resolve("/profile", &signed_in(Role::Manager)),
            Resolution::Render(Route::Dashboard)
        );
        assert_eq!(
            router.resolve("/dashboard", &signed_in(Role::Employee)),
            Resolution::Render(Route::Profile)
        );
        for role in Role::ALL {
            assert_eq!(
                router.resolve("/", &signed_in(role)),
                Resolution::Render(Route::home_for(role))
            );
        }
    }

    #[test]
    fn router_handles_signed_out_and_loading() {
        let router = Router::standard();
        assert_eq!(
            router.resolve("/dashboard", &Session::resolved(None)),
            Resolution::Render(Route::Login)
        );
        assert_eq!(router.resolve("/profile", &Session::loading()), Resolution::Pending);
        assert_eq!(router.resolve("/nope", &Session::resolved(None)), Resolution::NotFound);
    }

    #[test]
    fn redirect_loops_are_cut_off() {
        // Nobody may see the dashboard, yet it is the admin's home.
        let router = Router::builder()
            .route(Route::Dashboard, ProtectedRoute::new(Vec::new()))
            .build();
        assert_eq!(
            router.resolve("/dashboard", &signed_in(Role::Admin)),
            Resolution::NotFound
        );
    }
}

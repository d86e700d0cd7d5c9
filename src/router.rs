//! Radix-tree request router.
//!
//! One tree per HTTP method, plus an optional per-method fallback that takes
//! every path the tree does not know. The static site uses fallbacks for file
//! serving (GET) and form forwarding (POST).

use std::collections::HashMap;

use matchit::Router as MatchitRouter;

use crate::endpoint::Endpoint;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::site::Site;

/// What the router decided for one request.
pub(crate) enum Route {
    Matched(Endpoint),
    /// The method has routes, but none for this path.
    NotFound,
    /// Nothing is registered for the method at all.
    UnsupportedMethod,
}

/// The site plus its routing table.
///
/// Build it once at startup (usually through [`Site::into_router`]) and pass
/// it to [`Server::serve_with_shutdown`](crate::Server::serve_with_shutdown).
/// Each registration returns `self` so calls chain.
pub struct Router {
    site: Site,
    routes: HashMap<Method, MatchitRouter<Endpoint>>,
    fallbacks: HashMap<Method, Endpoint>,
}

impl Router {
    pub fn new(site: Site) -> Self {
        Self { site, routes: HashMap::new(), fallbacks: HashMap::new() }
    }

    /// Register an endpoint for a method + path pair.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered. Routes are fixed at startup, so this is a programming error.
    pub fn on(mut self, method: Method, path: &str, endpoint: Endpoint) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, endpoint)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Register the endpoint used for `method` when no route matches the path.
    pub fn fallback(mut self, method: Method, endpoint: Endpoint) -> Self {
        self.fallbacks.insert(method, endpoint);
        self
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Route {
        if let Some(matched) = self.routes.get(&method).and_then(|tree| tree.at(path).ok()) {
            return Route::Matched(*matched.value);
        }

        match self.fallbacks.get(&method) {
            Some(endpoint) => Route::Matched(*endpoint),
            None if self.routes.contains_key(&method) => Route::NotFound,
            None => Route::UnsupportedMethod,
        }
    }

    pub(crate) async fn call(&self, endpoint: Endpoint, req: Request) -> Response {
        endpoint.call(&self.site, &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::DatagramSender;

    async fn router() -> Router {
        let channel = DatagramSender::bind("127.0.0.1:9".parse().unwrap()).await.unwrap();
        Router::new(Site::new("static", channel))
    }

    fn matched(route: Route) -> Option<Endpoint> {
        match route {
            Route::Matched(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    #[tokio::test]
    async fn static_route_then_fallback() {
        let router = router().await
            .on(Method::Get, "/", Endpoint::Document("index.html"))
            .on(Method::Get, "/message", Endpoint::Document("message.html"))
            .fallback(Method::Get, Endpoint::File);

        assert_eq!(matched(router.lookup(Method::Get, "/")), Some(Endpoint::Document("index.html")));
        assert_eq!(matched(router.lookup(Method::Get, "/message")), Some(Endpoint::Document("message.html")));
        assert_eq!(matched(router.lookup(Method::Get, "/style.css")), Some(Endpoint::File));
        assert_eq!(matched(router.lookup(Method::Get, "/message/extra")), Some(Endpoint::File));
    }

    #[tokio::test]
    async fn missing_path_without_fallback_is_not_found() {
        let router = router().await.on(Method::Get, "/", Endpoint::Document("index.html"));
        assert!(matches!(router.lookup(Method::Get, "/nope"), Route::NotFound));
    }

    #[tokio::test]
    async fn unregistered_method_is_unsupported() {
        let router = router().await.fallback(Method::Post, Endpoint::Forward);
        assert_eq!(matched(router.lookup(Method::Post, "/anything")), Some(Endpoint::Forward));
        assert!(matches!(router.lookup(Method::Put, "/"), Route::UnsupportedMethod));
    }
}

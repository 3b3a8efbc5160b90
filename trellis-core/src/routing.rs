// Routing layer: servlet and filter bindings, pattern matching, dispatch

use crate::{Error, Filter, HttpRequest, HttpResponse, InitParams, Servlet};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use trellis_log::trace;

/// A servlet mounted at one URL pattern.
#[derive(Clone)]
pub struct ServletBinding {
    pub pattern: String,
    pub servlet: Arc<dyn Servlet>,
    pub init_params: InitParams,
}

/// A filter mounted at one URL pattern.
#[derive(Clone)]
pub struct FilterBinding {
    pub pattern: String,
    pub filter: Arc<dyn Filter>,
    pub init_params: InitParams,
}

/// Router holding the bindings produced at bootstrap and dispatching
/// requests through the filter chain to the best-matching servlet.
pub struct Router {
    servlets: Vec<ServletBinding>,
    filters: Vec<FilterBinding>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            servlets: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Mount a servlet at a URL pattern.
    pub fn serve(&mut self, pattern: &str, servlet: Arc<dyn Servlet>, init_params: InitParams) {
        self.servlets.push(ServletBinding {
            pattern: pattern.to_string(),
            servlet,
            init_params,
        });
    }

    /// Mount a filter at a URL pattern. Filters apply in mount order.
    pub fn filter(&mut self, pattern: &str, filter: Arc<dyn Filter>, init_params: InitParams) {
        self.filters.push(FilterBinding {
            pattern: pattern.to_string(),
            filter,
            init_params,
        });
    }

    pub fn servlet_count(&self) -> usize {
        self.servlets.len()
    }

    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Dispatch a request: split off the query string, select the
    /// best-matching servlet, and run it behind every matching filter.
    pub async fn dispatch(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let (path, query_string) = request
            .path
            .split_once('?')
            .map(|(p, q)| (p.to_string(), Some(q.to_string())))
            .unwrap_or((request.path.clone(), None));

        if let Some(query) = query_string {
            request.query_params = parse_query_string(&query);
        }
        request.path = path;

        let binding = self.match_servlet(&request.path).ok_or_else(|| {
            Error::RouteNotFound(format!("{} {}", request.method, request.path))
        })?;
        trace!("Matched '{}' to pattern '{}'", request.path, binding.pattern);

        let filters: Vec<(Arc<dyn Filter>, InitParams)> = self
            .filters
            .iter()
            .filter(|f| pattern_rank(&f.pattern, &request.path).is_some())
            .map(|f| (f.filter.clone(), f.init_params.clone()))
            .collect();

        FilterChain::new(filters)
            .run(request, binding.servlet.clone(), binding.init_params.clone())
            .await
    }

    /// Select the most specific matching servlet binding: exact match
    /// beats prefix, a longer prefix beats a shorter one, extension
    /// patterns come next, the default pattern `/` last.
    fn match_servlet(&self, path: &str) -> Option<&ServletBinding> {
        self.servlets
            .iter()
            .filter_map(|b| pattern_rank(&b.pattern, path).map(|rank| (rank, b)))
            .max_by_key(|(rank, _)| *rank)
            .map(|(_, binding)| binding)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Rank a servlet-style URL pattern against a path. Returns `None` when
/// the pattern does not match; otherwise a rank where a higher value is a
/// more specific match.
///
/// Supported grammar: exact paths, path-prefix wildcards (`/api/*`),
/// extension patterns (`*.ext`), and the default pattern `/`.
fn pattern_rank(pattern: &str, path: &str) -> Option<(u8, usize)> {
    if pattern == path {
        return Some((3, pattern.len()));
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        // "/*" has an empty prefix and matches every path.
        if prefix.is_empty() || path == prefix || path.starts_with(&format!("{}/", prefix)) {
            return Some((2, prefix.len()));
        }
        return None;
    }
    if let Some(extension) = pattern.strip_prefix("*.") {
        let last_segment = path.rsplit('/').next().unwrap_or(path);
        if let Some((_, ext)) = last_segment.rsplit_once('.') {
            if ext == extension {
                return Some((1, extension.len()));
            }
        }
        return None;
    }
    if pattern == "/" {
        return Some((0, 0));
    }
    None
}

/// Parse a query string into a map of parameters
fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            let key = split.next()?;
            let value = split.next().unwrap_or("");
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Executes the filters matched for a request, innermost call being the
/// servlet itself.
#[derive(Clone)]
struct FilterChain {
    filters: Arc<Vec<(Arc<dyn Filter>, InitParams)>>,
}

impl FilterChain {
    fn new(filters: Vec<(Arc<dyn Filter>, InitParams)>) -> Self {
        Self {
            filters: Arc::new(filters),
        }
    }

    async fn run(
        &self,
        request: HttpRequest,
        servlet: Arc<dyn Servlet>,
        servlet_params: InitParams,
    ) -> Result<HttpResponse, Error> {
        self.execute_from(0, request, servlet, servlet_params).await
    }

    fn execute_from(
        &self,
        index: usize,
        request: HttpRequest,
        servlet: Arc<dyn Servlet>,
        servlet_params: InitParams,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>> {
        if index >= self.filters.len() {
            Box::pin(async move { servlet.handle(request, &servlet_params).await })
        } else {
            let (filter, params) = self.filters[index].clone();
            let chain = self.clone();

            Box::pin(async move {
                filter
                    .handle(
                        request,
                        &params,
                        Box::new(move |request| {
                            chain.execute_from(index + 1, request, servlet, servlet_params)
                        }),
                    )
                    .await
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Next;
    use async_trait::async_trait;

    struct TextServlet {
        text: &'static str,
    }

    #[async_trait]
    impl Servlet for TextServlet {
        async fn handle(
            &self,
            _request: HttpRequest,
            config: &InitParams,
        ) -> Result<HttpResponse, Error> {
            let suffix = config.get("suffix").unwrap_or("");
            Ok(HttpResponse::ok().with_text(&format!("{}{}", self.text, suffix)))
        }
    }

    struct TagFilter {
        tag: &'static str,
    }

    #[async_trait]
    impl Filter for TagFilter {
        async fn handle(
            &self,
            request: HttpRequest,
            _config: &InitParams,
            next: Next,
        ) -> Result<HttpResponse, Error> {
            let response = next(request).await?;
            let mut body = response.body.clone();
            body.extend_from_slice(self.tag.as_bytes());
            Ok(HttpResponse::new(response.status).with_body(body))
        }
    }

    fn servlet(text: &'static str) -> Arc<dyn Servlet> {
        Arc::new(TextServlet { text })
    }

    #[test]
    fn test_pattern_rank_exact() {
        assert!(pattern_rank("/users", "/users").is_some());
        assert!(pattern_rank("/users", "/users/1").is_none());
    }

    #[test]
    fn test_pattern_rank_prefix() {
        assert!(pattern_rank("/api/*", "/api/users").is_some());
        assert!(pattern_rank("/api/*", "/api").is_some());
        assert!(pattern_rank("/api/*", "/apiary").is_none());
        assert!(pattern_rank("/*", "/anything/at/all").is_some());
    }

    #[test]
    fn test_pattern_rank_extension() {
        assert!(pattern_rank("*.json", "/reports/q1.json").is_some());
        assert!(pattern_rank("*.json", "/reports/q1.html").is_none());
        assert!(pattern_rank("*.json", "/reports/json").is_none());
    }

    #[test]
    fn test_pattern_rank_default() {
        assert!(pattern_rank("/", "/").is_some());
        assert!(pattern_rank("/", "/anything").is_some());
    }

    #[test]
    fn test_exact_beats_prefix() {
        let mut router = Router::new();
        router.serve("/api/*", servlet("prefix"), InitParams::new());
        router.serve("/api/status", servlet("exact"), InitParams::new());

        let binding = router.match_servlet("/api/status").unwrap();
        assert_eq!(binding.pattern, "/api/status");
    }

    #[test]
    fn test_longer_prefix_wins() {
        let mut router = Router::new();
        router.serve("/api/*", servlet("short"), InitParams::new());
        router.serve("/api/v2/*", servlet("long"), InitParams::new());

        let binding = router.match_servlet("/api/v2/users").unwrap();
        assert_eq!(binding.pattern, "/api/v2/*");
    }

    #[test]
    fn test_dispatch_routes_to_servlet() {
        let mut router = Router::new();
        router.serve("/hello", servlet("hi"), InitParams::new());

        let response = tokio_test::block_on(
            router.dispatch(HttpRequest::new("GET", "/hello")),
        )
        .unwrap();
        assert_eq!(response.body, b"hi".to_vec());
    }

    #[test]
    fn test_dispatch_passes_init_params() {
        let mut router = Router::new();
        let mut params = InitParams::new();
        params.insert("suffix", "!");
        router.serve("/hello", servlet("hi"), params);

        let response = tokio_test::block_on(
            router.dispatch(HttpRequest::new("GET", "/hello")),
        )
        .unwrap();
        assert_eq!(response.body, b"hi!".to_vec());
    }

    #[test]
    fn test_dispatch_unmatched_is_route_not_found() {
        let router = Router::new();
        let result = tokio_test::block_on(router.dispatch(HttpRequest::new("GET", "/missing")));
        assert!(matches!(result, Err(Error::RouteNotFound(_))));
    }

    #[test]
    fn test_dispatch_parses_query_string() {
        struct QueryServlet;

        #[async_trait]
        impl Servlet for QueryServlet {
            async fn handle(
                &self,
                request: HttpRequest,
                _config: &InitParams,
            ) -> Result<HttpResponse, Error> {
                let name = request.query("name").cloned().unwrap_or_default();
                Ok(HttpResponse::ok().with_text(&name))
            }
        }

        let mut router = Router::new();
        router.serve("/greet", Arc::new(QueryServlet), InitParams::new());

        let response = tokio_test::block_on(
            router.dispatch(HttpRequest::new("GET", "/greet?name=alice&debug=1")),
        )
        .unwrap();
        assert_eq!(response.body, b"alice".to_vec());
    }

    #[test]
    fn test_filters_apply_in_mount_order() {
        let mut router = Router::new();
        router.filter("/*", Arc::new(TagFilter { tag: "-outer" }), InitParams::new());
        router.filter("/*", Arc::new(TagFilter { tag: "-inner" }), InitParams::new());
        router.serve("/hello", servlet("hi"), InitParams::new());

        let response = tokio_test::block_on(
            router.dispatch(HttpRequest::new("GET", "/hello")),
        )
        .unwrap();
        // Inner filter appends first on the way out, outer appends last.
        assert_eq!(response.body, b"hi-inner-outer".to_vec());
    }

    #[test]
    fn test_filter_pattern_restricts_application() {
        let mut router = Router::new();
        router.filter("/admin/*", Arc::new(TagFilter { tag: "-admin" }), InitParams::new());
        router.serve("/*", servlet("page"), InitParams::new());

        let public = tokio_test::block_on(
            router.dispatch(HttpRequest::new("GET", "/public")),
        )
        .unwrap();
        assert_eq!(public.body, b"page".to_vec());

        let admin = tokio_test::block_on(
            router.dispatch(HttpRequest::new("GET", "/admin/console")),
        )
        .unwrap();
        assert_eq!(admin.body, b"page-admin".to_vec());
    }
}

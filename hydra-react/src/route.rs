// Route table and resolution

use crate::error::{Result, SsrError};
use crate::view::{DataFetcher, View};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Maps a URL pattern to a view and the fetcher producing its data.
#[derive(Clone)]
pub struct RouteDescriptor {
    pattern: String,
    exact: bool,
    view: Arc<dyn View>,
    fetcher: Arc<dyn DataFetcher>,
}

impl RouteDescriptor {
    /// A prefix-matching route. Call [`exact`](Self::exact) to require the
    /// whole path to match.
    pub fn new(
        pattern: impl Into<String>,
        view: Arc<dyn View>,
        fetcher: Arc<dyn DataFetcher>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            exact: false,
            view,
            fetcher,
        }
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    pub fn view(&self) -> &Arc<dyn View> {
        &self.view
    }

    pub fn fetcher(&self) -> &Arc<dyn DataFetcher> {
        &self.fetcher
    }

    /// Match `path` against this route's pattern under its `exact` flag.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        match_pattern(&self.pattern, path, self.exact)
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("pattern", &self.pattern)
            .field("exact", &self.exact)
            .finish_non_exhaustive()
    }
}

/// The part of a path a pattern matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Matched prefix of the path, normalized (`/about`, `/users/7`)
    pub url: String,
    pub params: HashMap<String, String>,
    /// Whether the pattern consumed the whole path
    pub is_exact: bool,
}

fn path_segments(path: &str) -> Vec<&str> {
    path.split(['?', '#'])
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Canonical form of a request path: no query or fragment, no empty
/// segments, always a leading slash. `/about/?x=1` becomes `/about`.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path_segments(path).join("/"))
}

/// Segment-based matching. Empty segments (leading, trailing or doubled
/// slashes) are ignored; query strings and fragments are stripped first.
pub fn match_pattern(pattern: &str, path: &str, exact: bool) -> Option<PathMatch> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts = path_segments(path);

    if pattern_parts.len() > path_parts.len() {
        return None;
    }
    if exact && pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(name) = pattern_part.strip_prefix(':') {
            params.insert(name.to_string(), (*path_part).to_string());
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(PathMatch {
        url: format!("/{}", path_parts[..pattern_parts.len()].join("/")),
        params,
        is_exact: pattern_parts.len() == path_parts.len(),
    })
}

/// A resolved route: the descriptor plus what it matched.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// Position of the descriptor in its table
    pub index: usize,
    pub route: RouteDescriptor,
    /// The full path that was resolved
    pub path: String,
    pub matched: PathMatch,
}

impl RouteMatch {
    pub fn pattern(&self) -> &str {
        self.route.pattern()
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.matched.params
    }
}

impl PartialEq for RouteMatch {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.route.pattern == other.route.pattern
            && Arc::ptr_eq(&self.route.view, &other.route.view)
            && Arc::ptr_eq(&self.route.fetcher, &other.route.fetcher)
            && self.path == other.path
            && self.matched == other.matched
    }
}

/// Outcome of resolving a path. Not matching is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(RouteMatch),
    NotFound,
}

impl Resolution {
    pub fn found(self) -> Option<RouteMatch> {
        match self {
            Resolution::Found(m) => Some(m),
            Resolution::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }
}

/// Ordered, immutable list of routes. The first match wins, so more specific
/// routes must be declared before more general ones.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    /// Build a table, rejecting relative or duplicate patterns.
    pub fn new(routes: Vec<RouteDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for route in &routes {
            if !route.pattern.starts_with('/') {
                return Err(SsrError::ConfigError(format!(
                    "route pattern must start with '/': {:?}",
                    route.pattern
                )));
            }
            if !seen.insert(route.pattern.as_str()) {
                return Err(SsrError::ConfigError(format!(
                    "duplicate route pattern: {}",
                    route.pattern
                )));
            }
        }
        Ok(Self { routes })
    }

    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first route matching `path`.
    pub fn resolve(&self, path: &str) -> Resolution {
        for (index, route) in self.routes.iter().enumerate() {
            if let Some(matched) = route.match_path(path) {
                tracing::debug!(path, pattern = %route.pattern, "route resolved");
                return Resolution::Found(RouteMatch {
                    index,
                    route: route.clone(),
                    path: path.to_string(),
                    matched,
                });
            }
        }

        tracing::debug!(path, "no route matches");
        Resolution::NotFound
    }
}

/// Collects routes in declaration order.
#[derive(Default)]
pub struct RouteTableBuilder {
    routes: Vec<RouteDescriptor>,
}

impl RouteTableBuilder {
    pub fn route(mut self, route: RouteDescriptor) -> Self {
        self.routes.push(route);
        self
    }

    pub fn build(self) -> Result<RouteTable> {
        RouteTable::new(self.routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{static_data, view_fn};
    use serde_json::json;

    fn route(pattern: &str) -> RouteDescriptor {
        RouteDescriptor::new(
            pattern,
            view_fn(|_| Ok(String::new())),
            static_data(json!(null)),
        )
    }

    #[test]
    fn test_exact_match() {
        assert!(match_pattern("/", "/", true).is_some());
        assert!(match_pattern("/", "/about", true).is_none());
        assert!(match_pattern("/about", "/about/", true).is_some());
        assert!(match_pattern("/about", "/about/team", true).is_none());
    }

    #[test]
    fn test_prefix_match_is_segment_aligned() {
        let m = match_pattern("/about", "/about/team", false).unwrap();
        assert_eq!(m.url, "/about");
        assert!(!m.is_exact);

        assert!(match_pattern("/about", "/aboutus", false).is_none());
        assert!(match_pattern("/", "/anything/at/all", false).is_some());
    }

    #[test]
    fn test_params_and_query_stripping() {
        let m = match_pattern("/users/:id", "/users/42?tab=posts#top", true).unwrap();
        assert_eq!(m.params.get("id"), Some(&"42".to_string()));
        assert_eq!(m.url, "/users/42");
        assert!(m.is_exact);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("//about/?tab=1"), "/about");
        assert_eq!(normalize_path("/users/7#top"), "/users/7");
    }

    #[test]
    fn test_first_match_wins() {
        let table = RouteTable::builder()
            .route(route("/").exact())
            .route(route("/about"))
            .route(route("/about/team"))
            .build()
            .unwrap();

        let found = table.resolve("/about/team").found().unwrap();
        assert_eq!(found.pattern(), "/about");
        assert_eq!(found.index, 1);
    }

    #[test]
    fn test_not_found() {
        let table = RouteTable::builder()
            .route(route("/").exact())
            .route(route("/about"))
            .build()
            .unwrap();

        assert_eq!(table.resolve("/nonexistent"), Resolution::NotFound);
    }

    #[test]
    fn test_duplicate_and_relative_patterns_rejected() {
        let dup = RouteTable::new(vec![route("/a"), route("/a").exact()]);
        assert!(matches!(dup, Err(SsrError::ConfigError(_))));

        let relative = RouteTable::new(vec![route("about")]);
        assert!(matches!(relative, Err(SsrError::ConfigError(_))));
    }
}

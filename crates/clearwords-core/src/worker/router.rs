//! Route selection for intercepted requests.
//!
//! Routing is an ordered rule table: the first rule whose predicate
//! matches decides the route. The last rule matches everything.

use reqwest::Method;

use crate::models::Request;

/// URL schemes belonging to browser extensions, never intercepted
const EXTENSION_SCHEMES: &[&str] = &["chrome-extension"];

/// Path segment that marks curriculum and other data requests
const DATA_SEGMENT: &str = "/data/";

/// Path suffix that marks data requests
const DATA_EXTENSION: &str = ".json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not intercepted: the request goes to the network untouched
    Passthrough,
    /// Network-first, falling back to the data cache
    Data,
    /// Cache-first with a background refresh
    Static,
}

pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&Request) -> bool,
    pub route: Route,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "non-get",
        matches: is_non_get,
        route: Route::Passthrough,
    },
    Rule {
        name: "extension-scheme",
        matches: is_extension_scheme,
        route: Route::Passthrough,
    },
    Rule {
        name: "data",
        matches: is_data_path,
        route: Route::Data,
    },
    Rule {
        name: "static",
        matches: any_request,
        route: Route::Static,
    },
];

fn is_non_get(request: &Request) -> bool {
    request.method != Method::GET
}

fn is_extension_scheme(request: &Request) -> bool {
    EXTENSION_SCHEMES.contains(&request.url.scheme())
}

fn any_request(_: &Request) -> bool {
    true
}

fn is_data_path(request: &Request) -> bool {
    let path = request.url.path();
    path.contains(DATA_SEGMENT) || path.ends_with(DATA_EXTENSION)
}

/// The first matching rule for a request
pub fn matching_rule(request: &Request) -> &'static Rule {
    RULES
        .iter()
        .find(|rule| (rule.matches)(request))
        .unwrap_or(&RULES[RULES.len() - 1])
}

pub fn route(request: &Request) -> Route {
    matching_rule(request).route
}

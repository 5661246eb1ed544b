//! URL generation for theme routes.
//!
//! A URL spec names a target relative to the current request:
//!
//! | Spec | Theme | Controller | Action |
//! |------|-------|------------|--------|
//! | `""` | current | current | current |
//! | `list` | current | current | `list` |
//! | `goods/list` | current | `goods` | `list` |
//! | `blog://post/show` | `blog` | `post` | `show` |
//!
//! A `?query` part on the spec is merged with the explicit parameters; explicit
//! parameters win. Controller names are snake-cased (`GoodsItem` → `goods_item`).

use std::collections::BTreeMap;

use themekit_dispatch::RequestContext;

use crate::naming::snake;

/// Path prefix every theme URL is generated under.
pub const URL_PREFIX: &str = "themes";

/// Builds `/themes/<theme>/<controller>/<action>` URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlBuilder {
    suffix: Option<String>,
}

/// A URL spec resolved against the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTarget {
    /// Theme name.
    pub theme: String,
    /// Snake-cased controller name.
    pub controller: String,
    /// Action name.
    pub action: String,
    /// Merged query parameters.
    pub params: BTreeMap<String, String>,
}

impl UrlBuilder {
    /// Creates a builder appending `suffix` (`html` or `.html`) to every path.
    pub fn new(suffix: Option<String>) -> Self {
        let suffix = suffix
            .map(|s| s.trim().trim_start_matches('.').to_string())
            .filter(|s| !s.is_empty());
        Self { suffix }
    }

    /// The configured suffix without its leading dot.
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Resolves `spec` against `current` without rendering it.
    pub fn resolve(
        &self,
        spec: &str,
        current: &RequestContext,
        params: &BTreeMap<String, String>,
    ) -> UrlTarget {
        let spec = spec.trim();
        let (location, query) = match spec.split_once('?') {
            Some((location, query)) => (location, parse_query(query)),
            None => (spec, BTreeMap::new()),
        };

        let mut merged = query;
        merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

        if location.is_empty() {
            return UrlTarget {
                theme: current.theme.clone(),
                controller: current.controller.replace('/', "."),
                action: current.action.clone(),
                params: merged,
            };
        }

        let (theme, controller, action) = match location.split_once("://") {
            Some((theme, rest)) => {
                let rest = rest.trim_matches('/');
                let (controller, action) = match rest.rsplit_once('/') {
                    Some((controller, action)) => (controller, action),
                    None => (rest, ""),
                };
                (theme.to_lowercase(), controller.to_string(), action.to_string())
            }
            None => {
                let path = location.trim_matches('/');
                match path.rsplit_once('/') {
                    Some((controller, action)) => (
                        current.theme.clone(),
                        controller.rsplit('/').next().unwrap_or(controller).to_string(),
                        action.to_string(),
                    ),
                    None => (
                        current.theme.clone(),
                        current.controller.clone(),
                        path.to_string(),
                    ),
                }
            }
        };

        UrlTarget {
            theme,
            controller: snake(&controller),
            action,
            params: merged,
        }
    }

    /// Builds a root-relative URL for `spec`.
    pub fn build(
        &self,
        spec: &str,
        current: &RequestContext,
        params: &BTreeMap<String, String>,
    ) -> String {
        self.render(&self.resolve(spec, current, params))
    }

    /// Builds an absolute URL on `domain` for `spec`.
    pub fn build_on(
        &self,
        domain: &str,
        spec: &str,
        current: &RequestContext,
        params: &BTreeMap<String, String>,
    ) -> String {
        let domain = domain.trim().trim_end_matches('/');
        let domain = domain
            .strip_prefix("http://")
            .or_else(|| domain.strip_prefix("https://"))
            .unwrap_or(domain);
        format!("http://{}{}", domain, self.build(spec, current, params))
    }

    /// URL of a theme's index page.
    pub fn home(&self, theme: &str) -> String {
        self.render(&UrlTarget {
            theme: theme.to_string(),
            controller: "index".to_string(),
            action: "index".to_string(),
            params: BTreeMap::new(),
        })
    }

    fn render(&self, target: &UrlTarget) -> String {
        let mut url = format!("/{}/{}", URL_PREFIX, target.theme);
        for segment in [&target.controller, &target.action] {
            if !segment.is_empty() {
                url.push('/');
                url.push_str(segment);
            }
        }
        if let Some(suffix) = &self.suffix {
            url.push('.');
            url.push_str(suffix);
        }
        if !target.params.is_empty() {
            let query: Vec<String> = target
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

/// Parses `a=1&b=2` into a map. Keys without `=` map to an empty string.
pub fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let raw = raw.replace('+', " ");
    let decoded = urlencoding::decode(&raw).map(|s| s.into_owned());
    decoded.unwrap_or(raw)
}

//! Route table for theme requests.
//!
//! Rules are tried in registration order; the first match wins. Patterns
//! are `/`-separated segments:
//!
//! - `goods` matches the literal segment
//! - `:id` captures a required segment
//! - `:id?` or `[:id]` captures an optional segment; only trailing
//!   segments may be optional
//!
//! The catch-all rule `themes/:theme/:controller?/:action?` is not a complete
//! match: segments past the pattern are read as `key/value` pairs and added
//! to the captured parameters. Named rules from configuration must match the
//! whole path.

use std::collections::BTreeMap;

use crate::error::ThemeError;
use crate::url::{parse_query, URL_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, optional: bool },
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parses `pattern`.
    pub fn parse(pattern: &str) -> Result<Self, ThemeError> {
        let mut segments = Vec::new();
        let mut seen_optional = false;
        for part in pattern.split('/').filter(|s| !s.is_empty()) {
            let segment = if let Some(name) = part
                .strip_prefix("[:")
                .and_then(|rest| rest.strip_suffix(']'))
            {
                Segment::Param {
                    name: name.to_string(),
                    optional: true,
                }
            } else if let Some(name) = part.strip_prefix(':') {
                match name.strip_suffix('?') {
                    Some(name) => Segment::Param {
                        name: name.to_string(),
                        optional: true,
                    },
                    None => Segment::Param {
                        name: name.to_string(),
                        optional: false,
                    },
                }
            } else {
                Segment::Literal(part.to_string())
            };

            match &segment {
                Segment::Param { name, .. } if name.is_empty() => {
                    return Err(ThemeError::Config(format!(
                        "route pattern \"{}\" has an unnamed parameter",
                        pattern
                    )));
                }
                Segment::Param { optional: true, .. } => seen_optional = true,
                _ if seen_optional => {
                    return Err(ThemeError::Config(format!(
                        "route pattern \"{}\" has a required segment after an optional one",
                        pattern
                    )));
                }
                _ => {}
            }
            segments.push(segment);
        }
        Ok(Self {
            raw: pattern.to_string(),
            segments,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Matches path segments. With `complete`, every segment must be
    /// consumed; otherwise leftovers are returned as `key/value` pairs.
    fn matches(&self, path: &[&str], complete: bool) -> Option<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        let mut rest = path.iter();
        for segment in &self.segments {
            match (segment, rest.next()) {
                (Segment::Literal(literal), Some(part)) if literal == part => {}
                (Segment::Literal(_), _) => return None,
                (Segment::Param { name, .. }, Some(part)) => {
                    params.insert(name.clone(), (*part).to_string());
                }
                (Segment::Param { optional: true, .. }, None) => {}
                (Segment::Param { optional: false, .. }, None) => return None,
            }
        }

        let leftover: Vec<&str> = rest.copied().collect();
        if complete && !leftover.is_empty() {
            return None;
        }
        for pair in leftover.chunks(2) {
            let value = pair.get(1).copied().unwrap_or("");
            params.entry(pair[0].to_string()).or_insert_with(|| value.to_string());
        }
        Some(params)
    }
}

/// Where a matched rule sends the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    /// Theme, controller and action come from the captured parameters.
    Dynamic,
    /// Fixed `theme/controller/action`.
    Fixed {
        /// Theme name.
        theme: String,
        /// Controller name.
        controller: String,
        /// Action name.
        action: String,
    },
}

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Configuration key the rule came from.
    pub name: Option<String>,
    /// Path pattern.
    pub pattern: RoutePattern,
    /// Dispatch target.
    pub target: RouteTarget,
    /// Host the rule is restricted to.
    pub domain: Option<String>,
    /// Whether the theme guard runs before dispatch.
    pub guarded: bool,
    /// Whether the pattern must consume the whole path.
    pub complete: bool,
}

impl RouteRule {
    /// The guarded `themes/:theme/:controller?/:action?` rule.
    pub fn catch_all() -> Self {
        let raw = format!("{}/:theme/:controller?/:action?", URL_PREFIX);
        let segments = vec![
            Segment::Literal(URL_PREFIX.to_string()),
            Segment::Param {
                name: "theme".into(),
                optional: false,
            },
            Segment::Param {
                name: "controller".into(),
                optional: true,
            },
            Segment::Param {
                name: "action".into(),
                optional: true,
            },
        ];
        Self {
            name: None,
            pattern: RoutePattern { raw, segments },
            target: RouteTarget::Dynamic,
            domain: None,
            guarded: true,
            complete: false,
        }
    }

    /// A named rule sending `pattern` to `"theme/controller/action"`.
    pub fn fixed(
        name: &str,
        pattern: &str,
        target: &str,
        domain: Option<&str>,
    ) -> Result<Self, ThemeError> {
        let parts: Vec<&str> = target.trim().trim_matches('/').split('/').map(str::trim).collect();
        let [theme, controller, action] = parts.as_slice() else {
            return Err(ThemeError::Config(format!(
                "route \"{}\" target \"{}\" is not theme/controller/action",
                name, target
            )));
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ThemeError::Config(format!(
                "route \"{}\" target \"{}\" has an empty segment",
                name, target
            )));
        }
        Ok(Self {
            name: Some(name.to_string()),
            pattern: RoutePattern::parse(pattern)?,
            target: RouteTarget::Fixed {
                theme: (*theme).to_string(),
                controller: (*controller).to_string(),
                action: (*action).to_string(),
            },
            domain: domain.map(|d| d.trim().to_lowercase()).filter(|d| !d.is_empty()),
            guarded: false,
            complete: true,
        })
    }

    fn matches_host(&self, host: Option<&str>) -> bool {
        match (&self.domain, host) {
            (None, _) => true,
            (Some(domain), Some(host)) => {
                let host = host.split(':').next().unwrap_or(host);
                host.eq_ignore_ascii_case(domain)
            }
            (Some(_), None) => false,
        }
    }
}

/// An incoming request as seen by the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Host header, possibly with a port.
    pub host: Option<String>,
    /// Path without the query string.
    pub path: String,
    /// Query parameters.
    pub query: BTreeMap<String, String>,
}

impl Request {
    /// Creates a request from `path`, splitting off any `?query`.
    pub fn get(path: &str) -> Self {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (path, BTreeMap::new()),
        };
        Self {
            host: None,
            path: path.to_string(),
            query,
        }
    }

    /// Sets the host.
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }
}

/// A successful route match.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    /// The rule that matched.
    pub rule: &'a RouteRule,
    /// Captured parameters; fixed targets add `theme`, `controller` and `action`.
    pub params: BTreeMap<String, String>,
}

/// Ordered route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    rules: Vec<RouteRule>,
    suffix: Option<String>,
}

impl Router {
    /// Creates an empty table. `suffix` is stripped from matched paths.
    pub fn new(suffix: Option<&str>) -> Self {
        Self {
            rules: Vec::new(),
            suffix: suffix
                .map(|s| s.trim().trim_start_matches('.').to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Appends a rule.
    pub fn push(&mut self, rule: RouteRule) {
        self.rules.push(rule);
    }

    /// The rules in match order.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Finds the first rule matching `request`.
    pub fn match_request(&self, request: &Request) -> Option<RouteMatch<'_>> {
        let path = self.strip_suffix(request.path.trim());
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        self.rules.iter().find_map(|rule| {
            if !rule.matches_host(request.host.as_deref()) {
                return None;
            }
            let mut params = rule.pattern.matches(&segments, rule.complete)?;
            if let RouteTarget::Fixed {
                theme,
                controller,
                action,
            } = &rule.target
            {
                params.insert("theme".into(), theme.clone());
                params.insert("controller".into(), controller.clone());
                params.insert("action".into(), action.clone());
            }
            Some(RouteMatch { rule, params })
        })
    }

    fn strip_suffix<'p>(&self, path: &'p str) -> &'p str {
        match &self.suffix {
            Some(suffix) => path
                .strip_suffix(suffix.as_str())
                .and_then(|p| p.strip_suffix('.'))
                .unwrap_or(path),
            None => path,
        }
    }
}

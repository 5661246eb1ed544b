mod common;

use std::collections::BTreeMap;

use common::{record, shop_config, Fixture};
use serde_json::json;
use themekit::{App, AppConfig, HttpStatus, Request, ThemeError};
use themekit_dispatch::{RequestContext, Response, THEMES_BEGIN, THEME_MIDDLEWARE};

#[test]
fn test_catch_all_reaches_active_theme() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());

    let response = app.handle(&Request::get("/themes/shop/index/index")).unwrap();
    assert_eq!(response.as_html(), Some("<h1>shop home</h1>"));

    let response = app.handle(&Request::get("/themes/shop")).unwrap();
    assert_eq!(response.as_html(), Some("<h1>shop home</h1>"));
}

#[test]
fn test_catch_all_passes_query_and_pairs() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());

    let response = app
        .handle(&Request::get("/themes/shop/index/hello/id/7?who=ann"))
        .unwrap();

    assert_eq!(response, Response::Json(json!({"hello": "ann", "id": "7"})));
}

#[test]
fn test_guard_rejects_inactive_theme() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());
    let seen = record(app.events(), &[THEME_MIDDLEWARE, THEMES_BEGIN]);

    let err = app.handle(&Request::get("/themes/ghost/index/index")).unwrap_err();

    assert!(matches!(err, ThemeError::ThemeNotFound(ref name) if name == "ghost"));
    assert_eq!(err.status(), HttpStatus::NotFound);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_guard_rejects_disabled_active_theme() {
    let fixture = Fixture::new();
    let mut config = shop_config();
    config.theme.name = Some("blog".into());
    let app = fixture.app(config);

    let err = app.handle(&Request::get("/themes/blog")).unwrap_err();

    assert!(matches!(err, ThemeError::ThemeDisabled(ref name) if name == "blog"));
    assert_eq!(err.status(), HttpStatus::NotFound);
    assert_eq!(fixture.counters.controllers(), 0);
}

#[test]
fn test_guard_requires_active_theme() {
    let fixture = Fixture::new();
    let app = fixture.app(AppConfig::default());

    let err = app.handle(&Request::get("/themes/shop")).unwrap_err();

    assert!(matches!(err, ThemeError::NoActiveTheme));
    assert_eq!(err.status(), HttpStatus::NotFound);
}

#[test]
fn test_guard_fires_middleware_event_before_dispatch() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());
    let seen = record(app.events(), &[THEME_MIDDLEWARE, THEMES_BEGIN]);

    app.handle(&Request::get("/themes/Shop/index")).unwrap();

    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["theme_middleware", "themes_begin"]
    );
}

#[test]
fn test_named_routes_skip_guard() {
    let fixture = Fixture::new();
    let mut config = shop_config();
    config.theme.name = None;
    let app = fixture.app(config);
    let seen = record(app.events(), &[THEME_MIDDLEWARE]);

    let response = app.handle(&Request::get("/")).unwrap();
    assert_eq!(response.as_html(), Some("<h1>shop home</h1>"));

    let response = app.handle(&Request::get("/hello/42")).unwrap();
    assert_eq!(response, Response::Json(json!({"hello": "world", "id": "42"})));

    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_domain_routes_match_only_their_host() {
    let fixture = Fixture::new();
    let config = AppConfig::from_toml(
        r#"
        [theme.route.mall]
        domain = "mall.example.com"
        rule = { "goods" = "shop/goods/list" }
        "#,
    )
    .unwrap();
    let app = fixture.app(config);

    let err = app.handle(&Request::get("/goods")).unwrap_err();
    assert!(matches!(err, ThemeError::RouteNotFound(_)));

    let response = app
        .handle(&Request::get("/goods").with_host("mall.example.com"))
        .unwrap();
    assert_eq!(response.as_html(), Some("goods of shop"));
}

#[test]
fn test_url_suffix_is_stripped_and_generated() {
    let fixture = Fixture::new();
    let mut config = shop_config();
    config.theme.url_suffix = Some("html".into());
    let app = fixture.app(config);

    let mut ctx = RequestContext::default();
    let response = app
        .handle_with(&Request::get("/themes/shop/goods/list.html"), &mut ctx)
        .unwrap();
    assert_eq!(response.as_html(), Some("goods of shop"));

    let mut params = BTreeMap::new();
    params.insert("page".to_string(), "2".to_string());
    assert_eq!(app.url("show", &ctx, &params), "/themes/shop/goods/show.html?page=2");
    assert_eq!(app.url("blog://post/read", &ctx, &BTreeMap::new()), "/themes/blog/post/read.html");
}

#[test]
fn test_unmatched_path_is_not_found() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());

    let err = app.handle(&Request::get("/elsewhere/page")).unwrap_err();

    assert!(matches!(err, ThemeError::RouteNotFound(ref path) if path == "/elsewhere/page"));
    assert_eq!(err.status(), HttpStatus::NotFound);
}

fn app_with_middleware(
    fixture: &Fixture,
    step: impl Fn(&mut RequestContext) -> Result<(), ThemeError> + Send + Sync + 'static,
) -> App {
    App::builder()
        .root(fixture.root())
        .config(shop_config())
        .theme(fixture.shop())
        .theme(fixture.blog())
        .middleware(step)
        .build()
        .unwrap()
}

#[test]
fn test_middleware_runs_between_guard_and_dispatch() {
    let fixture = Fixture::new();
    let app = app_with_middleware(&fixture, |ctx| {
        ctx.query.insert("who".to_string(), "middleware".to_string());
        Ok(())
    });
    let seen = record(app.events(), &[THEME_MIDDLEWARE, THEMES_BEGIN]);

    let response = app.handle(&Request::get("/themes/shop/index/hello")).unwrap();

    assert_eq!(response, Response::Json(json!({"hello": "middleware", "id": null})));
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["theme_middleware", "themes_begin"]
    );
}

#[test]
fn test_middleware_can_reject_request() {
    let fixture = Fixture::new();
    let app = app_with_middleware(&fixture, |_| {
        Err(ThemeError::Action(anyhow::anyhow!("closed for maintenance")))
    });
    let seen = record(app.events(), &[THEMES_BEGIN]);

    let err = app.handle(&Request::get("/themes/shop")).unwrap_err();

    assert_eq!(err.status(), HttpStatus::InternalServerError);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(fixture.counters.controllers(), 0);
}

#[test]
fn test_middleware_skips_named_routes_and_inactive_themes() {
    let fixture = Fixture::new();
    let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = std::sync::Arc::clone(&calls);
    let app = app_with_middleware(&fixture, move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    });

    app.handle(&Request::get("/hello/1")).unwrap();
    app.handle(&Request::get("/themes/ghost")).unwrap_err();
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

    app.handle(&Request::get("/themes/shop")).unwrap();
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
}

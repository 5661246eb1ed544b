mod common;

use common::{shop_config, Fixture};
use serde_json::json;
use themekit::{is_enabled, ThemeError};
use themekit_dispatch::RequestContext;

#[test]
fn test_info_merges_file_url_and_declared() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());

    let blog = app.registry().resolve_instance("blog").unwrap();
    let info = blog.info().unwrap();

    assert_eq!(info["name"], json!("blog"));
    assert_eq!(info["author"], json!("blog team"));
    assert_eq!(info["url"], json!("/themes/blog/index/index"));
    assert!(!is_enabled(&info));
}

#[test]
fn test_missing_info_returns_declared_defaults() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.root().join("theme/blog/info.ini")).unwrap();
    let app = fixture.app(shop_config());

    let info = app.registry().theme_info("blog").unwrap();

    assert_eq!(info.len(), 1);
    assert_eq!(info["author"], json!("blog team"));
    assert!(app.binding("blog").is_none());
}

#[test]
fn test_flat_config_is_value_of_full_config() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());
    let shop = app.registry().resolve_instance("shop").unwrap();

    let full = shop.config(true).unwrap();
    let flat = shop.config(false).unwrap();

    assert_eq!(full.len(), flat.len());
    for (key, value) in &flat {
        assert_eq!(&full[key]["value"], value);
    }
    assert_eq!(full["per_page"]["type"], json!("number"));
    assert_eq!(flat["per_page"], json!(20));
}

#[test]
fn test_theme_without_settings_has_empty_config() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());
    let blog = app.registry().resolve_instance("blog").unwrap();

    assert!(blog.config(true).unwrap().is_empty());
    assert!(blog.config(false).unwrap().is_empty());
}

#[test]
fn test_malformed_settings_surface_as_error() {
    let fixture = Fixture::new();
    fixture.write("theme/blog/config.yaml", "title: [unclosed\n");
    let app = fixture.app(shop_config());
    let blog = app.registry().resolve_instance("blog").unwrap();

    let err = blog.config(false).unwrap_err();
    assert!(matches!(err, ThemeError::Settings { .. }));
}

#[test]
fn test_info_sections_become_objects() {
    let fixture = Fixture::new();
    fixture.write(
        "theme/shop/info.ini",
        "name = shop\nstatus = yes\n\n[author]\nname = Ann\nsite = off\n",
    );
    let app = fixture.app(shop_config());

    let info = app.binding("shop").unwrap();
    assert_eq!(info["status"], json!(true));
    assert_eq!(info["author"], json!({"name": "Ann", "site": false}));
    assert!(!info.contains_key("url"));
}

#[test]
fn test_theme_config_follows_current_request() {
    let fixture = Fixture::new();
    let app = fixture.app(shop_config());
    let mut ctx = RequestContext::default();

    assert!(app.theme_config(&ctx, false).unwrap().is_empty());

    app.execute(&mut ctx, Some("shop"), Some("goods"), Some("list"))
        .unwrap();
    let flat = app.theme_config(&ctx, false).unwrap();
    let full = app.theme_config(&ctx, true).unwrap();
    assert_eq!(flat["title"], json!("My Shop"));
    assert_eq!(full["title"]["label"], json!("Site title"));

    ctx.theme = "ghost".into();
    assert!(app.theme_config(&ctx, true).unwrap().is_empty());
}

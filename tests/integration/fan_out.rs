//! Fan-out behaviour of the refresh engine
//!
//! - one connection per app, reused for all of its queries
//! - apps queried concurrently
//! - deterministic row order regardless of completion order

use std::time::{Duration, Instant};

use dashmin::{QueryOutcome, Scalar, engine::CONNECTION_LABEL};
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_blog_and_shop_rows() {
    let (provider, apps) = blog_and_shop();

    let rows = provider.engine().refresh(&apps, None).await.unwrap();

    assert_eq!(
        keys(&rows),
        vec![
            ("blog".to_string(), "posts".to_string()),
            ("blog".to_string(), "users".to_string()),
            ("shop".to_string(), CONNECTION_LABEL.to_string()),
        ]
    );
    assert_eq!(rows[0].outcome, QueryOutcome::failed("syntax error"));
    assert_eq!(rows[1].outcome.first_value(), Some(&Scalar::Integer(42)));
    assert_eq!(rows[2].outcome.error(), Some("timeout connecting"));
}

#[tokio::test]
async fn test_filter_only_touches_the_selected_app() {
    let (provider, apps) = blog_and_shop();

    let rows = provider.engine().refresh(&apps, Some("shop")).await.unwrap();

    assert_eq!(
        keys(&rows),
        vec![("shop".to_string(), CONNECTION_LABEL.to_string())]
    );
    assert_eq!(provider.connects(), vec!["shop-dsn".to_string()]);
}

#[tokio::test]
async fn test_unknown_filter_yields_no_rows() {
    let (provider, apps) = blog_and_shop();

    let rows = provider.engine().refresh(&apps, Some("crm")).await.unwrap();

    assert!(rows.is_empty());
    assert!(provider.connects().is_empty());
}

#[tokio::test]
async fn test_one_connection_per_app_reused_for_queries() {
    let provider = ScriptedProvider::new().script(
        "crm-dsn",
        Script::healthy()
            .answer("SELECT 1", count(1))
            .answer("SELECT 2", count(2))
            .answer("SELECT 3", count(3)),
    );
    let apps = apps(vec![app(
        "crm",
        &[("a", "SELECT 1"), ("b", "SELECT 2"), ("c", "SELECT 3")],
    )]);

    let rows = provider.engine().refresh(&apps, None).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(provider.connects(), vec!["crm-dsn".to_string()]);
    assert_eq!(provider.executed().len(), 3);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_queries_of_one_app_run_sequentially_in_label_order() {
    let latency = Duration::from_millis(40);
    let provider = ScriptedProvider::new().script(
        "crm-dsn",
        Script::healthy()
            .answer_after("SELECT 'a'", count(1), latency)
            .answer_after("SELECT 'b'", count(2), latency)
            .answer_after("SELECT 'c'", count(3), latency),
    );
    // declared out of order on purpose
    let apps = apps(vec![app(
        "crm",
        &[("c", "SELECT 'c'"), ("a", "SELECT 'a'"), ("b", "SELECT 'b'")],
    )]);

    provider.engine().refresh(&apps, None).await.unwrap();

    let executed: Vec<String> = provider
        .executed()
        .into_iter()
        .map(|(_, query)| query)
        .collect();
    assert_eq!(executed, vec!["SELECT 'a'", "SELECT 'b'", "SELECT 'c'"]);

    let spans = provider.spans();
    assert_eq!(spans.len(), 3);
    for pair in spans.windows(2) {
        assert!(
            pair[1].started >= pair[0].finished,
            "{} started before {} finished",
            pair[1].query,
            pair[0].query
        );
    }
}

#[tokio::test]
async fn test_every_opened_connection_is_closed() {
    let provider = ScriptedProvider::new()
        .script("a-dsn", Script::healthy().answer("q", count(1)))
        .script("b-dsn", Script::healthy().answer("q", count(2)))
        .script("c-dsn", Script::unreachable("connection refused"));
    let apps = apps(vec![
        app("a", &[("n", "q")]),
        app("b", &[("n", "q"), ("missing", "nope")]),
        app("c", &[("n", "q")]),
    ]);

    provider.engine().refresh(&apps, None).await.unwrap();

    assert_eq!(provider.connects().len(), 3);
    // c never got a connection, so only a and b close
    assert_eq!(provider.closes(), 2);
}

#[tokio::test]
async fn test_app_without_queries_connects_and_emits_nothing() {
    let provider = ScriptedProvider::new();
    let apps = apps(vec![app("idle", &[])]);

    let rows = provider.engine().refresh(&apps, None).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(provider.connects(), vec!["idle-dsn".to_string()]);
    assert_eq!(provider.closes(), 1);
}

#[tokio::test]
async fn test_apps_are_queried_concurrently() {
    let delay = Duration::from_millis(300);
    let provider = ScriptedProvider::new()
        .script("a-dsn", Script::healthy().with_connect_delay(delay).answer("q", count(1)))
        .script("b-dsn", Script::healthy().with_connect_delay(delay).answer("q", count(2)))
        .script("c-dsn", Script::healthy().with_connect_delay(delay).answer("q", count(3)));
    let apps = apps(vec![
        app("a", &[("n", "q")]),
        app("b", &[("n", "q")]),
        app("c", &[("n", "q")]),
    ]);

    let started = Instant::now();
    let rows = provider.engine().refresh(&apps, None).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(rows.len(), 3);
    assert!(
        elapsed < Duration::from_millis(800),
        "three 300ms apps took {elapsed:?}, expected them to overlap"
    );
}

#[tokio::test]
async fn test_order_is_independent_of_completion_order() {
    // z finishes first, a last
    let provider = ScriptedProvider::new()
        .script(
            "a-dsn",
            Script::healthy().answer_after("q", count(1), Duration::from_millis(120)),
        )
        .script(
            "m-dsn",
            Script::healthy().answer_after("q", count(2), Duration::from_millis(60)),
        )
        .script("z-dsn", Script::healthy().answer("q", count(3)));
    let apps = apps(vec![
        app("z", &[("n", "q")]),
        app("a", &[("n", "q")]),
        app("m", &[("n", "q")]),
    ]);

    let rows = provider.engine().refresh(&apps, None).await.unwrap();

    let order: Vec<&str> = rows.iter().map(|row| row.app.as_str()).collect();
    assert_eq!(order, vec!["a", "m", "z"]);
}

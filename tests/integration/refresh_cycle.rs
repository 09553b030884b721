//! Full refresh cycles: state machine, background fan-out and message channel

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use dashmin::dashboard::{Command, Dashboard, DashboardState, Effect, Message, spawn_refresh};
use tokio::sync::mpsc;

use crate::helpers::*;

/// Wait for the next message or fail the test
async fn next_message(rx: &mut mpsc::UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a refresh")
        .expect("channel closed")
}

#[tokio::test]
async fn test_initial_refresh_reaches_ready() {
    let (provider, apps) = blog_and_shop();
    let apps = Arc::new(apps);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (mut dashboard, effect) = Dashboard::new(None);
    let Effect::StartRefresh { generation } = effect else {
        panic!("expected the first refresh to start, got {effect:?}");
    };
    spawn_refresh(provider.engine(), Arc::clone(&apps), None, generation, tx);

    let effect = dashboard.update(next_message(&mut rx).await);

    assert_eq!(effect, Effect::None);
    assert_matches!(dashboard.state(), DashboardState::Ready { rows, .. } if rows.len() == 3);
    assert!(dashboard.state().has_errors());
}

#[tokio::test]
async fn test_superseded_refresh_is_discarded() {
    let old = ScriptedProvider::new().script(
        "blog-dsn",
        Script::healthy().answer_after("q", count(1), Duration::from_millis(300)),
    );
    let new = ScriptedProvider::new().script("blog-dsn", Script::healthy().answer("q", count(2)));
    let apps = Arc::new(apps(vec![app("blog", &[("users", "q")])]));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (mut dashboard, _) = Dashboard::new(None);
    spawn_refresh(old.engine(), Arc::clone(&apps), None, 1, tx.clone());

    // user presses r while generation 1 is still running
    let effect = dashboard.update(Message::Command(Command::Refresh));
    assert_eq!(effect, Effect::StartRefresh { generation: 2 });
    spawn_refresh(new.engine(), Arc::clone(&apps), None, 2, tx);

    // apply completions in arrival order, like the host loop does
    for _ in 0..2 {
        dashboard.update(next_message(&mut rx).await);
    }

    let rows = dashboard.state().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].outcome, count(2));
}

#[tokio::test]
async fn test_failed_refresh_recovers_on_next_refresh() {
    let broken = ScriptedProvider::new().script(
        "blog-dsn",
        Script {
            panic_on_connect: true,
            ..Script::default()
        },
    );
    let healthy =
        ScriptedProvider::new().script("blog-dsn", Script::healthy().answer("q", count(7)));
    let apps = Arc::new(apps(vec![app("blog", &[("users", "q")])]));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (mut dashboard, _) = Dashboard::new(None);
    spawn_refresh(broken.engine(), Arc::clone(&apps), None, 1, tx.clone());
    dashboard.update(next_message(&mut rx).await);

    assert_matches!(dashboard.state(), DashboardState::Failed { error } if error.starts_with("refresh failed"));

    let effect = dashboard.update(Message::Command(Command::Refresh));
    let Effect::StartRefresh { generation } = effect else {
        panic!("refresh from Failed must start a fan-out, got {effect:?}");
    };
    spawn_refresh(healthy.engine(), Arc::clone(&apps), None, generation, tx);
    dashboard.update(next_message(&mut rx).await);

    assert_matches!(dashboard.state(), DashboardState::Ready { rows, .. } if rows[0].outcome == count(7));
}

#[tokio::test]
async fn test_filtered_dashboard_only_shows_its_app() {
    let (provider, apps) = blog_and_shop();
    let apps = Arc::new(apps);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (mut dashboard, _) = Dashboard::new(Some("blog".to_string()));
    assert_eq!(
        dashboard.state(),
        &DashboardState::Loading {
            target: Some("blog".to_string())
        }
    );

    spawn_refresh(
        provider.engine(),
        Arc::clone(&apps),
        dashboard.filter().map(str::to_string),
        dashboard.generation(),
        tx,
    );
    dashboard.update(next_message(&mut rx).await);

    assert!(dashboard.state().rows().iter().all(|row| row.app == "blog"));
    assert_eq!(provider.connects(), vec!["blog-dsn".to_string()]);
}

#[tokio::test]
async fn test_refresh_after_quit_is_ignored() {
    let (mut dashboard, _) = Dashboard::new(None);

    assert_eq!(dashboard.update(Message::Command(Command::Quit)), Effect::Quit);
    assert_eq!(
        dashboard.update(Message::Command(Command::Refresh)),
        Effect::None
    );
    assert_eq!(dashboard.generation(), 1);
}

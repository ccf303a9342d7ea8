// Copyright 2026 Newsparse Contributors
// SPDX-License-Identifier: Apache-2.0

//! Render pipeline lifecycle and concurrency with a fake browser.

mod common;

use common::{render_pipeline, Behavior, FakeLauncher, RecordingSleeper, Spy, ARTICLE_HTML};
use newsparse_runtime::pacing::Sleeper;
use newsparse_runtime::extraction::Normalizer;
use newsparse_runtime::renderer::guard::RenderGuard;
use newsparse_runtime::renderer::pipeline::{RenderOptions, RenderPipeline};
use newsparse_runtime::renderer::sweep::{TempSweeper, PROFILE_PREFIX};
use newsparse_runtime::types::RenderingMethod;
use newsparse_runtime::ExtractError;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_guard_bounds_concurrent_browsers() {
    let dir = tempfile::tempdir().unwrap();
    let spy = Spy::default();
    let launcher = FakeLauncher::new(Behavior::Serve(ARTICLE_HTML.into()), spy.clone())
        .holding(Duration::from_millis(15));
    let sleeper: Arc<dyn Sleeper> = Arc::new(RecordingSleeper::default());
    let pipeline = render_pipeline(launcher, 2, dir.path(), sleeper);

    let options = RenderOptions::default();
    let jobs = (0..20).map(|i| {
        let pipeline = pipeline.clone();
        let options = options.clone();
        async move {
            pipeline
                .render_and_extract(&format!("https://example.test/{i}"), &options, 2)
                .await
        }
    });
    let results = futures::future::join_all(jobs).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(spy.launches(), 20);
    assert!(spy.peak_live() <= 2, "peak live browsers {}", spy.peak_live());
    assert!(pipeline.guard().peak() <= 2);
    assert_eq!(pipeline.guard().in_flight(), 0);
}

#[tokio::test]
async fn test_failed_render_still_tears_down_and_releases() {
    let dir = tempfile::tempdir().unwrap();
    let spy = Spy::default();
    let sleeper = Arc::new(RecordingSleeper::default());
    let pipeline = render_pipeline(
        FakeLauncher::new(Behavior::FailNavigate, spy.clone()),
        2,
        dir.path(),
        sleeper.clone(),
    );

    let err = pipeline
        .render_and_extract("https://example.test/slow", &RenderOptions::default(), 2)
        .await
        .unwrap_err();

    match &err {
        ExtractError::Render { message, attempts } => {
            assert_eq!(*attempts, 2);
            assert!(message.contains("navigation timed out"), "message was {message}");
        }
        other => panic!("expected render error, got {other:?}"),
    }

    let attempt = ["launch", "context", "context close", "browser close"];
    let expected: Vec<String> = attempt
        .iter()
        .chain(attempt.iter())
        .map(|s| s.to_string())
        .collect();
    assert_eq!(spy.events(), expected);
    assert_eq!(pipeline.guard().in_flight(), 0);
    assert!(sleeper.slept().contains(&Duration::from_secs(3)));
}

#[tokio::test]
async fn test_launch_failure_releases_slot() {
    let dir = tempfile::tempdir().unwrap();
    let spy = Spy::default();
    let pipeline = render_pipeline(
        FakeLauncher::new(Behavior::FailLaunch, spy.clone()),
        1,
        dir.path(),
        Arc::new(RecordingSleeper::default()),
    );

    let err = pipeline
        .render_and_extract("https://example.test/a", &RenderOptions::default(), 1)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("failed to launch Chromium"));
    assert_eq!(err.attempts(), 1);
    assert_eq!(spy.events(), vec!["launch failed".to_string()]);
    assert_eq!(pipeline.guard().in_flight(), 0);
}

#[tokio::test]
async fn test_cancelled_caller_does_not_abandon_browser() {
    let dir = tempfile::tempdir().unwrap();
    let spy = Spy::default();
    let launcher = FakeLauncher::new(Behavior::Serve(ARTICLE_HTML.into()), spy.clone())
        .holding(Duration::from_millis(150));
    let pipeline = render_pipeline(
        launcher,
        2,
        dir.path(),
        Arc::new(RecordingSleeper::default()),
    );

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        pipeline.render_and_extract("https://example.test/a", &RenderOptions::default(), 2),
    )
    .await;
    assert!(abandoned.is_err(), "caller should have timed out");

    tokio::time::sleep(Duration::from_millis(500)).await;
    let events = spy.events();
    assert_eq!(events.last().map(String::as_str), Some("browser close"));
    assert_eq!(pipeline.guard().in_flight(), 0);
    assert_eq!(spy.launches(), 1);
}

#[tokio::test]
async fn test_success_is_tagged_dynamic() {
    let dir = tempfile::tempdir().unwrap();
    let spy = Spy::default();
    let pipeline = render_pipeline(
        FakeLauncher::new(Behavior::Serve(ARTICLE_HTML.into()), spy.clone()),
        2,
        dir.path(),
        Arc::new(RecordingSleeper::default()),
    );

    let out = pipeline
        .render_and_extract("https://example.test/a", &RenderOptions::default(), 2)
        .await
        .unwrap();
    assert_eq!(out.attempts, 1);
    assert_eq!(out.article.rendering_method, RenderingMethod::Dynamic);
    assert_eq!(out.article.author.as_deref(), Some("Jane Reporter"));
    assert_eq!(
        spy.events(),
        vec!["launch", "context", "context close", "browser close"]
    );
}

fn profiles_in(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(root)
        .unwrap()
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with(PROFILE_PREFIX))
        .map(|e| e.path())
        .collect()
}

#[tokio::test]
async fn test_sweep_after_teardown_spares_running_render() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let leftover = root.join(".org.chromium.Chromium.shm1");
    std::fs::write(&leftover, b"shm").unwrap();

    // Two pipelines sharing one slot pool and one sweeper.
    let guard = RenderGuard::new(2);
    let sweeper = TempSweeper::new(root);
    let spy = Spy::default();
    let sleeper: Arc<dyn Sleeper> = Arc::new(RecordingSleeper::default());
    let slow = RenderPipeline::new(
        Arc::new(
            FakeLauncher::new(Behavior::Serve(ARTICLE_HTML.into()), spy.clone())
                .holding(Duration::from_millis(1500)),
        ),
        guard.clone(),
        sweeper.clone(),
        Normalizer::default(),
        sleeper.clone(),
    );
    let fast = RenderPipeline::new(
        Arc::new(FakeLauncher::new(Behavior::Serve(ARTICLE_HTML.into()), spy.clone())),
        guard.clone(),
        sweeper.clone(),
        Normalizer::default(),
        sleeper,
    );

    let slow_task = tokio::spawn(async move {
        slow.render_and_extract("https://example.test/slow", &RenderOptions::default(), 1)
            .await
    });
    tokio::time::timeout(Duration::from_secs(5), async {
        while profiles_in(root).is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("slow render never launched");
    let running = profiles_in(root);

    fast.render_and_extract("https://example.test/fast", &RenderOptions::default(), 1)
        .await
        .unwrap();

    // The fast teardown swept while the slow render was still in flight.
    assert_eq!(guard.in_flight(), 1);
    assert_eq!(profiles_in(root), running);
    assert!(running[0].join("Local State").exists());
    assert!(leftover.exists(), "fresh leftover removed under load");

    slow_task.await.unwrap().unwrap();

    // Last teardown runs with nothing in flight and clears everything.
    assert_eq!(guard.in_flight(), 0);
    assert_eq!(sweeper.live_profiles(), 0);
    assert!(!leftover.exists());
    assert_eq!(std::fs::read_dir(root).unwrap().count(), 0);
}

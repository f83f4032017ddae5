//! Remix engine orchestration tests
//!
//! Test File: engine_tests.rs
//! Drives the engine against a scripted backend and checks modes, session
//! data and the events published for each workflow.

mod helpers;

use std::sync::atomic::Ordering;
use std::time::Duration;

use remix_common::events::{NotificationLevel, RemixEvent};
use remix_engine::engine::{EngineError, Rejection};
use remix_engine::models::{
    AppMode, MatcherMode, RemixSettings, RemixStyle, TrackFile, TrackSlot,
};
use remix_engine::services::ServiceError;

use helpers::{drain_events, error_notifications, sample_match, test_engine, FakeBackend};

fn mode_changes(events: &[RemixEvent]) -> Vec<(AppMode, AppMode)> {
    events
        .iter()
        .filter_map(|e| match e {
            RemixEvent::ModeChanged {
                old_mode, new_mode, ..
            } => Some((*old_mode, *new_mode)),
            _ => None,
        })
        .collect()
}

fn progress_values(events: &[RemixEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            RemixEvent::RemixProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

fn notification(event: &RemixEvent) -> Option<(NotificationLevel, &str, &str)> {
    match event {
        RemixEvent::Notification {
            level,
            title,
            message,
            ..
        } => Some((*level, title.as_str(), message.as_str())),
        _ => None,
    }
}

fn six_megabytes(name: &str) -> TrackFile {
    TrackFile::new(name, 6 * 1024 * 1024)
}

#[tokio::test]
async fn tc_engine_001_select_track_analyzes_and_retargets_tempo() {
    let fake = FakeBackend::new();
    fake.analysis_bpm("track.mp3", 145.0);
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();

    let events = drain_events(&mut rx);
    assert_eq!(
        mode_changes(&events),
        vec![
            (AppMode::Upload, AppMode::Analyzing),
            (AppMode::Analyzing, AppMode::Analyzed)
        ]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        RemixEvent::AnalysisCompleted { slot: TrackSlot::Track1, bpm, .. } if *bpm == 145.0
    )));
    assert!(error_notifications(&events).is_empty());

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzed);
    assert_eq!(snapshot.settings.target_bpm, 145.0);
    assert_eq!(snapshot.analysis1.unwrap().file_name, "track.mp3");
    assert!(snapshot.stems1.is_some());
    assert!(snapshot.can_remix);
}

#[tokio::test]
async fn tc_engine_002_remix_progress_is_capped_until_resolution() {
    let fake = FakeBackend::new();
    fake.remix_delay(Duration::from_millis(250));
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    let settings = RemixSettings {
        style: RemixStyle::HardTechno,
        ..RemixSettings::default()
    };
    engine.update_settings(settings).await.unwrap();
    drain_events(&mut rx);

    engine.start_remix().await.unwrap();

    let events = drain_events(&mut rx);
    let progress = progress_values(&events);
    assert!(progress.len() >= 3, "expected ticks, got {:?}", progress);
    assert_eq!(progress.first(), Some(&0.0));
    assert_eq!(progress.last(), Some(&100.0));

    let before_resolution = &progress[..progress.len() - 1];
    assert!(before_resolution.iter().all(|p| *p <= 90.0));
    assert!(before_resolution.windows(2).all(|w| w[0] <= w[1]));

    assert_eq!(
        mode_changes(&events),
        vec![
            (AppMode::Analyzed, AppMode::Remixing),
            (AppMode::Remixing, AppMode::Complete)
        ]
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, RemixEvent::RemixCompleted { .. })));

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Complete);
    assert_eq!(snapshot.progress, 100.0);
    assert!(snapshot.remix_result.is_some());
    assert_eq!(fake.remix_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tc_engine_003_rate_limited_remix_returns_to_analyzed() {
    let fake = FakeBackend::new();
    fake.fail_remix(ServiceError::RateLimited(
        "Rate limit exceeded. Please try again later.".to_string(),
    ));
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    drain_events(&mut rx);

    engine.start_remix().await.unwrap();

    let events = drain_events(&mut rx);
    let errors = error_notifications(&events);
    assert_eq!(errors.len(), 1);
    let (_, title, message) = notification(errors[0]).unwrap();
    assert_eq!(title, "Rate limited");
    assert_eq!(message, "Rate limit exceeded. Please try again later.");

    assert_eq!(
        mode_changes(&events),
        vec![
            (AppMode::Analyzed, AppMode::Remixing),
            (AppMode::Remixing, AppMode::Analyzed)
        ]
    );
    assert_eq!(progress_values(&events).last(), Some(&0.0));

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzed);
    assert_eq!(snapshot.progress, 0.0);
    assert!(snapshot.remix_result.is_none());
}

#[tokio::test]
async fn tc_engine_004_clearing_track1_keeps_track2() {
    let fake = FakeBackend::new();
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("one.mp3"))
        .await
        .unwrap();
    engine
        .select_track(TrackSlot::Track2, six_megabytes("two.mp3"))
        .await
        .unwrap();
    drain_events(&mut rx);

    engine.clear_track(TrackSlot::Track1).await;

    let events = drain_events(&mut rx);
    assert_eq!(
        mode_changes(&events),
        vec![(AppMode::Analyzed, AppMode::Upload)]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        RemixEvent::TrackCleared {
            slot: TrackSlot::Track1,
            ..
        }
    )));

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Upload);
    assert!(snapshot.track1.is_none());
    assert!(snapshot.analysis1.is_none());
    assert_eq!(snapshot.track2.unwrap().name, "two.mp3");
    assert_eq!(snapshot.analysis2.unwrap().file_name, "two.mp3");
    assert!(snapshot.stems2.is_some());
    assert!(!snapshot.can_remix);
}

#[tokio::test]
async fn tc_engine_005_track1_failure_returns_to_upload() {
    let fake = FakeBackend::new();
    fake.fail_analysis(
        "broken.mp3",
        ServiceError::Status {
            status: 500,
            message: "Failed to analyze audio".to_string(),
        },
    );
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("broken.mp3"))
        .await
        .unwrap();

    let events = drain_events(&mut rx);
    let errors = error_notifications(&events);
    assert_eq!(errors.len(), 1);
    let (_, title, message) = notification(errors[0]).unwrap();
    assert_eq!(title, "Analysis failed");
    assert_eq!(message, "Failed to analyze audio");

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Upload);
    assert!(snapshot.analysis1.is_none());
    assert_eq!(snapshot.track1.unwrap().name, "broken.mp3");
}

#[tokio::test]
async fn tc_engine_006_track2_failure_keeps_primary_analysis() {
    let fake = FakeBackend::new();
    fake.fail_analysis(
        "second.mp3",
        ServiceError::Network("connection reset".to_string()),
    );
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("first.mp3"))
        .await
        .unwrap();
    engine
        .select_track(TrackSlot::Track2, six_megabytes("second.mp3"))
        .await
        .unwrap();

    let events = drain_events(&mut rx);
    assert_eq!(error_notifications(&events).len(), 1);

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzed);
    assert!(snapshot.analysis1.is_some());
    assert!(snapshot.analysis2.is_none());
}

#[tokio::test]
async fn tc_engine_007_track2_failure_without_primary_returns_to_upload() {
    let fake = FakeBackend::new();
    fake.fail_analysis(
        "second.mp3",
        ServiceError::Network("connection reset".to_string()),
    );
    let (engine, _rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track2, six_megabytes("second.mp3"))
        .await
        .unwrap();

    assert_eq!(engine.snapshot().await.mode, AppMode::Upload);
}

#[tokio::test]
async fn tc_engine_008_remix_without_analysis_is_rejected_once() {
    let fake = FakeBackend::new();
    let (engine, mut rx) = test_engine(&fake);

    let result = engine.start_remix().await;
    assert!(matches!(
        result,
        Err(EngineError::Rejected(Rejection::MissingPrimaryAnalysis))
    ));

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    let (level, title, _) = notification(&events[0]).unwrap();
    assert_eq!(level, NotificationLevel::Error);
    assert_eq!(title, "No track analyzed");
    assert!(mode_changes(&events).is_empty());

    assert_eq!(engine.snapshot().await.mode, AppMode::Upload);
    assert_eq!(fake.remix_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn tc_engine_009_second_match_search_is_rejected() {
    let fake = FakeBackend::new();
    let (engine, mut rx) = test_engine(&fake);

    let job = engine.begin_matches().await.unwrap();
    assert!(job.analysis.is_none());
    drain_events(&mut rx);

    let second = engine.begin_matches().await;
    assert!(matches!(
        second,
        Err(EngineError::Rejected(Rejection::MatchSearchInProgress))
    ));
    assert_eq!(error_notifications(&drain_events(&mut rx)).len(), 1);

    engine.run_matches(job).await;
    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.matches.len(), 2);
    assert_eq!(fake.match_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tc_engine_010_second_remix_is_rejected() {
    let fake = FakeBackend::new();
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    let job = engine.begin_remix().await.unwrap();
    drain_events(&mut rx);

    let second = engine.begin_remix().await;
    assert!(matches!(
        second,
        Err(EngineError::Rejected(Rejection::RemixInProgress))
    ));
    assert_eq!(error_notifications(&drain_events(&mut rx)).len(), 1);

    engine.run_remix(job).await;
    assert_eq!(engine.snapshot().await.mode, AppMode::Complete);
    assert_eq!(fake.remix_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn tc_engine_011_failed_search_keeps_previous_matches() {
    let fake = FakeBackend::new();
    fake.match_outcome(Ok(vec![
        sample_match("Keeper", 92.0),
        sample_match("Other", 70.0),
        sample_match("Third", 60.0),
    ]));
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    engine.find_matches().await.unwrap();
    assert_eq!(engine.snapshot().await.matches.len(), 3);
    drain_events(&mut rx);

    fake.match_outcome(Err(ServiceError::Status {
        status: 500,
        message: "AI gateway error".to_string(),
    }));
    engine.find_matches().await.unwrap();

    let events = drain_events(&mut rx);
    let errors = error_notifications(&events);
    assert_eq!(errors.len(), 1);
    assert_eq!(notification(errors[0]).unwrap().1, "Match search failed");

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzed);
    assert_eq!(snapshot.matches.len(), 3);
    assert_eq!(snapshot.matches[0].title, "Keeper");
}

#[tokio::test]
async fn tc_engine_012_stale_analysis_is_discarded() {
    let fake = FakeBackend::new();
    fake.analysis_delay("slow.mp3", Duration::from_millis(150));
    let (engine, mut rx) = test_engine(&fake);

    let slow = engine
        .begin_track(TrackSlot::Track1, six_megabytes("slow.mp3"))
        .await
        .unwrap();
    let slow_task = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_analysis(slow).await })
    };

    engine
        .select_track(TrackSlot::Track1, six_megabytes("fast.mp3"))
        .await
        .unwrap();
    slow_task.await.unwrap();

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzed);
    assert_eq!(snapshot.track1.unwrap().name, "fast.mp3");
    assert_eq!(snapshot.analysis1.unwrap().file_name, "fast.mp3");

    let completed = drain_events(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, RemixEvent::AnalysisCompleted { .. }))
        .count();
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn tc_engine_013_clearing_track1_discards_running_remix() {
    let fake = FakeBackend::new();
    fake.remix_delay(Duration::from_millis(150));
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    let job = engine.begin_remix().await.unwrap();
    let remix_task = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_remix(job).await })
    };

    tokio::time::sleep(Duration::from_millis(40)).await;
    engine.clear_track(TrackSlot::Track1).await;
    drain_events(&mut rx);
    remix_task.await.unwrap();

    let late = drain_events(&mut rx);
    assert!(!late
        .iter()
        .any(|e| matches!(e, RemixEvent::RemixCompleted { .. })));
    assert!(progress_values(&late).is_empty());

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Upload);
    assert!(snapshot.remix_result.is_none());
    assert_eq!(snapshot.progress, 0.0);
}

#[tokio::test]
async fn tc_engine_014_invalid_settings_are_rejected() {
    let fake = FakeBackend::new();
    let (engine, mut rx) = test_engine(&fake);

    let settings = RemixSettings {
        drop_length: 20,
        ..RemixSettings::default()
    };
    let result = engine.update_settings(settings).await;

    assert!(matches!(result, Err(EngineError::InvalidInput(_))));
    assert_eq!(error_notifications(&drain_events(&mut rx)).len(), 1);
    assert_eq!(engine.snapshot().await.settings, RemixSettings::default());
}

#[tokio::test]
async fn tc_engine_015_snapshot_derived_values() {
    let fake = FakeBackend::new();
    let (engine, _rx) = test_engine(&fake);

    let empty = engine.snapshot().await;
    assert_eq!(empty.matcher_mode, MatcherMode::Discovery);
    assert!(!empty.can_remix);
    assert!(empty.track1_duration.is_none());
    assert!(empty.remix_stage.is_none());

    let (other, _rx) = test_engine(&fake);
    other
        .select_track(TrackSlot::Track2, six_megabytes("only-second.mp3"))
        .await
        .unwrap();
    assert_eq!(other.snapshot().await.matcher_mode, MatcherMode::None);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    let analyzed = engine.snapshot().await;
    assert_eq!(analyzed.matcher_mode, MatcherMode::Single);
    assert_eq!(analyzed.track1_duration.as_deref(), Some("5:00"));

    engine
        .select_track(TrackSlot::Track2, six_megabytes("other.mp3"))
        .await
        .unwrap();
    assert_eq!(engine.snapshot().await.matcher_mode, MatcherMode::Single);

    engine.start_remix().await.unwrap();
    let complete = engine.snapshot().await;
    assert_eq!(complete.progress, 100.0);
    assert_eq!(complete.remix_duration.as_deref(), Some("4:00"));
    assert!(!complete.is_remixing);
}

#[tokio::test]
async fn tc_engine_016_remix_from_complete_is_allowed() {
    let fake = FakeBackend::new();
    let (engine, _rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    engine.start_remix().await.unwrap();
    engine.start_remix().await.unwrap();

    assert_eq!(engine.snapshot().await.mode, AppMode::Complete);
    assert_eq!(fake.remix_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn tc_engine_017_track2_failure_waits_for_track1_analysis() {
    let fake = FakeBackend::new();
    fake.analysis_delay("first.mp3", Duration::from_millis(100));
    fake.fail_analysis(
        "second.mp3",
        ServiceError::Network("connection reset".to_string()),
    );
    let (engine, mut rx) = test_engine(&fake);

    let first = engine
        .begin_track(TrackSlot::Track1, six_megabytes("first.mp3"))
        .await
        .unwrap();
    let first_task = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run_analysis(first).await })
    };

    engine
        .select_track(TrackSlot::Track2, six_megabytes("second.mp3"))
        .await
        .unwrap();

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzing);
    assert!(snapshot.is_analyzing);
    assert!(matches!(
        engine.begin_matches().await,
        Err(EngineError::Rejected(_))
    ));

    first_task.await.unwrap();

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzed);
    assert_eq!(snapshot.analysis1.unwrap().file_name, "first.mp3");
    assert!(snapshot.analysis2.is_none());

    let events = drain_events(&mut rx);
    assert!(!mode_changes(&events).contains(&(AppMode::Analyzing, AppMode::Upload)));
}

#[tokio::test]
async fn tc_engine_018_older_match_search_cannot_end_newer_one() {
    let fake = FakeBackend::new();
    fake.match_outcome(Ok(vec![sample_match("Outdated", 88.0)]));
    let (engine, mut rx) = test_engine(&fake);

    engine
        .select_track(TrackSlot::Track1, six_megabytes("track.mp3"))
        .await
        .unwrap();
    let older = engine.begin_matches().await.unwrap();

    engine
        .select_track(TrackSlot::Track1, six_megabytes("replacement.mp3"))
        .await
        .unwrap();
    let newer = engine.begin_matches().await.unwrap();
    drain_events(&mut rx);

    engine.run_matches(older).await;

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Matching);
    assert!(snapshot.is_searching);
    assert!(snapshot.matches.is_empty());
    assert!(drain_events(&mut rx).is_empty());

    fake.match_outcome(Ok(vec![
        sample_match("Current", 95.0),
        sample_match("Runner Up", 80.0),
    ]));
    engine.run_matches(newer).await;

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.mode, AppMode::Analyzed);
    assert_eq!(snapshot.matches.len(), 2);
    assert_eq!(snapshot.matches[0].title, "Current");
}

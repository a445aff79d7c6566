//! Orchestrator tests against a scripted resolver

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use crate::core::error_handling::{DownloadError, ResolutionReason};
use crate::core::models::{
    DownloadMode, DownloadOutcome, DownloadRequest, ProgressState, Resolution, SelectionPolicy,
    StreamVariant,
};
use crate::core::orchestrator::BatchOrchestrator;
use crate::core::test_support::*;
use crate::ui::events::{EventEmitter, NotificationLevel};
use crate::ui::form::DownloadForm;

fn single_request(id: &str, policy: SelectionPolicy, dest: PathBuf) -> DownloadRequest {
    DownloadRequest {
        locator: locator(id),
        policy,
        mode: DownloadMode::Single,
        destination: dest,
    }
}

fn playlist_request(id: &str, policy: SelectionPolicy, dest: PathBuf) -> DownloadRequest {
    DownloadRequest {
        locator: playlist_locator(id),
        policy,
        mode: DownloadMode::Playlist,
        destination: dest,
    }
}

fn video_only(height: u32) -> StreamVariant {
    let mut variant = video_variant(height);
    variant.format_id = format!("v{}-silent", height);
    variant.has_audio = false;
    variant
}

#[tokio::test]
async fn test_audio_single_download_succeeds() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(
        ScriptedResolver::new()
            .with_item(media_item("aaa", "Song A", vec![video_variant(720), audio_variant()])),
    );
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);

    let outcomes = orchestrator
        .run(&single_request("aaa", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    assert_eq!(outcomes.len(), 1);
    match &outcomes[0] {
        DownloadOutcome::Success { title, path } => {
            assert_eq!(title, "Song A");
            assert!(path.exists());
            assert_eq!(path.extension().unwrap(), "m4a");
        }
        other => panic!("Expected success, got {:?}", other),
    }
    assert_eq!(resolver.saved.lock()[0].1, "140");

    let events = collect_events(&mut rx);
    assert_eq!(events.completed, 1);
    assert!(events
        .notifications
        .iter()
        .all(|n| n.level == NotificationLevel::Info));
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_one() {
    let dir = TempDir::new().unwrap();
    let resolver = ScriptedResolver::new()
        .with_item(media_item("aaa", "Song A", vec![audio_variant()]));
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(resolver, emitter);

    orchestrator
        .run(&single_request("aaa", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    let events = collect_events(&mut rx);
    let fractions: Vec<f64> = events.progress.iter().map(|p| p.fraction).collect();
    assert!(fractions.len() as u64 > CHUNKS);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]), "{:?}", fractions);
    assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(*fractions.last().unwrap(), 1.0);
    assert_eq!(orchestrator.progress().fraction, 1.0);
    assert!(orchestrator.progress().status_text.contains("Song A"));
}

#[tokio::test]
async fn test_video_falls_back_to_highest_resolution() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(ScriptedResolver::new().with_item(media_item(
        "vid",
        "Clip",
        vec![video_variant(480), video_variant(720), audio_variant()],
    )));
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);

    let outcomes = orchestrator
        .run(&single_request(
            "vid",
            SelectionPolicy::VideoByResolution(Resolution::P1080),
            dir.path().to_path_buf(),
        ))
        .await;

    assert!(outcomes[0].is_success());
    assert_eq!(resolver.saved.lock()[0].1, "v720");

    let events = collect_events(&mut rx);
    assert!(events
        .progress
        .iter()
        .any(|p| p.status_text.contains("1080p not available") && p.status_text.contains("720p")));
}

#[tokio::test]
async fn test_exact_resolution_is_preferred() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(ScriptedResolver::new().with_item(media_item(
        "vid",
        "Clip",
        vec![video_variant(1080), video_only(720), video_variant(720)],
    )));
    let (emitter, _rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);

    let outcomes = orchestrator
        .run(&single_request(
            "vid",
            SelectionPolicy::VideoByResolution(Resolution::P720),
            dir.path().to_path_buf(),
        ))
        .await;

    assert!(outcomes[0].is_success());
    let saved = resolver.saved.lock();
    assert_eq!(saved[0].1, "v720");
}

#[tokio::test]
async fn test_audio_only_without_audio_variant() {
    let dir = TempDir::new().unwrap();
    let resolver = ScriptedResolver::new()
        .with_item(media_item("vid", "Silent", vec![video_variant(720)]));
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(resolver, emitter);

    let outcomes = orchestrator
        .run(&single_request("vid", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0].error(),
        Some(DownloadError::NoVariant {
            policy: SelectionPolicy::AudioOnly
        })
    ));

    let events = collect_events(&mut rx);
    assert_eq!(events.notifications.len(), 1);
    assert_eq!(events.notifications[0].level, NotificationLevel::Error);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_resolution_error_is_reported_once() {
    let dir = TempDir::new().unwrap();
    let resolver = ScriptedResolver::new().with_failing_item(
        "old",
        DownloadError::resolution(ResolutionReason::AgeRestricted, "Sign in to confirm your age"),
    );
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(resolver, emitter);

    let outcomes = orchestrator
        .run(&single_request("old", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    assert_eq!(outcomes[0].error().map(|e| e.kind()), Some("ResolutionError"));
    let events = collect_events(&mut rx);
    assert_eq!(events.notifications.len(), 1);
    assert_eq!(events.completed, 1);
    assert!(orchestrator.progress().status_text.starts_with("Download failed"));
}

#[tokio::test]
async fn test_playlist_continues_past_failures() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(
        ScriptedResolver::new()
            .with_playlist("PL1", "Mix", &["a", "b", "c"])
            .with_item(media_item("a", "Track A", vec![audio_variant()]))
            .with_item(media_item("b", "Track B", vec![video_variant(720)]))
            .with_item(media_item("c", "Track C", vec![audio_variant(), video_variant(1080)])),
    );
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);

    let outcomes = orchestrator
        .run(&playlist_request("PL1", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_success());
    assert!(matches!(outcomes[1].error(), Some(DownloadError::NoVariant { .. })));
    assert!(outcomes[2].is_success());

    assert!(dir.path().join("Track A.m4a").exists());
    assert!(!dir.path().join("Track B.m4a").exists());
    assert!(dir.path().join("Track C.m4a").exists());

    let events = collect_events(&mut rx);
    let errors = events
        .notifications
        .iter()
        .filter(|n| n.level == NotificationLevel::Error)
        .count();
    assert_eq!(errors, 1);
    assert_eq!(events.completed, 1);
    assert!(events
        .progress
        .iter()
        .any(|p| p.status_text.starts_with("Downloading audio 2/3")));
    assert!(orchestrator
        .progress()
        .status_text
        .contains("2 of 3 downloaded"));
}

#[tokio::test]
async fn test_playlist_progress_restarts_for_each_item() {
    let dir = TempDir::new().unwrap();
    let resolver = ScriptedResolver::new()
        .with_playlist("PL6", "Mix", &["a", "b", "c"])
        .with_item(media_item("a", "Track A", vec![audio_variant()]))
        .with_item(media_item("b", "Track B", vec![video_variant(720)]))
        .with_item(media_item("c", "Track C", vec![audio_variant()]));
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(resolver, emitter);

    let outcomes = orchestrator
        .run(&playlist_request("PL6", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    // one segment of progress states per entry, each opened by its i/N status
    let mut segments: Vec<Vec<ProgressState>> = Vec::new();
    for state in collect_events(&mut rx).progress {
        if state.status_text.starts_with("Downloading audio ") && state.fraction == 0.0 {
            segments.push(Vec::new());
        }
        if let Some(segment) = segments.last_mut() {
            segment.push(state);
        }
    }

    assert_eq!(segments.len(), 3);
    for (index, segment) in segments.iter().enumerate() {
        assert!(segment[0]
            .status_text
            .starts_with(&format!("Downloading audio {}/3", index + 1)));
        assert_eq!(segment[0].fraction, 0.0);
        assert!(
            segment.windows(2).all(|w| w[0].fraction <= w[1].fraction),
            "item {} went backwards: {:?}",
            index + 1,
            segment
        );
        if outcomes[index].is_success() {
            assert_eq!(segment.last().unwrap().fraction, 1.0);
        }
    }
    assert!(!outcomes[1].is_success());
}

#[tokio::test]
async fn test_playlist_outcome_count_matches_entries() {
    let dir = TempDir::new().unwrap();
    let ids = ["p1", "p2", "p3", "p4", "p5"];
    let resolver = ScriptedResolver::new()
        .with_playlist("PL2", "Long", &ids)
        .with_item(media_item("p1", "One", vec![audio_variant()]))
        .with_failing_item(
            "p2",
            DownloadError::resolution(ResolutionReason::Private, "Private video"),
        )
        .with_item(media_item("p3", "Three", vec![audio_variant()]))
        .with_item(media_item("p4", "Four", vec![audio_variant()]))
        .with_failing_save("p4");
    // p5 has no script at all, which surfaces as an unexpected error

    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(resolver, emitter);
    let outcomes = orchestrator
        .run(&playlist_request("PL2", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    assert_eq!(outcomes.len(), ids.len());
    let failures = outcomes.iter().filter(|o| !o.is_success()).count();
    assert_eq!(failures, 3);

    let events = collect_events(&mut rx);
    let errors = events
        .notifications
        .iter()
        .filter(|n| n.level == NotificationLevel::Error)
        .count();
    assert_eq!(errors, failures);
}

#[tokio::test]
async fn test_playlist_forces_audio_policy() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(
        ScriptedResolver::new()
            .with_playlist("PL3", "Videos", &["x"])
            .with_item(media_item("x", "Talk", vec![video_variant(1080), audio_variant()])),
    );
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);

    let outcomes = orchestrator
        .run(&playlist_request(
            "PL3",
            SelectionPolicy::VideoByResolution(Resolution::P1080),
            dir.path().to_path_buf(),
        ))
        .await;

    assert!(outcomes[0].is_success());
    assert_eq!(resolver.saved.lock()[0].1, audio_variant().format_id);

    let events = collect_events(&mut rx);
    assert!(events
        .notifications
        .iter()
        .any(|n| n.level == NotificationLevel::Warning && n.message.contains("audio only")));
}

#[tokio::test]
async fn test_unresolvable_playlist() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(ScriptedResolver::new().with_failing_playlist(
        "GONE",
        DownloadError::resolution(ResolutionReason::Unavailable, "The playlist does not exist"),
    ));
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);

    let outcomes = orchestrator
        .run(&playlist_request("GONE", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    assert!(outcomes.is_empty());
    assert_eq!(resolver.resolve_calls.load(Ordering::SeqCst), 0);

    let events = collect_events(&mut rx);
    assert_eq!(events.notifications.len(), 1);
    assert_eq!(events.notifications[0].level, NotificationLevel::Error);
    assert_eq!(events.completed, 1);
}

#[tokio::test]
async fn test_cancel_before_playlist_resolves() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(
        ScriptedResolver::new()
            .with_playlist("PL4", "Cancelled", &["a", "b", "c"])
            .with_item(media_item("a", "A", vec![audio_variant()])),
    );
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);
    orchestrator.cancellation_token().cancel();

    let outcomes = orchestrator
        .run(&playlist_request("PL4", SelectionPolicy::AudioOnly, dir.path().to_path_buf()))
        .await;

    assert!(outcomes.is_empty());
    assert_eq!(resolver.total_calls(), 0);
    assert_eq!(collect_events(&mut rx).completed, 1);
}

#[tokio::test]
async fn test_cancel_mid_playlist_reports_every_entry() {
    let dir = TempDir::new().unwrap();
    let resolver = Arc::new(
        ScriptedResolver::new()
            .with_playlist("PL5", "Slow", &["a", "b", "c"])
            .with_item(media_item("a", "A", vec![audio_variant()]))
            .with_item(media_item("b", "B", vec![audio_variant()]))
            .with_item(media_item("c", "C", vec![audio_variant()]))
            .with_save_delay(Duration::from_secs(30)),
    );
    let (emitter, mut rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(Arc::clone(&resolver), emitter);
    let token = orchestrator.cancellation_token();
    let request = playlist_request("PL5", SelectionPolicy::AudioOnly, dir.path().to_path_buf());

    let run = tokio::spawn(async move { orchestrator.run(&request).await });
    resolver.save_started.notified().await;
    token.cancel();
    let outcomes = run.await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o.error(), Some(DownloadError::Cancelled))));
    // only the first entry got as far as the resolver
    assert_eq!(resolver.resolve_calls.load(Ordering::SeqCst), 1);
    assert!(resolver.saved.lock().is_empty());

    let events = collect_events(&mut rx);
    assert_eq!(events.completed, 1);
    assert!(events
        .notifications
        .iter()
        .any(|n| n.level == NotificationLevel::Warning && n.message.contains("cancelled")));
}

#[tokio::test]
async fn test_empty_url_makes_no_resolver_calls() {
    let resolver = Arc::new(ScriptedResolver::new());
    let (emitter, mut rx) = EventEmitter::channel();

    let form = DownloadForm::new("");
    let request = form.submit(Some(PathBuf::from("unused")), &emitter);
    assert!(request.is_none());
    assert_eq!(resolver.total_calls(), 0);

    let events = collect_events(&mut rx);
    assert_eq!(events.notifications.len(), 1);
    assert_eq!(events.notifications[0].level, NotificationLevel::Warning);
    assert!(events.progress.is_empty());
}

#[tokio::test]
async fn test_download_single_keeps_container_extension() {
    let dir = TempDir::new().unwrap();
    let resolver = ScriptedResolver::new().with_item(media_item(
        "vid",
        "Clip",
        vec![video_variant(1080), audio_variant()],
    ));
    let (emitter, _rx) = EventEmitter::channel();
    let orchestrator = BatchOrchestrator::new(resolver, emitter);

    let outcome = orchestrator
        .download_single(
            &locator("vid"),
            SelectionPolicy::VideoByResolution(Resolution::P1080),
            dir.path(),
        )
        .await;

    match outcome {
        DownloadOutcome::Success { path, .. } => assert_eq!(path.extension().unwrap(), "mp4"),
        other => panic!("Expected success, got {:?}", other),
    }
}

//! Component integration tests.
//!
//! Wires the controller, duration store, state machine and cue scheduler
//! together the way the interactive shell does, substituting the manual
//! clock and the mock audio engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use focusfield::store::{BREAK_MINUTES_KEY, FOCUS_MINUTES_KEY};
use focusfield::{
    AudioEngine, Clock, Cue, DurationStore, Intent, JsonFileStore, KeyValueStore, ManualClock, MemoryStore,
    MockAudioEngine, Mode, RuntimeConfig, Status, TimerController, TimerEvent, Timestamp,
};

fn create_controller(
    store: DurationStore,
    engine: MockAudioEngine,
) -> (
    TimerController<MockAudioEngine>,
    Arc<MockAudioEngine>,
    Arc<ManualClock>,
    mpsc::UnboundedReceiver<TimerEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Arc::new(engine);
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(42_000_000)));
    let controller = TimerController::new(
        store,
        clock.clone() as Arc<dyn Clock>,
        Arc::clone(&engine),
        RuntimeConfig::default(),
    )
    .with_events(tx);
    (controller, engine, clock, rx)
}

fn fast_store() -> DurationStore {
    DurationStore::load(Box::new(MemoryStore::with_values([
        (FOCUS_MINUTES_KEY, "1"),
        (BREAK_MINUTES_KEY, "1"),
    ])))
}

fn drain(rx: &mut mpsc::UnboundedReceiver<TimerEvent>) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Store integration
// ============================================================================

mod store_integration {
    use super::*;

    /// 保存済みの時間で起動し、編集がファイルに即時保存される
    #[tokio::test]
    async fn durations_load_and_persist_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"focusMinutes": "25", "breakMinutes": "abc"}"#).unwrap();

        let store = DurationStore::load(Box::new(JsonFileStore::open(&path).unwrap()));
        let (mut controller, _engine, _clock, _rx) =
            create_controller(store, MockAudioEngine::new());

        assert_eq!(controller.snapshot().remaining_seconds, 1500.0);
        assert_eq!(controller.store().minutes(Mode::Break), 5);

        controller.edit_duration(Mode::Break, "12");

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(BREAK_MINUTES_KEY).unwrap(),
            Some("12".to_string())
        );
    }

    /// 範囲外の保存値は読み込み時に丸められる
    #[tokio::test]
    async fn out_of_range_saved_values_are_clamped() {
        let store = DurationStore::load(Box::new(MemoryStore::with_values([
            (FOCUS_MINUTES_KEY, "0"),
            (BREAK_MINUTES_KEY, "100000"),
        ])));
        let (controller, _engine, _clock, _rx) = create_controller(store, MockAudioEngine::new());

        assert_eq!(controller.store().minutes(Mode::Focus), 1);
        assert_eq!(controller.store().minutes(Mode::Break), 600);
        assert_eq!(controller.snapshot().remaining_seconds, 60.0);
    }

    /// 破損した設定ファイルでも既定値で起動できる
    #[tokio::test]
    async fn corrupt_settings_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        let store = DurationStore::load(Box::new(JsonFileStore::open_or_empty(&path)));
        let (controller, _engine, _clock, _rx) = create_controller(store, MockAudioEngine::new());

        assert_eq!(controller.snapshot().remaining_seconds, 1800.0);
    }
}

// ============================================================================
// Controller integration
// ============================================================================

mod controller_integration {
    use super::*;

    /// 最初の操作でオーディオが有効になり、クリック音とカウントダウンが鳴る
    #[tokio::test]
    async fn first_gesture_unlocks_audio_and_arms_cues() {
        let (mut controller, engine, clock, mut rx) =
            create_controller(fast_store(), MockAudioEngine::locked());

        controller.dispatch(Intent::PlayPause).await;
        assert!(engine.is_unlocked());
        assert_eq!(engine.delivered_count(Cue::Click), 1);

        clock.advance_secs(60.0);
        engine.advance(60.0);
        let snapshot = controller.frame();

        assert_eq!(snapshot.mode, Mode::Break);
        assert_eq!(engine.delivered_count(Cue::Tick), 5);
        assert_eq!(engine.completion_cues_delivered(), 1);

        let events = drain(&mut rx);
        assert!(matches!(events[0], TimerEvent::Started { .. }));
        assert_eq!(
            events[1],
            TimerEvent::Completed {
                finished: Mode::Focus,
                next: Mode::Break,
                cycle_count: 1
            }
        );
    }

    /// フレームが止まっていてもバックグラウンドの評価で完了する
    #[tokio::test]
    async fn background_tick_completes_without_frames() {
        let (mut controller, engine, clock, _rx) =
            create_controller(fast_store(), MockAudioEngine::new());
        controller.dispatch(Intent::PlayPause).await;

        let mono = Instant::now();
        for second in 1..=60 {
            clock.advance_secs(1.0);
            engine.advance(1.0);
            controller
                .background_tick(mono + Duration::from_secs(second))
                .await;
        }

        assert_eq!(controller.snapshot().mode, Mode::Break);
        assert_eq!(engine.completion_cues_delivered(), 1);
    }

    /// スリープ検出で取りこぼしたチャイムを1回だけ鳴らす
    #[tokio::test]
    async fn suspension_detected_by_background_tick_catches_up_once() {
        let (mut controller, engine, clock, mut rx) =
            create_controller(fast_store(), MockAudioEngine::new());
        controller.dispatch(Intent::PlayPause).await;
        drain(&mut rx);

        let mono = Instant::now() + Duration::from_secs(1);
        clock.advance_secs(300.0);
        controller.background_tick(mono).await;
        controller.background_tick(mono).await;
        controller.resume().await;

        assert_eq!(engine.completion_cues_delivered(), 1);
        let caught_up = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, TimerEvent::CueCaughtUp { .. }))
            .count();
        assert_eq!(caught_up, 1);
    }

    /// 実行中の時間変更は次のリセットまで反映されない
    #[tokio::test]
    async fn duration_edit_while_running_waits_for_reset() {
        let (mut controller, _engine, clock, _rx) =
            create_controller(fast_store(), MockAudioEngine::new());
        controller.dispatch(Intent::PlayPause).await;
        clock.advance_secs(10.0);

        controller.edit_duration(Mode::Focus, "3");
        assert_eq!(controller.snapshot().total_seconds, 60.0);
        assert_eq!(controller.snapshot().status, Status::Running);

        controller.dispatch(Intent::Reset).await;
        assert_eq!(controller.snapshot().remaining_seconds, 180.0);
        assert_eq!(controller.snapshot().status, Status::Idle);
    }

    /// 時間追加は実行中の締め切りを延ばし、古いチャイムは鳴らない
    #[tokio::test]
    async fn add_time_supersedes_old_cues() {
        let (mut controller, engine, clock, _rx) =
            create_controller(fast_store(), MockAudioEngine::new());
        controller.dispatch(Intent::PlayPause).await;
        controller.dispatch(Intent::AddTime(60.0)).await;

        clock.advance_secs(60.0);
        engine.advance(60.0);
        assert_eq!(controller.frame().mode, Mode::Focus);
        assert_eq!(engine.completion_cues_delivered(), 0);

        clock.advance_secs(60.0);
        engine.advance(60.0);
        assert_eq!(controller.frame().mode, Mode::Break);
        assert_eq!(engine.completion_cues_delivered(), 1);
    }

    /// ミュート中も状態遷移とスケジュールは通常どおり行われる
    #[tokio::test]
    async fn mute_does_not_affect_transitions() {
        let (mut controller, engine, _clock, _rx) =
            create_controller(fast_store(), MockAudioEngine::new());
        controller.set_muted(true);

        assert!(controller.dispatch(Intent::PlayPause).await);
        assert!(engine.is_muted());
        assert!(!engine.pending().is_empty());
    }
}

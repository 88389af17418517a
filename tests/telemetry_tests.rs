use std::rc::Rc;
use std::time::Duration;

use utterance_queue::kernel::telemetry::event::{DropReason, QueueEvent, QueuePosition};
use utterance_queue::kernel::telemetry::recorder::TelemetryRecorder;
use utterance_queue::{QueueConfig, RecordingAnnouncer, Utterance, UtteranceQueue};

#[test]
fn test_snapshot_counts_queue_flow() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());

    let position = Utterance::from_alert("Ball at 3 meters");
    queue.add_to_back(&position);
    queue.step_queue(Duration::from_millis(100));
    queue.add_to_back(&position);
    queue.step_queue(Duration::from_millis(250));

    let snapshot = queue.telemetry_snapshot();
    assert_eq!(snapshot.flow.enqueued, 2);
    assert_eq!(snapshot.flow.replaced, 1);
    assert_eq!(snapshot.flow.announced, 1);
    assert_eq!(snapshot.flow.completed, 1);
    assert_eq!(snapshot.wait.samples, 1);
    assert_eq!(snapshot.wait.max_ms, 350.0);

    println!("{}", serde_json::to_string_pretty(&snapshot).unwrap());
}

#[test]
fn test_event_order_for_single_announcement() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());

    let status = Utterance::from_alert("status");
    queue.add_to_back(&status);
    queue.step_queue(Duration::from_millis(250));

    let id = status.id();
    assert_eq!(
        queue.telemetry_events(),
        vec![
            QueueEvent::Enqueued {
                utterance_id: id,
                position: QueuePosition::Back,
            },
            QueueEvent::Announced {
                utterance_id: id,
                time_in_queue_ms: 250.0,
            },
            QueueEvent::Completed { utterance_id: id },
        ]
    );
}

#[test]
fn test_immediate_announcement_reports_zero_wait() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());

    queue.announce_immediately("now");

    let snapshot = queue.telemetry_snapshot();
    assert_eq!(snapshot.flow.announced, 1);
    assert_eq!(snapshot.wait.total_ms, 0.0);
    assert!(serde_json::to_string(&snapshot).is_ok());
}

#[test]
fn test_events_never_carry_text() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());
    queue.set_muted(true);

    queue.add_to_back("secret password hint");
    queue.step_queue(Duration::from_millis(250));
    queue.set_muted(false);
    queue.announce_immediately("secret password hint");

    let events = queue.telemetry_events();
    assert!(events.contains(&QueueEvent::Dropped {
        utterance_id: match &events[0] {
            QueueEvent::Enqueued { utterance_id, .. } => *utterance_id,
            other => panic!("unexpected first event {other:?}"),
        },
        reason: DropReason::Muted,
    }));

    let json = serde_json::to_string(&events).unwrap();
    assert!(!json.contains("secret"));
}

#[test]
fn test_capacity_bounds_event_log() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let config = QueueConfig {
        telemetry_capacity: 4,
        ..Default::default()
    };
    let queue = UtteranceQueue::with_config(announcer.clone(), config);

    for i in 0..10 {
        queue.add_to_back(format!("update {i}"));
    }
    assert_eq!(queue.len(), 10);
    assert_eq!(queue.telemetry_events().len(), 4);
    assert_eq!(queue.telemetry_snapshot().flow.enqueued, 4);
}

#[test]
fn test_recorder_evicts_oldest() {
    let mut recorder = TelemetryRecorder::with_capacity(2);
    recorder.record(QueueEvent::Cleared { count: 1 });
    recorder.record(QueueEvent::Cleared { count: 2 });
    recorder.record(QueueEvent::Cleared { count: 3 });

    assert_eq!(recorder.len(), 2);
    assert_eq!(
        recorder.events(),
        vec![QueueEvent::Cleared { count: 2 }, QueueEvent::Cleared { count: 3 }]
    );
    assert_eq!(recorder.snapshot().flow.cleared, 5);

    recorder.clear();
    assert!(recorder.is_empty());
}

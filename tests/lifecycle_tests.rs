use std::rc::Rc;
use std::time::Duration;

use utterance_queue::{
    Announcer, CompletionMode, QueueConfig, RecordingAnnouncer, StepTimer, Utterance,
    UtteranceOptions, UtteranceQueue,
};

fn manual() -> (Rc<RecordingAnnouncer>, UtteranceQueue) {
    let announcer = Rc::new(RecordingAnnouncer::new().with_completion(CompletionMode::Manual));
    let queue = UtteranceQueue::new(announcer.clone());
    (announcer, queue)
}

fn utterance(text: &str, priority: f64) -> Utterance {
    Utterance::new(UtteranceOptions {
        alert: text.into(),
        priority,
        ..Default::default()
    })
}

fn settle(queue: &UtteranceQueue) {
    queue.step_queue(Duration::from_millis(250));
}

#[test]
fn test_completion_clears_announcing_slot() {
    let (announcer, queue) = manual();
    let first = utterance("first", 1.0);
    let second = utterance("second", 1.0);

    queue.add_to_back(&first);
    settle(&queue);
    assert_eq!(queue.announcing_utterance(), Some(first.clone()));

    // Busy announcer: the next one waits.
    queue.add_to_back(&second);
    settle(&queue);
    assert_eq!(announcer.spoken().len(), 1);
    assert!(queue.has_utterance(&second));

    assert_eq!(announcer.finish(), Some(first.clone()));
    assert_eq!(queue.announcing_utterance(), None);
    assert_eq!(first.priority_property().listener_count(), 0);

    queue.step_queue(Duration::from_millis(1));
    assert_eq!(queue.announcing_utterance(), Some(second));
}

#[test]
fn test_raising_queued_priority_interrupts_announcement() {
    let (announcer, queue) = manual();
    let first = utterance("first", 1.0);
    let second = utterance("second", 1.0);

    queue.add_to_back(&first);
    settle(&queue);
    queue.add_to_back(&second);
    assert!(announcer.interrupted().is_empty());

    second.set_priority(3.0);
    assert_eq!(announcer.interrupted(), vec![first]);
    assert_eq!(queue.announcing_utterance(), None);

    settle(&queue);
    assert_eq!(announcer.speaking(), Some(second));
}

#[test]
fn test_raising_announcing_priority_keeps_it_tracked() {
    let (announcer, queue) = manual();
    let first = utterance("first", 1.0);
    let second = utterance("second", 2.0);

    queue.add_to_back(&first);
    settle(&queue);
    // The announcing wrapper keeps its listener while in flight.
    assert_eq!(first.priority_property().listener_count(), 1);

    first.set_priority(5.0);
    queue.add_to_back(&second);
    assert!(announcer.interrupted().is_empty());
    assert_eq!(announcer.speaking(), Some(first));
}

#[test]
fn test_requeue_while_announcing_tracks_both_copies() {
    let (announcer, queue) = manual();
    let status = utterance("status", 1.0);

    queue.add_to_back(&status);
    settle(&queue);
    queue.add_to_back(&status);
    assert_eq!(queue.len(), 1);
    assert_eq!(status.priority_property().listener_count(), 2);

    announcer.finish();
    assert_eq!(status.priority_property().listener_count(), 1);
    settle(&queue);
    assert_eq!(announcer.spoken(), vec!["status".to_string(), "status".to_string()]);
}

#[test]
fn test_shared_announcer_only_touches_own_queue() {
    let announcer = Rc::new(RecordingAnnouncer::new().with_completion(CompletionMode::Manual));
    let voicing = UtteranceQueue::new(announcer.clone());
    let description = UtteranceQueue::new(announcer.clone());

    let first = utterance("first", 1.0);
    voicing.add_to_back(&first);
    settle(&voicing);
    assert_eq!(voicing.announcing_utterance(), Some(first.clone()));

    // A completion this queue never dispatched.
    let foreign = utterance("foreign", 1.0);
    announcer.announcement_complete_emitter().emit(&foreign);
    assert_eq!(voicing.announcing_utterance(), Some(first));
    assert_eq!(description.announcing_utterance(), None);

    announcer.finish();
    assert_eq!(voicing.announcing_utterance(), None);
}

#[test]
fn test_clear_keeps_current_announcement() {
    let (announcer, queue) = manual();
    let first = utterance("first", 1.0);
    queue.add_to_back(&first);
    settle(&queue);

    let waiting: Vec<Utterance> = (0..3).map(|i| utterance(&format!("waiting {i}"), 1.0)).collect();
    for u in &waiting {
        queue.add_to_back(u);
    }
    assert_eq!(queue.len(), 3);

    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(announcer.speaking(), Some(first));
    assert!(waiting.iter().all(|u| u.priority_property().listener_count() == 0));
    assert_eq!(queue.telemetry_snapshot().flow.cleared, 3);
}

#[test]
fn test_cancel_stops_everything() {
    let (announcer, queue) = manual();
    let first = utterance("first", 1.0);
    queue.add_to_back(&first);
    settle(&queue);
    queue.add_to_back("next");

    queue.cancel();
    assert!(queue.is_empty());
    assert_eq!(announcer.speaking(), None);
    assert_eq!(announcer.interrupted(), vec![first]);
    assert_eq!(queue.announcing_utterance(), None);
}

#[test]
fn test_cancel_utterance() {
    let (announcer, queue) = manual();
    let first = utterance("first", 1.0);
    let second = utterance("second", 1.0);
    queue.add_to_back(&first);
    settle(&queue);
    queue.add_to_back(&second);

    // Queued: removed.
    queue.cancel_utterance(&second);
    assert!(!queue.has_utterance(&second));
    assert_eq!(announcer.speaking(), Some(first.clone()));

    // Announcing: interrupted by the announcer.
    queue.cancel_utterance(&first);
    assert_eq!(announcer.interrupted(), vec![first]);
    assert_eq!(queue.announcing_utterance(), None);
    assert_eq!(queue.telemetry_snapshot().flow.removed, 1);
}

#[test]
fn test_disabled_queue_ignores_requests() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());

    queue.add_to_back("kept");
    queue.set_enabled(false);

    queue.add_to_back("ignored");
    queue.announce_immediately("also ignored");
    settle(&queue);
    assert!(announcer.spoken().is_empty());
    // Disabling does not clear.
    assert_eq!(queue.len(), 1);

    queue.set_enabled(true);
    settle(&queue);
    assert_eq!(announcer.spoken(), vec!["kept".to_string()]);
}

#[test]
fn test_uninitialized_queue_is_inert() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let config = QueueConfig {
        initialize: false,
        ..Default::default()
    };
    let queue = UtteranceQueue::with_config(announcer.clone(), config);
    assert!(!queue.is_initialized());
    assert_eq!(announcer.announcement_complete_emitter().listener_count(), 0);

    queue.add_to_back("nothing");
    queue.announce_immediately("nothing either");
    settle(&queue);
    assert!(queue.is_empty());
    assert!(announcer.spoken().is_empty());
}

#[test]
#[allow(deprecated)]
fn test_add_to_front_inserts_first() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());
    let back = utterance("back", 1.0);
    let front = utterance("front", 1.0);

    queue.add_to_back(&back);
    queue.add_to_front(&front);
    assert_eq!(queue.utterances(), vec![front.clone(), back.clone()]);

    // Still priority-tracked.
    back.set_priority(2.0);
    assert_eq!(queue.utterances(), vec![back]);
}

#[test]
fn test_dispose_releases_listeners() {
    let announcer = Rc::new(RecordingAnnouncer::new().with_completion(CompletionMode::Manual));
    let timer = StepTimer::new();
    let first = utterance("first", 1.0);
    let second = utterance("second", 1.0);

    {
        let queue = UtteranceQueue::new(announcer.clone());
        queue.attach_to_timer(&timer);
        queue.add_to_back(&first);
        timer.step(Duration::from_millis(250));
        queue.add_to_back(&second);
        assert_eq!(announcer.announcement_complete_emitter().listener_count(), 1);

        queue.dispose();
        queue.dispose();
        assert!(queue.is_empty());
    }

    assert_eq!(announcer.announcement_complete_emitter().listener_count(), 0);
    assert_eq!(first.priority_property().listener_count(), 0);
    assert_eq!(second.priority_property().listener_count(), 0);

    // Timer no longer reaches the queue.
    timer.step(Duration::from_millis(250));
    assert_eq!(announcer.spoken(), vec!["first".to_string()]);
}

#[test]
fn test_drop_disposes() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let status = Utterance::from_alert("status");
    {
        let queue = UtteranceQueue::new(announcer.clone());
        queue.add_to_back(&status);
    }
    assert_eq!(status.priority_property().listener_count(), 0);
    assert_eq!(announcer.announcement_complete_emitter().listener_count(), 0);
}

#[test]
fn test_step_timer_drives_attached_queue() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());
    let timer = StepTimer::new();
    let other = StepTimer::new();

    queue.attach_to_timer(&timer);
    // Re-attaching moves the subscription.
    queue.attach_to_timer(&other);

    queue.add_to_back("tick");
    timer.step(Duration::from_millis(250));
    assert!(announcer.spoken().is_empty());

    other.step(Duration::from_millis(250));
    assert_eq!(announcer.spoken(), vec!["tick".to_string()]);

    queue.detach_from_timer();
    queue.add_to_back("tock");
    other.step(Duration::from_millis(250));
    assert_eq!(announcer.spoken().len(), 1);
}

#[tokio::test]
async fn test_step_timer_run_dispatches_in_real_time() {
    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::new(announcer.clone());
    let timer = StepTimer::new();
    queue.attach_to_timer(&timer);

    queue.add_to_back(Utterance::new(UtteranceOptions {
        alert: "settled".into(),
        alert_stable_delay: 40.0,
        ..Default::default()
    }));

    let result = tokio::time::timeout(Duration::from_millis(400), timer.run(Duration::from_millis(10))).await;
    assert!(result.is_err(), "run never returns on its own");
    assert_eq!(announcer.spoken(), vec!["settled".to_string()]);
    println!("Spoken: {:?}", announcer.spoken());
}

use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use utterance_queue::kernel::time::TICK_MS;
use utterance_queue::{
    QueueConfig, RecordingAnnouncer, StepTimer, Utterance, UtteranceOptions, UtteranceQueue,
};

const RUN_FOR: Duration = Duration::from_millis(600);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => QueueConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => QueueConfig::default(),
    };
    tracing::info!("Utterance queue booting. Config: {:?}", config);

    let announcer = Rc::new(RecordingAnnouncer::new());
    let queue = UtteranceQueue::with_config(announcer.clone(), config);
    let timer = StepTimer::new();
    queue.attach_to_timer(&timer);

    queue.announce_immediately("Simulation started");

    // Rapid-fire updates collapse into one announcement once they settle.
    let position = Utterance::from_alert("Ball at 1 meter");
    for meters in 1..=4 {
        position.set_alert(format!("Ball at {meters} meters"));
        queue.add_to_back(&position);
    }
    let hint = Utterance::new(UtteranceOptions {
        alert: "Drag the ball to move it".into(),
        priority: Utterance::LOW_PRIORITY,
        ..Default::default()
    });
    queue.add_to_back(&hint);

    // The timer loop never ends on its own.
    let period = Duration::from_millis(TICK_MS);
    let _ = tokio::time::timeout(RUN_FOR, timer.run(period)).await;

    // Outranks and removes everything still waiting.
    let warning = Utterance::new(UtteranceOptions {
        alert: "Ball is about to fall off the table".into(),
        priority: Utterance::HIGH_PRIORITY,
        ..Default::default()
    });
    queue.add_to_back(&position);
    queue.add_to_back(&warning);
    let _ = tokio::time::timeout(RUN_FOR, timer.run(period)).await;

    for text in announcer.spoken() {
        println!("[SPOKEN] {text}");
    }
    println!("{}", serde_json::to_string_pretty(&queue.telemetry_snapshot())?);

    queue.dispose();
    Ok(())
}

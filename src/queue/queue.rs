use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::config::QueueConfig;
use super::wrapper::{UtteranceWrapper, WrapperTiming};
use crate::announcer::Announcer;
use crate::kernel::reactive::ListenerId;
use crate::kernel::telemetry::event::{DropReason, QueueEvent, QueuePosition};
use crate::kernel::telemetry::metrics::QueueSnapshot;
use crate::kernel::telemetry::recorder::TelemetryRecorder;
use crate::kernel::time::StepTimer;
use crate::utterance::{AnnouncingFeature, ResponseCollector, Utterance};

/// Priority-aware, debounced scheduler feeding one `Announcer`.
///
/// **QUEUE LAW**: every mutation runs to completion synchronously. No
/// internal borrow is held while the announcer or a priority listener runs,
/// so both may call back into the queue.
///
/// Dropping the queue disposes it.
pub struct UtteranceQueue {
    core: Rc<QueueCore>,
}

struct QueueCore {
    announcer: Rc<dyn Announcer>,
    initialized: bool,
    feature_control: Option<AnnouncingFeature>,

    // Front-to-back announce order. An utterance appears at most once.
    queue: RefCell<Vec<Rc<UtteranceWrapper>>>,
    // Wrapper handed to the announcer and not yet completed. Its utterance
    // may be queued again at the same time.
    announcing: RefCell<Option<Rc<UtteranceWrapper>>>,

    muted: Cell<bool>,
    enabled: Cell<bool>,
    disposed: Cell<bool>,

    response_collector: RefCell<ResponseCollector>,
    telemetry: RefCell<TelemetryRecorder>,

    complete_listener: Cell<Option<ListenerId>>,
    timer: RefCell<Option<(StepTimer, ListenerId)>>,
}

impl UtteranceQueue {
    pub fn new(announcer: Rc<dyn Announcer>) -> Self {
        Self::with_config(announcer, QueueConfig::default())
    }

    pub fn with_config(announcer: Rc<dyn Announcer>, config: QueueConfig) -> Self {
        let core = Rc::new(QueueCore {
            announcer,
            initialized: config.initialize,
            feature_control: config.feature_control,
            queue: RefCell::new(Vec::new()),
            announcing: RefCell::new(None),
            muted: Cell::new(config.muted),
            enabled: Cell::new(config.enabled),
            disposed: Cell::new(false),
            response_collector: RefCell::new(ResponseCollector::new()),
            telemetry: RefCell::new(TelemetryRecorder::with_capacity(config.telemetry_capacity)),
            complete_listener: Cell::new(None),
            timer: RefCell::new(None),
        });

        if core.initialized {
            let weak = Rc::downgrade(&core);
            let id = core
                .announcer
                .announcement_complete_emitter()
                .add_listener(move |utterance: &Utterance| {
                    if let Some(core) = weak.upgrade() {
                        core.on_announcement_complete(utterance);
                    }
                });
            core.complete_listener.set(Some(id));
        }

        Self { core }
    }

    /// Queue `alertable` behind everything already waiting.
    pub fn add_to_back(&self, alertable: impl Into<Utterance>) {
        self.core.add(alertable.into(), QueuePosition::Back);
    }

    /// Timing-based eligibility, not insertion position, decides what is
    /// announced next, so front insertion rarely does what callers expect.
    #[deprecated(note = "use add_to_back or announce_immediately")]
    pub fn add_to_front(&self, alertable: impl Into<Utterance>) {
        warn!("add_to_front is deprecated: position does not decide announce order");
        self.core.add(alertable.into(), QueuePosition::Front);
    }

    /// Skip the debounce and announce now, unless the utterance currently
    /// being announced outranks this one (then it is silently dropped).
    pub fn announce_immediately(&self, alertable: impl Into<Utterance>) {
        self.core.announce_immediately(alertable.into());
    }

    /// Stop `utterance` if it is being announced and remove it from the queue.
    pub fn cancel_utterance(&self, utterance: &Utterance) {
        self.core.cancel_utterance(utterance);
    }

    /// Empty the queue. The current announcement keeps going.
    pub fn clear(&self) {
        self.core.clear();
    }

    /// Empty the queue and stop the current announcement.
    pub fn cancel(&self) {
        self.core.clear();
        self.core.announcer.cancel();
    }

    pub fn has_utterance(&self, utterance: &Utterance) -> bool {
        self.core.has_utterance(utterance)
    }

    pub fn len(&self) -> usize {
        self.core.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.queue.borrow().is_empty()
    }

    /// Queued utterances, front to back.
    pub fn utterances(&self) -> Vec<Utterance> {
        self.core
            .queue
            .borrow()
            .iter()
            .map(|w| w.utterance().clone())
            .collect()
    }

    pub fn timing(&self, utterance: &Utterance) -> Option<WrapperTiming> {
        self.core
            .queue
            .borrow()
            .iter()
            .find(|w| w.utterance().ptr_eq(utterance))
            .map(|w| w.timing())
    }

    pub fn announcing_utterance(&self) -> Option<Utterance> {
        self.core.announcing_utterance()
    }

    pub fn set_muted(&self, muted: bool) {
        self.core.muted.set(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.core.muted.get()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.core.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.core.enabled.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.initialized
    }

    pub fn announcer(&self) -> Rc<dyn Announcer> {
        self.core.announcer.clone()
    }

    pub fn response_collector(&self) -> ResponseCollector {
        self.core.response_collector.borrow().clone()
    }

    pub fn set_response_collector(&self, collector: ResponseCollector) {
        *self.core.response_collector.borrow_mut() = collector;
    }

    /// Advance timing by `dt` and announce the front-most ready utterance.
    pub fn step_queue(&self, dt: Duration) {
        self.core.step_queue(dt);
    }

    /// Drive `step_queue` from `timer`. Replaces any previous attachment.
    pub fn attach_to_timer(&self, timer: &StepTimer) {
        self.core.attach_to_timer(timer);
    }

    pub fn detach_from_timer(&self) {
        self.core.detach_from_timer();
    }

    pub fn telemetry_snapshot(&self) -> QueueSnapshot {
        self.core.telemetry.borrow().snapshot()
    }

    pub fn telemetry_events(&self) -> Vec<QueueEvent> {
        self.core.telemetry.borrow().events()
    }

    /// Release every listener this queue holds. Idempotent.
    pub fn dispose(&self) {
        self.core.dispose();
    }
}

impl Drop for UtteranceQueue {
    fn drop(&mut self) {
        self.core.dispose();
    }
}

impl QueueCore {
    fn is_active(&self) -> bool {
        self.initialized && self.enabled.get() && !self.disposed.get()
    }

    fn record(&self, event: QueueEvent) {
        self.telemetry.borrow_mut().record(event);
    }

    fn add(self: &Rc<Self>, utterance: Utterance, position: QueuePosition) {
        if !self.is_active() {
            return;
        }

        // Cold start: some outputs refuse to speak until a user gesture has
        // produced a first announcement.
        if !self.announcer.has_spoken() {
            debug!("Announcer has not spoken yet; announcing {} immediately", utterance.id());
            self.announce_immediately(utterance);
            return;
        }

        let wrapper = self.prepare_utterance(utterance);
        {
            let mut queue = self.queue.borrow_mut();
            match position {
                QueuePosition::Back => queue.push(wrapper.clone()),
                QueuePosition::Front => queue.insert(0, wrapper.clone()),
            }
        }
        debug!("Queued {} ({:?}), priority {}", wrapper.utterance().id(), position, wrapper.utterance().priority());
        self.record(QueueEvent::Enqueued {
            utterance_id: wrapper.utterance().id(),
            position,
        });

        self.add_priority_listener_and_prioritize(&wrapper);
    }

    fn announce_immediately(self: &Rc<Self>, utterance: Utterance) {
        if !self.is_active() {
            return;
        }

        if let Some(current) = self.announcing_utterance() {
            if !self.announcer.should_utterance_cancel_other(&utterance, &current) {
                debug!("Dropped {}: outranked by announcing {}", utterance.id(), current.id());
                self.record(QueueEvent::Dropped {
                    utterance_id: utterance.id(),
                    reason: DropReason::Outranked,
                });
                return;
            }
        }

        let wrapper = self.prepare_utterance(utterance);
        // Eligible right away, regardless of debounce.
        wrapper.set_stable_time(f64::INFINITY);
        wrapper.set_time_in_queue(f64::INFINITY);

        self.queue.borrow_mut().insert(0, wrapper.clone());
        self.record(QueueEvent::Enqueued {
            utterance_id: wrapper.utterance().id(),
            position: QueuePosition::Front,
        });
        self.add_priority_listener_and_prioritize(&wrapper);

        // Prioritization may already have removed it.
        if self.contains_wrapper(&wrapper) {
            self.attempt_to_announce(&wrapper);
        }
    }

    /// Fresh wrapper for `utterance`, replacing any stale queued copy.
    fn prepare_utterance(&self, utterance: Utterance) -> Rc<UtteranceWrapper> {
        let wrapper = Rc::new(UtteranceWrapper::new(utterance));
        self.remove_others_and_update_wrapper(&wrapper);
        wrapper.set_stable_time(0.0);
        wrapper
    }

    /// Removes every queued wrapper of the same utterance and carries the
    /// longest `time_in_queue` over to `wrapper`.
    fn remove_others_and_update_wrapper(&self, wrapper: &UtteranceWrapper) {
        let stale = self.take_matching(|w| w.utterance().ptr_eq(wrapper.utterance()));
        if stale.is_empty() {
            return;
        }

        let carried = stale
            .iter()
            .map(|w| w.time_in_queue())
            .fold(f64::NEG_INFINITY, f64::max);
        for old in &stale {
            self.dispose_unless_announcing(old);
        }
        wrapper.set_time_in_queue(carried);

        self.record(QueueEvent::Replaced {
            utterance_id: wrapper.utterance().id(),
            carried_time_in_queue_ms: if carried.is_finite() { carried } else { 0.0 },
        });
    }

    fn add_priority_listener_and_prioritize(self: &Rc<Self>, wrapper: &Rc<UtteranceWrapper>) {
        let queue = Rc::downgrade(self);
        let pivot = Rc::downgrade(wrapper);
        wrapper.set_priority_listener(move |_| {
            if let (Some(queue), Some(pivot)) = (queue.upgrade(), pivot.upgrade()) {
                queue.prioritize_utterances(&pivot);
            }
        });
        self.prioritize_utterances(wrapper);
    }

    /// Enforce priority order around `pivot`, then tell the announcer about
    /// the (possibly new) front of the queue.
    fn prioritize_utterances(&self, pivot: &Rc<UtteranceWrapper>) {
        // 1. Toward the front: drop everything `pivot` outranks.
        let snapshot: Vec<Rc<UtteranceWrapper>> = self.queue.borrow().clone();
        if let Some(index) = position_of(&snapshot, pivot) {
            for other in snapshot[..index].iter().rev() {
                if !self.contains_wrapper(other) {
                    continue;
                }
                if self
                    .announcer
                    .should_utterance_cancel_other(pivot.utterance(), other.utterance())
                {
                    debug!("{} cancelled by {}", other.utterance().id(), pivot.utterance().id());
                    self.record(QueueEvent::PriorityCancelled {
                        utterance_id: other.utterance().id(),
                        cancelled_by: pivot.utterance().id(),
                    });
                    self.remove_utterance(other.utterance());
                }
            }
        }

        // 2. Toward the back: only the immediate successor can outrank
        // `pivot`; anything further back was already swept by that successor.
        let next = {
            let queue = self.queue.borrow();
            let next = position_of(&queue, pivot).and_then(|i| queue.get(i + 1).cloned());
            next
        };
        if let Some(next) = next {
            if self
                .announcer
                .should_utterance_cancel_other(next.utterance(), pivot.utterance())
            {
                debug!("{} cancelled by {}", pivot.utterance().id(), next.utterance().id());
                self.record(QueueEvent::PriorityCancelled {
                    utterance_id: pivot.utterance().id(),
                    cancelled_by: next.utterance().id(),
                });
                self.remove_utterance(pivot.utterance());
            }
        }

        // 3. The announcer decides whether its current output must yield.
        let front = self.queue.borrow().first().map(|w| w.utterance().clone());
        if let Some(front) = front {
            self.announcer.on_utterance_priority_change(&front);
        }
    }

    fn attempt_to_announce(&self, wrapper: &Rc<UtteranceWrapper>) {
        let utterance = wrapper.utterance().clone();
        debug_assert!(!utterance.is_disposed(), "cannot announce disposed utterance {}", utterance.id());
        if utterance.is_disposed() {
            self.drop_wrapper(wrapper, DropReason::Disposed);
            return;
        }

        if !self.announcer.ready_to_announce() {
            trace!("Announcer not ready; {} waits", utterance.id());
            return;
        }

        let collector = self.response_collector.borrow().clone();
        let text = utterance.get_alert_text(self.announcer.respect_response_collector_properties(), &collector);

        let feature_permitted = self
            .feature_control
            .map_or(true, |feature| utterance.feature_can_announce(feature));
        let permitted = utterance.can_announce() && utterance.predicate() && feature_permitted;

        let blocked = if self.muted.get() {
            Some(DropReason::Muted)
        } else if !permitted {
            Some(DropReason::Gated)
        } else if text.is_empty() {
            Some(DropReason::EmptyText)
        } else {
            None
        };

        match blocked {
            None => {
                let stale = self.announcing.borrow_mut().replace(wrapper.clone());
                if let Some(stale) = stale {
                    if !Rc::ptr_eq(&stale, wrapper) {
                        debug!("{} replaced in announcing slot without completion", stale.utterance().id());
                        stale.dispose();
                    }
                }

                let waited = wrapper.time_in_queue();
                self.record(QueueEvent::Announced {
                    utterance_id: utterance.id(),
                    time_in_queue_ms: if waited.is_finite() { waited } else { 0.0 },
                });
                debug!("Announcing {}", utterance.id());
                self.announcer
                    .announce(&text, &utterance, &utterance.announcer_options());
            }
            Some(reason) => {
                debug!("{} will not be announced: {:?}", utterance.id(), reason);
                self.record(QueueEvent::Dropped {
                    utterance_id: utterance.id(),
                    reason,
                });
            }
        }

        // `announce` may already have completed and cleaned up synchronously.
        let still_queued = !self.take_matching(|w| Rc::ptr_eq(w, wrapper)).is_empty();
        if still_queued {
            self.dispose_unless_announcing(wrapper);
        }
    }

    fn step_queue(&self, dt: Duration) {
        if !self.is_active() {
            return;
        }
        if self.queue.borrow().is_empty() {
            return;
        }
        let dt_ms = dt.as_secs_f64() * 1000.0;

        // Utterances cannot remove themselves from queues they don't know about.
        for wrapper in self.take_matching(|w| w.utterance().is_disposed()) {
            self.record(QueueEvent::Dropped {
                utterance_id: wrapper.utterance().id(),
                reason: DropReason::Disposed,
            });
            self.dispose_unless_announcing(&wrapper);
        }

        let next = {
            let queue = self.queue.borrow();
            for wrapper in queue.iter() {
                wrapper.step(dt_ms);
            }
            let ready = queue.iter().find(|w| w.is_ready()).cloned();
            ready
        };

        if let Some(next) = next {
            trace!("{} ready after {:.0}ms", next.utterance().id(), next.time_in_queue());
            self.attempt_to_announce(&next);
        }
    }

    fn on_announcement_complete(&self, utterance: &Utterance) {
        // Announcers may be shared between queues; only react to our own.
        let matches = self
            .announcing
            .borrow()
            .as_ref()
            .is_some_and(|wrapper| wrapper.utterance().ptr_eq(utterance));
        if !matches {
            return;
        }
        let finished = self.announcing.borrow_mut().take();
        if let Some(wrapper) = finished {
            wrapper.dispose();
            debug!("Completed {}", utterance.id());
            self.record(QueueEvent::Completed {
                utterance_id: utterance.id(),
            });
        }
    }

    fn cancel_utterance(&self, utterance: &Utterance) {
        self.announcer.cancel_utterance(utterance);
        if self.has_utterance(utterance) {
            self.record(QueueEvent::Removed {
                utterance_id: utterance.id(),
            });
            self.remove_utterance(utterance);
        }
    }

    fn clear(&self) {
        let drained = std::mem::take(&mut *self.queue.borrow_mut());
        if drained.is_empty() {
            return;
        }
        debug!("Cleared {} queued utterances", drained.len());
        self.record(QueueEvent::Cleared { count: drained.len() });
        for wrapper in &drained {
            self.dispose_unless_announcing(wrapper);
        }
    }

    fn has_utterance(&self, utterance: &Utterance) -> bool {
        self.queue
            .borrow()
            .iter()
            .any(|w| w.utterance().ptr_eq(utterance))
    }

    fn contains_wrapper(&self, wrapper: &Rc<UtteranceWrapper>) -> bool {
        position_of(&self.queue.borrow(), wrapper).is_some()
    }

    fn announcing_utterance(&self) -> Option<Utterance> {
        self.announcing
            .borrow()
            .as_ref()
            .map(|w| w.utterance().clone())
    }

    fn is_announcing(&self, wrapper: &Rc<UtteranceWrapper>) -> bool {
        self.announcing
            .borrow()
            .as_ref()
            .is_some_and(|current| Rc::ptr_eq(current, wrapper))
    }

    fn remove_utterance(&self, utterance: &Utterance) {
        let removed = self.take_matching(|w| w.utterance().ptr_eq(utterance));
        debug_assert!(!removed.is_empty(), "utterance {} to be removed not found in queue", utterance.id());
        for wrapper in &removed {
            self.dispose_unless_announcing(wrapper);
        }
    }

    /// Removes and returns every queued wrapper matching `predicate`.
    fn take_matching(&self, predicate: impl Fn(&Rc<UtteranceWrapper>) -> bool) -> Vec<Rc<UtteranceWrapper>> {
        let mut queue = self.queue.borrow_mut();
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *queue).into_iter().partition(|w| predicate(w));
        *queue = kept;
        taken
    }

    fn drop_wrapper(&self, wrapper: &Rc<UtteranceWrapper>, reason: DropReason) {
        self.record(QueueEvent::Dropped {
            utterance_id: wrapper.utterance().id(),
            reason,
        });
        self.take_matching(|w| Rc::ptr_eq(w, wrapper));
        self.dispose_unless_announcing(wrapper);
    }

    // The announcing wrapper keeps its listener for in-flight priority tracking.
    fn dispose_unless_announcing(&self, wrapper: &Rc<UtteranceWrapper>) {
        if !self.is_announcing(wrapper) {
            wrapper.dispose();
        }
    }

    fn attach_to_timer(self: &Rc<Self>, timer: &StepTimer) {
        self.detach_from_timer();
        if !self.initialized || self.disposed.get() {
            return;
        }
        let weak = Rc::downgrade(self);
        let id = timer.add_listener(move |dt: &Duration| {
            if let Some(core) = weak.upgrade() {
                core.step_queue(*dt);
            }
        });
        *self.timer.borrow_mut() = Some((timer.clone(), id));
    }

    fn detach_from_timer(&self) {
        let attached = self.timer.borrow_mut().take();
        if let Some((timer, id)) = attached {
            timer.remove_listener(id);
        }
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.clear();
        let announcing = self.announcing.borrow_mut().take();
        if let Some(wrapper) = announcing {
            wrapper.dispose();
        }
        self.detach_from_timer();
        if let Some(id) = self.complete_listener.take() {
            self.announcer.announcement_complete_emitter().remove_listener(id);
        }
    }
}

fn position_of(queue: &[Rc<UtteranceWrapper>], wrapper: &Rc<UtteranceWrapper>) -> Option<usize> {
    queue.iter().position(|w| Rc::ptr_eq(w, wrapper))
}

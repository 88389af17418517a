use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kernel::reactive::{ListenerId, Property};

use super::alertable::Alertable;
use super::response::{ResponseCollector, ResponsePacket};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub Uuid);

impl UtteranceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UtteranceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Options read by announcers when deciding whether one utterance may
/// interrupt another. `extra` is opaque to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerOptions {
    /// May interrupt an earlier announcement of this same utterance.
    pub cancel_self: bool,
    /// May interrupt a different utterance.
    pub cancel_other: bool,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AnnouncerOptions {
    fn default() -> Self {
        Self {
            cancel_self: true,
            cancel_other: true,
            extra: serde_json::Map::new(),
        }
    }
}

/// Output features a queue can opt into gating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncingFeature {
    Voicing,
    Description,
}

/// Construction options for `Utterance`.
#[derive(Clone)]
pub struct UtteranceOptions {
    pub alert: Alertable,
    pub priority: f64,
    pub announcer_options: AnnouncerOptions,
    /// Milliseconds the utterance must sit unchanged in the queue.
    pub alert_stable_delay: f64,
    /// Milliseconds after which the utterance is eligible even if unstable.
    pub alert_maximum_delay: f64,
    pub can_announce_properties: Vec<Property<bool>>,
    pub voicing_can_announce_properties: Vec<Property<bool>>,
    pub description_can_announce_properties: Vec<Property<bool>>,
    pub predicate: Option<Rc<dyn Fn() -> bool>>,
}

impl Default for UtteranceOptions {
    fn default() -> Self {
        Self {
            alert: Alertable::default(),
            priority: Utterance::DEFAULT_PRIORITY,
            announcer_options: AnnouncerOptions::default(),
            alert_stable_delay: Utterance::DEFAULT_ALERT_STABLE_DELAY,
            alert_maximum_delay: Utterance::DEFAULT_ALERT_MAXIMUM_DELAY,
            can_announce_properties: Vec::new(),
            voicing_can_announce_properties: Vec::new(),
            description_can_announce_properties: Vec::new(),
            predicate: None,
        }
    }
}

struct UtteranceInner {
    id: UtteranceId,
    alert: RefCell<Alertable>,
    priority: Property<f64>,
    announcer_options: RefCell<AnnouncerOptions>,
    alert_stable_delay: Cell<f64>,
    alert_maximum_delay: Cell<f64>,
    can_announce_properties: RefCell<Vec<Property<bool>>>,
    voicing_can_announce_properties: RefCell<Vec<Property<bool>>>,
    description_can_announce_properties: RefCell<Vec<Property<bool>>>,
    predicate: RefCell<Option<Rc<dyn Fn() -> bool>>>,
    disposed: Cell<bool>,
}

/// A unit of announceable content with its priority and timing policy.
///
/// Cheap to clone: every clone is a handle to the same utterance, and
/// equality is identity.
#[derive(Clone)]
pub struct Utterance {
    inner: Rc<UtteranceInner>,
}

impl Utterance {
    pub const TOP_PRIORITY: f64 = 10.0;
    pub const HIGH_PRIORITY: f64 = 5.0;
    pub const MEDIUM_PRIORITY: f64 = 2.0;
    pub const DEFAULT_PRIORITY: f64 = 1.0;
    pub const LOW_PRIORITY: f64 = 0.0;

    pub const DEFAULT_ALERT_STABLE_DELAY: f64 = 200.0;
    pub const DEFAULT_ALERT_MAXIMUM_DELAY: f64 = f64::MAX;

    pub fn new(options: UtteranceOptions) -> Self {
        Self {
            inner: Rc::new(UtteranceInner {
                id: UtteranceId::new(),
                alert: RefCell::new(options.alert),
                priority: Property::new(options.priority),
                announcer_options: RefCell::new(options.announcer_options),
                alert_stable_delay: Cell::new(options.alert_stable_delay),
                alert_maximum_delay: Cell::new(options.alert_maximum_delay),
                can_announce_properties: RefCell::new(options.can_announce_properties),
                voicing_can_announce_properties: RefCell::new(options.voicing_can_announce_properties),
                description_can_announce_properties: RefCell::new(
                    options.description_can_announce_properties,
                ),
                predicate: RefCell::new(options.predicate),
                disposed: Cell::new(false),
            }),
        }
    }

    pub fn from_alert(alert: impl Into<Alertable>) -> Self {
        Self::new(UtteranceOptions {
            alert: alert.into(),
            ..UtteranceOptions::default()
        })
    }

    pub fn id(&self) -> UtteranceId {
        self.inner.id
    }

    pub fn ptr_eq(&self, other: &Utterance) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // --- Alert ---

    pub fn alert(&self) -> Alertable {
        self.inner.alert.borrow().clone()
    }

    pub fn set_alert(&self, alert: impl Into<Alertable>) {
        *self.inner.alert.borrow_mut() = alert.into();
    }

    /// Edits the response packet in place. Returns false if the alert is not
    /// a packet.
    pub fn update_response_packet(&self, edit: impl FnOnce(&mut ResponsePacket)) -> bool {
        match &mut *self.inner.alert.borrow_mut() {
            Alertable::Response(packet) => {
                edit(packet);
                true
            }
            _ => false,
        }
    }

    /// Final text for this utterance. Evaluated at dispatch time only.
    pub fn get_alert_text(&self, respect_response_collector: bool, collector: &ResponseCollector) -> String {
        // Clone out so a text function may touch this utterance without a borrow conflict.
        let alert = self.alert();
        alert.resolve(respect_response_collector, collector)
    }

    // --- Priority ---

    pub fn priority(&self) -> f64 {
        self.inner.priority.get()
    }

    /// Every linked listener (including queue prioritization) runs before this returns.
    pub fn set_priority(&self, priority: f64) {
        debug_assert!(!priority.is_nan(), "Utterance priority must be a number");
        self.inner.priority.set(priority);
    }

    pub fn priority_property(&self) -> &Property<f64> {
        &self.inner.priority
    }

    pub(crate) fn lazy_link_priority(&self, listener: impl Fn(&f64) + 'static) -> ListenerId {
        self.inner.priority.lazy_link(listener)
    }

    pub(crate) fn unlink_priority(&self, id: ListenerId) -> bool {
        self.inner.priority.unlink(id)
    }

    // --- Announcer options ---

    pub fn announcer_options(&self) -> AnnouncerOptions {
        self.inner.announcer_options.borrow().clone()
    }

    pub fn cancel_self(&self) -> bool {
        self.inner.announcer_options.borrow().cancel_self
    }

    pub fn cancel_other(&self) -> bool {
        self.inner.announcer_options.borrow().cancel_other
    }

    pub fn set_announcer_options(&self, options: AnnouncerOptions) {
        *self.inner.announcer_options.borrow_mut() = options;
    }

    // --- Timing ---

    pub fn alert_stable_delay(&self) -> f64 {
        self.inner.alert_stable_delay.get()
    }

    pub fn set_alert_stable_delay(&self, delay_ms: f64) {
        debug_assert!(delay_ms >= 0.0, "alert_stable_delay must be non-negative");
        self.inner.alert_stable_delay.set(delay_ms);
    }

    pub fn alert_maximum_delay(&self) -> f64 {
        self.inner.alert_maximum_delay.get()
    }

    pub fn set_alert_maximum_delay(&self, delay_ms: f64) {
        debug_assert!(delay_ms >= 0.0, "alert_maximum_delay must be non-negative");
        self.inner.alert_maximum_delay.set(delay_ms);
    }

    // --- Gating ---

    /// True when every can-announce signal is true (vacuously true when none are set).
    pub fn can_announce(&self) -> bool {
        all_true(&self.inner.can_announce_properties.borrow())
    }

    pub fn set_can_announce_properties(&self, properties: Vec<Property<bool>>) {
        *self.inner.can_announce_properties.borrow_mut() = properties;
    }

    pub fn set_voicing_can_announce_properties(&self, properties: Vec<Property<bool>>) {
        *self.inner.voicing_can_announce_properties.borrow_mut() = properties;
    }

    pub fn set_description_can_announce_properties(&self, properties: Vec<Property<bool>>) {
        *self.inner.description_can_announce_properties.borrow_mut() = properties;
    }

    pub fn feature_can_announce(&self, feature: AnnouncingFeature) -> bool {
        match feature {
            AnnouncingFeature::Voicing => all_true(&self.inner.voicing_can_announce_properties.borrow()),
            AnnouncingFeature::Description => {
                all_true(&self.inner.description_can_announce_properties.borrow())
            }
        }
    }

    pub fn set_predicate(&self, predicate: impl Fn() -> bool + 'static) {
        *self.inner.predicate.borrow_mut() = Some(Rc::new(predicate));
    }

    pub fn clear_predicate(&self) {
        *self.inner.predicate.borrow_mut() = None;
    }

    pub fn predicate(&self) -> bool {
        let predicate = self.inner.predicate.borrow().clone();
        predicate.map_or(true, |p| p())
    }

    // --- Disposal ---

    /// A disposed utterance is never announced; queues prune it on their next step.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

fn all_true(properties: &[Property<bool>]) -> bool {
    properties.iter().all(|p| p.get())
}

impl PartialEq for Utterance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Utterance {}

impl fmt::Debug for Utterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utterance")
            .field("id", &self.inner.id)
            .field("priority", &self.priority())
            .field("alert", &*self.inner.alert.borrow())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl From<&Utterance> for Utterance {
    fn from(utterance: &Utterance) -> Self {
        utterance.clone()
    }
}

impl From<Alertable> for Utterance {
    fn from(alert: Alertable) -> Self {
        Utterance::from_alert(alert)
    }
}

impl From<&str> for Utterance {
    fn from(text: &str) -> Self {
        Utterance::from_alert(text)
    }
}

impl From<String> for Utterance {
    fn from(text: String) -> Self {
        Utterance::from_alert(text)
    }
}

impl From<Property<String>> for Utterance {
    fn from(text: Property<String>) -> Self {
        Utterance::from_alert(text)
    }
}

impl From<ResponsePacket> for Utterance {
    fn from(packet: ResponsePacket) -> Self {
        Utterance::from_alert(packet)
    }
}

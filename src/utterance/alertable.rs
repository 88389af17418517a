use std::fmt;
use std::rc::Rc;

use crate::kernel::reactive::Property;

use super::response::{ResponseCollector, ResponsePacket};

/// A single response slot: text known now, text produced on demand, or text
/// read from a reactive source.
#[derive(Clone)]
pub enum VoicingResponse {
    Text(String),
    Function(Rc<dyn Fn() -> String>),
    Property(Property<String>),
}

impl VoicingResponse {
    pub fn function(f: impl Fn() -> String + 'static) -> Self {
        VoicingResponse::Function(Rc::new(f))
    }

    pub fn resolve(&self) -> String {
        match self {
            VoicingResponse::Text(text) => text.clone(),
            VoicingResponse::Function(f) => f(),
            VoicingResponse::Property(property) => property.get(),
        }
    }
}

impl fmt::Debug for VoicingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoicingResponse::Text(text) => f.debug_tuple("Text").field(text).finish(),
            VoicingResponse::Function(_) => f.write_str("Function(..)"),
            VoicingResponse::Property(property) => f.debug_tuple("Property").field(property).finish(),
        }
    }
}

impl From<&str> for VoicingResponse {
    fn from(text: &str) -> Self {
        VoicingResponse::Text(text.to_string())
    }
}

impl From<String> for VoicingResponse {
    fn from(text: String) -> Self {
        VoicingResponse::Text(text)
    }
}

impl From<Property<String>> for VoicingResponse {
    fn from(property: Property<String>) -> Self {
        VoicingResponse::Property(property)
    }
}

/// Content an Utterance announces. Resolved to a string only at dispatch time.
#[derive(Clone)]
pub enum Alertable {
    Text(String),
    Function(Rc<dyn Fn() -> String>),
    Property(Property<String>),
    Response(ResponsePacket),
}

impl Default for Alertable {
    fn default() -> Self {
        Alertable::Text(String::new())
    }
}

impl Alertable {
    pub fn function(f: impl Fn() -> String + 'static) -> Self {
        Alertable::Function(Rc::new(f))
    }

    /// `respect_collector` is the announcer's wish to honour the collector's
    /// enabled flags; a packet's own `ignore_properties` still overrides it.
    pub fn resolve(&self, respect_collector: bool, collector: &ResponseCollector) -> String {
        match self {
            Alertable::Text(text) => text.clone(),
            Alertable::Function(f) => f(),
            Alertable::Property(property) => property.get(),
            Alertable::Response(packet) => collector.collect_responses(packet, respect_collector),
        }
    }
}

impl fmt::Debug for Alertable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alertable::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Alertable::Function(_) => f.write_str("Function(..)"),
            Alertable::Property(property) => f.debug_tuple("Property").field(property).finish(),
            Alertable::Response(packet) => f.debug_tuple("Response").field(packet).finish(),
        }
    }
}

impl From<&str> for Alertable {
    fn from(text: &str) -> Self {
        Alertable::Text(text.to_string())
    }
}

impl From<String> for Alertable {
    fn from(text: String) -> Self {
        Alertable::Text(text)
    }
}

impl From<Property<String>> for Alertable {
    fn from(property: Property<String>) -> Self {
        Alertable::Property(property)
    }
}

impl From<ResponsePacket> for Alertable {
    fn from(packet: ResponsePacket) -> Self {
        Alertable::Response(packet)
    }
}

impl From<VoicingResponse> for Alertable {
    fn from(response: VoicingResponse) -> Self {
        match response {
            VoicingResponse::Text(text) => Alertable::Text(text),
            VoicingResponse::Function(f) => Alertable::Function(f),
            VoicingResponse::Property(property) => Alertable::Property(property),
        }
    }
}

use crate::kernel::reactive::Property;

use super::alertable::VoicingResponse;

/// Structured description of a UI element: up to four response slots
/// combined into one announcement at dispatch time.
#[derive(Debug, Clone, Default)]
pub struct ResponsePacket {
    name_response: Option<VoicingResponse>,
    object_response: Option<VoicingResponse>,
    context_response: Option<VoicingResponse>,
    hint_response: Option<VoicingResponse>,
    /// Include every slot regardless of the collector's enabled flags.
    ignore_properties: bool,
}

impl ResponsePacket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_response(mut self, response: impl Into<VoicingResponse>) -> Self {
        self.name_response = Some(response.into());
        self
    }

    pub fn with_object_response(mut self, response: impl Into<VoicingResponse>) -> Self {
        self.object_response = Some(response.into());
        self
    }

    pub fn with_context_response(mut self, response: impl Into<VoicingResponse>) -> Self {
        self.context_response = Some(response.into());
        self
    }

    pub fn with_hint_response(mut self, response: impl Into<VoicingResponse>) -> Self {
        self.hint_response = Some(response.into());
        self
    }

    pub fn with_ignore_properties(mut self, ignore: bool) -> Self {
        self.ignore_properties = ignore;
        self
    }

    pub fn set_name_response(&mut self, response: Option<VoicingResponse>) {
        self.name_response = response;
    }

    pub fn set_object_response(&mut self, response: Option<VoicingResponse>) {
        self.object_response = response;
    }

    pub fn set_context_response(&mut self, response: Option<VoicingResponse>) {
        self.context_response = response;
    }

    pub fn set_hint_response(&mut self, response: Option<VoicingResponse>) {
        self.hint_response = response;
    }

    pub fn set_ignore_properties(&mut self, ignore: bool) {
        self.ignore_properties = ignore;
    }

    pub fn ignore_properties(&self) -> bool {
        self.ignore_properties
    }
}

/// User preferences deciding which response slots are spoken.
#[derive(Debug, Clone)]
pub struct ResponseCollector {
    pub name_responses_enabled: Property<bool>,
    pub object_responses_enabled: Property<bool>,
    pub context_responses_enabled: Property<bool>,
    pub hint_responses_enabled: Property<bool>,
}

impl Default for ResponseCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self {
            name_responses_enabled: Property::new(true),
            object_responses_enabled: Property::new(true),
            context_responses_enabled: Property::new(true),
            hint_responses_enabled: Property::new(true),
        }
    }

    pub fn reset(&self) {
        self.name_responses_enabled.set(true);
        self.object_responses_enabled.set(true);
        self.context_responses_enabled.set(true);
        self.hint_responses_enabled.set(true);
    }

    /// Joins the included, non-empty responses with ", " in
    /// name, object, context, hint order.
    pub fn collect_responses(&self, packet: &ResponsePacket, respect_properties: bool) -> String {
        let ignore = packet.ignore_properties || !respect_properties;
        let slots = [
            (&packet.name_response, &self.name_responses_enabled),
            (&packet.object_response, &self.object_responses_enabled),
            (&packet.context_response, &self.context_responses_enabled),
            (&packet.hint_response, &self.hint_responses_enabled),
        ];

        slots
            .iter()
            .filter(|(_, enabled)| ignore || enabled.get())
            .filter_map(|(response, _)| response.as_ref().map(VoicingResponse::resolve))
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

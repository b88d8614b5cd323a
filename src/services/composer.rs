use chrono::NaiveDate;

use crate::models::{AppointmentRequest, ConversationContext, MissingField, Slot};
use crate::services::ai::intent::{IntentClassifier, BASE_CONFIDENCE};
use crate::services::extract::{FieldExtractor, DEFAULT_CLASS_TYPE};

pub const DEFAULT_TIME: &str = "09:00";

const NAME_WEIGHT: f32 = 0.2;
const DATE_WEIGHT: f32 = 0.3;
const TIME_WEIGHT: f32 = 0.2;
const CLASS_WEIGHT: f32 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct ComposeOptions {
    /// When true a defaulted 09:00 never shows up in `missing_info`.
    pub default_time_satisfies: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            default_time_satisfies: true,
        }
    }
}

/// Turns one message plus the running context into an [`AppointmentRequest`].
pub struct Composer<'a> {
    classifier: &'a dyn IntentClassifier,
    extractor: &'a dyn FieldExtractor,
    options: ComposeOptions,
}

impl<'a> Composer<'a> {
    pub fn new(
        classifier: &'a dyn IntentClassifier,
        extractor: &'a dyn FieldExtractor,
        options: ComposeOptions,
    ) -> Self {
        Self {
            classifier,
            extractor,
            options,
        }
    }

    pub fn compose(
        &self,
        text: &str,
        context: &ConversationContext,
        today: NaiveDate,
    ) -> AppointmentRequest {
        let classification = self.classifier.classify(text);
        let ongoing = context.appointment_intent.as_ref();

        // Nothing to do: leave the extractors alone.
        if !classification.has_intent && ongoing.is_none() {
            return AppointmentRequest::no_intent();
        }

        let mut confidence = if classification.has_intent {
            classification.base_confidence
        } else {
            BASE_CONFIDENCE
        };

        let name = match &context.user_info.name {
            Some(known) => Some(known.clone()),
            None => {
                let extracted = self.extractor.name(text);
                if extracted.is_some() {
                    confidence += NAME_WEIGHT;
                }
                extracted
            }
        };

        let date = match self.extractor.date(text, today) {
            Some(d) => {
                confidence += DATE_WEIGHT;
                Some(d)
            }
            None => ongoing.and_then(|i| i.date),
        };

        let time = match self.extractor.time(text) {
            Some(t) => {
                confidence += TIME_WEIGHT;
                Slot::Extracted(t)
            }
            None => match ongoing.and_then(|i| i.time.clone()) {
                Some(t) => Slot::Extracted(t),
                None => Slot::Defaulted(DEFAULT_TIME.to_string()),
            },
        };

        let class_type = match self.extractor.class_type(text) {
            Some(c) => {
                confidence += CLASS_WEIGHT;
                c
            }
            None => ongoing
                .map(|i| i.class_type.clone())
                .unwrap_or_else(|| DEFAULT_CLASS_TYPE.to_string()),
        };

        if let Some(previous) = ongoing {
            confidence = confidence.max(previous.confidence);
        }

        let mut missing_info = vec![];
        if name.is_none() {
            missing_info.push(MissingField::Name);
        }
        if date.is_none() {
            missing_info.push(MissingField::Date);
        }
        if !time.is_satisfied(self.options.default_time_satisfies) {
            missing_info.push(MissingField::Time);
        }

        AppointmentRequest {
            has_appointment_intent: true,
            name,
            date,
            time,
            class_type,
            confidence,
            missing_info,
        }
    }
}

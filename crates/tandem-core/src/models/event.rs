//! Calendar event model

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{
    normalize_optional, null_as_default, require_title, Draft, Entity, EntityKind, EventId, Patch,
    Searchable,
};
use crate::error::{Error, Result};

/// Longest notification lead time the calendar offers.
pub const MAX_NOTIFICATION_DAYS: u32 = 30;

const DEFAULT_NOTIFICATION_DAYS: u32 = 1;

/// A dated entry on the shared calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    /// Calendar day of the event
    pub date: NaiveDate,
    /// Optional companion contact (e-mail)
    #[serde(default)]
    pub companion_email: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notification_enabled: bool,
    /// Days before `date` to notify
    #[serde(
        default = "default_notification_days",
        deserialize_with = "notification_days_or_default"
    )]
    pub notification_days_before: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_general_calendar: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Event {
    type Id = EventId;
    type Draft = EventDraft;
    type Patch = EventPatch;

    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> EventId {
        self.id
    }

    fn natural_order(_a: &Self, _b: &Self) -> Ordering {
        Ordering::Equal
    }
}

impl Searchable for Event {
    fn title(&self) -> &str {
        &self.title
    }

    fn description(&self) -> Option<&str> {
        None
    }
}

/// Fields for a new calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDraft {
    pub title: String,
    pub date: NaiveDate,
    pub companion_email: Option<String>,
    pub notification_enabled: bool,
    pub notification_days_before: u32,
    pub image_url: Option<String>,
}

impl EventDraft {
    /// A draft for `date` with notifications off and a one-day lead time.
    #[must_use]
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date,
            companion_email: None,
            notification_enabled: false,
            notification_days_before: DEFAULT_NOTIFICATION_DAYS,
            image_url: None,
        }
    }
}

impl Draft for EventDraft {
    fn prepare(self) -> Result<Self> {
        check_notification_days(self.notification_days_before)?;
        Ok(Self {
            title: require_title(&self.title, EntityKind::Event)?,
            companion_email: normalize_optional(self.companion_email),
            image_url: normalize_optional(self.image_url),
            ..self
        })
    }
}

/// Partial update of a calendar event; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companion_email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_days_before: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<Option<String>>,
}

impl Patch<Event> for EventPatch {
    fn prepare(self) -> Result<Self> {
        if let Some(days) = self.notification_days_before {
            check_notification_days(days)?;
        }
        let title = match self.title {
            Some(title) => Some(require_title(&title, EntityKind::Event)?),
            None => None,
        };
        Ok(Self {
            title,
            companion_email: self.companion_email.map(normalize_optional),
            image_url: self.image_url.map(normalize_optional),
            ..self
        })
    }

    fn apply_to(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title.clone_from(title);
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(companion_email) = &self.companion_email {
            event.companion_email.clone_from(companion_email);
        }
        if let Some(enabled) = self.notification_enabled {
            event.notification_enabled = enabled;
        }
        if let Some(days) = self.notification_days_before {
            event.notification_days_before = days;
        }
        if let Some(image_url) = &self.image_url {
            event.image_url.clone_from(image_url);
        }
    }
}

fn check_notification_days(days: u32) -> Result<()> {
    if days > MAX_NOTIFICATION_DAYS {
        return Err(Error::Validation(format!(
            "Notification lead time must be at most {MAX_NOTIFICATION_DAYS} days"
        )));
    }
    Ok(())
}

const fn default_notification_days() -> u32 {
    DEFAULT_NOTIFICATION_DAYS
}

fn notification_days_or_default<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(DEFAULT_NOTIFICATION_DAYS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(value: &str) -> NaiveDate {
        value.parse().unwrap()
    }

    #[test]
    fn parses_row_with_nullable_columns() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": "6f1c2d3e-0000-4000-8000-000000000001",
            "title": "Dinner",
            "date": "2024-02-14",
            "companion_email": null,
            "notification_enabled": null,
            "notification_days_before": null,
            "image_url": null,
            "is_general_calendar": null,
            "created_at": "2024-02-01T10:00:00.123456+00:00",
            "user_id": "u1"
        }))
        .unwrap();

        assert_eq!(event.date, day("2024-02-14"));
        assert!(!event.notification_enabled);
        assert_eq!(event.notification_days_before, 1);
        assert!(!event.is_general_calendar);
    }

    #[test]
    fn draft_requires_title_and_trims_optionals() {
        assert!(EventDraft::new("  ", day("2024-02-14")).prepare().is_err());

        let mut draft = EventDraft::new(" Dinner ", day("2024-02-14"));
        draft.companion_email = Some("   ".to_string());
        let prepared = draft.prepare().unwrap();
        assert_eq!(prepared.title, "Dinner");
        assert_eq!(prepared.companion_email, None);
    }

    #[test]
    fn draft_rejects_long_lead_time() {
        let mut draft = EventDraft::new("Dinner", day("2024-02-14"));
        draft.notification_days_before = MAX_NOTIFICATION_DAYS + 1;
        assert!(matches!(draft.prepare(), Err(Error::Validation(_))));
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = EventPatch {
            title: Some("Lunch".to_string()),
            companion_email: Some(None),
            ..EventPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            serde_json::json!({ "title": "Lunch", "companion_email": null })
        );
    }
}

//! Calendar day lookups.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::models::Event;

/// Events on `date`, in collection order.
#[must_use]
pub fn events_for_date(events: &[Event], date: NaiveDate) -> Vec<Event> {
    events.iter().filter(|event| event.date == date).cloned().collect()
}

/// What selecting a calendar day opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySelection {
    /// Empty day: start a new event prefilled with the date.
    Create { date: NaiveDate },
    /// Edit the first event of the day. `others` lists the remaining events
    /// on the same date so they stay reachable.
    Edit { event: Event, others: Vec<Event> },
}

#[must_use]
pub fn select_day(events: &[Event], date: NaiveDate) -> DaySelection {
    let mut on_day = events_for_date(events, date).into_iter();
    match on_day.next() {
        Some(event) => DaySelection::Edit {
            event,
            others: on_day.collect(),
        },
        None => DaySelection::Create { date },
    }
}

/// Distinct days within the month of `month` that carry at least one event.
#[must_use]
pub fn days_with_events(events: &[Event], month: NaiveDate) -> BTreeSet<NaiveDate> {
    events
        .iter()
        .map(|event| event.date)
        .filter(|date| date.year() == month.year() && date.month() == month.month())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::EventId;

    fn day(raw: &str) -> NaiveDate {
        raw.parse().unwrap()
    }

    fn event(title: &str, date: &str) -> Event {
        Event {
            id: EventId::new(),
            title: title.to_string(),
            date: day(date),
            companion_email: None,
            notification_enabled: false,
            notification_days_before: 1,
            image_url: None,
            is_general_calendar: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn events_for_date_keeps_every_match_in_order() {
        let events = vec![
            event("Dinner", "2024-03-10"),
            event("Movie", "2024-03-11"),
            event("Brunch", "2024-03-10"),
        ];
        let titles: Vec<_> = events_for_date(&events, day("2024-03-10"))
            .into_iter()
            .map(|event| event.title)
            .collect();
        assert_eq!(titles, vec!["Dinner", "Brunch"]);
    }

    #[test]
    fn select_day_edits_first_and_exposes_the_rest() {
        let events = vec![event("Dinner", "2024-03-10"), event("Brunch", "2024-03-10")];
        match select_day(&events, day("2024-03-10")) {
            DaySelection::Edit { event, others } => {
                assert_eq!(event.title, "Dinner");
                assert_eq!(others.len(), 1);
                assert_eq!(others[0].title, "Brunch");
            }
            DaySelection::Create { .. } => panic!("expected edit"),
        }
    }

    #[test]
    fn select_empty_day_creates() {
        let events = vec![event("Dinner", "2024-03-10")];
        assert_eq!(
            select_day(&events, day("2024-03-12")),
            DaySelection::Create {
                date: day("2024-03-12")
            }
        );
    }

    #[test]
    fn days_with_events_stays_within_month() {
        let events = vec![
            event("a", "2024-03-10"),
            event("b", "2024-03-10"),
            event("c", "2024-03-31"),
            event("d", "2024-04-01"),
            event("e", "2023-03-10"),
        ];
        let days: Vec<_> = days_with_events(&events, day("2024-03-01")).into_iter().collect();
        assert_eq!(days, vec![day("2024-03-10"), day("2024-03-31")]);
    }
}

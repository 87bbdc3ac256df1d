//! Reflection reminder evaluation
//!
//! Decides whether a user is due for a reminder based on their cadence and
//! how recently they recorded a reflection.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;

use crate::db::schemas::NotificationCadence;

/// Outcome of the reminder check, shaped for the status endpoint
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NotificationStatus {
    pub reminder_needed: bool,
    pub message: String,
}

/// Start of the window a reflection must fall in to count as recent.
///
/// Daily counts from midnight UTC today, weekly from seven days ago.
/// Paused has no window; the check short-circuits without a query.
pub fn window_start(cadence: NotificationCadence, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match cadence {
        NotificationCadence::Daily => Some(now.date_naive().and_time(NaiveTime::MIN).and_utc()),
        NotificationCadence::Weekly => Some(now - Duration::days(7)),
        NotificationCadence::Paused => None,
    }
}

/// Turn the cadence and the in-window reflection count into a status
pub fn evaluate_reminder(
    cadence: NotificationCadence,
    reflections_in_window: u64,
) -> NotificationStatus {
    match cadence {
        NotificationCadence::Paused => NotificationStatus {
            reminder_needed: false,
            message: "Notifications are paused.".into(),
        },
        NotificationCadence::Daily if reflections_in_window == 0 => NotificationStatus {
            reminder_needed: true,
            message:
                "You haven't recorded your High, Low, and Buffalo today. Take a moment to reflect!"
                    .into(),
        },
        NotificationCadence::Weekly if reflections_in_window == 0 => NotificationStatus {
            reminder_needed: true,
            message: "It's been a week since your last reflection. Time to check in!".into(),
        },
        _ => NotificationStatus {
            reminder_needed: false,
            message: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(iso: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(iso).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_daily_window_starts_at_midnight_utc() {
        let now = at("2024-01-15T18:45:12.500000+00:00");
        let start = window_start(NotificationCadence::Daily, now).unwrap();
        assert_eq!(
            start,
            at("2024-01-15T00:00:00.000000+00:00")
        );
    }

    #[test]
    fn test_weekly_window_starts_seven_days_back() {
        let now = at("2024-01-15T18:45:12.500000+00:00");
        let start = window_start(NotificationCadence::Weekly, now).unwrap();
        assert_eq!(start, at("2024-01-08T18:45:12.500000+00:00"));
    }

    #[test]
    fn test_paused_has_no_window() {
        let now = at("2024-01-15T18:45:12.500000+00:00");
        assert_eq!(window_start(NotificationCadence::Paused, now), None);
    }

    #[test]
    fn test_paused_message() {
        let status = evaluate_reminder(NotificationCadence::Paused, 0);
        assert!(!status.reminder_needed);
        assert_eq!(status.message, "Notifications are paused.");
    }

    #[test]
    fn test_daily_reminder_when_no_reflection_today() {
        let status = evaluate_reminder(NotificationCadence::Daily, 0);
        assert!(status.reminder_needed);
        assert!(status.message.contains("High, Low, and Buffalo"));
    }

    #[test]
    fn test_no_reminder_once_reflected() {
        let status = evaluate_reminder(NotificationCadence::Daily, 1);
        assert!(!status.reminder_needed);
        assert_eq!(status.message, "");

        let status = evaluate_reminder(NotificationCadence::Weekly, 3);
        assert!(!status.reminder_needed);
    }

    #[test]
    fn test_weekly_reminder_message() {
        let status = evaluate_reminder(NotificationCadence::Weekly, 0);
        assert!(status.reminder_needed);
        assert_eq!(
            status.message,
            "It's been a week since your last reflection. Time to check in!"
        );
    }
}

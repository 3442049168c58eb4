//! Deletion classification - stato Global o Local in base all'età del messaggio

use crate::entities::DeleteType;
use chrono::{DateTime, Duration, Utc};

/// Classifica una richiesta di cancellazione: i messaggi con età fino alla
/// soglia (inclusa) vengono rimossi per tutti, quelli più vecchi vengono
/// solo nascosti al richiedente.
///
/// L'età è misurata esclusivamente sul `created_at` immutabile del
/// messaggio e la classificazione avviene una sola volta, al momento della
/// richiesta.
pub fn classify(now: DateTime<Utc>, created_at: DateTime<Utc>, threshold: Duration) -> DeleteType {
    if now.signed_duration_since(created_at) <= threshold {
        DeleteType::Global
    } else {
        DeleteType::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms_after_creation: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let created_at: DateTime<Utc> = "2025-03-01T10:00:00Z".parse().unwrap();
        (created_at + Duration::milliseconds(ms_after_creation), created_at)
    }

    #[test]
    fn test_age_under_threshold_is_global() {
        let (now, created_at) = at(59_999);
        assert_eq!(classify(now, created_at, Duration::milliseconds(60_000)), DeleteType::Global);
    }

    #[test]
    fn test_age_exactly_at_threshold_is_global() {
        let (now, created_at) = at(60_000);
        assert_eq!(classify(now, created_at, Duration::milliseconds(60_000)), DeleteType::Global);
    }

    #[test]
    fn test_age_over_threshold_is_local() {
        let (now, created_at) = at(60_001);
        assert_eq!(classify(now, created_at, Duration::milliseconds(60_000)), DeleteType::Local);
    }

    #[test]
    fn test_message_from_the_future_is_global() {
        // skew dell'orologio client/server: età negativa, mai Local
        let (now, created_at) = at(-5_000);
        assert_eq!(classify(now, created_at, Duration::milliseconds(60_000)), DeleteType::Global);
    }
}

use crate::limits::*;
use crate::model::*;

use super::ServiceError;

/// Booking rule between a candidate `a` and an existing booking `b`.
///
/// Deliberately not symmetric: `a` may start exactly where `b` ends, but an
/// `a` ending exactly where `b` starts collides.
pub fn collides(a: &Span, b: &Span) -> bool {
    (a.start >= b.start && a.start < b.end)
        || (a.end >= b.start && a.end <= b.end)
        || (a.start <= b.start && a.end >= b.end)
}

pub fn has_conflict(candidate: &Span, existing: &[Span]) -> bool {
    for span in existing {
        if collides(candidate, span) {
            return true;
        }
    }
    false
}

/// First booking in `existing` the candidate collides with.
pub fn first_conflict<'a>(
    candidate: &Span,
    existing: impl IntoIterator<Item = &'a Booking>,
) -> Option<&'a Booking> {
    for booking in existing {
        if collides(candidate, &booking.span) {
            return Some(booking);
        }
    }
    None
}

/// Reject `span` on `field` if it collides with another match, then with
/// another agenda event. `near` must hold every booking on the field that
/// touches `span`, with the record being written already excluded.
pub(crate) fn check_field_free(field: Field, span: &Span, near: &[Booking]) -> Result<(), ServiceError> {
    let matches = near.iter().filter(|b| matches!(b.holder, Holder::Match(_)));
    let events = near.iter().filter(|b| matches!(b.holder, Holder::AgendaEvent(_)));
    let hit = first_conflict(span, matches).or_else(|| first_conflict(span, events));
    match hit {
        Some(booking) => {
            metrics::counter!(crate::observability::BOOKING_CONFLICTS_TOTAL, "field" => field.to_string())
                .increment(1);
            Err(ServiceError::FieldAlreadyBooked {
                field,
                holder: booking.holder,
            })
        }
        None => Ok(()),
    }
}

pub(crate) fn validate_span(span: &Span) -> Result<(), ServiceError> {
    if span.start < MIN_VALID_TIMESTAMP_MS || span.end > MAX_VALID_TIMESTAMP_MS {
        return Err(ServiceError::LimitExceeded("timestamp out of range"));
    }
    if span.duration_ms() > MAX_SPAN_DURATION_MS {
        return Err(ServiceError::LimitExceeded("span too wide"));
    }
    Ok(())
}

pub(crate) fn validate_timestamp(ms: Ms) -> Result<(), ServiceError> {
    if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&ms) {
        return Err(ServiceError::LimitExceeded("timestamp out of range"));
    }
    Ok(())
}

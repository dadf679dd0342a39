use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::FIELD_COUNT;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

/// Time window of a booking, `start` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    /// Half-open overlap, used to cross-check the booking rule in tests.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Field slot. 1..=4 are physical fields, 0 means "no field".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field(u8);

impl Field {
    pub const GENERAL: Field = Field(0);

    /// Accepts 0..=4.
    pub fn new(raw: i64) -> Option<Field> {
        u8::try_from(raw).ok().filter(|n| *n <= FIELD_COUNT).map(Field)
    }

    /// Accepts only bookable fields (1..=4).
    pub fn bookable(raw: i64) -> Option<Field> {
        Field::new(raw).filter(Field::is_bookable)
    }

    pub fn is_bookable(&self) -> bool {
        self.0 != 0
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Competition tier, plus the general tag used by field-less agenda events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// `C`
    College,
    /// `L`
    Lycee,
    /// `g`
    General,
}

impl Category {
    pub fn from_code(code: &str) -> Option<Category> {
        match code {
            "C" => Some(Category::College),
            "L" => Some(Category::Lycee),
            "g" => Some(Category::General),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Category::College => "C",
            Category::Lycee => "L",
            Category::General => "g",
        }
    }

    pub fn is_tier(&self) -> bool {
        !matches!(self, Category::General)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Draft,
    Public,
}

impl Visibility {
    pub fn from_code(code: i64) -> Option<Visibility> {
        match code {
            0 => Some(Visibility::Draft),
            1 => Some(Visibility::Public),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Visibility::Draft => 0,
            Visibility::Public => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiveStatus {
    /// `s`: announced, hidden from the public listing.
    Scheduled,
    /// `l`: on air. At most one live at a time.
    OnAir,
    /// `r`: replay available.
    Replay,
}

impl LiveStatus {
    pub fn from_code(code: &str) -> Option<LiveStatus> {
        match code {
            "s" => Some(LiveStatus::Scheduled),
            "l" => Some(LiveStatus::OnAir),
            "r" => Some(LiveStatus::Replay),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LiveStatus::Scheduled => "s",
            LiveStatus::OnAir => "l",
            LiveStatus::Replay => "r",
        }
    }
}

// ── Entities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: Ulid,
    pub name: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teammate {
    pub name: String,
    pub role: u32,
    pub captain: bool,
    pub image_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: Ulid,
    pub name: String,
    pub school: Ulid,
    pub roster: Vec<Teammate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: Ulid,
    pub team1: Ulid,
    pub team2: Ulid,
    pub score1: u32,
    pub score2: u32,
    pub category: Category,
    pub span: Span,
    pub field: Field,
    pub tree: u32,
}

impl Match {
    /// A recorded result freezes the match.
    pub fn is_played(&self) -> bool {
        self.score1 != 0 || self.score2 != 0
    }

    pub fn involves(&self, team: Ulid) -> bool {
        self.team1 == team || self.team2 == team
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaEvent {
    pub id: Ulid,
    pub from: Ms,
    /// Always `None` on field 0.
    pub to: Option<Ms>,
    pub title: String,
    pub content: String,
    pub field: Field,
    pub category: Category,
    pub visibility: Visibility,
}

impl AgendaEvent {
    /// The window this event holds on its field, if it holds one.
    pub fn booking_span(&self) -> Option<Span> {
        match self.to {
            Some(to) if self.field.is_bookable() && self.from < to => Some(Span::new(self.from, to)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Live {
    pub id: Ulid,
    pub title: String,
    pub date: Ms,
    pub status: LiveStatus,
    pub url: String,
}

// ── Field occupancy ──────────────────────────────────────────────

/// Who holds a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Holder {
    Match(Ulid),
    AgendaEvent(Ulid),
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Holder::Match(id) => write!(f, "match {id}"),
            Holder::AgendaEvent(id) => write!(f, "agenda event {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Booking {
    pub holder: Holder,
    pub span: Span,
}

/// Bookings held on one field, sorted by `span.start`.
#[derive(Debug, Clone)]
pub struct FieldOccupancy {
    pub field: Field,
    pub bookings: Vec<Booking>,
}

impl FieldOccupancy {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            bookings: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by span.start.
    pub fn insert(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.span.start, |b| b.span.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove(&mut self, holder: Holder) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.holder == holder)?;
        Some(self.bookings.remove(pos))
    }

    /// Bookings that touch the closed window `[query.start, query.end]`.
    /// This is a superset of everything the booking rule can reject, since
    /// a candidate ending exactly at an existing start still collides.
    pub fn near(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        let right_bound = self
            .bookings
            .partition_point(|b| b.span.start <= query.end);
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.end >= query.start)
    }
}

// ── WAL records ──────────────────────────────────────────────────

/// Flat record of one state change. A commit is a `Vec<Event>` written as a
/// single WAL frame, so a cascade lands or fails as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    SchoolCreated(School),
    SchoolUpdated(School),
    SchoolDeleted { id: Ulid },
    TeamCreated(Team),
    TeamUpdated(Team),
    TeamDeleted { id: Ulid },
    MatchCreated(Match),
    MatchUpdated(Match),
    MatchDeleted { id: Ulid },
    AgendaEventCreated(AgendaEvent),
    AgendaEventUpdated(AgendaEvent),
    AgendaEventDeleted { id: Ulid },
    LiveCreated(Live),
    LiveUpdated(Live),
    LiveDeleted { id: Ulid },
}

// ── Timestamps ───────────────────────────────────────────────────

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an external date. Offsets are honoured; naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<Ms> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

pub fn format_timestamp(ms: Ms) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

//! Raw, partially-filled payloads as callers send them.
//!
//! Create operations validate an input directly. Update operations turn the
//! stored record back into an input, overlay the patch and validate the merged
//! result, so an absent field always keeps its stored value.

use ulid::Ulid;

use crate::model::*;

/// Fill every `None` in `patch` from `base`.
macro_rules! overlay {
    ($base:expr, $patch:expr, $($field:ident),+ $(,)?) => {
        Self { $($field: $patch.$field.or($base.$field)),+ }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchoolInput {
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamInput {
    pub name: Option<String>,
    pub school: Option<Ulid>,
    pub roster: Option<Vec<Teammate>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchInput {
    pub team1: Option<Ulid>,
    pub team2: Option<Ulid>,
    pub score1: Option<i64>,
    pub score2: Option<i64>,
    pub category: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub field: Option<i64>,
    pub tree: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgendaInput {
    pub from: Option<String>,
    pub to: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub field: Option<i64>,
    pub category: Option<String>,
    pub status: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveInput {
    pub title: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub url: Option<String>,
}

impl SchoolInput {
    pub fn overlay(self, base: SchoolInput) -> Self {
        overlay!(base, self, name, category)
    }
}

impl TeamInput {
    pub fn overlay(self, base: TeamInput) -> Self {
        overlay!(base, self, name, school, roster)
    }
}

impl MatchInput {
    pub fn overlay(self, base: MatchInput) -> Self {
        overlay!(base, self, team1, team2, score1, score2, category, from, to, field, tree)
    }
}

impl AgendaInput {
    pub fn overlay(self, base: AgendaInput) -> Self {
        overlay!(base, self, from, to, title, content, field, category, status)
    }
}

impl LiveInput {
    pub fn overlay(self, base: LiveInput) -> Self {
        overlay!(base, self, title, date, status, url)
    }
}

impl From<&School> for SchoolInput {
    fn from(s: &School) -> Self {
        Self {
            name: Some(s.name.clone()),
            category: Some(s.category.code().into()),
        }
    }
}

impl From<&Team> for TeamInput {
    fn from(t: &Team) -> Self {
        Self {
            name: Some(t.name.clone()),
            school: Some(t.school),
            roster: Some(t.roster.clone()),
        }
    }
}

impl From<&Match> for MatchInput {
    fn from(m: &Match) -> Self {
        Self {
            team1: Some(m.team1),
            team2: Some(m.team2),
            score1: Some(m.score1.into()),
            score2: Some(m.score2.into()),
            category: Some(m.category.code().into()),
            from: Some(format_timestamp(m.span.start)),
            to: Some(format_timestamp(m.span.end)),
            field: Some(m.field.get().into()),
            tree: Some(m.tree.into()),
        }
    }
}

impl From<&AgendaEvent> for AgendaInput {
    fn from(e: &AgendaEvent) -> Self {
        Self {
            from: Some(format_timestamp(e.from)),
            to: e.to.map(format_timestamp),
            title: Some(e.title.clone()),
            content: Some(e.content.clone()),
            field: Some(e.field.get().into()),
            category: Some(e.category.code().into()),
            status: Some(e.visibility.code().into()),
        }
    }
}

impl From<&Live> for LiveInput {
    fn from(l: &Live) -> Self {
        Self {
            title: Some(l.title.clone()),
            date: Some(format_timestamp(l.date)),
            status: Some(l.status.code().into()),
            url: Some(l.url.clone()),
        }
    }
}

/// A required text value: absent and blank both count as missing.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_stored_values() {
        let stored = MatchInput {
            team1: Some(Ulid::new()),
            team2: Some(Ulid::new()),
            score1: Some(0),
            score2: Some(0),
            category: Some("C".into()),
            from: Some("2024-06-01T10:00:00.000Z".into()),
            to: Some("2024-06-01T12:00:00.000Z".into()),
            field: Some(2),
            tree: Some(1),
        };
        let patch = MatchInput {
            field: Some(3),
            ..Default::default()
        };
        let merged = patch.overlay(stored.clone());
        assert_eq!(merged.field, Some(3));
        assert_eq!(merged.team1, stored.team1);
        assert_eq!(merged.from, stored.from);
        assert_eq!(merged.tree, Some(1));
    }

    #[test]
    fn empty_patch_is_identity() {
        let live = Live {
            id: Ulid::new(),
            title: "Quarter finals".into(),
            date: 1_717_236_000_000,
            status: LiveStatus::Replay,
            url: "https://example.org/qf".into(),
        };
        let base = LiveInput::from(&live);
        assert_eq!(LiveInput::default().overlay(base.clone()), base);
    }

    #[test]
    fn general_event_round_trips_without_end() {
        let ev = AgendaEvent {
            id: Ulid::new(),
            from: 0,
            to: None,
            title: "Welcome".into(),
            content: String::new(),
            field: Field::GENERAL,
            category: Category::General,
            visibility: Visibility::Draft,
        };
        let input = AgendaInput::from(&ev);
        assert_eq!(input.to, None);
        assert_eq!(input.category.as_deref(), Some("g"));
        assert_eq!(input.status, Some(0));
    }

    #[test]
    fn blank_counts_as_missing() {
        assert_eq!(present(&Some("  ".into())), None);
        assert_eq!(present(&None), None);
        assert_eq!(present(&Some(" Lyon ".into())), Some("Lyon"));
    }
}

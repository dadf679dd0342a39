use std::cmp::Reverse;
use std::collections::HashMap;

use ulid::Ulid;

use crate::model::*;

/// In-memory materialization of the event log.
///
/// Entity maps plus a per-field occupancy index kept in sync by `apply`.
#[derive(Debug, Default)]
pub struct Tables {
    schools: HashMap<Ulid, School>,
    teams: HashMap<Ulid, Team>,
    matches: HashMap<Ulid, Match>,
    agenda: HashMap<Ulid, AgendaEvent>,
    lives: HashMap<Ulid, Live>,
    occupancy: HashMap<Field, FieldOccupancy>,
}

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookups ──────────────────────────────────────────────

    pub fn school(&self, id: &Ulid) -> Option<&School> {
        self.schools.get(id)
    }

    pub fn team(&self, id: &Ulid) -> Option<&Team> {
        self.teams.get(id)
    }

    pub fn match_by_id(&self, id: &Ulid) -> Option<&Match> {
        self.matches.get(id)
    }

    pub fn agenda_event(&self, id: &Ulid) -> Option<&AgendaEvent> {
        self.agenda.get(id)
    }

    pub fn live(&self, id: &Ulid) -> Option<&Live> {
        self.lives.get(id)
    }

    pub fn teams_of(&self, school: Ulid) -> impl Iterator<Item = &Team> {
        self.teams.values().filter(move |t| t.school == school)
    }

    pub fn matches_of(&self, team: Ulid) -> impl Iterator<Item = &Match> {
        self.matches.values().filter(move |m| m.involves(team))
    }

    /// School with this (name, category), ignoring `except`.
    pub fn school_named(&self, name: &str, category: Category, except: Option<Ulid>) -> Option<&School> {
        self.schools
            .values()
            .find(|s| s.name == name && s.category == category && Some(s.id) != except)
    }

    /// Team with this (name, school), ignoring `except`.
    pub fn team_named(&self, name: &str, school: Ulid, except: Option<Ulid>) -> Option<&Team> {
        self.teams
            .values()
            .find(|t| t.name == name && t.school == school && Some(t.id) != except)
    }

    /// The live currently on air, ignoring `except`.
    pub fn live_on_air(&self, except: Option<Ulid>) -> Option<&Live> {
        self.lives
            .values()
            .find(|l| l.status == LiveStatus::OnAir && Some(l.id) != except)
    }

    /// Bookings on `field` that touch `span`, minus the booking held by `except`.
    pub fn bookings_near(&self, field: Field, span: &Span, except: Option<Holder>) -> Vec<Booking> {
        match self.occupancy.get(&field) {
            Some(occ) => occ
                .near(span)
                .filter(|b| Some(b.holder) != except)
                .copied()
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn bookings_on(&self, field: Field) -> &[Booking] {
        self.occupancy
            .get(&field)
            .map(|occ| occ.bookings.as_slice())
            .unwrap_or(&[])
    }

    // ── Listings ─────────────────────────────────────────────

    /// Schools by category, then name.
    pub fn schools_sorted(&self) -> Vec<School> {
        let mut out: Vec<School> = self.schools.values().cloned().collect();
        out.sort_by(|a, b| (a.category, &a.name, a.id).cmp(&(b.category, &b.name, b.id)));
        out
    }

    /// Teams by name.
    pub fn teams_sorted(&self) -> Vec<Team> {
        let mut out: Vec<Team> = self.teams.values().cloned().collect();
        out.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        out
    }

    /// Matches by start, latest first.
    pub fn matches_sorted(&self) -> Vec<Match> {
        let mut out: Vec<Match> = self.matches.values().cloned().collect();
        out.sort_by_key(|m| (Reverse(m.span.start), Reverse(m.id)));
        out
    }

    /// Privileged callers see everything, latest first. Others see public
    /// events only, earliest first.
    pub fn agenda_sorted(&self, privileged: bool) -> Vec<AgendaEvent> {
        let mut out: Vec<AgendaEvent> = self
            .agenda
            .values()
            .filter(|e| privileged || e.visibility == Visibility::Public)
            .cloned()
            .collect();
        if privileged {
            out.sort_by_key(|e| (Reverse(e.from), Reverse(e.id)));
        } else {
            out.sort_by_key(|e| (e.from, e.id));
        }
        out
    }

    /// Privileged callers see everything, latest first. Others never see
    /// scheduled lives and get the rest earliest first.
    pub fn lives_sorted(&self, privileged: bool) -> Vec<Live> {
        let mut out: Vec<Live> = self
            .lives
            .values()
            .filter(|l| privileged || l.status != LiveStatus::Scheduled)
            .cloned()
            .collect();
        if privileged {
            out.sort_by_key(|l| (Reverse(l.date), Reverse(l.id)));
        } else {
            out.sort_by_key(|l| (l.date, l.id));
        }
        out
    }

    pub fn counts(&self) -> (usize, usize, usize, usize, usize) {
        (
            self.schools.len(),
            self.teams.len(),
            self.matches.len(),
            self.agenda.len(),
            self.lives.len(),
        )
    }

    // ── Event application ────────────────────────────────────

    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::SchoolCreated(s) | Event::SchoolUpdated(s) => {
                self.schools.insert(s.id, s.clone());
            }
            Event::SchoolDeleted { id } => {
                self.schools.remove(id);
            }
            Event::TeamCreated(t) | Event::TeamUpdated(t) => {
                self.teams.insert(t.id, t.clone());
            }
            Event::TeamDeleted { id } => {
                self.teams.remove(id);
            }
            Event::MatchCreated(m) | Event::MatchUpdated(m) => {
                if let Some(old) = self.matches.insert(m.id, m.clone()) {
                    self.release(old.field, Holder::Match(old.id));
                }
                self.hold(m.field, Holder::Match(m.id), m.span);
            }
            Event::MatchDeleted { id } => {
                if let Some(old) = self.matches.remove(id) {
                    self.release(old.field, Holder::Match(old.id));
                }
            }
            Event::AgendaEventCreated(e) | Event::AgendaEventUpdated(e) => {
                if let Some(old) = self.agenda.insert(e.id, e.clone()) {
                    self.release(old.field, Holder::AgendaEvent(old.id));
                }
                if let Some(span) = e.booking_span() {
                    self.hold(e.field, Holder::AgendaEvent(e.id), span);
                }
            }
            Event::AgendaEventDeleted { id } => {
                if let Some(old) = self.agenda.remove(id) {
                    self.release(old.field, Holder::AgendaEvent(old.id));
                }
            }
            Event::LiveCreated(l) | Event::LiveUpdated(l) => {
                self.lives.insert(l.id, l.clone());
            }
            Event::LiveDeleted { id } => {
                self.lives.remove(id);
            }
        }
    }

    fn hold(&mut self, field: Field, holder: Holder, span: Span) {
        if !field.is_bookable() {
            return;
        }
        self.occupancy
            .entry(field)
            .or_insert_with(|| FieldOccupancy::new(field))
            .insert(Booking { holder, span });
    }

    fn release(&mut self, field: Field, holder: Holder) {
        if let Some(occ) = self.occupancy.get_mut(&field) {
            occ.remove(holder);
        }
    }

    /// Minimal event sequence that rebuilds the current state, one entity per
    /// commit. Parents come before children.
    pub fn snapshot(&self) -> Vec<Vec<Event>> {
        let mut commits = Vec::with_capacity(
            self.schools.len() + self.teams.len() + self.matches.len() + self.agenda.len() + self.lives.len(),
        );
        commits.extend(self.schools.values().map(|s| vec![Event::SchoolCreated(s.clone())]));
        commits.extend(self.teams.values().map(|t| vec![Event::TeamCreated(t.clone())]));
        commits.extend(self.matches.values().map(|m| vec![Event::MatchCreated(m.clone())]));
        commits.extend(self.agenda.values().map(|e| vec![Event::AgendaEventCreated(e.clone())]));
        commits.extend(self.lives.values().map(|l| vec![Event::LiveCreated(l.clone())]));
        commits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const H: Ms = 3_600_000;

    fn field(n: i64) -> Field {
        Field::new(n).unwrap()
    }

    fn a_match(field_no: i64, start: Ms, end: Ms) -> Match {
        Match {
            id: Ulid::new(),
            team1: Ulid::new(),
            team2: Ulid::new(),
            score1: 0,
            score2: 0,
            category: Category::College,
            span: Span::new(start, end),
            field: field(field_no),
            tree: 0,
        }
    }

    fn event(field_no: i64, from: Ms, to: Option<Ms>, visibility: Visibility) -> AgendaEvent {
        AgendaEvent {
            id: Ulid::new(),
            from,
            to,
            title: "Ceremony".into(),
            content: String::new(),
            field: field(field_no),
            category: if field_no == 0 { Category::General } else { Category::Lycee },
            visibility,
        }
    }

    #[test]
    fn match_update_moves_occupancy() {
        let mut t = Tables::new();
        let m = a_match(1, 0, H);
        t.apply(&Event::MatchCreated(m.clone()));
        assert_eq!(t.bookings_on(field(1)).len(), 1);

        let moved = Match { field: field(2), span: Span::new(2 * H, 3 * H), ..m.clone() };
        t.apply(&Event::MatchUpdated(moved));
        assert!(t.bookings_on(field(1)).is_empty());
        assert_eq!(t.bookings_on(field(2))[0].span, Span::new(2 * H, 3 * H));

        t.apply(&Event::MatchDeleted { id: m.id });
        assert!(t.bookings_on(field(2)).is_empty());
        assert!(t.match_by_id(&m.id).is_none());
    }

    #[test]
    fn general_agenda_event_never_occupies() {
        let mut t = Tables::new();
        t.apply(&Event::AgendaEventCreated(event(0, 0, None, Visibility::Public)));
        for n in 1..=4 {
            assert!(t.bookings_on(field(n)).is_empty());
        }
        assert!(t.bookings_on(Field::GENERAL).is_empty());
    }

    #[test]
    fn bookings_near_excludes_self() {
        let mut t = Tables::new();
        let m = a_match(3, 0, H);
        let e = event(3, H, Some(2 * H), Visibility::Draft);
        t.apply(&Event::MatchCreated(m.clone()));
        t.apply(&Event::AgendaEventCreated(e.clone()));

        let all = t.bookings_near(field(3), &Span::new(0, 2 * H), None);
        assert_eq!(all.len(), 2);
        let others = t.bookings_near(field(3), &Span::new(0, 2 * H), Some(Holder::Match(m.id)));
        assert_eq!(others.len(), 1);
        assert_eq!(others[0].holder, Holder::AgendaEvent(e.id));
    }

    #[test]
    fn agenda_listing_depends_on_privilege() {
        let mut t = Tables::new();
        let early = event(0, H, None, Visibility::Public);
        let late = event(0, 5 * H, None, Visibility::Public);
        let draft = event(0, 3 * H, None, Visibility::Draft);
        for e in [&early, &late, &draft] {
            t.apply(&Event::AgendaEventCreated(e.clone()));
        }

        let admin: Vec<_> = t.agenda_sorted(true).into_iter().map(|e| e.id).collect();
        assert_eq!(admin, vec![late.id, draft.id, early.id]);

        let public: Vec<_> = t.agenda_sorted(false).into_iter().map(|e| e.id).collect();
        assert_eq!(public, vec![early.id, late.id]);
    }

    #[test]
    fn live_listing_hides_scheduled() {
        let mut t = Tables::new();
        let mk = |date, status| Live {
            id: Ulid::new(),
            title: "Final".into(),
            date,
            status,
            url: "https://example.org/live".into(),
        };
        let replay = mk(H, LiveStatus::Replay);
        let soon = mk(9 * H, LiveStatus::Scheduled);
        let on_air = mk(5 * H, LiveStatus::OnAir);
        for l in [&replay, &soon, &on_air] {
            t.apply(&Event::LiveCreated(l.clone()));
        }

        let admin: Vec<_> = t.lives_sorted(true).into_iter().map(|l| l.id).collect();
        assert_eq!(admin, vec![soon.id, on_air.id, replay.id]);
        let public: Vec<_> = t.lives_sorted(false).into_iter().map(|l| l.id).collect();
        assert_eq!(public, vec![replay.id, on_air.id]);
        assert_eq!(t.live_on_air(None).map(|l| l.id), Some(on_air.id));
        assert!(t.live_on_air(Some(on_air.id)).is_none());
    }

    #[test]
    fn schools_sort_by_category_then_name() {
        let mut t = Tables::new();
        let mk = |name: &str, category| School { id: Ulid::new(), name: name.into(), category };
        t.apply(&Event::SchoolCreated(mk("Zola", Category::College)));
        t.apply(&Event::SchoolCreated(mk("Arago", Category::Lycee)));
        t.apply(&Event::SchoolCreated(mk("Brassens", Category::College)));
        let names: Vec<_> = t.schools_sorted().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Brassens", "Zola", "Arago"]);
    }

    #[test]
    fn snapshot_rebuilds_same_state() {
        let mut t = Tables::new();
        let school = School { id: Ulid::new(), name: "Hugo".into(), category: Category::Lycee };
        let team = Team { id: Ulid::new(), name: "Hugo A".into(), school: school.id, roster: vec![] };
        let m = a_match(4, 0, H);
        t.apply(&Event::SchoolCreated(school));
        t.apply(&Event::TeamCreated(team));
        t.apply(&Event::MatchCreated(m));
        t.apply(&Event::AgendaEventCreated(event(2, 2 * H, Some(3 * H), Visibility::Public)));

        let mut rebuilt = Tables::new();
        for commit in t.snapshot() {
            for e in &commit {
                rebuilt.apply(e);
            }
        }
        assert_eq!(rebuilt.counts(), t.counts());
        assert_eq!(rebuilt.matches_sorted(), t.matches_sorted());
        assert_eq!(rebuilt.agenda_sorted(true), t.agenda_sorted(true));
        assert_eq!(rebuilt.bookings_on(field(2)).len(), 1);
        assert_eq!(rebuilt.bookings_on(field(4)).len(), 1);
    }
}

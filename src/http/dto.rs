//! Wire shapes. Each entity has one view (outgoing) and one body (incoming),
//! with the external camelCase names declared field by field.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::model::*;
use crate::service::{AgendaInput, LiveInput, MatchInput, SchoolCascade, SchoolInput, TeamInput};

// ── Views ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchoolView {
    pub id: Ulid,
    pub name: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeammateDto {
    pub name: String,
    #[serde(default)]
    pub role: u32,
    #[serde(default)]
    pub captain: bool,
    #[serde(rename = "imageId", default)]
    pub image_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamView {
    pub id: Ulid,
    pub name: String,
    pub school: Ulid,
    pub teammates: Vec<TeammateDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchView {
    pub id: Ulid,
    pub team1: Ulid,
    pub team2: Ulid,
    pub score1: u32,
    pub score2: u32,
    pub category: String,
    #[serde(rename = "fromDate")]
    pub from_date: String,
    #[serde(rename = "toDate")]
    pub to_date: String,
    pub field: u8,
    pub tree: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventView {
    pub id: Ulid,
    #[serde(rename = "fromDate")]
    pub from_date: String,
    #[serde(rename = "toDate")]
    pub to_date: Option<String>,
    pub title: String,
    pub content: String,
    pub field: u8,
    pub category: String,
    pub status: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveView {
    pub id: Ulid,
    pub title: String,
    pub date: String,
    pub status: String,
    pub url: String,
}

impl From<&Teammate> for TeammateDto {
    fn from(t: &Teammate) -> Self {
        Self {
            name: t.name.clone(),
            role: t.role,
            captain: t.captain,
            image_id: t.image_id.clone(),
        }
    }
}

impl From<TeammateDto> for Teammate {
    fn from(t: TeammateDto) -> Self {
        Self {
            name: t.name,
            role: t.role,
            captain: t.captain,
            image_id: t.image_id,
        }
    }
}

impl From<&School> for SchoolView {
    fn from(s: &School) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            category: s.category.code().into(),
        }
    }
}

impl From<&Team> for TeamView {
    fn from(t: &Team) -> Self {
        Self {
            id: t.id,
            name: t.name.clone(),
            school: t.school,
            teammates: t.roster.iter().map(TeammateDto::from).collect(),
        }
    }
}

impl From<&Match> for MatchView {
    fn from(m: &Match) -> Self {
        Self {
            id: m.id,
            team1: m.team1,
            team2: m.team2,
            score1: m.score1,
            score2: m.score2,
            category: m.category.code().into(),
            from_date: format_timestamp(m.span.start),
            to_date: format_timestamp(m.span.end),
            field: m.field.get(),
            tree: m.tree,
        }
    }
}

impl From<&AgendaEvent> for EventView {
    fn from(e: &AgendaEvent) -> Self {
        Self {
            id: e.id,
            from_date: format_timestamp(e.from),
            to_date: e.to.map(format_timestamp),
            title: e.title.clone(),
            content: e.content.clone(),
            field: e.field.get(),
            category: e.category.code().into(),
            status: e.visibility.code(),
        }
    }
}

impl From<&Live> for LiveView {
    fn from(l: &Live) -> Self {
        Self {
            id: l.id,
            title: l.title.clone(),
            date: format_timestamp(l.date),
            status: l.status.code().into(),
            url: l.url.clone(),
        }
    }
}

// ── Listing payloads ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SchoolsData {
    pub schools: Vec<SchoolView>,
}

#[derive(Debug, Serialize)]
pub struct TeamsData {
    pub teams: Vec<TeamView>,
}

#[derive(Debug, Serialize)]
pub struct MatchesData {
    pub matches: Vec<MatchView>,
}

#[derive(Debug, Serialize)]
pub struct EventsData {
    pub events: Vec<EventView>,
}

#[derive(Debug, Serialize)]
pub struct LivesData {
    pub lives: Vec<LiveView>,
}

#[derive(Debug, Serialize)]
pub struct CascadeData {
    pub schools: Vec<SchoolView>,
    pub teams: Vec<TeamView>,
    pub matches: Vec<MatchView>,
}

#[derive(Debug, Serialize)]
pub struct JwtData {
    pub jwt: String,
}

impl From<Vec<School>> for SchoolsData {
    fn from(v: Vec<School>) -> Self {
        Self { schools: v.iter().map(SchoolView::from).collect() }
    }
}

impl From<Vec<Team>> for TeamsData {
    fn from(v: Vec<Team>) -> Self {
        Self { teams: v.iter().map(TeamView::from).collect() }
    }
}

impl From<Vec<Match>> for MatchesData {
    fn from(v: Vec<Match>) -> Self {
        Self { matches: v.iter().map(MatchView::from).collect() }
    }
}

impl From<Vec<AgendaEvent>> for EventsData {
    fn from(v: Vec<AgendaEvent>) -> Self {
        Self { events: v.iter().map(EventView::from).collect() }
    }
}

impl From<Vec<Live>> for LivesData {
    fn from(v: Vec<Live>) -> Self {
        Self { lives: v.iter().map(LiveView::from).collect() }
    }
}

impl From<SchoolCascade> for CascadeData {
    fn from(c: SchoolCascade) -> Self {
        Self {
            schools: c.schools.iter().map(SchoolView::from).collect(),
            teams: c.teams.iter().map(TeamView::from).collect(),
            matches: c.matches.iter().map(MatchView::from).collect(),
        }
    }
}

// ── Bodies ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SchoolBody {
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TeamBody {
    pub name: Option<String>,
    pub school: Option<Ulid>,
    pub teammates: Option<Vec<TeammateDto>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchBody {
    pub team1: Option<Ulid>,
    pub team2: Option<Ulid>,
    pub score1: Option<i64>,
    pub score2: Option<i64>,
    pub category: Option<String>,
    #[serde(rename = "fromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "toDate")]
    pub to_date: Option<String>,
    pub field: Option<i64>,
    pub tree: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventBody {
    #[serde(rename = "fromDate")]
    pub from_date: Option<String>,
    #[serde(rename = "toDate")]
    pub to_date: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub field: Option<i64>,
    pub category: Option<String>,
    pub status: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveBody {
    pub title: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
    pub url: Option<String>,
}

impl From<SchoolBody> for SchoolInput {
    fn from(b: SchoolBody) -> Self {
        Self {
            name: b.name,
            category: b.category,
        }
    }
}

impl From<TeamBody> for TeamInput {
    fn from(b: TeamBody) -> Self {
        Self {
            name: b.name,
            school: b.school,
            roster: b.teammates.map(|v| v.into_iter().map(Teammate::from).collect()),
        }
    }
}

impl From<MatchBody> for MatchInput {
    fn from(b: MatchBody) -> Self {
        Self {
            team1: b.team1,
            team2: b.team2,
            score1: b.score1,
            score2: b.score2,
            category: b.category,
            from: b.from_date,
            to: b.to_date,
            field: b.field,
            tree: b.tree,
        }
    }
}

impl From<EventBody> for AgendaInput {
    fn from(b: EventBody) -> Self {
        Self {
            from: b.from_date,
            to: b.to_date,
            title: b.title,
            content: b.content,
            field: b.field,
            category: b.category,
            status: b.status,
        }
    }
}

impl From<LiveBody> for LiveInput {
    fn from(b: LiveBody) -> Self {
        Self {
            title: b.title,
            date: b.date,
            status: b.status,
            url: b.url,
        }
    }
}

use std::sync::Arc;

use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::store::Tables;

use super::conflict::{check_field_free, validate_span, validate_timestamp};
use super::input::{present, AgendaInput, MatchInput};
use super::{Context, Entity, ServiceError};

/// Create and update of the two booking streams, matches and agenda events.
#[derive(Clone)]
pub struct SchedulingService {
    ctx: Arc<Context>,
}

/// A match payload that passed every check not needing the tables.
struct MatchDraft {
    team1: Ulid,
    team2: Ulid,
    score1: u32,
    score2: u32,
    category: Category,
    span: Span,
    field: Field,
    tree: u32,
}

/// An agenda payload that passed every check not needing the tables.
struct AgendaDraft {
    from: Ms,
    to: Option<Ms>,
    title: String,
    content: String,
    field: Field,
    category: Category,
    visibility: Visibility,
}

fn count(raw: Option<i64>, what: &'static str) -> Result<u32, ServiceError> {
    match raw {
        None => Ok(0),
        Some(n) => u32::try_from(n).map_err(|_| ServiceError::InvalidParameters(what)),
    }
}

fn parse_dates(from: &str, to: &str) -> Result<Span, ServiceError> {
    let (Some(start), Some(end)) = (parse_timestamp(from), parse_timestamp(to)) else {
        return Err(ServiceError::InvalidDates);
    };
    if start >= end {
        return Err(ServiceError::InvalidDates);
    }
    let span = Span::new(start, end);
    validate_span(&span)?;
    Ok(span)
}

impl MatchDraft {
    fn parse(input: &MatchInput) -> Result<Self, ServiceError> {
        let (Some(team1), Some(team2), Some(from), Some(to), Some(category), Some(field)) = (
            input.team1,
            input.team2,
            present(&input.from),
            present(&input.to),
            present(&input.category),
            input.field,
        ) else {
            return Err(ServiceError::MissingParameters);
        };
        let category = Category::from_code(category)
            .filter(Category::is_tier)
            .ok_or(ServiceError::InvalidParameters("category must be C or L"))?;
        let field = Field::bookable(field).ok_or(ServiceError::InvalidParameters("field must be 1 to 4"))?;
        if team1 == team2 {
            return Err(ServiceError::InvalidParameters("teams must be distinct"));
        }
        let score1 = count(input.score1, "score1 must be a non-negative integer")?;
        let score2 = count(input.score2, "score2 must be a non-negative integer")?;
        let tree = count(input.tree, "tree must be a non-negative integer")?;
        let span = parse_dates(from, to)?;
        Ok(Self {
            team1,
            team2,
            score1,
            score2,
            category,
            span,
            field,
            tree,
        })
    }

    /// Checks against current state. `stored` is the record being updated.
    fn resolve(self, tables: &Tables, id: Ulid, stored: Option<&Match>) -> Result<Match, ServiceError> {
        if tables.team(&self.team1).is_none() || tables.team(&self.team2).is_none() {
            return Err(ServiceError::UnknownReference(Entity::Team));
        }
        let unchanged = stored.is_some_and(|m| m.field == self.field && m.span == self.span);
        if !unchanged {
            let near = tables.bookings_near(self.field, &self.span, Some(Holder::Match(id)));
            check_field_free(self.field, &self.span, &near)?;
        }
        if self.score1 == self.score2 && self.score1 != 0 {
            return Err(ServiceError::InvalidScore);
        }
        Ok(Match {
            id,
            team1: self.team1,
            team2: self.team2,
            score1: self.score1,
            score2: self.score2,
            category: self.category,
            span: self.span,
            field: self.field,
            tree: self.tree,
        })
    }
}

impl AgendaDraft {
    fn parse(input: &AgendaInput) -> Result<Self, ServiceError> {
        let (Some(title), Some(from), Some(category), Some(field), Some(status)) = (
            present(&input.title),
            present(&input.from),
            present(&input.category),
            input.field,
            input.status,
        ) else {
            return Err(ServiceError::MissingParameters);
        };
        let to = present(&input.to);
        if field != 0 && to.is_none() {
            return Err(ServiceError::MissingParameters);
        }
        let category = Category::from_code(category)
            .ok_or(ServiceError::InvalidParameters("category must be C, L or g"))?;
        let visibility =
            Visibility::from_code(status).ok_or(ServiceError::InvalidParameters("status must be 0 or 1"))?;
        let field = Field::new(field).ok_or(ServiceError::InvalidParameters("field must be 0 to 4"))?;

        let content = input.content.clone().unwrap_or_default();
        if title.len() > MAX_TITLE_LEN {
            return Err(ServiceError::LimitExceeded("title too long"));
        }
        if content.len() > MAX_CONTENT_LEN {
            return Err(ServiceError::LimitExceeded("content too long"));
        }

        let (category, from, to) = match to {
            _ if !field.is_bookable() => {
                let from = parse_timestamp(from).ok_or(ServiceError::InvalidDates)?;
                validate_timestamp(from)?;
                (Category::General, from, None)
            }
            Some(to) => {
                if !category.is_tier() {
                    return Err(ServiceError::InvalidParameters("category must be C or L on a field"));
                }
                let span = parse_dates(from, to)?;
                (category, span.start, Some(span.end))
            }
            None => return Err(ServiceError::MissingParameters),
        };

        Ok(Self {
            from,
            to,
            title: title.to_string(),
            content,
            field,
            category,
            visibility,
        })
    }

    fn resolve(self, tables: &Tables, id: Ulid, stored: Option<&AgendaEvent>) -> Result<AgendaEvent, ServiceError> {
        let event = AgendaEvent {
            id,
            from: self.from,
            to: self.to,
            title: self.title,
            content: self.content,
            field: self.field,
            category: self.category,
            visibility: self.visibility,
        };
        if let Some(span) = event.booking_span() {
            let unchanged = stored.is_some_and(|s| s.field == event.field && s.booking_span() == Some(span));
            if !unchanged {
                let near = tables.bookings_near(event.field, &span, Some(Holder::AgendaEvent(id)));
                check_field_free(event.field, &span, &near)?;
            }
        }
        Ok(event)
    }
}

impl SchedulingService {
    pub(super) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// All matches, latest first. Public.
    pub async fn matches(&self) -> Vec<Match> {
        self.ctx.store.tables().read().await.matches_sorted()
    }

    /// Agenda, filtered to public events for unprivileged callers.
    pub async fn agenda(&self, credential: Option<&str>) -> Vec<AgendaEvent> {
        let privileged = self.ctx.privileged(credential).await;
        self.ctx.store.tables().read().await.agenda_sorted(privileged)
    }

    pub async fn create_match(&self, credential: Option<&str>, input: MatchInput) -> Result<Vec<Match>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let draft = MatchDraft::parse(&input)?;

        let guard = self.ctx.locks.booking(&[draft.field]).await;
        debug_assert!(guard.covers(draft.field));
        let m = {
            let tables = self.ctx.store.tables().read().await;
            draft.resolve(&tables, Ulid::new(), None)?
        };
        self.ctx.store.commit(vec![Event::MatchCreated(m.clone())]).await?;
        info!("match {} created on field {}", m.id, m.field);
        Ok(self.ctx.store.tables().read().await.matches_sorted())
    }

    pub async fn update_match(
        &self,
        credential: Option<&str>,
        id: Ulid,
        patch: MatchInput,
    ) -> Result<Vec<Match>, ServiceError> {
        self.ctx.authorize(credential).await?;

        loop {
            let stored = self.load_match(id).await?;
            if stored.is_played() {
                return Err(ServiceError::AlreadyPlayed(id));
            }
            let merged = patch.clone().overlay(MatchInput::from(&stored));
            let draft = MatchDraft::parse(&merged)?;

            let guard = self.ctx.locks.booking(&[stored.field, draft.field]).await;
            let tables = self.ctx.store.tables().read().await;
            let current = tables
                .match_by_id(&id)
                .ok_or(ServiceError::NotFound(Entity::Match, id))?;
            if *current != stored {
                // Changed between the unlocked read and the lock; start over.
                drop(tables);
                drop(guard);
                continue;
            }
            let m = draft.resolve(&tables, id, Some(&stored))?;
            drop(tables);

            self.ctx.store.commit(vec![Event::MatchUpdated(m.clone())]).await?;
            info!("match {id} updated on field {}", m.field);
            return Ok(self.ctx.store.tables().read().await.matches_sorted());
        }
    }

    pub async fn create_agenda_event(
        &self,
        credential: Option<&str>,
        input: AgendaInput,
    ) -> Result<Vec<AgendaEvent>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let draft = AgendaDraft::parse(&input)?;

        let guard = self.ctx.locks.booking(&[draft.field]).await;
        debug_assert!(guard.covers(draft.field));
        let event = {
            let tables = self.ctx.store.tables().read().await;
            draft.resolve(&tables, Ulid::new(), None)?
        };
        self.ctx.store.commit(vec![Event::AgendaEventCreated(event.clone())]).await?;
        info!("agenda event {} created on field {}", event.id, event.field);
        Ok(self.ctx.store.tables().read().await.agenda_sorted(true))
    }

    pub async fn update_agenda_event(
        &self,
        credential: Option<&str>,
        id: Ulid,
        patch: AgendaInput,
    ) -> Result<Vec<AgendaEvent>, ServiceError> {
        self.ctx.authorize(credential).await?;

        loop {
            let stored = self.load_agenda_event(id).await?;
            let merged = patch.clone().overlay(AgendaInput::from(&stored));
            let draft = AgendaDraft::parse(&merged)?;

            let guard = self.ctx.locks.booking(&[stored.field, draft.field]).await;
            let tables = self.ctx.store.tables().read().await;
            let current = tables
                .agenda_event(&id)
                .ok_or(ServiceError::NotFound(Entity::AgendaEvent, id))?;
            if *current != stored {
                drop(tables);
                drop(guard);
                continue;
            }
            let event = draft.resolve(&tables, id, Some(&stored))?;
            drop(tables);

            self.ctx.store.commit(vec![Event::AgendaEventUpdated(event.clone())]).await?;
            info!("agenda event {id} updated on field {}", event.field);
            return Ok(self.ctx.store.tables().read().await.agenda_sorted(true));
        }
    }

    async fn load_match(&self, id: Ulid) -> Result<Match, ServiceError> {
        self.ctx
            .store
            .tables()
            .read()
            .await
            .match_by_id(&id)
            .cloned()
            .ok_or(ServiceError::NotFound(Entity::Match, id))
    }

    async fn load_agenda_event(&self, id: Ulid) -> Result<AgendaEvent, ServiceError> {
        self.ctx
            .store
            .tables()
            .read()
            .await
            .agenda_event(&id)
            .cloned()
            .ok_or(ServiceError::NotFound(Entity::AgendaEvent, id))
    }
}

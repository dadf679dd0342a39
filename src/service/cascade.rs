use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;
use ulid::Ulid;

use crate::model::*;

use super::{Context, Entity, ServiceError};

/// Deletes, including the School -> Team -> Match cascade.
///
/// Each delete runs under the exclusive catalog lock and commits one batch:
/// dependent matches first, then teams, then the school. The batch is a single
/// WAL frame, so a failure anywhere leaves every row in place.
#[derive(Clone)]
pub struct CascadeService {
    ctx: Arc<Context>,
}

/// Listings returned after a school delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolCascade {
    pub schools: Vec<School>,
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
}

fn record_cascade(entity: &'static str, n: usize) {
    if n > 0 {
        metrics::counter!(crate::observability::CASCADE_DELETED_TOTAL, "entity" => entity).increment(n as u64);
    }
}

impl CascadeService {
    pub(super) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    pub async fn delete_school(&self, credential: Option<&str>, id: Ulid) -> Result<SchoolCascade, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;

        let (batch, teams, matches) = {
            let tables = self.ctx.store.tables().read().await;
            if tables.school(&id).is_none() {
                return Err(ServiceError::NotFound(Entity::School, id));
            }
            let team_ids: Vec<Ulid> = tables.teams_of(id).map(|t| t.id).collect();
            let mut match_ids: Vec<Ulid> = Vec::new();
            let mut seen = HashSet::new();
            for team in &team_ids {
                for m in tables.matches_of(*team) {
                    // A match between two teams of the same school shows up twice.
                    if seen.insert(m.id) {
                        match_ids.push(m.id);
                    }
                }
            }

            let mut batch = Vec::with_capacity(match_ids.len() + team_ids.len() + 1);
            batch.extend(match_ids.iter().map(|&id| Event::MatchDeleted { id }));
            batch.extend(team_ids.iter().map(|&id| Event::TeamDeleted { id }));
            batch.push(Event::SchoolDeleted { id });
            (batch, team_ids.len(), match_ids.len())
        };

        self.ctx.store.commit(batch).await?;
        record_cascade("team", teams);
        record_cascade("match", matches);
        info!("school {id} deleted with {teams} teams and {matches} matches");

        let tables = self.ctx.store.tables().read().await;
        Ok(SchoolCascade {
            schools: tables.schools_sorted(),
            teams: tables.teams_sorted(),
            matches: tables.matches_sorted(),
        })
    }

    pub async fn delete_team(&self, credential: Option<&str>, id: Ulid) -> Result<Vec<Team>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;

        let batch = {
            let tables = self.ctx.store.tables().read().await;
            if tables.team(&id).is_none() {
                return Err(ServiceError::NotFound(Entity::Team, id));
            }
            let mut batch: Vec<Event> = tables.matches_of(id).map(|m| Event::MatchDeleted { id: m.id }).collect();
            batch.push(Event::TeamDeleted { id });
            batch
        };
        let matches = batch.len() - 1;

        self.ctx.store.commit(batch).await?;
        record_cascade("match", matches);
        info!("team {id} deleted with {matches} matches");
        Ok(self.ctx.store.tables().read().await.teams_sorted())
    }

    pub async fn delete_match(&self, credential: Option<&str>, id: Ulid) -> Result<Vec<Match>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;

        {
            let tables = self.ctx.store.tables().read().await;
            let m = tables.match_by_id(&id).ok_or(ServiceError::NotFound(Entity::Match, id))?;
            if m.is_played() {
                return Err(ServiceError::AlreadyPlayed(id));
            }
        }

        self.ctx.store.commit(vec![Event::MatchDeleted { id }]).await?;
        info!("match {id} deleted");
        Ok(self.ctx.store.tables().read().await.matches_sorted())
    }

    pub async fn delete_agenda_event(&self, credential: Option<&str>, id: Ulid) -> Result<Vec<AgendaEvent>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;

        if self.ctx.store.tables().read().await.agenda_event(&id).is_none() {
            return Err(ServiceError::NotFound(Entity::AgendaEvent, id));
        }

        self.ctx.store.commit(vec![Event::AgendaEventDeleted { id }]).await?;
        info!("agenda event {id} deleted");
        Ok(self.ctx.store.tables().read().await.agenda_sorted(true))
    }

    pub async fn delete_live(&self, credential: Option<&str>, id: Ulid) -> Result<Vec<Live>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;

        if self.ctx.store.tables().read().await.live(&id).is_none() {
            return Err(ServiceError::NotFound(Entity::Live, id));
        }

        self.ctx.store.commit(vec![Event::LiveDeleted { id }]).await?;
        info!("live {id} deleted");
        Ok(self.ctx.store.tables().read().await.lives_sorted(true))
    }
}

use std::sync::Arc;

use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::store::Tables;

use super::input::{present, SchoolInput, TeamInput};
use super::{Context, Entity, ServiceError};

/// Schools and teams. Every write holds the catalog lock exclusively, so no
/// booking write can observe a half-renamed or half-moved team.
#[derive(Clone)]
pub struct CatalogService {
    ctx: Arc<Context>,
}

fn check_name(name: &str) -> Result<(), ServiceError> {
    if name.len() > MAX_NAME_LEN {
        return Err(ServiceError::LimitExceeded("name too long"));
    }
    Ok(())
}

fn build_school(tables: &Tables, id: Ulid, input: &SchoolInput) -> Result<School, ServiceError> {
    let (Some(name), Some(category)) = (present(&input.name), present(&input.category)) else {
        return Err(ServiceError::MissingParameters);
    };
    let category = Category::from_code(category)
        .filter(Category::is_tier)
        .ok_or(ServiceError::InvalidParameters("category must be C or L"))?;
    check_name(name)?;
    if tables.school_named(name, category, Some(id)).is_some() {
        return Err(ServiceError::AlreadyExists(Entity::School));
    }
    Ok(School {
        id,
        name: name.to_string(),
        category,
    })
}

fn build_team(tables: &Tables, id: Ulid, input: &TeamInput) -> Result<Team, ServiceError> {
    let (Some(name), Some(school), Some(roster)) = (present(&input.name), input.school, input.roster.as_ref()) else {
        return Err(ServiceError::MissingParameters);
    };
    check_name(name)?;
    if roster.len() > MAX_ROSTER_SIZE {
        return Err(ServiceError::LimitExceeded("roster too large"));
    }
    for mate in roster {
        check_name(&mate.name)?;
        if mate.image_id.len() > MAX_NAME_LEN {
            return Err(ServiceError::LimitExceeded("image id too long"));
        }
    }
    if tables.school(&school).is_none() {
        return Err(ServiceError::UnknownReference(Entity::School));
    }
    if tables.team_named(name, school, Some(id)).is_some() {
        return Err(ServiceError::AlreadyExists(Entity::Team));
    }
    Ok(Team {
        id,
        name: name.to_string(),
        school,
        roster: roster.clone(),
    })
}

impl CatalogService {
    pub(super) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Schools by category, then name. Public.
    pub async fn schools(&self) -> Vec<School> {
        self.ctx.store.tables().read().await.schools_sorted()
    }

    /// Teams by name. Public.
    pub async fn teams(&self) -> Vec<Team> {
        self.ctx.store.tables().read().await.teams_sorted()
    }

    pub async fn create_school(&self, credential: Option<&str>, input: SchoolInput) -> Result<Vec<School>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;
        let school = {
            let tables = self.ctx.store.tables().read().await;
            build_school(&tables, Ulid::new(), &input)?
        };
        self.ctx.store.commit(vec![Event::SchoolCreated(school.clone())]).await?;
        info!("school {} created: {}", school.id, school.name);
        Ok(self.ctx.store.tables().read().await.schools_sorted())
    }

    pub async fn update_school(
        &self,
        credential: Option<&str>,
        id: Ulid,
        patch: SchoolInput,
    ) -> Result<Vec<School>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;
        let school = {
            let tables = self.ctx.store.tables().read().await;
            let stored = tables.school(&id).ok_or(ServiceError::NotFound(Entity::School, id))?;
            build_school(&tables, id, &patch.overlay(SchoolInput::from(stored)))?
        };
        self.ctx.store.commit(vec![Event::SchoolUpdated(school)]).await?;
        info!("school {id} updated");
        Ok(self.ctx.store.tables().read().await.schools_sorted())
    }

    pub async fn create_team(&self, credential: Option<&str>, input: TeamInput) -> Result<Vec<Team>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;
        let team = {
            let tables = self.ctx.store.tables().read().await;
            build_team(&tables, Ulid::new(), &input)?
        };
        self.ctx.store.commit(vec![Event::TeamCreated(team.clone())]).await?;
        info!("team {} created: {}", team.id, team.name);
        Ok(self.ctx.store.tables().read().await.teams_sorted())
    }

    pub async fn update_team(&self, credential: Option<&str>, id: Ulid, patch: TeamInput) -> Result<Vec<Team>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;
        let team = {
            let tables = self.ctx.store.tables().read().await;
            let stored = tables.team(&id).ok_or(ServiceError::NotFound(Entity::Team, id))?;
            build_team(&tables, id, &patch.overlay(TeamInput::from(stored)))?
        };
        self.ctx.store.commit(vec![Event::TeamUpdated(team)]).await?;
        info!("team {id} updated");
        Ok(self.ctx.store.tables().read().await.teams_sorted())
    }
}

use std::sync::Arc;

use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::store::Tables;

use super::conflict::validate_timestamp;
use super::input::{present, LiveInput};
use super::{Context, Entity, ServiceError};

/// Broadcast announcements. At most one live is on air.
#[derive(Clone)]
pub struct LiveService {
    ctx: Arc<Context>,
}

fn build_live(tables: &Tables, id: Ulid, input: &LiveInput) -> Result<Live, ServiceError> {
    let (Some(title), Some(date), Some(status), Some(url)) = (
        present(&input.title),
        present(&input.date),
        present(&input.status),
        present(&input.url),
    ) else {
        return Err(ServiceError::MissingParameters);
    };
    let status = LiveStatus::from_code(status).ok_or(ServiceError::InvalidParameters("status must be s, l or r"))?;
    let date = parse_timestamp(date).ok_or(ServiceError::InvalidDates)?;
    validate_timestamp(date)?;
    if title.len() > MAX_TITLE_LEN {
        return Err(ServiceError::LimitExceeded("title too long"));
    }
    if url.len() > MAX_URL_LEN {
        return Err(ServiceError::LimitExceeded("url too long"));
    }
    if status == LiveStatus::OnAir && tables.live_on_air(Some(id)).is_some() {
        return Err(ServiceError::LiveAlreadyRunning);
    }
    Ok(Live {
        id,
        title: title.to_string(),
        date,
        status,
        url: url.to_string(),
    })
}

impl LiveService {
    pub(super) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Everything for privileged callers; scheduled lives hidden otherwise.
    pub async fn lives(&self, credential: Option<&str>) -> Vec<Live> {
        let privileged = self.ctx.privileged(credential).await;
        self.ctx.store.tables().read().await.lives_sorted(privileged)
    }

    pub async fn create_live(&self, credential: Option<&str>, input: LiveInput) -> Result<Vec<Live>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;
        let live = {
            let tables = self.ctx.store.tables().read().await;
            build_live(&tables, Ulid::new(), &input)?
        };
        self.ctx.store.commit(vec![Event::LiveCreated(live.clone())]).await?;
        info!("live {} created ({})", live.id, live.status.code());
        Ok(self.ctx.store.tables().read().await.lives_sorted(true))
    }

    pub async fn update_live(&self, credential: Option<&str>, id: Ulid, patch: LiveInput) -> Result<Vec<Live>, ServiceError> {
        self.ctx.authorize(credential).await?;
        let _guard = self.ctx.locks.exclusive().await;
        let live = {
            let tables = self.ctx.store.tables().read().await;
            let stored = tables.live(&id).ok_or(ServiceError::NotFound(Entity::Live, id))?;
            build_live(&tables, id, &patch.overlay(LiveInput::from(stored)))?
        };
        self.ctx.store.commit(vec![Event::LiveUpdated(live.clone())]).await?;
        info!("live {id} updated ({})", live.status.code());
        Ok(self.ctx.store.tables().read().await.lives_sorted(true))
    }
}

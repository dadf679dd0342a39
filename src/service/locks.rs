use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::limits::FIELD_COUNT;
use crate::model::Field;

/// Write-side locking for the services.
///
/// Booking writes hold `catalog` shared plus the mutex of every field they
/// touch, so two bookings on different fields run in parallel while two on the
/// same field serialize across their check and commit. Catalog writes, deletes
/// and live writes hold `catalog` exclusively.
pub struct LockTable {
    catalog: RwLock<()>,
    fields: [Mutex<()>; FIELD_COUNT as usize],
}

pub struct BookingGuard<'a> {
    _catalog: RwLockReadGuard<'a, ()>,
    _fields: Vec<MutexGuard<'a, ()>>,
    held: Vec<Field>,
}

impl BookingGuard<'_> {
    /// Whether this guard serializes writes on `field`. Field 0 never needs it.
    pub fn covers(&self, field: Field) -> bool {
        !field.is_bookable() || self.held.contains(&field)
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(()),
            fields: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.catalog.write().await
    }

    /// Lock the given fields in ascending order to prevent deadlocks.
    pub async fn booking(&self, fields: &[Field]) -> BookingGuard<'_> {
        let catalog = self.catalog.read().await;
        let mut held: Vec<Field> = fields.iter().copied().filter(Field::is_bookable).collect();
        held.sort();
        held.dedup();
        let mut guards = Vec::with_capacity(held.len());
        for field in &held {
            guards.push(self.fields[usize::from(field.get()) - 1].lock().await);
        }
        BookingGuard {
            _catalog: catalog,
            _fields: guards,
            held,
        }
    }
}

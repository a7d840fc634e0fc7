use crate::error::AvailabilityError;
use crate::model::AvailabilityDocument;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};
use tracing::debug;

pub type LoadOutcome = Result<Arc<AvailabilityDocument>, AvailabilityError>;

type Cell = Arc<OnceLock<LoadOutcome>>;

/// Single-date availability cache.
///
/// Holds at most one date as the current answer. Callers asking for a date
/// share one cell: the first runs the loader, the rest block until its
/// outcome is ready. Loads still running for a date that is no longer
/// current stay joinable, so a date never has two fetches in flight.
#[derive(Debug, Default)]
pub struct AvailabilityCache {
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    current: Option<CacheSlot>,
    in_flight: HashMap<NaiveDate, Weak<OnceLock<LoadOutcome>>>,
}

#[derive(Debug)]
struct CacheSlot {
    date: NaiveDate,
    cell: Cell,
}

impl CacheState {
    fn is_current(&self, cell: &Cell) -> bool {
        self.current
            .as_ref()
            .is_some_and(|slot| Arc::ptr_eq(&slot.cell, cell))
    }

    /// A load for `date` that has not finished yet, if any caller still
    /// waits on it.
    fn pending(&mut self, date: NaiveDate) -> Option<Cell> {
        self.in_flight.retain(|_, weak| weak.strong_count() > 0);
        self.in_flight
            .get(&date)
            .and_then(Weak::upgrade)
            .filter(|cell| cell.get().is_none())
    }
}

impl AvailabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.lock().current.as_ref().map(|slot| slot.date)
    }

    /// Completed outcome for `date`, if that date is current.
    pub fn get(&self, date: NaiveDate) -> Option<LoadOutcome> {
        let state = self.lock();
        let slot = state.current.as_ref().filter(|slot| slot.date == date)?;
        slot.cell.get().cloned()
    }

    pub fn put(&self, date: NaiveDate, outcome: LoadOutcome) {
        let cell = OnceLock::new();
        let _ = cell.set(outcome);
        self.lock().current = Some(CacheSlot {
            date,
            cell: Arc::new(cell),
        });
    }

    pub fn invalidate(&self) {
        self.lock().current = None;
    }

    /// Returns the outcome for `date`, running `load` only when no cell
    /// for that date is current or in flight.
    ///
    /// `commit` runs under the cache lock, and only if the load's cell is
    /// still current when the load finishes. Its return value becomes the
    /// outcome. A load overtaken by a newer date skips `commit`.
    pub fn get_or_load<F, C>(&self, date: NaiveDate, load: F, commit: C) -> LoadOutcome
    where
        F: FnOnce() -> LoadOutcome,
        C: FnOnce(LoadOutcome) -> LoadOutcome,
    {
        let cell = self.cell_for(date);
        cell.get_or_init(|| {
            let outcome = load();
            let state = self.lock();
            if state.is_current(&cell) {
                commit(outcome)
            } else {
                debug!(date = %date, "load finished after date was replaced; not committing");
                outcome
            }
        })
        .clone()
    }

    fn cell_for(&self, date: NaiveDate) -> Cell {
        let mut state = self.lock();
        if let Some(slot) = state.current.as_ref().filter(|slot| slot.date == date) {
            return Arc::clone(&slot.cell);
        }

        let replaced = state.current.as_ref().map(|slot| slot.date);
        let cell = match state.pending(date) {
            Some(cell) => {
                debug!(date = %date, replaced = ?replaced, "joining in-flight load");
                cell
            }
            None => {
                debug!(date = %date, replaced = ?replaced, "availability cache miss");
                let cell: Cell = Arc::new(OnceLock::new());
                state.in_flight.insert(date, Arc::downgrade(&cell));
                cell
            }
        };
        state.current = Some(CacheSlot {
            date,
            cell: Arc::clone(&cell),
        });
        cell
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

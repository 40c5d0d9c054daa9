use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::domain::{CompanyId, Technician};

#[derive(Debug, Clone)]
struct CachedRoster {
    fetched_at: Instant,
    technicians: Vec<Technician>,
}

#[derive(Debug, Default)]
struct CompanySlot {
    generation: u64,
    roster: Option<CachedRoster>,
}

/// Per-company technician list with a staleness window. Writes for a company
/// drop its entry and bump its generation, so a fetch that started before the
/// write cannot put its result back.
#[derive(Debug)]
pub(crate) struct RosterCache {
    ttl: Duration,
    slots: Mutex<HashMap<CompanyId, CompanySlot>>,
}

impl RosterCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<CompanyId, CompanySlot>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub(crate) fn fresh(&self, company: CompanyId, now: Instant) -> Option<Vec<Technician>> {
        self.slots()
            .get(&company)
            .and_then(|slot| slot.roster.as_ref())
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| entry.technicians.clone())
    }

    /// Read before fetching; pass the value back to [`RosterCache::store`].
    pub(crate) fn generation(&self, company: CompanyId) -> u64 {
        self.slots()
            .get(&company)
            .map_or(0, |slot| slot.generation)
    }

    /// Keeps the list only if no write for the company landed since
    /// `generation` was read.
    pub(crate) fn store(
        &self,
        company: CompanyId,
        generation: u64,
        technicians: Vec<Technician>,
        now: Instant,
    ) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let mut slots = self.slots();
        let slot = slots.entry(company).or_default();
        if slot.generation != generation {
            return false;
        }
        slot.roster = Some(CachedRoster {
            fetched_at: now,
            technicians,
        });
        true
    }

    pub(crate) fn invalidate(&self, company: CompanyId) {
        let mut slots = self.slots();
        let slot = slots.entry(company).or_default();
        slot.generation = slot.generation.wrapping_add(1);
        slot.roster = None;
    }
}

use crate::id::StationId;
use std::collections::BTreeSet;

/// Tracks which stations changed since the last clean point.
///
/// A [`Workshop`](crate::workshop::Workshop) marks a station whenever its
/// tick report says so, and hosts persist only the marked stations before
/// calling [`mark_clean`](DirtyTracker::mark_clean).
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_stations: BTreeSet<StationId>,
    /// Stations were added or removed.
    membership_dirty: bool,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_station(&mut self, station: StationId) {
        self.dirty_stations.insert(station);
    }

    pub fn mark_membership(&mut self) {
        self.membership_dirty = true;
    }

    /// Returns `true` if anything has been marked dirty since the last clean.
    pub fn is_dirty(&self) -> bool {
        self.membership_dirty || !self.dirty_stations.is_empty()
    }

    pub fn is_station_dirty(&self, station: StationId) -> bool {
        self.dirty_stations.contains(&station)
    }

    pub fn is_membership_dirty(&self) -> bool {
        self.membership_dirty
    }

    /// Dirty stations in stable key order.
    pub fn dirty_stations(&self) -> &BTreeSet<StationId> {
        &self.dirty_stations
    }

    /// Forget a removed station.
    pub fn forget(&mut self, station: StationId) {
        self.dirty_stations.remove(&station);
    }

    pub fn mark_clean(&mut self) {
        self.dirty_stations.clear();
        self.membership_dirty = false;
    }
}

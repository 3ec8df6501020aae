//! A collection of stations ticked together.
//!
//! The workshop owns one scratch [`CraftingGrid`] that every station reuses
//! during resolution, a [`DirtyTracker`] telling the host which stations to
//! persist, and an [`EventBus`] through which station side effects are
//! delivered after each tick.

use crate::config::{ConfigError, StationConfig};
use crate::dirty::DirtyTracker;
use crate::event::{EventBus, WorkshopEvent};
use crate::id::StationId;
use crate::item::ItemCatalog;
use crate::rule::{RuleGate, RuleSource};
use crate::slots::CraftingGrid;
use crate::station::{Owner, Station, StationTier};
use crate::world::{Above, StationWorld, TickContext};
use slotmap::SlotMap;

/// The host's view of every station's surroundings.
pub trait WorkshopWorld {
    fn is_enabled(&self, station: StationId) -> bool;

    fn above(&mut self, station: StationId) -> Above<'_>;

    fn owner_permits(&self, station: StationId, owner: Option<&Owner>, gate: &RuleGate) -> bool;
}

/// Narrows a [`WorkshopWorld`] to the station being ticked.
struct StationView<'w> {
    world: &'w mut dyn WorkshopWorld,
    station: StationId,
}

impl StationWorld for StationView<'_> {
    fn is_enabled(&self) -> bool {
        self.world.is_enabled(self.station)
    }

    fn above(&mut self) -> Above<'_> {
        self.world.above(self.station)
    }

    fn owner_permits(&self, owner: Option<&Owner>, gate: &RuleGate) -> bool {
        self.world.owner_permits(self.station, owner, gate)
    }
}

/// Totals for one workshop tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkshopTick {
    pub ticked: usize,
    pub crafted: usize,
    pub dirty: usize,
}

#[derive(Debug)]
pub struct Workshop {
    pub(crate) stations: SlotMap<StationId, Station>,
    pub(crate) config: StationConfig,
    pub(crate) tick: u64,
    scratch: CraftingGrid,
    dirty: DirtyTracker,
    events: EventBus,
}

impl Workshop {
    pub fn new(config: StationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            stations: SlotMap::with_key(),
            config,
            tick: 0,
            scratch: CraftingGrid::new(),
            dirty: DirtyTracker::new(),
            events: EventBus::default(),
        })
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    // -- Membership --

    pub fn add_station(&mut self, tier: StationTier) -> StationId {
        let station = Station::with_tier(tier, &self.config);
        self.insert_station(station)
    }

    pub fn insert_station(&mut self, station: Station) -> StationId {
        let id = self.stations.insert(station);
        self.dirty.mark_membership();
        self.dirty.mark_station(id);
        id
    }

    pub fn remove_station(&mut self, id: StationId) -> Option<Station> {
        let removed = self.stations.remove(id)?;
        self.dirty.forget(id);
        self.dirty.mark_membership();
        Some(removed)
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(id)
    }

    /// Mutable access marks the station dirty.
    pub fn station_mut(&mut self, id: StationId) -> Option<&mut Station> {
        let station = self.stations.get_mut(id)?;
        self.dirty.mark_station(id);
        Some(station)
    }

    pub fn stations(&self) -> impl Iterator<Item = (StationId, &Station)> {
        self.stations.iter()
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    // -- Tick --

    /// Tick every station once, in stable key order, then deliver events.
    pub fn tick(
        &mut self,
        rules: &dyn RuleSource,
        catalog: &dyn ItemCatalog,
        world: &mut dyn WorkshopWorld,
    ) -> WorkshopTick {
        let mut summary = WorkshopTick::default();
        for (id, station) in self.stations.iter_mut() {
            let mut view = StationView { world: &mut *world, station: id };
            let mut ctx = TickContext {
                rules,
                catalog,
                config: &self.config,
                world: &mut view,
                scratch: &mut self.scratch,
            };
            let report = station.tick(&mut ctx);

            summary.ticked += 1;
            summary.crafted += usize::from(report.crafted);
            if report.dirty {
                summary.dirty += 1;
                self.dirty.mark_station(id);
            }
            for event in report.events {
                self.events.emit(WorkshopEvent {
                    station: id,
                    tick: self.tick,
                    event,
                });
            }
        }
        self.events.deliver();
        self.tick += 1;
        tracing::trace!(tick = self.tick, ?summary, "workshop ticked");
        summary
    }

    // -- Dirty tracking / events --

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty.mark_clean();
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }
}

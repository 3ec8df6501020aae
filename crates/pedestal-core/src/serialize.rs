//! Persistence for stations and workshops.
//!
//! Binary encoding via `bitcode` behind a versioned header. Station state is
//! written as a [`StationRecord`]: only occupied slots, the pending reward
//! at reduced precision, counters narrowed to `u16`, owner fields and tier.
//! The cached rule is never written; a reloaded station re-resolves on its
//! first tick.

use crate::config::{ConfigError, StationConfig};
use crate::fixed::{Fixed32, narrow, ticks_to_u16, widen};
use crate::id::{OwnerId, StationId};
use crate::item::ItemStack;
use crate::progress::CraftingProgress;
use crate::rng::SimRng;
use crate::slots::{SLOT_COUNT, SlotContainer};
use crate::station::{Owner, Station, StationTier, UNKNOWN_OWNER};
use crate::workshop::Workshop;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a single-station snapshot.
pub const STATION_MAGIC: u32 = 0x9ED5_0001;

/// Magic number identifying a workshop snapshot.
pub const WORKSHOP_MAGIC: u32 = 0x9ED5_0002;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("data too short for snapshot header")]
    TooShort,
    #[error("invalid magic number 0x{0:08X}")]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("snapshot carries an invalid config: {0}")]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized snapshot. Enables format detection
/// and version checking before the payload is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Magic number for format detection.
    pub magic: u32,
    /// Format version for forward compatibility.
    pub version: u32,
}

impl SnapshotHeader {
    /// Create a header for the current format version.
    pub fn new(magic: u32) -> Self {
        Self {
            magic,
            version: FORMAT_VERSION,
        }
    }

    /// Validate the header against the expected magic number.
    pub fn validate(&self, expected_magic: u32) -> Result<(), DeserializeError> {
        if self.magic != expected_magic {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Station record
// ---------------------------------------------------------------------------

/// One occupied slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    pub index: u8,
    pub stack: ItemStack,
}

/// The persisted form of a [`Station`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRecord {
    pub slots: Vec<SlotEntry>,
    pub pending_reward: Fixed32,
    pub counter: u16,
    pub target: u16,
    #[serde(default)]
    pub owner_id: Option<OwnerId>,
    #[serde(default)]
    pub owner_name: Option<String>,
    pub tier: StationTier,
    pub rng: SimRng,
}

impl From<&Station> for StationRecord {
    fn from(station: &Station) -> Self {
        let slots = station
            .slots
            .iter()
            .filter_map(|(index, stack)| {
                let index = u8::try_from(index).ok()?;
                Some(SlotEntry {
                    index,
                    stack: stack.clone(),
                })
            })
            .collect();
        Self {
            slots,
            pending_reward: narrow(station.pending_reward),
            counter: ticks_to_u16(station.progress.counter),
            target: ticks_to_u16(station.progress.target),
            owner_id: station.owner.as_ref().map(|o| o.id),
            owner_name: station.owner.as_ref().map(|o| o.name.clone()),
            tier: station.tier,
            rng: station.rng.clone(),
        }
    }
}

impl From<Station> for StationRecord {
    fn from(station: Station) -> Self {
        Self::from(&station)
    }
}

impl From<StationRecord> for Station {
    /// Rebuild the full 16-slot container. Entries outside it are dropped.
    fn from(record: StationRecord) -> Self {
        let mut slots = SlotContainer::new();
        for entry in record.slots {
            let index = usize::from(entry.index);
            if index >= SLOT_COUNT || slots.set(index, Some(entry.stack)).is_err() {
                tracing::warn!(index, "dropping persisted stack outside the container");
            }
        }

        let target = u32::from(record.target);
        let progress = CraftingProgress {
            counter: u32::from(record.counter).min(target),
            target,
            cached: None,
        };

        let owner = record.owner_id.map(|id| Owner {
            id,
            name: record.owner_name.unwrap_or_else(|| UNKNOWN_OWNER.to_string()),
        });

        Station {
            slots,
            progress,
            pending_reward: widen(record.pending_reward),
            tier: record.tier,
            owner,
            rng: record.rng,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StationSnapshot {
    header: SnapshotHeader,
    record: StationRecord,
}

impl Station {
    pub fn to_record(&self) -> StationRecord {
        StationRecord::from(self)
    }

    pub fn from_record(record: StationRecord) -> Self {
        Station::from(record)
    }

    /// Serialize the station to a binary blob via bitcode.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = StationSnapshot {
            header: SnapshotHeader::new(STATION_MAGIC),
            record: self.to_record(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Deserialize a station. The header is validated before the record is
    /// used. Progress toward the previously cached rule restarts on the
    /// first tick.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        if data.is_empty() {
            return Err(DeserializeError::TooShort);
        }
        let snapshot: StationSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate(STATION_MAGIC)?;
        Ok(Station::from_record(snapshot.record))
    }
}

// ---------------------------------------------------------------------------
// Workshop snapshot
// ---------------------------------------------------------------------------

/// The serializable portion of a workshop. The event bus (it holds
/// closures), scratch grid and dirty set are rebuilt fresh. Stations go
/// through [`StationRecord`] via their serde impls, which keeps the slotmap
/// keys intact.
#[derive(Debug, Serialize, Deserialize)]
struct WorkshopSnapshot {
    header: SnapshotHeader,
    tick: u64,
    config: StationConfig,
    stations: SlotMap<StationId, Station>,
}

impl Workshop {
    /// Serialize the workshop, preserving station ids.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = WorkshopSnapshot {
            header: SnapshotHeader::new(WORKSHOP_MAGIC),
            tick: self.tick,
            config: self.config.clone(),
            stations: self.stations.clone(),
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Deserialize a workshop. The dirty set starts clean and event
    /// listeners must be re-registered.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        if data.is_empty() {
            return Err(DeserializeError::TooShort);
        }
        let snapshot: WorkshopSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate(WORKSHOP_MAGIC)?;

        let mut workshop = Workshop::new(snapshot.config)?;
        workshop.tick = snapshot.tick;
        workshop.stations = snapshot.stations;
        Ok(workshop)
    }
}

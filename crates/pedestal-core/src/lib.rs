//! Pedestal Core -- the tick engine for automated crafting stations.
//!
//! A station holds a fixed 16-slot container (3×3 crafting grid, five
//! catalyst slots, a recipe template slot and an output buffer). Every tick
//! it resolves which rule applies, advances a progress counter toward that
//! rule's duration, completes the craft when the counter reaches it, and
//! drains its output upward into open space or an adjacent receiver.
//!
//! # Tick Pipeline
//!
//! Each call to [`station::Station::tick`] runs:
//!
//! 1. **Resolve** -- Reuse the cached rule if it still matches, otherwise
//!    scan primary rules, then fallback rules.
//! 2. **Progress** -- Advance or reset the counter; complete at target.
//! 3. **Complete** -- Consume inputs, then upgrade the station or
//!    accumulate output, and accrue the fractional reward.
//! 4. **Dispatch** -- Hand buffered output off, realize the reward and
//!    emit feedback. Runs even while the station is disabled.
//!
//! Steps 1 to 3 only run while the host reports the station enabled.
//!
//! # Host Boundary
//!
//! The core never reaches into the world. Rule lookup, item facts and the
//! surroundings come in through traits bundled in a [`world::TickContext`];
//! side effects go out as [`event::StationEvent`]s:
//!
//! ```rust,ignore
//! let mut ctx = TickContext { rules: &registry, catalog: &registry, config: &config,
//!                             world: &mut host, scratch: &mut grid };
//! let report = station.tick(&mut ctx);
//! for event in report.events { host.apply(event); }
//! ```
//!
//! # Key Types
//!
//! - [`station::Station`] -- Slot container plus crafting state.
//! - [`workshop::Workshop`] -- Many stations ticked together with dirty
//!   tracking and an event bus.
//! - [`registry::Registry`] -- Immutable item and rule registry (frozen at
//!   startup) implementing [`rule::RuleSource`] and [`item::ItemCatalog`].
//! - [`rule::Rule`] -- Primary or fallback rule, shared by `Arc`.
//! - [`config::StationConfig`] -- Tunables shared by all stations.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic rewards.
//! - [`serialize`] -- Versioned station and workshop snapshots via bitcode.

pub mod cache;
pub mod completion;
pub mod config;
pub mod dirty;
pub mod dispatch;
pub mod event;
pub mod fixed;
pub mod id;
pub mod item;
pub mod progress;
pub mod registry;
pub mod rng;
pub mod rule;
pub mod serialize;
pub mod slots;
pub mod station;
pub mod workshop;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

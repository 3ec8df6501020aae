//! End-to-end station scenarios driven through `Station::tick`.

use pedestal_core::config::{RewardRounding, StationConfig};
use pedestal_core::event::{FeedbackCue, StationEvent};
use pedestal_core::item::ItemStack;
use pedestal_core::registry::Registry;
use pedestal_core::slots::{Catalyst, CraftingGrid, Face, OUTPUT_SLOT};
use pedestal_core::station::{Station, StationTier, TickReport};
use pedestal_core::test_utils::*;
use pedestal_core::world::StationWorld;

// ===========================================================================
// Helpers
// ===========================================================================

fn tick(s: &mut Station, reg: &Registry, cfg: &StationConfig, world: &mut dyn StationWorld) -> TickReport {
    let mut grid = CraftingGrid::new();
    let mut ctx = context(reg, reg, cfg, world, &mut grid);
    s.tick(&mut ctx)
}

fn blocked_cues(report: &TickReport) -> usize {
    report
        .events
        .iter()
        .filter(|e| matches!(e, StationEvent::Feedback(FeedbackCue::Blocked)))
        .count()
}

fn count(s: &Station, slot: usize) -> u32 {
    s.slots().get(slot).map_or(0, |stack| stack.count)
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn empty_station_stays_idle() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    let mut world = TestWorld::open();
    let mut s = Station::new(&cfg);

    for _ in 0..200 {
        let report = tick(&mut s, &reg, &cfg, &mut world);
        assert!(report.events.is_empty());
        assert!(!report.dirty);
        assert_eq!(s.progress().counter(), 0);
        assert!(s.progress().cached().is_none());
    }
}

#[test]
fn catalyst_rule_completes_after_exactly_forty_ticks() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    // Keep the output in place so it can be inspected.
    let mut world = TestWorld::obstructed();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 0, "log", 3);
    put(&mut s, &reg, Catalyst::Cyan.slot(), "cyan_powder", 2);

    for n in 1..40 {
        let report = tick(&mut s, &reg, &cfg, &mut world);
        assert!(!report.crafted, "crafted early on tick {n}");
        assert_eq!(s.progress().counter(), n);
    }
    let report = tick(&mut s, &reg, &cfg, &mut world);
    assert!(report.crafted);

    assert_eq!(count(&s, Catalyst::Cyan.slot()), 0);
    assert_eq!(count(&s, 0), 2);
    let output = s.slots().output().unwrap();
    assert_eq!(Some(output.item_type), reg.item_id("plank"));
    assert_eq!(output.count, 8);
    assert_eq!(s.pending_reward(), fixed(1.5));
}

#[test]
fn interrupted_run_starts_over() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    let mut world = TestWorld::obstructed();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 0, "log", 1);
    put(&mut s, &reg, Catalyst::Cyan.slot(), "cyan_powder", 2);

    for _ in 0..20 {
        tick(&mut s, &reg, &cfg, &mut world);
    }
    assert_eq!(s.progress().counter(), 20);

    s.set_stack(0, None, &reg, &cfg).unwrap();
    assert_eq!(s.progress().counter(), 0);
    tick(&mut s, &reg, &cfg, &mut world);
    assert_eq!(s.progress().counter(), 0);

    put(&mut s, &reg, 0, "log", 1);
    for _ in 0..39 {
        assert!(!tick(&mut s, &reg, &cfg, &mut world).crafted);
    }
    assert!(tick(&mut s, &reg, &cfg, &mut world).crafted);
}

#[test]
fn full_output_forces_counter_to_zero() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    let mut world = TestWorld::obstructed();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 0, "log", 1);
    put(&mut s, &reg, OUTPUT_SLOT, "plank", 60);

    for _ in 0..10 {
        tick(&mut s, &reg, &cfg, &mut world);
    }
    assert_eq!(s.progress().counter(), 10);

    // Another run of 4 no longer fits under the cap of 64.
    put(&mut s, &reg, OUTPUT_SLOT, "plank", 62);
    let report = tick(&mut s, &reg, &cfg, &mut world);
    assert_eq!(s.progress().counter(), 0);
    assert!(report.events.contains(&StationEvent::ActivityChanged { active: false }));

    for _ in 0..50 {
        tick(&mut s, &reg, &cfg, &mut world);
        assert_eq!(s.progress().counter(), 0);
    }
    assert_eq!(count(&s, 0), 1);
}

#[test]
fn blocked_feedback_fires_only_on_completion() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    let mut world = TestWorld::obstructed();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, OUTPUT_SLOT, "stone", 64);

    let idle: usize = (0..100)
        .map(|_| blocked_cues(&tick(&mut s, &reg, &cfg, &mut world)))
        .sum();
    assert_eq!(idle, 0);

    // A fallback run that completes into a blocked output.
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 0, "log", 1);
    put(&mut s, &reg, OUTPUT_SLOT, "plank", 4);
    let mut total = 0;
    for _ in 0..cfg.fallback_duration {
        let report = tick(&mut s, &reg, &cfg, &mut world);
        total += blocked_cues(&report);
        if report.crafted {
            assert_eq!(blocked_cues(&report), 1);
        }
    }
    assert_eq!(total, 1);
    assert_eq!(count(&s, OUTPUT_SLOT), 8);
}

#[test]
fn completed_output_is_ejected_with_reward() {
    let reg = sample_registry();
    let cfg = StationConfig {
        reward_rounding: RewardRounding::Floor,
        ..StationConfig::default()
    };
    let mut world = TestWorld::open();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 0, "log", 1);
    put(&mut s, &reg, Catalyst::Cyan.slot(), "cyan_powder", 2);

    let last = (0..40)
        .map(|_| tick(&mut s, &reg, &cfg, &mut world))
        .last()
        .unwrap();
    assert!(last.crafted);
    assert!(s.slots().output().is_none());
    assert_eq!(s.pending_reward(), fixed(0.0));
    assert!(last.events.iter().any(|e| matches!(
        e,
        StationEvent::ItemSpawned { stack, .. } if stack.count == 8
    )));
    assert!(last.events.contains(&StationEvent::RewardSpawned { amount: 1 }));
}

#[test]
fn upgrade_never_touches_output() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    let mut world = TestWorld::obstructed();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 4, "onyx_shard", 2);
    put(&mut s, &reg, Catalyst::Black.slot(), "black_powder", 8);

    for _ in 0..10 {
        tick(&mut s, &reg, &cfg, &mut world);
    }
    assert_eq!(s.tier(), StationTier(4));
    assert!(s.slots().output().is_none());

    // Same rule again at tier 4: no upgrade, the station item accumulates.
    for _ in 0..10 {
        tick(&mut s, &reg, &cfg, &mut world);
    }
    assert_eq!(s.tier(), StationTier(4));
    assert_eq!(s.slots().output().map(|o| o.item_type), reg.item_id("onyx_station"));
}

#[test]
fn cached_rule_survives_ticks_without_rescans() {
    let reg = sample_registry();
    let rules = CountingRules::new(&reg);
    let cfg = StationConfig::default();
    let mut world = TestWorld::obstructed();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 0, "log", 1);

    let mut grid = CraftingGrid::new();
    let mut ctx = context(&rules, &reg, &cfg, &mut world, &mut grid);
    s.tick(&mut ctx);
    let after_first = rules.scans();
    for _ in 0..10 {
        s.tick(&mut ctx);
    }
    assert_eq!(rules.scans(), after_first);
}

#[test]
fn disabled_station_still_dispatches() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    let mut world = TestWorld::open().disabled();
    let mut s = Station::new(&cfg);
    put(&mut s, &reg, 0, "log", 1);
    put(&mut s, &reg, OUTPUT_SLOT, "plank", 5);

    let report = tick(&mut s, &reg, &cfg, &mut world);
    assert!(s.slots().output().is_none());
    assert_eq!(s.progress().counter(), 0);
    assert!(report.events.iter().any(|e| matches!(e, StationEvent::ItemSpawned { .. })));
    assert!(!report.events.iter().any(|e| matches!(e, StationEvent::RuleAdopted { .. })));
}

#[test]
fn manual_insert_through_faces_feeds_a_run() {
    let reg = sample_registry();
    let cfg = StationConfig::default();
    let mut world = TestWorld::obstructed();
    let mut s = Station::new(&cfg);
    let log = ItemStack::new(reg.item_id("log").unwrap(), 1);
    let cyan = ItemStack::new(reg.item_id("cyan_powder").unwrap(), 2);
    assert!(s.insert(log, Face::Up, &reg, &reg, &cfg).is_none());
    assert!(s.insert(cyan, Face::North, &reg, &reg, &cfg).is_none());

    let crafted = (0..40).filter(|_| tick(&mut s, &reg, &cfg, &mut world).crafted).count();
    assert_eq!(crafted, 1);
    let out = s.extract(Face::Down, 64).unwrap();
    assert_eq!(out.count, 8);
    assert_eq!(s.pending_reward(), fixed(0.0));
}

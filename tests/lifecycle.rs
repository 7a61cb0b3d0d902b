use std::cell::Cell;
use std::rc::Rc;

use qao_runtime::{Category, RuntimeConfig, RuntimeError, Runtime};

mod common;
use common::*;

#[test]
fn created_object_is_live_and_resolvable() {
    let log = new_log();
    let mut rt = runtime();

    let handle = rt.create(MID, Tracer::new("a", &log)).unwrap();
    let id = handle.identity();

    assert!(rt.contains(id));
    assert!(rt.is_valid(&handle));
    assert_eq!(rt.resolve(&handle).unwrap().name, "a");
    assert_eq!(rt.priority_of(id), Some(3));
    assert_eq!(rt.category_of(id), Some(&Category::new(MID)));
    assert_eq!(rt.order(), vec![id]);
    assert_eq!(rt.len(), 1);
}

#[test]
fn create_with_sees_its_own_identity() {
    let log = new_log();
    let mut rt = runtime();
    let seen = Rc::new(Cell::new(None));

    let handle = rt
        .create_with(LOW, |identity| {
            seen.set(Some(identity));
            Tracer::new("self-aware", &log)
        })
        .unwrap();

    assert_eq!(seen.get(), Some(handle.identity()));
    assert!(rt.contains(handle.identity()));
}

#[test]
fn unknown_category_fails_without_side_effects() {
    let log = new_log();
    let mut rt = runtime();

    let err = rt.create("nope", Tracer::new("ghost", &log)).unwrap_err();

    assert!(matches!(err, RuntimeError::UnknownCategory(ref e) if e.category.name() == "nope"));
    assert_eq!(rt.registry().capacity(), 0);
    assert!(rt.is_empty());
}

#[test]
fn slot_limit_reports_capacity_error() {
    let log = new_log();
    let config = RuntimeConfig::new().with_category(LOW, 1).with_max_slots(2);
    let mut rt: Runtime<Tracer> = Runtime::with_config(config);

    let a = rt.create(LOW, Tracer::new("a", &log)).unwrap();
    let _b = rt.create(LOW, Tracer::new("b", &log)).unwrap();

    match rt.create(LOW, Tracer::new("c", &log)) {
        Err(RuntimeError::Capacity(e)) => {
            assert_eq!(e.slots_needed, 3);
            assert_eq!(e.capacity, 2);
        }
        other => panic!("expected capacity error, got {other:?}"),
    }

    rt.destroy_immediate(a).unwrap();
    assert!(rt.create(LOW, Tracer::new("c", &log)).is_ok());
}

#[test]
fn destroy_requested_mid_step_waits_for_the_boundary() {
    let log = new_log();
    let mut rt = runtime();

    let victim = rt.create(HIGH, Tracer::new("victim", &log)).unwrap();
    let target = victim.identity();
    let _killer = rt
        .create(
            LOW,
            Tracer::with_behaviour("killer", &log, move |ctx| {
                if ctx.tick() == 0 {
                    ctx.request_destroy(target).unwrap();
                    // Still live until the step ends.
                    assert!(ctx.contains(target));
                }
            }),
        )
        .unwrap();

    let report = rt.step();

    assert_eq!(visited(&log, 0), vec!["killer", "victim"]);
    assert_eq!(report.destroyed, 1);
    assert_eq!(destroyed(&log), vec!["victim"]);
    assert!(!rt.contains(target));
    assert!(!rt.is_valid(&victim));

    rt.step();
    assert_eq!(visited(&log, 1), vec!["killer"]);
}

#[test]
fn destroy_self_runs_once_more_then_disappears() {
    let log = new_log();
    let mut rt = runtime();

    let handle = rt
        .create(MID, Tracer::with_behaviour("mayfly", &log, |ctx| ctx.destroy_self()))
        .unwrap();

    rt.step();
    rt.step();

    assert_eq!(visited(&log, 0), vec!["mayfly"]);
    assert!(visited(&log, 1).is_empty());
    assert!(!rt.is_valid(&handle));
}

#[test]
fn repeated_destroy_self_is_coalesced() {
    let log = new_log();
    let mut rt = runtime();

    let _handle = rt
        .create(
            MID,
            Tracer::with_behaviour("twice", &log, |ctx| {
                ctx.destroy_self();
                ctx.destroy_self();
            }),
        )
        .unwrap();

    let report = rt.step();

    assert_eq!(report.destroyed, 1);
    assert_eq!(destroyed(&log), vec!["twice"]);
}

#[test]
fn current_object_is_lent_out_during_update() {
    let log = new_log();
    let mut rt = runtime();
    let checked = Rc::new(Cell::new(false));

    let flag = checked.clone();
    let _handle = rt
        .create(
            MID,
            Tracer::with_behaviour("lent", &log, move |ctx| {
                let me = ctx.identity();
                assert!(ctx.get(me).is_none());
                assert!(ctx.contains(me));
                assert!(ctx.observe(me).is_some());
                flag.set(true);
            }),
        )
        .unwrap();

    rt.step();
    assert!(checked.get());
}

#[test]
fn dropping_owned_handle_destroys_at_next_boundary() {
    let log = new_log();
    let mut rt = runtime();

    let handle = rt.create(MID, Tracer::new("dropped", &log)).unwrap();
    let id = handle.identity();
    drop(handle);

    assert!(rt.contains(id));
    assert_eq!(rt.stats().pending_commands, 1);

    let report = rt.step();

    assert_eq!(report.destroyed, 1);
    assert_eq!(report.scheduled, 0);
    assert!(!rt.contains(id));
    assert_eq!(destroyed(&log), vec!["dropped"]);
}

#[test]
fn duplicate_destroy_requests_are_coalesced() {
    let log = new_log();
    let mut rt = runtime();

    let handle = rt.create(MID, Tracer::new("once", &log)).unwrap();
    let id = handle.identity();

    rt.request_destroy(id).unwrap();
    rt.request_destroy(id).unwrap();
    assert_eq!(rt.stats().pending_commands, 1);

    // The handle's own destroy command is skipped when applied.
    drop(handle);
    assert_eq!(rt.apply_deferred(), 1);
    assert_eq!(destroyed(&log), vec!["once"]);

    assert!(rt.request_destroy(id).unwrap_err().is_stale());
}

#[test]
fn destroy_immediate_runs_hook_synchronously() {
    let log = new_log();
    let mut rt = runtime();

    let handle = rt.create(MID, Tracer::new("now", &log)).unwrap();
    let id = handle.identity();

    rt.destroy_immediate(handle).unwrap();

    assert_eq!(destroyed(&log), vec!["now"]);
    assert!(!rt.contains(id));
    assert_eq!(rt.stats().pending_commands, 0);
    assert_eq!(rt.registry().free_len(), 1);
}

#[test]
fn destroy_immediate_rejects_dead_object() {
    let log = new_log();
    let mut rt = runtime();

    let handle = rt.create(MID, Tracer::new("gone", &log)).unwrap();
    let id = handle.identity();
    rt.request_destroy(id).unwrap();
    rt.apply_deferred();

    let err = rt.destroy_immediate(handle).unwrap_err();
    assert!(err.error.is_stale());
    assert_eq!(err.handle.identity(), id);
    assert_eq!(destroyed(&log), vec!["gone"]);
}

#[test]
fn reused_slot_gets_new_generation() {
    let log = new_log();
    let mut rt = runtime();

    let first = rt.create(MID, Tracer::new("first", &log)).unwrap();
    let old = first.identity();
    rt.destroy_immediate(first).unwrap();

    let second = rt.create(MID, Tracer::new("second", &log)).unwrap();
    let new = second.identity();

    assert_eq!(new.index(), old.index());
    assert_eq!(new.generation(), old.generation() + 1);
    assert_ne!(new, old);
    assert!(rt.get(old).is_none());
    assert!(!rt.contains(old));
    assert_eq!(rt.get(new).map(|p| p.name), Some("second"));
}

#[test]
fn teardown_destroys_in_step_order() {
    let log = new_log();
    let mut rt = runtime();

    let handles = vec![
        rt.create(HIGH, Tracer::new("obj1", &log)).unwrap(),
        rt.create(LOW, Tracer::new("obj2", &log)).unwrap(),
        rt.create(HIGH, Tracer::new("obj3", &log)).unwrap(),
        rt.create(MID, Tracer::new("obj4", &log)).unwrap(),
    ];
    let expected: Vec<_> = [1, 3, 0, 2].iter().map(|&i| handles[i].identity()).collect();

    let report = rt.teardown();

    assert_eq!(report.destroyed, expected);
    assert_eq!(destroyed(&log), vec!["obj2", "obj4", "obj1", "obj3"]);
    assert!(rt.registry().is_empty());
    assert!(rt.orderer().is_empty());
    assert!(handles.iter().all(|h| !rt.is_valid(h)));
}

#[test]
fn dropping_runtime_tears_everything_down() {
    let log = new_log();
    let mut rt = runtime();

    let kept = rt.create(LOW, Tracer::new("kept", &log)).unwrap();
    let _released = rt.create(MID, Tracer::new("released", &log)).unwrap().release();
    drop(rt);

    assert_eq!(destroyed(&log), vec!["kept", "released"]);
    assert!(!kept.is_bound());
}

#[test]
fn destroying_an_owner_cascades_to_owned_children() {
    let log = new_log();
    let mut rt = runtime();

    let mut parent = Tracer::new("parent", &log);
    parent.children.push(rt.create(LOW, Tracer::new("child1", &log)).unwrap());
    parent.children.push(rt.create(LOW, Tracer::new("child2", &log)).unwrap());
    let parent = rt.create(HIGH, parent).unwrap();

    drop(parent);
    let destroyed_count = rt.apply_deferred();

    assert_eq!(destroyed_count, 3);
    assert_eq!(destroyed(&log), vec!["parent", "child1", "child2"]);
    assert!(rt.registry().is_empty());
}

#[test]
fn stats_track_lifetime_counters() {
    let log = new_log();
    let mut rt = runtime();

    let a = rt.create(LOW, Tracer::new("a", &log)).unwrap();
    let _b = rt.create(HIGH, Tracer::new("b", &log)).unwrap();
    rt.destroy_immediate(a).unwrap();
    rt.step();

    let stats = rt.stats();
    assert_eq!(stats.ordered, 1);
    assert_eq!(stats.occupied_slots, 1);
    assert_eq!(stats.free_slots, 1);
    assert_eq!(stats.buckets, 1);
    assert_eq!(stats.created_total, 2);
    assert_eq!(stats.destroyed_total, 1);
    assert_eq!(stats.tick, 1);
}

use std::cell::Cell;
use std::rc::Rc;

mod common;
use common::*;

#[test]
fn step_visits_by_priority_then_insertion() {
    let log = new_log();
    let mut rt = runtime();

    let _obj1 = rt.create(HIGH, Tracer::new("obj1", &log)).unwrap();
    let _obj2 = rt.create(LOW, Tracer::new("obj2", &log)).unwrap();
    let _obj3 = rt.create(HIGH, Tracer::new("obj3", &log)).unwrap();

    let report = rt.step();

    assert_eq!(visited(&log, 0), vec!["obj2", "obj1", "obj3"]);
    assert_eq!(report.scheduled, 3);
    assert_eq!(report.visited, 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(rt.tick(), 1);
}

#[test]
fn order_is_stable_across_steps() {
    let log = new_log();
    let mut rt = runtime();

    let _handles: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .zip([MID, LOW, MID, LOW])
        .map(|(name, category)| rt.create(category, Tracer::new(name, &log)).unwrap())
        .collect();

    rt.step();
    rt.step();

    assert_eq!(visited(&log, 0), vec!["b", "d", "a", "c"]);
    assert_eq!(visited(&log, 1), visited(&log, 0));
}

#[test]
fn object_created_mid_step_runs_from_next_step_at_its_priority() {
    let log = new_log();
    let stash = new_stash();
    let mut rt = runtime();

    let spawned = Rc::new(Cell::new(false));
    let behaviour = {
        let log = log.clone();
        let stash = stash.clone();
        let spawned = spawned.clone();
        move |ctx: &mut qao_runtime::StepContext<'_, Tracer>| {
            if !spawned.replace(true) {
                let child = ctx.create(LOW, Tracer::new("child", &log)).unwrap();
                assert!(ctx.contains(child.identity()));
                stash.borrow_mut().push(child);
            }
        }
    };

    let _parent = rt.create(MID, Tracer::with_behaviour("parent", &log, behaviour)).unwrap();
    let _tail = rt.create(HIGH, Tracer::new("tail", &log)).unwrap();

    let first = rt.step();
    assert_eq!(visited(&log, 0), vec!["parent", "tail"]);
    assert_eq!(first.created, 1);
    assert_eq!(first.visited, 2);

    rt.step();
    // LOW sorts ahead of the parent's MID bucket.
    assert_eq!(visited(&log, 1), vec!["child", "parent", "tail"]);
}

#[test]
fn set_priority_moves_to_tail_of_new_bucket() {
    let log = new_log();
    let mut rt = runtime();

    let a = rt.create(LOW, Tracer::new("a", &log)).unwrap();
    let _b = rt.create(MID, Tracer::new("b", &log)).unwrap();
    let _c = rt.create(MID, Tracer::new("c", &log)).unwrap();

    assert_eq!(rt.set_priority(a.identity(), 3).unwrap(), 1);
    assert_eq!(rt.priority_of(a.identity()), Some(3));

    rt.step();
    assert_eq!(visited(&log, 0), vec!["b", "c", "a"]);
}

#[test]
fn set_priority_from_update_applies_after_traversal() {
    let log = new_log();
    let mut rt = runtime();

    let last = rt.create(LATE, Tracer::new("last", &log)).unwrap();
    let target = last.identity();
    let _mover = rt
        .create(
            LOW,
            Tracer::with_behaviour("mover", &log, move |ctx| {
                if ctx.tick() == 0 {
                    ctx.set_priority(target, 0).unwrap();
                }
            }),
        )
        .unwrap();

    rt.step();
    assert_eq!(visited(&log, 0), vec!["mover", "last"]);
    assert_eq!(rt.priority_of(target), Some(0));

    rt.step();
    assert_eq!(visited(&log, 1), vec!["last", "mover"]);
}

#[test]
fn empty_buckets_disappear() {
    let log = new_log();
    let mut rt = runtime();

    let a = rt.create(LOW, Tracer::new("a", &log)).unwrap();
    let _b = rt.create(HIGH, Tracer::new("b", &log)).unwrap();
    assert_eq!(rt.orderer().bucket_count(), 2);

    drop(a);
    rt.apply_deferred();

    assert_eq!(rt.orderer().bucket_count(), 1);
    assert!(rt.orderer().bucket(1).is_empty());
}

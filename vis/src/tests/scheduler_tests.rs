use std::fs;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::{chain, rows, run, zigzag};
use crate::graph::PortalStatus;
use crate::{Checkpoint, PortalGraph, Vis, VisOptions};

fn threads(n: usize) -> VisOptions {
    VisOptions {
        threads: n,
        ..VisOptions::default()
    }
}

#[test]
fn one_worker_matches_many() {
    for prt in [chain(7), zigzag()] {
        let single = run(&prt, threads(1));
        for _ in 0..4 {
            assert_eq!(run(&prt, threads(4)), single);
        }
    }
}

#[test]
fn rows_are_symmetric() {
    for prt in [chain(5), zigzag()] {
        let data = run(&prt, threads(3));
        let rows = rows(&data);
        for (a, row) in rows.iter().enumerate() {
            assert!(row.contains(&a));
            for &b in row {
                assert!(rows[b].contains(&a), "{a} sees {b} but not the reverse");
            }
        }
    }
}

#[test]
fn mightsee_only_shrinks() {
    let vis = Vis::new(&zigzag(), threads(2)).unwrap();
    vis.base_vis();
    let before: Vec<_> = vis
        .graph()
        .portals
        .iter()
        .map(|p| (p.mightsee.snapshot(), p.num_mightsee.load(Ordering::Relaxed)))
        .collect();

    vis.full_vis().unwrap();
    for (p, (might, count)) in vis.graph().portals.iter().zip(before) {
        let now = p.mightsee.snapshot();
        assert!(now.is_subset_of(&might));
        assert!(p.num_mightsee.load(Ordering::Relaxed) <= count);
        assert_eq!(now.count_ones() as u32, p.num_mightsee.load(Ordering::Relaxed));
        assert!(p.visbits.snapshot().is_subset_of(&now));
        assert_eq!(p.status(), PortalStatus::Done);
    }
    assert!(vis.stats().snapshot().chains > 0);
}

#[test]
fn finished_run_resumes_without_work() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("zigzag.prt");
    let keep = VisOptions {
        autoclean: false,
        ..threads(2)
    };

    let first = Vis::new(&zigzag(), keep.clone())
        .unwrap()
        .with_checkpoint(Checkpoint::for_map(&map));
    let data = first.run().unwrap();
    assert!(Checkpoint::for_map(&map).exists());

    let second = Vis::new(&zigzag(), keep)
        .unwrap()
        .with_checkpoint(Checkpoint::for_map(&map));
    assert_eq!(second.run().unwrap(), data);
    assert_eq!(second.stats().snapshot().chains, 0);
}

#[test]
fn interrupted_run_resumes_to_the_same_result() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("chain.prt");
    let cp = Checkpoint::for_map(&map);
    let expected = run(&chain(6), threads(1));

    // a run stopped part way: some portals done, one in flight
    let partial = Vis::new(&chain(6), threads(1)).unwrap();
    partial.base_vis();
    partial.full_vis().unwrap();
    for (i, p) in partial.graph().portals.iter().enumerate() {
        match i % 3 {
            0 => {}
            1 => p.set_status(PortalStatus::Working),
            _ => {
                p.visbits.clear_all();
                p.set_status(PortalStatus::Unprocessed);
            }
        }
    }
    cp.save(partial.graph(), 4).unwrap();

    let resumed = Vis::new(&chain(6), threads(3))
        .unwrap()
        .with_checkpoint(cp.clone());
    assert_eq!(resumed.run().unwrap(), expected);
    // autoclean is on by default
    assert!(!cp.exists());
}

#[test]
fn bad_checkpoint_means_fresh_run() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("chain.prt");
    let cp = Checkpoint::for_map(&map);
    fs::write(cp.path(), b"garbage").unwrap();

    let vis = Vis::new(&chain(4), threads(2))
        .unwrap()
        .with_checkpoint(cp.clone());
    assert_eq!(vis.run().unwrap(), run(&chain(4), threads(2)));
    assert!(!cp.exists());
}

#[test]
fn nostate_ignores_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("chain.prt");
    let cp = Checkpoint::for_map(&map);

    // a checkpoint claiming everything is done with nothing visible
    let stale = Vis::new(&chain(3), threads(1)).unwrap();
    for p in &stale.graph().portals {
        p.set_status(PortalStatus::Done);
    }
    cp.save(stale.graph(), 4).unwrap();

    let vis = Vis::new(
        &chain(3),
        VisOptions {
            nostate: true,
            autoclean: false,
            ..threads(2)
        },
    )
    .unwrap()
    .with_checkpoint(cp.clone());
    assert_eq!(rows(&vis.run().unwrap()), vec![vec![0, 1, 2]; 3]);
    assert!(cp.exists());
}

#[test]
fn workers_save_while_running() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("zigzag.prt");
    let cp = Checkpoint::for_map(&map);
    let vis = Vis::new(
        &zigzag(),
        VisOptions {
            state_interval: Duration::ZERO,
            ..threads(1)
        },
    )
    .unwrap()
    .with_checkpoint(cp.clone());

    vis.base_vis();
    vis.full_vis().unwrap();
    assert!(cp.exists());

    // the last save is taken just before the last portal is picked
    let fresh = PortalGraph::new(&zigzag()).unwrap();
    assert!(cp.load(&fresh, 4).unwrap());
    assert_eq!(fresh.count_done(), fresh.num_portals() - 1);
    for (saved, now) in fresh.portals.iter().zip(&vis.graph().portals) {
        if saved.is_done() {
            assert_eq!(saved.visbits.snapshot(), now.visbits.snapshot());
        }
    }
}

#[test]
fn failed_cleanup_keeps_the_result() {
    let dir = tempfile::tempdir().unwrap();
    let map = dir.path().join("chain.prt");
    let cp = Checkpoint::for_map(&map);
    // a directory in the way: loading, saving and removing all fail
    fs::create_dir(cp.path()).unwrap();

    let vis = Vis::new(&chain(4), threads(2))
        .unwrap()
        .with_checkpoint(cp.clone());
    assert_eq!(vis.run().unwrap(), run(&chain(4), threads(2)));
    assert!(cp.path().is_dir());
}

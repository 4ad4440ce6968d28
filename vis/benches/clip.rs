use criterion::*;
use math::{DVec3, Plane, Winding};
use prt::{PrtFile, PrtPortal};
use vis::{Vis, VisOptions};

fn ngon(n: usize, r: f64) -> Winding {
    let pts: Vec<DVec3> = (0..n)
        .map(|i| {
            let a = -(i as f64) * std::f64::consts::TAU / n as f64;
            DVec3::new(r * a.cos(), r * a.sin(), 0.0)
        })
        .collect();
    Winding::from_points(&pts).unwrap()
}

/// Long tube with the portals drifting sideways so the flow has to clip
fn tube(n: usize) -> PrtFile {
    let portals = (0..n - 1)
        .map(|i| {
            let x = 64.0 * (i + 1) as f64;
            let y = 12.0 * i as f64;
            PrtPortal {
                points: vec![
                    DVec3::new(x, y - 32.0, -32.0),
                    DVec3::new(x, y + 32.0, -32.0),
                    DVec3::new(x, y + 32.0, 32.0),
                    DVec3::new(x, y - 32.0, 32.0),
                ],
                leafs: [i, i + 1],
            }
        })
        .collect();
    PrtFile::new(n, portals)
}

fn bench_clip(c: &mut Criterion) {
    let w = ngon(16, 64.0);
    let split = Plane::from_point_normal(DVec3::new(10.0, 0.0, 0.0), DVec3::new(0.8, 0.6, 0.0));
    let mut out = Winding::new();
    c.bench_function("clip 16-gon", |b| {
        b.iter(|| black_box(&w).clip_into(black_box(&split), &mut out))
    });
}

fn bench_tube(c: &mut Criterion) {
    let prt = tube(32);
    let options = VisOptions {
        threads: 1,
        ..VisOptions::default()
    };
    c.bench_function("vis 32 leaf tube", |b| {
        b.iter(|| Vis::new(&prt, options.clone()).unwrap().run().unwrap())
    });
}

criterion_group!(benches, bench_clip, bench_tube);
criterion_main!(benches);

use combifold::config::AlgorithmConfig;
use combifold::geometry::{Transform, Vec3};
use combifold::subunit::SubunitType;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn grid_subunit(name: &str, side: usize) -> SubunitType {
    let mut residues = Vec::new();
    let mut points = Vec::new();
    let mut confidence = Vec::new();
    let mut residue = 0i64;
    for x in 0..side {
        for y in 0..side {
            for z in 0..side {
                residues.push(residue);
                points.push(Vec3::new(x as f64 * 3.8, y as f64 * 3.8, z as f64 * 3.8));
                confidence.push(90.0);
                residue += 1;
            }
        }
    }
    SubunitType::new(name.to_string(), vec!['0'], residues, points, confidence, &AlgorithmConfig::default())
}

fn bench_collision_count(c: &mut Criterion) {
    let config = AlgorithmConfig::default();
    let a = grid_subunit("A", 10);
    let b = grid_subunit("B", 10);
    let overlap = Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(5.0, 5.0, 5.0));

    c.bench_function("collision_count/10x10x10 overlapping", |bencher| {
        bencher.iter(|| black_box(a.collision_count(&b, black_box(&overlap), 0.0, &config)));
    });
}

fn bench_max_penetration_depth(c: &mut Criterion) {
    let config = AlgorithmConfig::default();
    let a = grid_subunit("A", 10);
    let b = grid_subunit("B", 10);
    let overlap = Transform::from_euler_translation(0.0, 0.0, 0.0, Vec3::new(5.0, 5.0, 5.0));

    c.bench_function("max_penetration_depth/10x10x10 overlapping", |bencher| {
        bencher.iter(|| black_box(a.max_penetration_depth(&b, black_box(&overlap), 0.0, &config)));
    });
}

criterion_group!(benches, bench_collision_count, bench_max_penetration_depth);
criterion_main!(benches);

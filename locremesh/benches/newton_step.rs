use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use locremesh::param::tutte_embedding;
use locremesh::{test_utils::*, *};

fn parametrization_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Parametrization");
    group.sample_size(20);

    for n in [8, 16, 32] {
        let (verts, faces) = bumpy_grid_mesh(n, n, 1.0 / n as f64, 0.2);
        let seed = tutte_embedding(&verts, &faces).unwrap();

        group.bench_function(BenchmarkId::new("Tutte Embedding", n), |b| {
            b.iter(|| tutte_embedding(&verts, &faces).unwrap())
        });

        let params = ParamParams::default();
        group.bench_function(BenchmarkId::new("Newton Solve", n), |b| {
            b.iter(|| parametrize(&verts, &faces, Some(&seed[..]), &[], &params).unwrap())
        });
    }
    group.finish();
}

fn mass_spring_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Mass Spring");

    for n in [10, 30] {
        let system = MassSpringSystem::grid(n, n, 0.1, 10.0, SimParams::default()).unwrap();
        group.bench_function(BenchmarkId::new("Implicit Euler Step", n), |b| {
            let mut system = system.clone();
            b.iter(|| system.step_implicit_euler().is_ok())
        });
    }
    group.finish();
}

criterion_group!(benches, parametrization_bench, mass_spring_bench);
criterion_main!(benches);

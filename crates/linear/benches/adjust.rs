use blemu_doe::{Grid, Lhs, SamplingMethod};
use blemu_linear::{BayesLinearEmulator, Derivatives};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{array, Array1, Axis};

fn criterion_adjust(c: &mut Criterion) {
    let sizes = [8, 16, 32];
    let grid = Grid::new(&array![[0., 1.], [0., 1.]])
        .unwrap()
        .levels(&[20, 20])
        .unwrap();

    let mut group = c.benchmark_group("linear");
    group.sample_size(10);
    for size in sizes {
        let xd = Lhs::<f64, _>::unit(2, 42).unwrap().sample(size).unwrap();
        let values = xd.map_axis(Axis(1), |x| (3. * x[0]).sin() + x[1] * x[1]);
        let dx1 = xd.map_axis(Axis(1), |x| 3. * (3. * x[0]).cos());
        let dx2 = xd.map_axis(Axis(1), |x| 2. * x[1]);
        let d = Array1::from_iter(values.iter().chain(dx1.iter()).chain(dx2.iter()).copied());

        group.bench_function(format!("fit-{size}-size"), |b| {
            b.iter(|| {
                std::hint::black_box(
                    BayesLinearEmulator::params(array![0.3], 1.)
                        .derivatives(Derivatives::all_points(&[0, 1]))
                        .fit(&xd, &d)
                        .unwrap(),
                )
            });
        });

        let emulator = BayesLinearEmulator::params(array![0.3], 1.)
            .derivatives(Derivatives::all_points(&[0, 1]))
            .fit(&xd, &d)
            .unwrap();
        group.bench_function(format!("adjust-grid-{size}-size"), |b| {
            b.iter(|| std::hint::black_box(emulator.adjust_grid(&grid).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_adjust);
criterion_main!(benches);

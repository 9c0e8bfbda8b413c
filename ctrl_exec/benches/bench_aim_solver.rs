//! # Aim Solver Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ctrl_lib::aim_ctrl::{solve_once, AimCtrl, Params};

fn aim_solver_benchmark(c: &mut Criterion) {
    let params = Params::default();

    // Cold start, the launch point is the robot's reference point
    c.bench_function("aim_solve_once", |b| {
        b.iter(|| solve_once(&params, black_box(2.5), black_box(4.0), true, None))
    });

    // Warm started calls, as made once per control cycle
    let mut aim_ctrl = AimCtrl::with_params(params.clone());
    c.bench_function("aim_compute_aim", |b| {
        b.iter(|| aim_ctrl.compute_aim(black_box(2.5), black_box(4.0), true))
    });

    let mut relaxed_params = params;
    relaxed_params.warm_start_iters = 8;
    relaxed_params.warm_start_relaxation = 0.5;
    let mut relaxed_ctrl = AimCtrl::with_params(relaxed_params);
    c.bench_function("aim_compute_aim_8_iters", |b| {
        b.iter(|| relaxed_ctrl.compute_aim(black_box(2.5), black_box(4.0), true))
    });
}

criterion_group!(benches, aim_solver_benchmark);
criterion_main!(benches);

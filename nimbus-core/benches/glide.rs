use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nimbus_core::filters::OnePoleLP;
use nimbus_core::glide::GlideParam;

fn bench_glide(c: &mut Criterion) {
    c.bench_function("glide_param_48k_block", |b| {
        let mut g = GlideParam::new(0.0, 2.0, 48_000.0);
        g.set_target(0.6);
        b.iter(|| {
            let mut acc = 0.0f32;
            for _ in 0..512 {
                acc += g.next();
            }
            black_box(acc)
        })
    });

    c.bench_function("one_pole_lp_48k_block", |b| {
        let mut lp = OnePoleLP::new(450.0, 48_000.0);
        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..512 {
                acc += lp.process(if i & 1 == 0 { 1.0 } else { -1.0 });
            }
            black_box(acc)
        })
    });
}

criterion_group!(benches, bench_glide);
criterion_main!(benches);

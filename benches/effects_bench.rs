#![deny(warnings)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pathfx::*;
use std::hint::black_box;

const SQUIRREL: &str = r#"
M12 1C9.79 1 8 2.31 8 3.92c0 1.94.5 3.03 0 6.08 0-4.5-2.77-6.34-4-6.34.05-.5-.48
-.66-.48-.66s-.22.11-.3.34c-.27-.31-.56-.27-.56-.27l-.13.58S.7 4.29 .68 6.87c.2.33
1.53.6 2.47.48.89.35.67.66 1.13 1.78 1.14 2.77-4.23 4.23-4.25 4.27-.01.04.04.06.11
.06h7.27c.1 0 .13 0 .13-.06 0-.06.1-.11.1-.24 0-.17-.31-.47-.47-.56 1.13-.24 2.28-.46
3.21-.78 4.31-1.49 4.53-5.59 1.2-6.99-.47-.2-1.15-.41-1.43-.67-.63-.57.86-.55 1.49
-.44 2.61.45 5.25 0 4.99-4.56C15.82 2.12 13.93 1 12 1zm-9.5 5.21c.27 0 .5.25.5.54
0 .3-.23.55-.5.55s-.5-.25-.5-.55c0-.29.23-.54.5-.54z
"#;

fn effects() -> Vec<(&'static str, Vec<(&'static str, &'static str)>)> {
    vec![
        ("fillet_chamfer", vec![("radius", "0.5")]),
        ("offset", vec![("offset", "0.5")]),
        ("roughen", vec![("segments", "3")]),
        ("mirror_symmetry", vec![("fuse_paths", "true")]),
        ("copy_rotate", vec![("num_copies", "6")]),
        ("transform_2pts", vec![]),
        ("join_type", vec![("line_width", "0.5")]),
    ]
}

fn effect_benchmark(c: &mut Criterion) {
    let path: Path = SQUIRREL.parse().expect("failed to parse path");
    let input = EffectInput::new(path.clone());
    let env = Environment::default();

    let mut group = c.benchmark_group("effects");
    group.throughput(Throughput::Elements(path.segments_count() as u64));
    for (key, params) in effects() {
        let effect_type = EffectType::from_key(key).expect("unknown effect");
        let mut effect = Effect::new(effect_type).expect("effect is not implemented");
        effect.on_apply(&input);
        for (param, value) in params {
            effect.set_param(param, value).expect("invalid parameter");
        }
        group.bench_with_input(BenchmarkId::new("apply", key), &input, |b, input| {
            b.iter_with_large_drop(|| effect.apply(black_box(input), &env))
        });
    }
    group.finish();
}

fn geometry_benchmark(c: &mut Criterion) {
    let path: Path = SQUIRREL.parse().expect("failed to parse path");
    let shifted = path.transformed(Transform::new_translate(3.0, 2.0));
    let mut group = c.benchmark_group("geometry");
    group
        .throughput(Throughput::Elements(path.segments_count() as u64))
        .bench_function("parse", |b| b.iter(|| black_box(SQUIRREL).parse::<Path>()))
        .bench_function("piecewise", |b| {
            b.iter_with_large_drop(|| Piecewise::from_path(black_box(&path)))
        })
        .bench_function("union", |b| {
            b.iter_with_large_drop(|| union(black_box(&path), &shifted))
        });
    group.finish();
}

fn layout_benchmark(c: &mut Criterion) {
    let count = 30;
    let rects: Vec<BBox> = (0..count)
        .map(|i| {
            let offset = (i * 7 % 11) as Scalar * 5.0;
            BBox::new((offset, i as Scalar * 3.0), (offset + 40.0, i as Scalar * 3.0 + 20.0))
        })
        .collect();
    let edges: Vec<LayoutEdge> = (1..count)
        .map(|i| LayoutEdge::new(i / 2, i))
        .collect();
    let options = LayoutOptions {
        avoid_overlaps: true,
        ..LayoutOptions::default()
    };
    let mut group = c.benchmark_group("layout");
    group
        .throughput(Throughput::Elements(count as u64))
        .bench_function("tree", |b| {
            b.iter(|| graph_layout(black_box(&rects), &edges, &options))
        });
    group.finish();
}

criterion_group!(
    benches,
    effect_benchmark,
    geometry_benchmark,
    layout_benchmark
);
criterion_main!(benches);

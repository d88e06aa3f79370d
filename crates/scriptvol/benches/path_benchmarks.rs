//! Benchmarks for path parsing and harddisk lookups.
//!
//! # Run Benchmarks
//!
//! ```bash
//! cargo bench --bench path_benchmarks
//! ```

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use scriptvol::{GlobalPath, Harddisk, Volume, VolumeManager, VolumePath};
use std::hint::black_box;

fn bench_parse_by_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_by_depth");

    for depth in [1, 4, 16, 64] {
        let text = (0..depth).map(|i| format!("/dir{i}")).collect::<String>() + "/../file.ks";
        group.bench_with_input(BenchmarkId::new("volume_path", depth), &text, |b, text| {
            b.iter(|| VolumePath::from_string(black_box(text)).unwrap());
        });

        let global = format!("scratch:{text}");
        group.bench_with_input(BenchmarkId::new("global_path", depth), &global, |b, text| {
            b.iter(|| GlobalPath::from_string(black_box(text)).unwrap());
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut manager = VolumeManager::new();
    manager.add(Volume::new(Harddisk::new("main", 100_000)));
    manager.add(Volume::new(Harddisk::new("scratch", 100_000)));

    c.bench_function("resolve_relative", |b| {
        b.iter(|| manager.resolve(black_box("lib/util/../boot.ks")).unwrap());
    });
    c.bench_function("resolve_by_name", |b| {
        b.iter(|| manager.resolve(black_box("scratch:/lib/boot.ks")).unwrap());
    });
}

fn bench_open_with_guessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("open_with_guessing");

    for file_count in [10, 100, 1000] {
        let volume = Volume::new(Harddisk::new("disk", 10_000_000));
        for i in 0..file_count {
            let path = VolumePath::from_string(&format!("/lib/file{i}.ks")).unwrap();
            volume.save_file(&path, &"print 1.".into(), true).unwrap();
        }
        let guessed = VolumePath::from_string(&format!("/lib/file{}", file_count / 2)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(file_count), &guessed, |b, path| {
            b.iter(|| volume.open(black_box(path), false).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse_by_depth, bench_resolve, bench_open_with_guessing);
criterion_main!(benches);

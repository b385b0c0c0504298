// Copyright 2022 houseme
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use criterion::{criterion_group, criterion_main, Criterion};
use snowflake_me::{ServiceIdGenerator, Snowflake};

fn bench_new(c: &mut Criterion) {
    c.bench_function("bench_new", |b| {
        b.iter(Snowflake::new);
    });
}

fn bench_next_id(c: &mut Criterion) {
    let sf = Snowflake::new().expect("Could not create Snowflake");
    c.bench_function("bench_next_id", |b| {
        b.iter(|| sf.next_id());
    });
}

fn bench_next_service_id(c: &mut Criterion) {
    let sf = Snowflake::new().expect("Could not create Snowflake");
    let generator = ServiceIdGenerator::new(sf, 4).expect("Could not create ServiceIdGenerator");
    c.bench_function("bench_next_service_id", |b| {
        b.iter(|| generator.next_id(1001));
    });
}

fn bench_decode(c: &mut Criterion) {
    let sf = Snowflake::new().expect("Could not create Snowflake");
    let id = sf.next_id().expect("Could not generate id");
    c.bench_function("bench_decode", |b| {
        b.iter(|| sf.decode(criterion::black_box(id)));
    });
}

criterion_group!(
    snowflake_perf,
    bench_new,
    bench_next_id,
    bench_next_service_id,
    bench_decode
);
criterion_main!(snowflake_perf);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use openstack_usage_exporter::encoding::text::encode;
use openstack_usage_exporter::metrics::family::MetricFamily;
use openstack_usage_exporter::registry::{Descriptor, Snapshot};
use std::borrow::Cow;

pub fn text(c: &mut Criterion) {
    c.bench_function("encode", |b| {
        // 20 metrics over 1000 projects, roughly a mid-sized cloud.
        let snapshot: Snapshot = (0..20)
            .map(|i| {
                let mut family = MetricFamily::new(Descriptor::new(
                    format!("openstack_project_metric_{i}"),
                    "Total usage per OpenStack project",
                    vec![Cow::Borrowed("project_id")],
                ));
                for project in 0..1000u32 {
                    let value = f64::from(project * i) / 3.0;
                    family.insert(vec![format!("{project:032x}")], value);
                }
                family
            })
            .collect();

        let mut buffer = String::new();

        b.iter(|| {
            encode(&mut buffer, &snapshot).unwrap();
            black_box(&mut buffer);
            buffer.clear();
        });
    });
}

criterion_group!(benches, text);
criterion_main!(benches);

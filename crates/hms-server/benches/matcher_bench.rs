use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hms_server::{
    Expectation, IncomingRequest, Method, Registry, RequestPredicate, ResponseTemplate, Status,
};

fn create_expectation(id: usize, is_regex: bool) -> Expectation {
    let uri = if is_regex {
        format!("regexp:/api/v[0-9]+/endpoint{id}")
    } else {
        format!("/api/v1/endpoint{id}")
    };
    let predicate = RequestPredicate::new(&uri)
        .unwrap()
        .with_method(Method::Get)
        .with_header("Accept", "application/json");
    Expectation::new(predicate, ResponseTemplate::new(Status::Ok).with_body("ok"))
}

fn create_registry(count: usize, is_regex: bool) -> Registry {
    let registry = Registry::new();
    for i in 0..count {
        registry.append(create_expectation(i, is_regex));
    }
    registry
}

fn request_for(id: usize) -> IncomingRequest {
    IncomingRequest::new("GET", format!("/api/v1/endpoint{id}"))
        .with_header("accept", "application/json")
        .with_header("user-agent", "bench")
}

fn bench_registry_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_matching");

    for count in [10, 100, 1000].iter() {
        let literal = create_registry(*count, false);
        let regex = create_registry(*count, true);
        group.throughput(Throughput::Elements(1));

        // Matching the first expectation (best case)
        let first = request_for(0);
        group.bench_with_input(BenchmarkId::new("literal_first", count), count, |b, _| {
            b.iter(|| literal.match_request(black_box(&first)));
        });

        // Matching the last expectation (worst case)
        let last = request_for(count - 1);
        group.bench_with_input(BenchmarkId::new("literal_last", count), count, |b, _| {
            b.iter(|| literal.match_request(black_box(&last)));
        });
        group.bench_with_input(BenchmarkId::new("regex_last", count), count, |b, _| {
            b.iter(|| regex.match_request(black_box(&last)));
        });
    }

    group.finish();
}

fn bench_predicate_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicate_evaluation");
    let literal = create_expectation(7, false);
    let regex = create_expectation(7, true);
    let hit = request_for(7);
    let miss = request_for(8);

    group.bench_function("literal_hit", |b| {
        b.iter(|| literal.predicate().matches(black_box(&hit)))
    });
    group.bench_function("literal_miss", |b| {
        b.iter(|| literal.predicate().matches(black_box(&miss)))
    });
    group.bench_function("regex_hit", |b| {
        b.iter(|| regex.predicate().matches(black_box(&hit)))
    });

    let body = RequestPredicate::new("/orders")
        .unwrap()
        .with_body(r#"regexp:.*"qty":\s*[0-9]+.*"#)
        .unwrap();
    let order = IncomingRequest::new("POST", "/orders").with_body(r#"{"sku": "a-1", "qty": 3}"#);
    group.bench_function("body_regex", |b| {
        b.iter(|| body.matches(black_box(&order)))
    });

    group.finish();
}

criterion_group!(benches, bench_registry_matching, bench_predicate_evaluation);
criterion_main!(benches);

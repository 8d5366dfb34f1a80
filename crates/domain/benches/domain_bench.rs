use common::ResourceId;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{Deploy, DeployService, DomainEvent, Product, ProductEvent, Repository};
use event_store::{EventLog, EventRecord, InMemoryEventLog, PutCondition, Version};

/// Seeds one product with a restock followed by `reservations` reservations.
async fn seed_product(log: &InMemoryEventLog, id: &ResourceId, reservations: i64) {
    let restock = ProductEvent::ProductRestocked {
        amount: reservations as u32,
    };
    log.put(
        EventRecord::new(id.clone(), restock.encode(Version::first()).unwrap()),
        PutCondition::ResourceAbsent,
    )
    .await
    .unwrap();

    for number in 2..=reservations + 1 {
        let event = ProductEvent::ProductReserved
            .encode(Version::new(number))
            .unwrap();
        log.put(EventRecord::new(id.clone(), event), PutCondition::EventAbsent)
            .await
            .unwrap();
    }
}

fn bench_hydrate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("domain/hydrate");

    for size in [10i64, 100, 1000] {
        let log = InMemoryEventLog::new();
        let id = ResourceId::from(format!("bench-{size}"));
        rt.block_on(seed_product(&log, &id, size));
        let repository: Repository<Product, _> = Repository::new(log);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                rt.block_on(async {
                    repository.get(&id).await.unwrap();
                });
            });
        });
    }

    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create_deploy", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = DeployService::new(InMemoryEventLog::new());
                service.create("bench:latest".to_string()).await.unwrap();
            });
        });
    });
}

fn bench_find_all(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = DeployService::new(InMemoryEventLog::new());
    rt.block_on(async {
        for n in 0..100 {
            service.create(format!("bench:{n}")).await.unwrap();
        }
    });
    let repository: &Repository<Deploy, _> = service.repository();

    c.bench_function("domain/find_all_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                repository.find_all().await.unwrap();
            });
        });
    });
}

criterion_group!(benches, bench_hydrate, bench_commit, bench_find_all);
criterion_main!(benches);

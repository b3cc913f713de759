use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{CreateProduct, Money, NewProduct, Product, ProductService, UpdateStock};
use outbox::{InMemoryStore, TrackedAggregate, Version};

fn new_product() -> NewProduct {
    NewProduct {
        name: "Benchmark Widget".to_string(),
        sku: None,
        description: "Used for benchmarks".to_string(),
        price: Money::parse(1000, "USD").unwrap(),
        initial_stock: 500,
        category_id: AggregateId::new(),
        created_by: "bench".to_string(),
    }
}

fn bench_create_product(c: &mut Criterion) {
    c.bench_function("domain/product_create", |b| {
        b.iter(|| Product::create(new_product()).unwrap());
    });
}

fn bench_stock_update_with_threshold_events(c: &mut Criterion) {
    let mut product = Product::create(new_product()).unwrap();
    product.mark_committed(Version::first());

    c.bench_function("domain/update_stock_low", |b| {
        b.iter(|| {
            product.update_stock(5, "bench", "recount").unwrap();
            product.update_stock(500, "bench", "restock").unwrap();
            product.mark_committed(Version::first());
        });
    });
}

fn bench_pending_serialization(c: &mut Criterion) {
    let mut product = Product::create(new_product()).unwrap();
    for quantity in (0..50).rev() {
        product.update_stock(quantity, "bench", "drain").unwrap();
    }

    c.bench_function("domain/serialize_pending_events", |b| {
        b.iter(|| product.pending_events().unwrap());
    });
}

fn bench_service_round_trip(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = ProductService::new(InMemoryStore::new());
    let product_id = rt.block_on(async {
        service
            .create_product(CreateProduct::new(new_product()))
            .await
            .unwrap()
            .aggregate
            .id()
    });

    let mut quantity = 0;
    c.bench_function("domain/service_update_stock", |b| {
        b.iter(|| {
            quantity = (quantity + 1) % 1000;
            rt.block_on(async {
                service
                    .update_stock(UpdateStock::new(product_id, quantity, "bench", "recount"))
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_product,
    bench_stock_update_with_threshold_events,
    bench_pending_serialization,
    bench_service_round_trip,
);
criterion_main!(benches);

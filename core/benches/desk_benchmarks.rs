use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use repairdesk::receipt::{PdfReceiptRenderer, ReceiptData, ReceiptRenderer};
use repairdesk::{
  normalize, ContextData, DeskConfig, MemoryRowStore, NewOrder, OrderDesk, Pipeline, PipelineControl, PipelineError,
  StepPolicy,
};
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Clone, Debug, Default)]
struct BenchContext {
  counter: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct BenchError(String);

impl From<PipelineError> for BenchError {
  fn from(e: PipelineError) -> Self {
    BenchError(e.to_string())
  }
}

fn bench_normalize(c: &mut Criterion) {
  let mut group = c.benchmark_group("Normalize");
  let inputs = [
    ("canonical", "checked_waiting_approval"),
    ("dictionary", "Tamir Edildi - Teslimat Bekliyor"),
    ("heuristic", "Inspection done, waiting on customer"),
    ("fallback", "no idea what this means"),
  ];
  for (label, raw) in inputs {
    group.bench_with_input(BenchmarkId::from_parameter(label), raw, |b, raw| {
      b.iter(|| normalize(black_box(raw)))
    });
  }
  group.finish();
}

fn bench_pipeline_steps(c: &mut Criterion) {
  let mut group = c.benchmark_group("PipelineRun");
  let rt = Runtime::new().unwrap();

  for num_steps in [1usize, 5, 10] {
    let names: Vec<String> = (0..num_steps).map(|i| format!("step_{}", i)).collect();
    let defs: Vec<_> = names
      .iter()
      .enumerate()
      .map(|(i, name)| {
        let policy = if i % 2 == 0 { StepPolicy::Required } else { StepPolicy::BestEffort };
        (name.as_str(), policy, None)
      })
      .collect();
    let mut pipeline = Pipeline::<BenchContext, BenchError>::new(&defs);
    for name in &names {
      pipeline.on_root(name, |ctx: ContextData<BenchContext>| {
        Box::pin(async move {
          ctx.update(|c| c.counter = c.counter.wrapping_add(1));
          Ok::<_, BenchError>(PipelineControl::Continue)
        })
      });
    }

    group.throughput(Throughput::Elements(num_steps as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), &pipeline, |b, pipeline| {
      b.to_async(&rt)
        .iter(|| async { pipeline.run(ContextData::new(BenchContext::default())).await.unwrap() })
    });
  }
  group.finish();
}

fn bench_create_order(c: &mut Criterion) {
  let rt = Runtime::new().unwrap();
  let desk = OrderDesk::builder(Arc::new(MemoryRowStore::new()))
    .config(DeskConfig::default())
    .build();
  let input = NewOrder {
    customer_name: "Ali".into(),
    customer_phone: "555".into(),
    device_type: "X1".into(),
    issue: "no power".into(),
    ..NewOrder::default()
  };

  // The store grows with every iteration, so later samples include longer scans.
  c.bench_function("CreateOrderInMemory", |b| {
    b.to_async(&rt).iter(|| async { desk.create_order(input.clone()).await.unwrap() })
  });
}

fn bench_render_receipt(c: &mut Criterion) {
  let data = ReceiptData {
    business_name: "Repair Desk".into(),
    receipt_code: "SRV-2026-04817".into(),
    access_code: "482913".into(),
    created_at: chrono::Utc::now(),
    customer_name: "Ayşe Yılmaz".into(),
    customer_phone: "+90 555 000 00 00".into(),
    address: "Kadıköy, Moda Mah., Bahariye Cd., No 12, D 4, İstanbul".into(),
    device_type: "Laptop".into(),
    serial_number: Some("SN-1234567".into()),
    accessories: vec!["charger".into(), "bag".into()],
    issue: "Does not power on after a liquid spill; keyboard partially unresponsive.".into(),
    estimated_cost: None,
    tracking_link: Some("https://example.test/track?code=SRV-2026-04817".into()),
  };
  c.bench_function("RenderReceiptPdf", |b| b.iter(|| PdfReceiptRenderer.render(black_box(&data)).unwrap()));
}

criterion_group!(
  benches,
  bench_normalize,
  bench_pipeline_steps,
  bench_create_order,
  bench_render_receipt
);
criterion_main!(benches);

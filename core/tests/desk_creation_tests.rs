// tests/desk_creation_tests.rs
mod common;

use chrono::{Datelike, Utc};
use common::*;
use regex::Regex;
use repairdesk::desk::create_pipeline::{ATTACH_DOCUMENT_URL, NOTIFY_CUSTOMER, RENDER_RECEIPT, UPLOAD_RECEIPT};
use repairdesk::notify::NotifyError;
use repairdesk::order::{Address, StructuredAddress};
use repairdesk::store::schema::Column;
use repairdesk::upload::StorageError;
use repairdesk::{ContextData, DeskError, MemoryRowStore, NewOrder, OrderDesk, PipelineControl, Status};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_create_order_returns_well_formed_identifiers() {
  setup_tracing();
  let h = harness();

  let created = h.desk.create_order(sample_order()).await.unwrap();

  assert!(!created.sequence_id.is_empty());
  let receipt_re = Regex::new(&format!(r"^SRV-{}-\d{{5}}$", Utc::now().year())).unwrap();
  assert!(receipt_re.is_match(&created.receipt_code), "{}", created.receipt_code);
  assert!(Regex::new(r"^\d{6}$").unwrap().is_match(&created.access_code));
  assert!(created.document_url.is_some());
  assert!(created.degraded.is_empty());
}

#[tokio::test]
async fn test_created_order_reads_back_as_pending_pickup() {
  setup_tracing();
  let h = harness();

  let created = h.desk.create_order(sample_order()).await.unwrap();
  let order = h.desk.find_order(&created.sequence_id).await.unwrap();

  assert_eq!(order.status, Status::PendingPickup);
  assert_eq!(order.created_at, order.updated_at);
  assert_eq!(order.receipt_code, created.receipt_code);
  assert_eq!(order.customer.name, "Ali");
  assert_eq!(order.document_url, created.document_url);
}

#[tokio::test]
async fn test_sequence_ids_increase_and_identical_input_creates_two_orders() {
  setup_tracing();
  let h = harness();

  let first = h.desk.create_order(sample_order()).await.unwrap();
  let second = h.desk.create_order(sample_order()).await.unwrap();

  assert_eq!(first.sequence_id, "1");
  assert_eq!(second.sequence_id, "2");
  assert_ne!(first.receipt_code, second.receipt_code);
  assert_eq!(h.rows.len(), 2);
}

#[tokio::test]
async fn test_concurrent_creations_get_distinct_sequence_ids() {
  setup_tracing();
  let h = Arc::new(harness());

  let mut tasks = Vec::new();
  for _ in 0..8 {
    let h = h.clone();
    tasks.push(tokio::spawn(async move { h.desk.create_order(sample_order()).await }));
  }
  let mut ids = Vec::new();
  for task in tasks {
    ids.push(task.await.unwrap().unwrap().sequence_id.parse::<u64>().unwrap());
  }
  ids.sort_unstable();
  assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_validation_failure_writes_nothing() {
  setup_tracing();
  let h = harness();

  let input = NewOrder {
    issue: "   ".into(),
    device_type: String::new(),
    ..sample_order()
  };
  let err = h.desk.create_order(input).await.unwrap_err();

  match err {
    DeskError::Validation { fields } => assert_eq!(fields, vec!["device_type", "issue"]),
    other => panic!("expected validation error, got {:?}", other),
  }
  assert_eq!(h.rows.write_count(), 0);
  assert_eq!(h.storage.upload_calls(), 0);
  assert!(h.messenger.sent().is_empty());
}

#[tokio::test]
async fn test_non_network_upload_failure_still_creates_order() {
  setup_tracing();
  let h = harness();
  h.storage.fail_next(StorageError::Rejected {
    status: 403,
    body: "storage quota exceeded".into(),
  });

  let created = h.desk.create_order(sample_order()).await.unwrap();

  assert_eq!(created.document_url, None);
  assert!(created.degraded.iter().any(|d| d.name == UPLOAD_RECEIPT));
  assert_eq!(h.storage.upload_calls(), 1);

  let order = h.desk.find_order(&created.sequence_id).await.unwrap();
  assert_eq!(order.status, Status::PendingPickup);
  assert_eq!(order.document_url, None);
  // Notification still goes out.
  assert_eq!(h.messenger.sent().len(), 1);
}

#[tokio::test]
async fn test_transient_upload_failures_are_retried_during_creation() {
  setup_tracing();
  let h = harness();
  h.storage.fail_next(StorageError::Network("read ECONNRESET".into()));
  h.storage.fail_next(StorageError::Network("request timed out".into()));

  let created = h.desk.create_order(sample_order()).await.unwrap();

  assert!(created.document_url.is_some());
  assert_eq!(h.storage.upload_calls(), 3);
  assert_eq!(h.storage.file_count(), 1);
}

#[tokio::test]
async fn test_render_failure_skips_upload() {
  setup_tracing();
  let rows = Arc::new(MemoryRowStore::new());
  let desk = OrderDesk::builder(rows.clone())
    .renderer(Arc::new(FailingRenderer))
    .config(test_config())
    .build();

  let created = desk.create_order(sample_order()).await.unwrap();

  assert_eq!(created.document_url, None);
  let degraded: Vec<_> = created.degraded.iter().map(|d| d.name.as_str()).collect();
  assert_eq!(degraded, vec![RENDER_RECEIPT]);
  assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_notification_failure_is_not_propagated() {
  setup_tracing();
  let h = harness();
  h.messenger.fail_next(NotifyError::Rejected {
    status: 401,
    body: "bad token".into(),
  });

  let created = h.desk.create_order(sample_order()).await.unwrap();

  assert!(created.document_url.is_some());
  assert_eq!(created.degraded.len(), 1);
  assert_eq!(created.degraded[0].name, NOTIFY_CUSTOMER);
}

#[tokio::test]
async fn test_notification_carries_codes_and_tracking_link() {
  setup_tracing();
  let h = harness();

  let created = h.desk.create_order(sample_order()).await.unwrap();

  let sent = h.messenger.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].recipient, "555");
  assert!(sent[0].body.contains(&created.receipt_code));
  assert!(sent[0].body.contains(&created.access_code));
  assert!(sent[0]
    .body
    .contains(&format!("?code={}&access={}", created.receipt_code, created.access_code)));
}

#[tokio::test]
async fn test_document_url_write_back_failure_is_swallowed() {
  setup_tracing();
  let rows = Arc::new(SwitchableRowStore::default());
  rows.fail_updates.store(true, Ordering::SeqCst);
  let desk = OrderDesk::builder(rows.clone()).config(test_config()).build();

  let created = desk.create_order(sample_order()).await.unwrap();

  // The upload itself worked, so the link is still returned.
  assert!(created.document_url.is_some());
  assert!(created.degraded.iter().any(|d| d.name == ATTACH_DOCUMENT_URL));
  let order = desk.find_order(&created.sequence_id).await.unwrap();
  assert_eq!(order.document_url, None);
}

#[tokio::test]
async fn test_store_failure_at_commit_fails_creation() {
  setup_tracing();
  let rows = Arc::new(SwitchableRowStore::default());
  rows.fail_appends.store(true, Ordering::SeqCst);
  let storage = Arc::new(repairdesk::upload::MemoryDocumentStorage::default());
  let desk = OrderDesk::builder(rows.clone())
    .document_storage(storage.clone())
    .config(test_config())
    .build();

  let err = desk.create_order(sample_order()).await.unwrap_err();

  assert!(matches!(err, DeskError::Store(_)));
  assert_eq!(storage.upload_calls(), 0);
  assert!(rows.inner.is_empty());

  // The write gate was released with the failed run.
  rows.fail_appends.store(false, Ordering::SeqCst);
  assert!(desk.create_order(sample_order()).await.is_ok());
}

#[tokio::test]
async fn test_receipt_code_sampling_is_bounded() {
  setup_tracing();
  let rows = Arc::new(FullCodeSpaceRowStore::default());
  let config = repairdesk::DeskConfig {
    max_receipt_code_attempts: 4,
    ..test_config()
  };
  let desk = OrderDesk::builder(rows.clone()).config(config).build();

  let err = desk.create_order(sample_order()).await.unwrap_err();

  assert!(matches!(err, DeskError::CodeSpaceExhausted { attempts: 4 }));
  assert!(rows.inner.is_empty());
}

#[tokio::test]
async fn test_structured_address_is_stored_formatted() {
  setup_tracing();
  let h = harness();
  let input = NewOrder {
    address: Address::Structured(StructuredAddress {
      region: Some("İstanbul".into()),
      district: Some("Kadıköy".into()),
      street: Some("Bahariye Cd.".into()),
      building: Some("12".into()),
      ..StructuredAddress::default()
    }),
    ..sample_order()
  };

  let created = h.desk.create_order(input).await.unwrap();

  let row = &h.rows.snapshot()[0];
  assert_eq!(row[Column::Address.index()], "Kadıköy, Bahariye Cd., No 12, İstanbul");
  let order = h.desk.find_order(&created.sequence_id).await.unwrap();
  assert_eq!(order.customer.address, "Kadıköy, Bahariye Cd., No 12, İstanbul");
}

#[tokio::test]
async fn test_creation_pipeline_accepts_extra_hooks() {
  setup_tracing();
  let mut h = harness();
  h.desk
    .create_pipeline_mut()
    .before_root(NOTIFY_CUSTOMER, |_ctx: ContextData<_>| {
      Box::pin(async move { Ok::<_, DeskError>(PipelineControl::Stop) })
    });

  let created = h.desk.create_order(sample_order()).await.unwrap();

  assert!(created.document_url.is_some());
  assert!(h.messenger.sent().is_empty());
}

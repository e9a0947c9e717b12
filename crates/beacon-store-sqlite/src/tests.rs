//! Integration tests for `SqliteStore` against an in-memory database.

use beacon_core::{
  company::NewCompany,
  embedding::{EMBEDDING_DIM, Embedding},
  signal::{EvidenceSet, NewSignal},
  source::NewSource,
  store::SignalStore,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn embed(components: &[(usize, f32)]) -> Embedding {
  let mut v = vec![0.0; EMBEDDING_DIM];
  for &(i, x) in components {
    v[i] = x;
  }
  Embedding::new(v).unwrap()
}

fn source_for(company_id: Uuid, hash: &str) -> NewSource {
  let mut input = NewSource::new(hash);
  input.company_id = Some(company_id);
  input
}

async fn acme(s: &SqliteStore) -> Uuid {
  s.upsert_company(NewCompany::new("Acme"))
    .await
    .unwrap()
    .company_id
}

// ─── Companies ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_and_get_company() {
  let s = store().await;

  let company = s
    .upsert_company(NewCompany {
      name:   "Acme".into(),
      domain: Some("acme.example".into()),
      notes:  Some(json!({ "sector": "spirits", "tier": 1 })),
    })
    .await
    .unwrap();

  let fetched = s.get_company(company.company_id).await.unwrap().unwrap();
  assert_eq!(fetched, company);
  assert_eq!(fetched.name, "Acme");
  assert_eq!(fetched.domain.as_deref(), Some("acme.example"));
  assert_eq!(fetched.notes, Some(json!({ "sector": "spirits", "tier": 1 })));
}

#[tokio::test]
async fn get_company_missing_returns_none() {
  let s = store().await;
  assert!(s.get_company(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn company_names_are_not_unique() {
  let s = store().await;
  let a = acme(&s).await;
  let b = acme(&s).await;
  assert_ne!(a, b);

  let all = s.list_companies().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].company_id, a);
  assert_eq!(all[1].company_id, b);
}

#[tokio::test]
async fn update_company_notes_replaces_document() {
  let s = store().await;
  let id = acme(&s).await;

  let updated = s
    .update_company_notes(id, Some(json!({ "watch": true })))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.notes, Some(json!({ "watch": true })));
  assert_eq!(updated.name, "Acme");

  let cleared = s.update_company_notes(id, None).await.unwrap().unwrap();
  assert!(cleared.notes.is_none());
}

#[tokio::test]
async fn update_notes_of_unknown_company_returns_none() {
  let s = store().await;
  let result = s
    .update_company_notes(Uuid::new_v4(), Some(json!({})))
    .await
    .unwrap();
  assert!(result.is_none());
}

// ─── Sources ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ingest_source_roundtrip() {
  let s = store().await;
  let company_id = acme(&s).await;

  let mut input = NewSource::from_text("Acme reports FY25 net sales of 10bn.");
  input.company_id = Some(company_id);
  input.url = Some("https://acme.example/media/fy25".into());
  input.title = Some("FY25 results".into());
  input.language = Some("en".into());
  input.published_at = Some(Utc.with_ymd_and_hms(2025, 8, 28, 7, 0, 0).unwrap());
  input.embedding = Some(embed(&[(0, 1.0)]));

  let source = s.ingest_source(input.clone()).await.unwrap();
  assert_eq!(source.hash, input.hash);

  let fetched = s.get_source(source.source_id).await.unwrap().unwrap();
  assert_eq!(fetched, source);
  assert_eq!(fetched.embedding, input.embedding);

  let by_hash = s.find_source_by_hash(&input.hash).await.unwrap().unwrap();
  assert_eq!(by_hash.source_id, source.source_id);
  assert!(s.find_source_by_hash("unknown").await.unwrap().is_none());
}

#[tokio::test]
async fn orphan_sources_are_allowed() {
  let s = store().await;
  let source = s.ingest_source(NewSource::new("orphan")).await.unwrap();
  assert!(source.company_id.is_none());
}

#[tokio::test]
async fn duplicate_hash_is_rejected() {
  let s = store().await;
  let company_id = acme(&s).await;

  let mut first = source_for(company_id, "h1");
  first.raw_text = Some("...".into());
  let original = s.ingest_source(first).await.unwrap();

  let mut second = source_for(company_id, "h1");
  second.raw_text = Some("different".into());
  let err = s.ingest_source(second).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateContent(ref h) if h == "h1"));

  // The original is untouched.
  let stored = s.find_source_by_hash("h1").await.unwrap().unwrap();
  assert_eq!(stored.source_id, original.source_id);
  assert_eq!(stored.raw_text.as_deref(), Some("..."));
}

#[tokio::test]
async fn concurrent_duplicate_ingest_has_one_winner() {
  let s = store().await;
  let other = s.clone();

  let (a, b) = tokio::join!(
    s.ingest_source(NewSource::new("race")),
    other.ingest_source(NewSource::new("race")),
  );

  let results = [a, b];
  assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
  assert!(
    results
      .iter()
      .any(|r| matches!(r, Err(Error::DuplicateContent(_))))
  );
  assert_eq!(s.stats().await.unwrap().sources, 1);
}

#[tokio::test]
async fn source_with_unknown_company_fails() {
  let s = store().await;
  let ghost = Uuid::new_v4();

  let err = s.ingest_source(source_for(ghost, "h")).await.unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound(id) if id == ghost));
  assert!(s.find_source_by_hash("h").await.unwrap().is_none());
}

#[tokio::test]
async fn sources_for_company_newest_published_first() {
  let s = store().await;
  let company_id = acme(&s).await;

  let mut old = source_for(company_id, "old");
  old.published_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
  let mut new = source_for(company_id, "new");
  new.published_at = Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
  let undated = source_for(company_id, "undated");

  s.ingest_source(undated).await.unwrap();
  s.ingest_source(old).await.unwrap();
  s.ingest_source(new).await.unwrap();
  s.ingest_source(NewSource::new("someone else")).await.unwrap();

  let hashes: Vec<_> = s
    .list_sources_for_company(company_id)
    .await
    .unwrap()
    .into_iter()
    .map(|src| src.hash)
    .collect();
  assert_eq!(hashes, ["new", "old", "undated"]);
}

#[tokio::test]
async fn equal_publication_dates_list_latest_ingested_first() {
  let s = store().await;
  let company_id = acme(&s).await;
  let day = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();

  for hash in ["first", "second", "third"] {
    let mut input = source_for(company_id, hash);
    input.published_at = Some(day);
    s.ingest_source(input).await.unwrap();
  }

  let hashes: Vec<_> = s
    .list_sources_for_company(company_id)
    .await
    .unwrap()
    .into_iter()
    .map(|src| src.hash)
    .collect();
  assert_eq!(hashes, ["third", "second", "first"]);
}

#[tokio::test]
async fn far_past_and_future_dates_stay_readable() {
  let s = store().await;
  let company_id = acme(&s).await;

  let future = Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap();
  let ancient = Utc.with_ymd_and_hms(-50, 6, 1, 0, 0, 0).unwrap();
  let modern = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

  for (hash, at) in [("ancient", ancient), ("future", future), ("modern", modern)] {
    let mut input = source_for(company_id, hash);
    input.published_at = Some(at);
    let stored = s.ingest_source(input).await.unwrap();
    assert_eq!(stored.published_at, Some(at));
  }
  let signal = s
    .record_signal(NewSignal {
      company_id: Some(company_id),
      detected_at: Some(future),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(s.get_signal(signal.signal_id).await.unwrap().unwrap(), signal);

  let hashes: Vec<_> = s
    .list_sources_for_company(company_id)
    .await
    .unwrap()
    .into_iter()
    .map(|src| src.hash)
    .collect();
  assert_eq!(hashes, ["future", "modern", "ancient"]);

  let snapshot = s.snapshot(company_id).await.unwrap().unwrap();
  assert_eq!(snapshot.sources.len(), 3);
  assert_eq!(snapshot.signals[0].detected_at, future);
}

// ─── Signals ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn signal_with_dangling_evidence_is_accepted() {
  let s = store().await;
  let company_id = acme(&s).await;
  let real = s.ingest_source(source_for(company_id, "real")).await.unwrap();
  let ghost = Uuid::new_v4();

  let signal = s
    .record_signal(NewSignal {
      company_id: Some(company_id),
      signal_type: Some("leadership_change".into()),
      source_ids: EvidenceSet::new(vec![real.source_id, ghost]),
      ..Default::default()
    })
    .await
    .unwrap();

  let fetched = s.get_signal(signal.signal_id).await.unwrap().unwrap();
  assert_eq!(fetched.source_ids.ids(), &[real.source_id, ghost]);

  let evidence = s.resolve_evidence(&fetched).await.unwrap();
  assert_eq!(evidence.found.len(), 1);
  assert_eq!(evidence.found[0].source_id, real.source_id);
  assert_eq!(evidence.missing, vec![ghost]);
}

#[tokio::test]
async fn signal_with_empty_evidence() {
  let s = store().await;
  let signal = s.record_signal(NewSignal::default()).await.unwrap();

  let fetched = s.get_signal(signal.signal_id).await.unwrap().unwrap();
  assert_eq!(fetched, signal);
  assert!(fetched.source_ids.is_empty());

  let evidence = s.resolve_evidence(&fetched).await.unwrap();
  assert!(evidence.found.is_empty());
  assert!(evidence.missing.is_empty());
}

#[tokio::test]
async fn signal_with_unknown_company_fails() {
  let s = store().await;
  let ghost = Uuid::new_v4();

  let err = s
    .record_signal(NewSignal {
      company_id: Some(ghost),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ReferenceNotFound(id) if id == ghost));
}

#[tokio::test]
async fn signals_listed_newest_first_and_filtered_by_type() {
  let s = store().await;
  let company_id = acme(&s).await;
  let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

  for (offset, kind) in [(0, "hiring"), (2, "funding_round"), (1, "hiring")] {
    s.record_signal(NewSignal {
      company_id: Some(company_id),
      signal_type: Some(kind.into()),
      value: Some(json!({ "day": offset })),
      detected_at: Some(base + Duration::days(offset)),
      ..Default::default()
    })
    .await
    .unwrap();
  }

  let all = s.list_signals_for_company(company_id, None).await.unwrap();
  let days: Vec<_> = all.iter().map(|sig| sig.value.clone().unwrap()["day"].clone()).collect();
  assert_eq!(days, [json!(2), json!(1), json!(0)]);
  assert!(all.windows(2).all(|w| w[0].detected_at >= w[1].detected_at));

  let hiring = s
    .list_signals_for_company(company_id, Some("hiring"))
    .await
    .unwrap();
  assert_eq!(hiring.len(), 2);
  assert!(hiring.iter().all(|sig| sig.signal_type.as_deref() == Some("hiring")));

  let none = s.list_signals_for_company(Uuid::new_v4(), None).await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn equal_detection_times_list_latest_recorded_first() {
  let s = store().await;
  let company_id = acme(&s).await;
  let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

  for n in 0..3 {
    s.record_signal(NewSignal {
      company_id: Some(company_id),
      value: Some(json!(n)),
      detected_at: Some(at),
      ..Default::default()
    })
    .await
    .unwrap();
  }

  let values: Vec<_> = s
    .list_signals_for_company(company_id, None)
    .await
    .unwrap()
    .into_iter()
    .map(|sig| sig.value.unwrap())
    .collect();
  assert_eq!(values, [json!(2), json!(1), json!(0)]);
}

#[tokio::test]
async fn nan_confidence_is_rejected() {
  let s = store().await;

  let err = s
    .record_signal(NewSignal {
      confidence: Some(f64::NAN),
      ..Default::default()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NanConfidence));
  assert_eq!(s.stats().await.unwrap().signals, 0);

  let infinite = s
    .record_signal(NewSignal {
      confidence: Some(f64::INFINITY),
      ..Default::default()
    })
    .await
    .unwrap();
  let fetched = s.get_signal(infinite.signal_id).await.unwrap().unwrap();
  assert_eq!(fetched.confidence, Some(f64::INFINITY));
}

#[tokio::test]
async fn resolve_evidence_beyond_parameter_limit() {
  let s = store().await;
  let real = s.ingest_source(NewSource::new("real")).await.unwrap();

  let mut ids: Vec<Uuid> = (0..40_000).map(|_| Uuid::new_v4()).collect();
  ids.insert(20_000, real.source_id);

  let signal = s
    .record_signal(NewSignal {
      source_ids: EvidenceSet::new(ids.clone()),
      ..Default::default()
    })
    .await
    .unwrap();

  let evidence = s.resolve_evidence(&signal).await.unwrap();
  assert_eq!(evidence.found.len(), 1);
  assert_eq!(evidence.found[0].source_id, real.source_id);
  assert_eq!(evidence.missing.len(), 40_000);
  assert_eq!(evidence.missing[0], ids[0]);
  assert_eq!(evidence.missing[20_000], ids[20_001]);
}

#[tokio::test]
async fn detected_at_defaults_to_now() {
  let s = store().await;
  let before = Utc::now() - Duration::seconds(1);
  let signal = s.record_signal(NewSignal::default()).await.unwrap();
  assert!(signal.detected_at >= before);
  assert!(signal.detected_at <= Utc::now());
}

#[tokio::test]
async fn acme_funding_round_scenario() {
  let s = store().await;
  let c1 = acme(&s).await;

  let mut first = source_for(c1, "h1");
  first.raw_text = Some("...".into());
  let s1 = s.ingest_source(first).await.unwrap().source_id;

  let mut second = source_for(c1, "h1");
  second.raw_text = Some("different".into());
  assert!(matches!(
    s.ingest_source(second).await,
    Err(Error::DuplicateContent(_))
  ));

  let sig1 = s
    .record_signal(NewSignal {
      company_id: Some(c1),
      signal_type: Some("funding_round".into()),
      value: Some(json!({ "amount": 5_000_000 })),
      confidence: Some(0.8),
      source_ids: EvidenceSet::new(vec![s1]),
      ..Default::default()
    })
    .await
    .unwrap();

  let listed = s.list_signals_for_company(c1, None).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0], sig1);
  assert_eq!(listed[0].value, Some(json!({ "amount": 5_000_000 })));
  assert_eq!(listed[0].confidence, Some(0.8));
  assert_eq!(listed[0].source_ids.ids(), &[s1]);
}

// ─── Similarity ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn similar_sources_nearest_first() {
  let s = store().await;

  let mut near = NewSource::new("near");
  near.embedding = Some(embed(&[(0, 1.0), (1, 0.1)]));
  let mut mid = NewSource::new("mid");
  mid.embedding = Some(embed(&[(0, 1.0), (1, 1.0)]));
  let mut far = NewSource::new("far");
  far.embedding = Some(embed(&[(1, 1.0)]));

  s.ingest_source(far).await.unwrap();
  s.ingest_source(NewSource::new("no embedding")).await.unwrap();
  s.ingest_source(mid).await.unwrap();
  s.ingest_source(near).await.unwrap();

  let query = embed(&[(0, 1.0)]);
  let hits = s.find_similar_sources(&query, 10).await.unwrap();
  let hashes: Vec<_> = hits.iter().map(|h| h.source.hash.as_str()).collect();
  assert_eq!(hashes, ["near", "mid", "far"]);
  assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

  let top = s.find_similar_sources(&query, 2).await.unwrap();
  assert_eq!(top.len(), 2);
  assert_eq!(top[0].source.hash, "near");

  assert!(s.find_similar_sources(&query, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn similar_sources_on_empty_store() {
  let s = store().await;
  let hits = s.find_similar_sources(&embed(&[(0, 1.0)]), 5).await.unwrap();
  assert!(hits.is_empty());
}

#[tokio::test]
async fn duplicate_ingest_does_not_touch_index() {
  let s = store().await;

  let mut first = NewSource::new("h");
  first.embedding = Some(embed(&[(0, 1.0)]));
  let original = s.ingest_source(first).await.unwrap();

  let mut second = NewSource::new("h");
  second.embedding = Some(embed(&[(1, 1.0)]));
  assert!(s.ingest_source(second).await.is_err());

  let hits = s.find_similar_sources(&embed(&[(1, 1.0)]), 5).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].source.source_id, original.source_id);
  assert!((hits[0].distance - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn rebuild_index_sees_other_handles() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("beacon.db");

  let writer = SqliteStore::open(&path).await.unwrap();
  let reader = SqliteStore::open(&path).await.unwrap();

  let mut input = NewSource::new("late");
  input.embedding = Some(embed(&[(4, 1.0)]));
  writer.ingest_source(input).await.unwrap();

  let query = embed(&[(4, 1.0)]);
  assert!(reader.find_similar_sources(&query, 1).await.unwrap().is_empty());

  assert_eq!(reader.rebuild_index().await.unwrap(), 1);
  let hits = reader.find_similar_sources(&query, 1).await.unwrap();
  assert_eq!(hits[0].source.hash, "late");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rebuild_during_ingest_keeps_new_sources() {
  let s = store().await;
  let total = 200;

  let writer = {
    let s = s.clone();
    tokio::spawn(async move {
      for n in 0..total {
        let mut input = NewSource::new(format!("doc-{n}"));
        input.embedding = Some(embed(&[(n % EMBEDDING_DIM, 1.0)]));
        s.ingest_source(input).await.unwrap();
      }
    })
  };
  let rebuilder = {
    let s = s.clone();
    tokio::spawn(async move {
      for _ in 0..total {
        s.rebuild_index().await.unwrap();
        tokio::task::yield_now().await;
      }
    })
  };
  writer.await.unwrap();
  rebuilder.await.unwrap();

  let hits = s.find_similar_sources(&embed(&[(0, 1.0)]), total).await.unwrap();
  assert_eq!(hits.len(), total);
}

#[tokio::test]
async fn reopen_hydrates_index() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("beacon.db");

  {
    let s = SqliteStore::open(&path).await.unwrap();
    let mut input = NewSource::new("persisted");
    input.embedding = Some(embed(&[(9, 1.0)]));
    s.ingest_source(input).await.unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  let hits = s.find_similar_sources(&embed(&[(9, 1.0)]), 1).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].source.hash, "persisted");
}

// ─── Read models ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_collects_company_records() {
  let s = store().await;
  let company_id = acme(&s).await;

  let mut input = source_for(company_id, "doc");
  input.embedding = Some(embed(&[(0, 1.0)]));
  let source = s.ingest_source(input).await.unwrap();
  s.record_signal(NewSignal {
    company_id: Some(company_id),
    source_ids: EvidenceSet::new(vec![source.source_id]),
    ..Default::default()
  })
  .await
  .unwrap();
  s.record_signal(NewSignal::default()).await.unwrap();

  let snapshot = s.snapshot(company_id).await.unwrap().unwrap();
  assert_eq!(snapshot.company.company_id, company_id);
  assert_eq!(snapshot.signals.len(), 1);
  assert_eq!(snapshot.sources.len(), 1);
  assert!(snapshot.sources[0].embedding.is_none());

  assert!(s.snapshot(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn stats_count_rows() {
  let s = store().await;
  let company_id = acme(&s).await;

  let mut embedded = source_for(company_id, "a");
  embedded.embedding = Some(embed(&[(0, 1.0)]));
  s.ingest_source(embedded).await.unwrap();
  s.ingest_source(source_for(company_id, "b")).await.unwrap();
  s.record_signal(NewSignal::default()).await.unwrap();

  let stats = s.stats().await.unwrap();
  assert_eq!(stats.companies, 1);
  assert_eq!(stats.sources, 2);
  assert_eq!(stats.embedded_sources, 1);
  assert_eq!(stats.signals, 1);
}

//! Integration tests for reconciliation and dataset assembly.
//!
//! Origins are counting stubs, the bucket is a `MemoryObjectStore`, and the
//! local tier lives in a fresh temp directory per test.

use chrono::{Datelike, NaiveDate};
use imoexlab_core::data::{
    decode_market_index, DataError, Encoding, FeedSource, LocalTier, MarketIndexOrigin,
    MemoryObjectStore, NewsOrigin, ObjectStore, RemoteTier, RetryPolicy, RetryingNewsOrigin,
};
use imoexlab_core::domain::{ArtifactKind, DateKey, MarketIndexArtifact, NewsArtifact, RawArtifact};
use imoexlab_core::features::NewsFeaturizer;
use imoexlab_runner::{
    DatasetAssembler, DateRange, MergePolicy, NoProgress, OriginBackfiller, Pipeline, RemoteSync,
    TierAvailabilityChecker,
};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 3, day).unwrap()
}

// ── Stubs ───────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Calls(Arc<AtomicUsize>);

impl Calls {
    fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct StubNews {
    calls: Calls,
}

impl NewsOrigin for StubNews {
    fn name(&self) -> &str {
        "stub_news"
    }

    fn fetch(&self, date: DateKey) -> NewsArtifact {
        self.calls.bump();
        let mut a = NewsArtifact::new();
        a.push(format!("{date}T09:10:00"), "Индекс Мосбиржи растет");
        a.push(format!("{date}T18:45:00"), "Рубль укрепился к доллару");
        a
    }
}

struct StubMarket {
    calls: Calls,
    fail_on: Vec<DateKey>,
}

impl MarketIndexOrigin for StubMarket {
    fn name(&self) -> &str {
        "stub_market"
    }

    fn fetch(&self, from: DateKey, till: DateKey) -> Result<MarketIndexArtifact, DataError> {
        self.calls.bump();
        if self.fail_on.contains(&from) {
            return Err(DataError::HttpStatus {
                origin: "stub_market".into(),
                status: 500,
            });
        }
        let mut a = MarketIndexArtifact::new();
        for date in from.iter_days().take_while(|x| *x <= till) {
            a.push(format!("{date}T18:45:00"), Some(3000.0), Some(3000.0 + date.day0() as f64));
        }
        Ok(a)
    }
}

struct AlwaysDown {
    calls: Calls,
}

impl FeedSource for AlwaysDown {
    fn name(&self) -> &str {
        "always_down"
    }

    fn fetch_once(&self, _date: DateKey) -> Result<NewsArtifact, DataError> {
        self.calls.bump();
        Err(DataError::HttpStatus {
            origin: "always_down".into(),
            status: 503,
        })
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    local: LocalTier,
    store: Arc<MemoryObjectStore>,
    remote: RemoteTier,
    news_calls: Calls,
    market_calls: Calls,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let local = LocalTier::new(dir.path().join("data"));
        let store = Arc::new(MemoryObjectStore::new());
        let remote = RemoteTier::new(store.clone());
        Self {
            _dir: dir,
            local,
            store,
            remote,
            news_calls: Calls::default(),
            market_calls: Calls::default(),
        }
    }

    fn pipeline(&self, fail_on: Vec<DateKey>, policy: MergePolicy) -> Pipeline {
        Pipeline::new(
            self.local.clone(),
            self.remote.clone(),
            Box::new(StubNews {
                calls: self.news_calls.clone(),
            }),
            Box::new(StubMarket {
                calls: self.market_calls.clone(),
                fail_on,
            }),
            DatasetAssembler::new(Box::new(NewsFeaturizer::russian(1000)), policy),
            self.local.data_dir().join("dataset.csv"),
        )
    }
}

// ── Merge policy: the two-date scenario ─────────────────────────────

fn seed_two_date_scenario(local: &LocalTier) {
    let mut news = NewsArtifact::new();
    news.push("2022-03-07T09:10:00", "Индекс Мосбиржи вырос");
    local.write_artifact(d(7), &RawArtifact::News(news)).unwrap();

    for day in [7, 8] {
        let mut candles = MarketIndexArtifact::new();
        candles.push(format!("2022-03-0{day}T18:45:00"), Some(3000.0), Some(3100.0 + day as f64));
        local
            .write_artifact(d(day), &RawArtifact::MarketIndex(candles))
            .unwrap();
    }
}

#[test]
fn anchor_on_target_keeps_both_dates_and_imputes_zeros() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalTier::new(dir.path());
    seed_two_date_scenario(&local);

    let mut assembler = DatasetAssembler::new(
        Box::new(NewsFeaturizer::russian(1000)),
        MergePolicy::AnchorOnTarget,
    );
    let out = assembler.assemble(&local).unwrap();

    assert_eq!(out.table.len(), 2);
    assert_eq!(out.table.dates(), vec![d(7), d(8)]);
    assert!(out.table.row(d(8)).unwrap().features.iter().all(|v| *v == 0.0));
    assert!(out.table.row(d(7)).unwrap().features.iter().any(|v| *v > 0.0));
    assert_eq!(out.report.imputed_dates, vec![d(8)]);
}

#[test]
fn intersection_keeps_only_the_covered_date() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalTier::new(dir.path());
    seed_two_date_scenario(&local);

    let mut assembler = DatasetAssembler::new(
        Box::new(NewsFeaturizer::russian(1000)),
        MergePolicy::Intersection,
    );
    let out = assembler.assemble(&local).unwrap();

    assert_eq!(out.table.len(), 1);
    assert_eq!(out.table.dates(), vec![d(7)]);
    assert_eq!(out.table.rows[0].target, 3107.0);
    assert!(out.report.imputed_dates.is_empty());
}

#[test]
fn morning_news_and_evening_candle_share_a_row() {
    let dir = tempfile::tempdir().unwrap();
    let local = LocalTier::new(dir.path());
    seed_two_date_scenario(&local);

    let mut assembler =
        DatasetAssembler::new(Box::new(NewsFeaturizer::russian(1000)), MergePolicy::Intersection);
    let out = assembler.assemble(&local).unwrap();
    let row = out.table.row(d(7)).unwrap();
    assert_eq!(row.features.len(), out.table.columns.len());
    assert!(out.table.columns.iter().all(|c| c.starts_with("tfidf_")));
}

// ── Sync idempotence ────────────────────────────────────────────────

#[test]
fn sync_twice_gives_identical_local_and_untouched_remote() {
    let h = Harness::new();
    for day in [7, 8] {
        let mut news = NewsArtifact::new();
        news.push(format!("2022-03-0{day} 10:00"), "Нефть дорожает");
        h.remote.put_artifact(d(day), &RawArtifact::News(news)).unwrap();
    }
    h.remote
        .put_artifact(d(7), &RawArtifact::MarketIndex(MarketIndexArtifact::new()))
        .unwrap();
    // Legacy bare candles with the old column names.
    h.store
        .put(
            &ArtifactKind::MarketIndex.key(d(8)),
            br#"{"dt":["2022-03-08 00:00:00"],"imoex_open_val":[2500.5],"imoex_close_val":[2600.25]}"#,
        )
        .unwrap();
    let remote_before = h.store.snapshot();

    let dates: BTreeSet<_> = [d(7), d(8)].into_iter().collect();
    let local_files = |local: &LocalTier| -> Vec<Vec<u8>> {
        dates
            .iter()
            .flat_map(|&x| ArtifactKind::ALL.into_iter().map(move |kind| (kind, x)))
            .map(|(kind, x)| local.read(kind, x).unwrap())
            .collect()
    };

    let sync = RemoteSync::new(&h.remote, &h.local);
    sync.sync(&dates, &NoProgress).unwrap();
    let first = local_files(&h.local);

    sync.sync(&dates, &NoProgress).unwrap();
    let second = local_files(&h.local);

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);
    assert_eq!(h.store.snapshot(), remote_before);

    let candles = decode_market_index(&h.local.read(ArtifactKind::MarketIndex, d(8)).unwrap())
        .unwrap();
    assert_eq!(candles.encoding, Encoding::Versioned);
    assert_eq!(candles.artifact.close, vec![Some(2600.25)]);
}

// ── Backfill with a feed that never answers ─────────────────────────

#[test]
fn exhausted_news_retries_still_backfill_an_empty_artifact() {
    let h = Harness::new();
    let feed_calls = Calls::default();
    let news = RetryingNewsOrigin::new(
        AlwaysDown {
            calls: feed_calls.clone(),
        },
        RetryPolicy::new(3, Duration::ZERO),
    );
    let market = StubMarket {
        calls: h.market_calls.clone(),
        fail_on: vec![],
    };

    let backfiller = OriginBackfiller::new(&news, &market, &h.remote);
    let dates: BTreeSet<_> = [d(7)].into_iter().collect();
    let summary = backfiller.backfill_all(&dates, &NoProgress).unwrap();

    assert_eq!(feed_calls.get(), 3);
    assert_eq!(summary.empty_news, vec![d(7)]);
    assert!(summary.all_succeeded());

    let bytes = h.remote.get(ArtifactKind::News, d(7)).unwrap();
    let stored = imoexlab_core::data::decode_news(&bytes).unwrap().artifact;
    assert!(stored.is_empty());
}

// ── End to end ──────────────────────────────────────────────────────

#[test]
fn first_run_backfills_second_run_stays_offline() {
    let h = Harness::new();
    let range = DateRange::new(d(7), d(9)).unwrap();

    let mut pipeline = h.pipeline(vec![], MergePolicy::AnchorOnTarget);
    let report = pipeline.make_dataset(&range, &NoProgress).unwrap();
    assert_eq!(report.reconcile.local_missing.len(), 3);
    assert_eq!(report.reconcile.remote_missing.len(), 3);
    assert_eq!(report.rows, 3);
    assert_eq!(h.news_calls.get(), 3);
    assert_eq!(h.market_calls.get(), 3);

    let checker = TierAvailabilityChecker::new(&h.local, &h.remote);
    assert!(checker.missing_local(&range.dates()).is_empty());

    let lists_before = h.store.list_calls();
    let gets_before = h.store.get_calls();
    let report2 = pipeline.make_dataset(&range, &NoProgress).unwrap();
    assert!(report2.reconcile.local_missing.is_empty());
    assert_eq!(h.news_calls.get(), 3);
    assert_eq!(h.market_calls.get(), 3);
    assert_eq!(h.store.list_calls(), lists_before);
    assert_eq!(h.store.get_calls(), gets_before);
    assert_eq!(report.dataset_hash, report2.dataset_hash);
}

#[test]
fn remote_hits_are_synced_without_origin_calls() {
    let h = Harness::new();
    let mut news = NewsArtifact::new();
    news.push("2022-03-07 10:00", "Индекс снизился");
    h.remote.put_artifact(d(7), &RawArtifact::News(news)).unwrap();
    let mut candles = MarketIndexArtifact::new();
    candles.push("2022-03-07 00:00:00", Some(1.0), Some(2.0));
    h.remote
        .put_artifact(d(7), &RawArtifact::MarketIndex(candles))
        .unwrap();

    let pipeline = h.pipeline(vec![], MergePolicy::AnchorOnTarget);
    let report = pipeline
        .reconcile(&DateRange::new(d(7), d(7)).unwrap(), &NoProgress)
        .unwrap();

    assert!(report.remote_missing.is_empty());
    assert!(report.backfill.is_none());
    assert_eq!(report.sync.unwrap().written, 2);
    assert_eq!(h.news_calls.get(), 0);
    assert_eq!(h.market_calls.get(), 0);
}

#[test]
fn market_failure_leaves_date_unresolved_and_run_continues() {
    let h = Harness::new();
    let range = DateRange::new(d(7), d(9)).unwrap();
    let mut pipeline = h.pipeline(vec![d(8)], MergePolicy::AnchorOnTarget);

    let report = pipeline.make_dataset(&range, &NoProgress).unwrap();
    assert_eq!(report.reconcile.unresolved().into_iter().collect::<Vec<_>>(), vec![d(8)]);
    assert_eq!(report.rows, 2);
    assert!(!h.local.exists(ArtifactKind::MarketIndex, d(8)));
    assert!(h.store.snapshot().keys().all(|k| !k.contains("2022-03-08")));

    let csv = std::fs::read_to_string(pipeline.output_path()).unwrap();
    assert!(csv.starts_with("dt,"));
    assert!(csv.lines().next().unwrap().ends_with(",target"));
    assert_eq!(csv.lines().count(), 3);
}

#[test]
fn status_counts_gaps_without_fetching() {
    let h = Harness::new();
    let range = DateRange::new(d(1), d(10)).unwrap();
    let pipeline = h.pipeline(vec![], MergePolicy::AnchorOnTarget);

    let status = pipeline.status(&range).unwrap();
    assert_eq!(status.requested, 10);
    assert_eq!(status.local_missing.len(), 10);
    assert_eq!(status.remote_missing.len(), 10);
    assert_eq!(h.news_calls.get(), 0);
    assert_eq!(h.market_calls.get(), 0);
}

//! Multi-date report retrieval against an in-memory report server

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;

use miso_data_downloader::batch::{BatchError, BatchOrchestrator};
use miso_data_downloader::parser::lmp::parse_dayahead_lmp_report;
use miso_data_downloader::report::{ReportKind, ReportLocator};
use miso_data_downloader::timezone::MarketTimezone;
use miso_data_downloader::transport::TransportError;
use miso_data_downloader::{Hub, LmpRecord, Retrieval, RetrievalWarning, TableRecord};

use crate::common::{dayahead_csv, zip_of, MockTransport, REPORTS};

const KIND: ReportKind = ReportKind::DayAheadExPostLmp;

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, m, d).unwrap()
}

fn daily(m: u32, d: u32) -> String {
    format!("2021{m:02}{d:02}_da_expost_lmp.csv")
}

fn report(m: u32, d: u32) -> String {
    dayahead_csv(&format!("{m:02}/{d:02}/2021"))
}

async fn retrieve(
    transport: Arc<MockTransport>,
    dates: &[NaiveDate],
) -> Result<Retrieval<LmpRecord>, BatchError> {
    let tz = MarketTimezone::parse("EST").unwrap();
    BatchOrchestrator::new(transport, ReportLocator::new(REPORTS))
        .retrieve(dates, KIND, |bytes: &[u8]| parse_dayahead_lmp_report(bytes, &tz))
        .await
}

fn market_dates(retrieval: &Retrieval<LmpRecord>) -> BTreeSet<NaiveDate> {
    retrieval
        .table
        .iter()
        .map(|r| r.interval().market_date())
        .collect()
}

#[tokio::test]
async fn test_unarchived_days_are_concatenated_in_order() {
    let transport = Arc::new(
        MockTransport::new()
            .with_report(&daily(1, 16), report(1, 16))
            .with_report(&daily(1, 15), report(1, 15)),
    );

    let retrieval = retrieve(transport, &[date(1, 16), date(1, 15)]).await.unwrap();

    assert!(!retrieval.is_partial());
    // two hubs, 24 hours, two days
    assert_eq!(retrieval.table.len(), 96);
    let first = retrieval.table.first().unwrap();
    assert_eq!(first.interval.market_date(), date(1, 15));
    assert_eq!(first.node, Hub::Arkansas);
    let rows = retrieval.table.rows();
    assert!(rows.windows(2).all(|w| w[0].cmp_key(&w[1]).is_lt()));
}

#[tokio::test]
async fn test_archive_fallback_across_month_boundary() {
    let archive = zip_of(&[
        (daily(1, 30), report(1, 30)),
        (daily(1, 31), report(1, 31)),
    ]);
    let transport = Arc::new(
        MockTransport::new()
            .with_report("202101_da_expost_lmp_csv.zip", archive)
            .with_report(&daily(2, 1), report(2, 1)),
    );

    let retrieval = retrieve(transport, &[date(1, 31), date(2, 1)]).await.unwrap();

    assert!(retrieval.warnings.is_empty());
    assert_eq!(retrieval.table.len(), 96);
    // Jan 30 shares the archive but was not requested
    assert_eq!(
        market_dates(&retrieval),
        [date(1, 31), date(2, 1)].into_iter().collect()
    );
}

#[tokio::test]
async fn test_missing_day_degrades_to_warning() {
    let transport = Arc::new(MockTransport::new().with_report(&daily(1, 15), report(1, 15)));

    let retrieval = retrieve(transport, &[date(1, 14), date(1, 15)]).await.unwrap();

    assert_eq!(retrieval.table.len(), 48);
    assert_eq!(
        retrieval.warnings,
        vec![RetrievalWarning::MissingDates(vec![date(1, 14)])]
    );
}

#[tokio::test]
async fn test_no_reports_at_all_yields_empty_table() {
    let transport = Arc::new(MockTransport::new());

    let retrieval = retrieve(transport.clone(), &[date(3, 1)]).await.unwrap();

    assert!(retrieval.table.is_empty());
    assert_eq!(
        retrieval.warnings,
        vec![RetrievalWarning::MissingDates(vec![date(3, 1)])]
    );
    // one existence check per candidate, nothing else
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_unarchived_candidate_takes_precedence() {
    let archive_url = format!("{REPORTS}/202101_da_expost_lmp_csv.zip");
    let transport = Arc::new(
        MockTransport::new()
            .with_report(&daily(1, 15), report(1, 15))
            .with_report(
                "202101_da_expost_lmp_csv.zip",
                zip_of(&[(daily(1, 15), "not a report".to_string())]),
            ),
    );

    let retrieval = retrieve(transport.clone(), &[date(1, 15)]).await.unwrap();

    assert_eq!(retrieval.table.len(), 48);
    assert_eq!(transport.calls_to(&archive_url), 0);
    assert_eq!(transport.checks_of(&archive_url), 0);
}

#[tokio::test]
async fn test_archive_without_expected_member_is_reported() {
    let transport = Arc::new(MockTransport::new().with_report(
        "202101_da_expost_lmp_csv.zip",
        zip_of(&[(daily(1, 10), report(1, 10))]),
    ));

    let retrieval = retrieve(transport, &[date(1, 10), date(1, 11)]).await.unwrap();

    assert_eq!(retrieval.table.len(), 48);
    assert_eq!(
        retrieval.warnings,
        vec![RetrievalWarning::UnretrievedFiles(vec![daily(1, 11)])]
    );
}

#[tokio::test]
async fn test_archive_fetched_once_for_many_dates() {
    let archive_url = format!("{REPORTS}/202101_da_expost_lmp_csv.zip");
    let members: Vec<(String, String)> = (1..=5).map(|d| (daily(1, d), report(1, d))).collect();
    let transport = Arc::new(
        MockTransport::new().with_report("202101_da_expost_lmp_csv.zip", zip_of(&members)),
    );
    let dates: Vec<NaiveDate> = (1..=5).map(|d| date(1, d)).collect();

    let retrieval = retrieve(transport.clone(), &dates).await.unwrap();

    assert_eq!(retrieval.table.len(), 5 * 48);
    // one existence check per date, a single download
    assert_eq!(transport.checks_of(&archive_url), 5);
    assert_eq!(transport.calls_to(&archive_url), 1);
}

#[tokio::test]
async fn test_retrieval_is_idempotent() {
    let transport = Arc::new(
        MockTransport::new()
            .with_report(&daily(1, 15), report(1, 15))
            .with_report(&daily(1, 16), report(1, 16)),
    );
    let dates = [date(1, 15), date(1, 16), date(1, 15)];

    let first = retrieve(transport.clone(), &dates).await.unwrap();
    let second = retrieve(transport, &dates).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unparseable_report_aborts_batch() {
    let transport = Arc::new(
        MockTransport::new()
            .with_report(&daily(1, 15), report(1, 15))
            .with_report(&daily(1, 16), "garbage"),
    );

    let err = retrieve(transport, &[date(1, 15), date(1, 16)]).await.unwrap_err();

    match err {
        BatchError::Parse { file, .. } => assert_eq!(file, daily(1, 16)),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_while_probing_aborts_batch() {
    let url = format!("{REPORTS}/{}", daily(1, 15));
    let transport = Arc::new(MockTransport::new().with_error(
        url.clone(),
        TransportError::Status { url, status: 500 },
    ));

    let err = retrieve(transport, &[date(1, 15)]).await.unwrap_err();

    assert!(matches!(
        err,
        BatchError::Transport(TransportError::Status { status: 500, .. })
    ));
}

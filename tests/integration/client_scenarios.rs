//! Client operations end to end over a mock transport

use chrono::{NaiveDate, Timelike};
use rust_decimal::Decimal;
use std::sync::Arc;

use miso_data_downloader::client::{ClientError, MisoClient};
use miso_data_downloader::parser::ParseError;
use miso_data_downloader::timezone::MarketTimezone;
use miso_data_downloader::{DateRequest, Hub, PriceMethod, RetrievalWarning};

use crate::common::{dayahead_csv, forecast_json, load_json, mock_config, MockTransport, BASE};

fn total_load_key() -> String {
    format!("{BASE}/DataBrokerServices.asmx?messageType=gettotalload&returnType=json")
}

fn client(transport: MockTransport) -> (MisoClient<MockTransport>, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let client = MisoClient::with_transport(mock_config(), transport.clone()).unwrap();
    (client, transport)
}

fn three_intervals() -> String {
    load_json(
        "19-Oct-2026 - Interval 00:15 EST",
        &[("00:00", "61000"), ("00:05", "61100.1"), ("00:10", "61234.567")],
    )
}

#[tokio::test]
async fn test_latest_load_keeps_last_interval() {
    let (client, _) = client(MockTransport::new().with_response(total_load_key(), three_intervals()));

    let retrieval = client.get_load(&DateRequest::Latest).await.unwrap();

    assert_eq!(retrieval.table.len(), 1);
    let row = &retrieval.table.rows()[0];
    assert_eq!(row.interval.start.minute(), 10);
    assert_eq!(row.interval.end.minute(), 15);
    assert_eq!(row.load, Decimal::new(6_123_457, 2));
}

#[tokio::test]
async fn test_today_load_returns_full_series() {
    let (client, transport) =
        client(MockTransport::new().with_response(total_load_key(), three_intervals()));

    let retrieval = client.get_load(&DateRequest::Today).await.unwrap();

    assert_eq!(retrieval.table.len(), 3);
    assert!(retrieval.warnings.is_empty());
    assert_eq!(transport.calls(), vec![total_load_key()]);
}

/// Forecast for every hour of the current market day, referenced at the current time
fn todays_forecast() -> String {
    let now = MarketTimezone::parse("EST").unwrap().now();
    let refid = format!(
        "{} - Interval {} EST",
        now.format("%d-%b-%Y"),
        now.format("%H:%M")
    );
    let hours: Vec<(u32, String)> = (1..=24).map(|he| (he, format!("{}.5", 60_000 + he))).collect();
    let hours: Vec<(u32, &str)> = hours.iter().map(|(he, v)| (*he, v.as_str())).collect();
    forecast_json(&refid, &hours)
}

#[tokio::test]
async fn test_latest_forecast_is_the_current_hour() {
    let tz = MarketTimezone::parse("EST").unwrap();
    let (client, transport) =
        client(MockTransport::new().with_response(total_load_key(), todays_forecast()));

    let before = tz.current_hour();
    let retrieval = client.get_forecast(&DateRequest::Latest).await.unwrap();
    let after = tz.current_hour();

    assert_eq!(retrieval.table.len(), 1);
    let row = &retrieval.table.rows()[0];
    assert!(row.interval.start == before || row.interval.start == after);
    assert_eq!((row.interval.start.minute(), row.interval.start.second()), (0, 0));
    assert_eq!(row.interval.end - row.interval.start, chrono::Duration::hours(1));
    let expected = Decimal::new(600_005 + 10 * i64::from(row.interval.start.hour() + 1), 1);
    assert_eq!(row.forecast, expected);
    assert_eq!(transport.calls(), vec![total_load_key()]);
}

#[tokio::test]
async fn test_today_forecast_returns_whole_day() {
    let tz = MarketTimezone::parse("EST").unwrap();
    let (client, _) =
        client(MockTransport::new().with_response(total_load_key(), todays_forecast()));

    let retrieval = client.get_forecast(&DateRequest::Today).await.unwrap();

    assert_eq!(retrieval.table.len(), 24);
    let first = retrieval.table.first().unwrap();
    assert_eq!(first.interval.start, tz.start_of_day(first.interval.start.date_naive()).unwrap());
    assert_eq!(first.forecast, Decimal::new(600_015, 1));
    assert_eq!(retrieval.table.last().unwrap().interval.start.hour(), 23);
    assert!(retrieval
        .table
        .iter()
        .any(|r| r.interval.start == tz.current_hour()));
}

#[tokio::test]
async fn test_fuel_mix_today_is_rejected_without_network() {
    let (client, transport) = client(MockTransport::new());

    let err = client.get_fuel_mix(&DateRequest::Today).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::UnsupportedMode {
            operation: "fuel mix",
            mode: "today"
        }
    ));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_reference_id_fails_operation() {
    let payload = load_json("19-Oct-2026 - Interval 00:15", &[("00:00", "61000")]);
    let (client, _) = client(MockTransport::new().with_response(total_load_key(), payload));

    let err = client.get_load(&DateRequest::Latest).await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Parse(ParseError::MalformedReferenceId(_))
    ));
}

#[tokio::test]
async fn test_latest_fuel_mix() {
    let payload = r#"{
        "RefId": "19-Oct-2026 - Interval 14:35 EST",
        "TotalMW": "70100.123",
        "Fuel": {"Type": [
            {"INTERVALEST": "2026-10-19 02:35:00 PM", "CATEGORY": "Coal", "ACT": "20000"},
            {"INTERVALEST": "2026-10-19 02:35:00 PM", "CATEGORY": "Gas", "ACT": "30000.554"},
            {"INTERVALEST": "2026-10-19 02:35:00 PM", "CATEGORY": "Wind", "ACT": 20000},
            {"INTERVALEST": "2026-10-19 02:35:00 PM", "CATEGORY": "Other", "ACT": "100"}
        ]}
    }"#;
    let (client, _) = client(MockTransport::new().with_response(
        format!("{BASE}/DataBrokerServices.asmx?messageType=getfuelmix&returnType=json"),
        payload,
    ));

    let retrieval = client.get_fuel_mix(&DateRequest::Latest).await.unwrap();

    assert_eq!(retrieval.table.len(), 1);
    let row = &retrieval.table.rows()[0];
    assert_eq!(
        row.fuels.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["coal", "natural_gas", "wind"]
    );
    assert_eq!(row.fuels["natural_gas"], Decimal::new(3_000_055, 2));
    assert_eq!(row.other, Some(Decimal::new(100, 0)));
    assert_eq!(row.total, Decimal::new(7_010_012, 2));
    assert_eq!((row.interval.start.hour(), row.interval.start.minute()), (14, 35));
}

#[tokio::test]
async fn test_realtime_lmp_modes_use_distinct_endpoints() {
    let csv = "INTERVAL,CPNODE,LMP,MLC,MCC\n\
               2026-10-19T14:35:00,TEXAS.HUB,25.12,0.5,-1.25\n\
               2026-10-19T14:35:00,AMIL.BGS6,30,0,0\n";
    let (client, transport) = client(
        MockTransport::new()
            .with_response(
                format!("{BASE}/Reporter.asmx?messageType=currentinterval&returnType=csv"),
                csv,
            )
            .with_response(
                format!("{BASE}/Reporter.asmx?messageType=rollingmarketday&returnType=csv"),
                csv,
            ),
    );

    let latest = client.get_realtime_lmp(&DateRequest::Latest).await.unwrap();
    let today = client.get_realtime_lmp(&DateRequest::Today).await.unwrap();

    assert_eq!(latest.table.len(), 1);
    assert_eq!(latest.table.rows()[0].node, Hub::Texas);
    assert_eq!(today, latest);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_dayahead_history_uses_price_method_report() {
    let (client, transport) = client(MockTransport::new().with_response(
        format!("{BASE}/marketreports/20210115_da_exante_lmp.csv"),
        dayahead_csv("01/15/2021"),
    ));
    let request = DateRequest::History(vec![
        NaiveDate::from_ymd_opt(2021, 1, 15).unwrap(),
        NaiveDate::from_ymd_opt(2021, 1, 16).unwrap(),
    ]);

    let retrieval = client
        .get_dayahead_lmp(&request, PriceMethod::ExAnte)
        .await
        .unwrap();

    assert_eq!(retrieval.table.len(), 48);
    assert!(matches!(
        retrieval.warnings.as_slice(),
        [RetrievalWarning::MissingDates(dates)] if dates == &[NaiveDate::from_ymd_opt(2021, 1, 16).unwrap()]
    ));
    assert!(transport
        .calls()
        .iter()
        .all(|url| !url.contains("da_expost")));
}

#[tokio::test]
async fn test_dayahead_today_reads_todays_report() {
    let today = MarketTimezone::parse("EST").unwrap().today();
    let (client, _) = client(MockTransport::new().with_response(
        format!("{BASE}/marketreports/{}_da_expost_lmp.csv", today.format("%Y%m%d")),
        dayahead_csv(&today.format("%m/%d/%Y").to_string()),
    ));

    let full_day = client
        .get_dayahead_lmp(&DateRequest::Today, PriceMethod::ExPost)
        .await
        .unwrap();
    let latest = client
        .get_dayahead_lmp(&DateRequest::Latest, PriceMethod::ExPost)
        .await
        .unwrap();

    assert_eq!(full_day.table.len(), 48);
    assert_eq!(latest.table.len(), 2);
    let start = latest.table.rows()[0].interval.start;
    assert!(latest.table.iter().all(|r| r.interval.start == start));
}

#[tokio::test]
async fn test_history_results_restricted_to_requested_dates() {
    let archive = crate::common::zip_of(&[
        ("20210101_da_expost_lmp.csv".to_string(), dayahead_csv("01/01/2021")),
        ("20210102_da_expost_lmp.csv".to_string(), dayahead_csv("01/02/2021")),
    ]);
    let (client, _) = client(
        MockTransport::new()
            .with_response(format!("{BASE}/marketreports/202101_da_expost_lmp_csv.zip"), archive),
    );
    let requested = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();

    let retrieval = client
        .get_dayahead_lmp(&DateRequest::History(vec![requested]), PriceMethod::ExPost)
        .await
        .unwrap();

    assert_eq!(retrieval.table.len(), 48);
    assert!(retrieval
        .table
        .iter()
        .all(|r| r.interval.start.date_naive() == requested));
}

#[tokio::test]
async fn test_empty_history_is_invalid() {
    let (client, transport) = client(MockTransport::new());

    let err = client
        .get_realtime_lmp(&DateRequest::History(Vec::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidDateSpecification(_)));
    assert_eq!(transport.call_count(), 0);
}

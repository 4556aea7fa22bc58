//! Writing retrieved tables to disk

use chrono::NaiveDate;
use std::sync::Arc;
use tempfile::TempDir;

use miso_data_downloader::client::MisoClient;
use miso_data_downloader::output::{write_table_file, OutputFormat};
use miso_data_downloader::{DateRequest, PriceMethod};

use crate::common::{dayahead_csv, mock_config, MockTransport, BASE};

#[tokio::test]
async fn test_dayahead_history_written_as_csv_and_json() {
    let transport = Arc::new(MockTransport::new().with_response(
        format!("{BASE}/marketreports/20210115_da_expost_lmp.csv"),
        dayahead_csv("01/15/2021"),
    ));
    let client = MisoClient::with_transport(mock_config(), transport).unwrap();
    let request = DateRequest::History(vec![NaiveDate::from_ymd_opt(2021, 1, 15).unwrap()]);
    let retrieval = client
        .get_dayahead_lmp(&request, PriceMethod::ExPost)
        .await
        .unwrap();

    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("out/lmp.csv");
    let json_path = temp_dir.path().join("out/lmp.json");

    assert_eq!(
        write_table_file(&retrieval.table, OutputFormat::Csv, &csv_path).unwrap(),
        48
    );
    assert_eq!(
        write_table_file(&retrieval.table, OutputFormat::Json, &json_path).unwrap(),
        48
    );

    let mut reader = csv::Reader::from_path(&csv_path).unwrap();
    assert_eq!(
        reader.headers().unwrap().iter().collect::<Vec<_>>(),
        vec!["start", "end", "node", "lmp", "mlc", "mcc"]
    );
    let first = reader.records().next().unwrap().unwrap();
    assert_eq!(
        first.iter().collect::<Vec<_>>(),
        vec![
            "2021-01-15T00:00:00-05:00",
            "2021-01-15T01:00:00-05:00",
            "ARKANSAS.HUB",
            "30.01",
            "32.01",
            "31.01"
        ]
    );

    let rows: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 48);
    assert_eq!(rows[0]["node"], "ARKANSAS.HUB");
    assert_eq!(rows[47]["start"], "2021-01-15T23:00:00-05:00");
}

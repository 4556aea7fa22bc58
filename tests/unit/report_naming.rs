//! Unit tests for report filenames and URLs

use chrono::NaiveDate;

use miso_data_downloader::report::{ReportDescriptor, ReportKind, ReportLocator};
use miso_data_downloader::PriceMethod;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_unarchived_filenames_for_every_kind() {
    let market_date = date(2021, 3, 14);
    let names: Vec<String> = ReportKind::ALL
        .iter()
        .map(|kind| ReportDescriptor::unarchived(*kind, market_date).filename())
        .collect();

    assert_eq!(
        names,
        vec![
            "20210315_df_al.xls",
            "20210315_sr_gfm.xlsx",
            "20210314_da_exante_lmp.csv",
            "20210314_da_expost_lmp.csv",
            "20210315_5min_exante_lmp.xlsx",
        ]
    );
}

#[test]
fn test_publish_date_crosses_year_end() {
    let descriptor = ReportDescriptor::archived(ReportKind::GenerationFuelMix, date(2020, 12, 31));
    assert_eq!(descriptor.file_date(), date(2021, 1, 1));
    assert_eq!(descriptor.filename(), "202101_sr_gfm_xlsx.zip");
    assert_eq!(descriptor.member_name(), "20210101_sr_gfm.xlsx");
}

#[test]
fn test_candidates_probe_unarchived_first() {
    let locator = ReportLocator::new("https://docs.misoenergy.org/marketreports/");
    let [first, second] = locator.candidates(ReportKind::day_ahead(PriceMethod::ExAnte), date(2021, 1, 15));

    assert!(!first.archived);
    assert!(second.archived);
    assert_eq!(
        locator.url(&first),
        "https://docs.misoenergy.org/marketreports/20210115_da_exante_lmp.csv"
    );
    assert_eq!(
        locator.url(&second),
        "https://docs.misoenergy.org/marketreports/202101_da_exante_lmp_csv.zip"
    );
}

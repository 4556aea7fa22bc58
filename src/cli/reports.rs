//! CLI command for listing report files

use chrono::NaiveDate;
use clap::Args;
use serde_json::{json, Value};

use super::CliError;
use crate::config::ClientConfig;
use crate::output::OutputFormat;
use crate::report::{ReportKind, ReportLocator};
use crate::transport::{HttpTransport, Transport};

/// Reports subcommand
#[derive(Debug, Args)]
pub struct ReportsCommand {
    /// Market date (YYYY-MM-DD, default: today in the market timezone)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Probe the server and report which candidate exists
    #[arg(long, default_value_t = false)]
    pub resolve: bool,
}

impl ReportsCommand {
    /// List the candidate files of every report kind, returning how many kinds were listed
    pub async fn execute(&self, config: &ClientConfig, format: OutputFormat) -> Result<u64, CliError> {
        let timezone = config
            .validate()
            .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
        let date = self.date.unwrap_or_else(|| timezone.today());
        let locator = ReportLocator::new(config.endpoints.market_reports.clone());
        let transport = if self.resolve {
            Some(HttpTransport::from_config(config)?)
        } else {
            None
        };

        let entries = self.list_and_close(&locator, date, transport.as_ref()).await?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::to_string_pretty(&entries)
                    .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
                println!("{output}");
            }
            OutputFormat::Csv => {
                println!("Reports for market date {date}:");
                for entry in &entries {
                    println!("  {}", entry["report"].as_str().unwrap_or_default());
                    println!("    daily:   {}", entry["unarchived"].as_str().unwrap_or_default());
                    println!("    archive: {}", entry["archived"].as_str().unwrap_or_default());
                    if self.resolve {
                        match entry["resolved"].as_str() {
                            Some(url) => println!("    found:   {url}"),
                            None => println!("    found:   (none)"),
                        }
                    }
                }
            }
        }

        Ok(entries.len() as u64)
    }

    /// List every kind, then close the transport whether or not probing failed.
    async fn list_and_close<T>(
        &self,
        locator: &ReportLocator,
        date: NaiveDate,
        transport: Option<&T>,
    ) -> Result<Vec<Value>, CliError>
    where
        T: Transport + ?Sized,
    {
        let listed = self.list(locator, date, transport).await;
        if let Some(transport) = transport {
            transport.close().await;
        }
        listed
    }

    async fn list<T>(
        &self,
        locator: &ReportLocator,
        date: NaiveDate,
        transport: Option<&T>,
    ) -> Result<Vec<Value>, CliError>
    where
        T: Transport + ?Sized,
    {
        let mut entries = Vec::new();
        for kind in ReportKind::ALL {
            let [unarchived, archived] = locator.candidates(kind, date);
            let resolved = match transport {
                Some(transport) => locator
                    .resolve(transport, kind, date)
                    .await?
                    .map(|report| report.url),
                None => None,
            };
            entries.push(json!({
                "report": kind.to_string(),
                "market_date": date.to_string(),
                "unarchived": locator.url(&unarchived),
                "archived": locator.url(&archived),
                "resolved": resolved,
            }));
        }
        Ok(entries)
    }
}

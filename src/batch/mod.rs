//! Multi-date report retrieval
//!
//! [`BatchOrchestrator::retrieve`] turns a list of market dates into one table:
//!
//! 1. resolve each date to its daily file or monthly archive
//! 2. build the expected set of daily filenames for every resolved date
//! 3. fetch each distinct URL once, handling results as they complete
//! 4. parse daily files, and archive members whose name is expected
//! 5. report dates and files that could not be retrieved as warnings
//!
//! The expected set keeps out-of-range days bundled in a shared monthly
//! archive from being parsed. Completion order never affects the result since
//! the final table is re-sorted.

use bytes::Bytes;
use chrono::NaiveDate;
use futures::future::try_join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::ZipArchive;

use crate::metrics;
use crate::parser::{ParseError, ParseResult};
use crate::report::{ReportKind, ReportLocator};
use crate::table::{Retrieval, RetrievalWarning, Table, TableRecord};
use crate::transport::{Transport, TransportError};

/// Batch retrieval errors. Any of these aborts the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A located report could not be fetched
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A report file could not be parsed
    #[error("failed to parse {file}: {source}")]
    Parse {
        /// Report filename
        file: String,
        /// Underlying error
        #[source]
        source: ParseError,
    },

    /// A monthly archive could not be read
    #[error("failed to read archive {url}: {message}")]
    Archive {
        /// Archive URL
        url: String,
        /// Underlying error
        message: String,
    },

    /// A fetched daily file does not correspond to any requested date
    #[error("unexpected report file: {0}")]
    UnexpectedFile(String),
}

/// Result type for batch retrieval
pub type BatchResult<T> = Result<T, BatchError>;

/// Retrieves and parses report files for many dates
pub struct BatchOrchestrator<T: Transport + ?Sized> {
    transport: Arc<T>,
    locator: ReportLocator,
    show_progress: bool,
}

impl<T: Transport + ?Sized> BatchOrchestrator<T> {
    /// Orchestrator fetching through `transport`
    pub fn new(transport: Arc<T>, locator: ReportLocator) -> Self {
        Self {
            transport,
            locator,
            show_progress: false,
        }
    }

    /// Draw a progress bar while parsing
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Report locator
    pub fn locator(&self) -> &ReportLocator {
        &self.locator
    }

    /// Retrieve `kind` reports for `dates` and parse them with `parse`.
    ///
    /// Dates need not be unique or ordered. Dates with no report under either
    /// candidate name, and expected files absent from a fetched archive, are
    /// returned as warnings. A transport error (other than absence), an
    /// unreadable archive or a parse failure aborts the batch.
    pub async fn retrieve<R, F>(
        &self,
        dates: &[NaiveDate],
        kind: ReportKind,
        parse: F,
    ) -> BatchResult<Retrieval<R>>
    where
        R: TableRecord,
        F: Fn(&[u8]) -> ParseResult<Table<R>> + Sync,
    {
        let dates: BTreeSet<NaiveDate> = dates.iter().copied().collect();

        let resolved = try_join_all(
            dates
                .iter()
                .map(|date| self.locator.resolve(self.transport.as_ref(), kind, *date)),
        )
        .await?;

        let mut missing_dates = Vec::new();
        let mut expected: BTreeSet<String> = BTreeSet::new();
        let mut urls: BTreeMap<String, bool> = BTreeMap::new();
        for (date, report) in dates.iter().zip(resolved) {
            match report {
                Some(report) => {
                    expected.insert(report.descriptor.member_name());
                    urls.insert(report.url, report.descriptor.archived);
                }
                None => missing_dates.push(*date),
            }
        }

        info!(
            "Retrieving {} {} files for {} dates ({} missing)",
            urls.len(),
            kind.suffix(),
            dates.len(),
            missing_dates.len()
        );

        let progress = ProgressGuard(self.progress_bar(expected.len() as u64, kind));

        let mut pending: FuturesUnordered<_> = urls
            .iter()
            .map(|(url, archived)| async move {
                let body = self.transport.fetch(url, &[]).await;
                (url.as_str(), *archived, body)
            })
            .collect();

        let mut tables = Vec::new();
        while let Some((url, archived, body)) = pending.next().await {
            let body = body?;
            if archived {
                let parsed = extract_archive(url, &body, &mut expected, &parse)?;
                progress.0.inc(parsed.len() as u64);
                tables.extend(parsed);
            } else {
                let file = url.rsplit('/').next().unwrap_or(url).to_string();
                if !expected.remove(&file) {
                    return Err(BatchError::UnexpectedFile(file));
                }
                tables.push(parse(&body[..]).map_err(|source| BatchError::Parse { file, source })?);
                progress.0.inc(1);
            }
        }
        drop(progress);

        let mut warnings = Vec::new();
        if !missing_dates.is_empty() {
            warn!(
                "Not all requested data is available. Missing {} dates: {:?}",
                kind.suffix(),
                missing_dates
            );
            warnings.push(RetrievalWarning::MissingDates(missing_dates));
        }
        if !expected.is_empty() {
            let files: Vec<String> = expected.into_iter().collect();
            warn!("Not all report files retrieved. Missing: {:?}", files);
            warnings.push(RetrievalWarning::UnretrievedFiles(files));
        }
        if !warnings.is_empty() {
            metrics::record_partial_retrieval(kind.suffix());
        }

        Ok(Retrieval {
            table: Table::concat(tables),
            warnings,
        })
    }

    fn progress_bar(&self, total: u64, kind: ReportKind) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        ) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(format!("Retrieving {kind} reports"));
        pb
    }
}

/// Clears the progress bar when the batch ends, including early error returns.
struct ProgressGuard(ProgressBar);

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}

/// Parse every archive member whose name is still expected, removing it from
/// the expected set.
fn extract_archive<R, F>(
    url: &str,
    body: &Bytes,
    expected: &mut BTreeSet<String>,
    parse: &F,
) -> BatchResult<Vec<Table<R>>>
where
    R: TableRecord,
    F: Fn(&[u8]) -> ParseResult<Table<R>>,
{
    let archive_error = |message: String| BatchError::Archive {
        url: url.to_string(),
        message,
    };

    let mut archive =
        ZipArchive::new(Cursor::new(body.as_ref())).map_err(|e| archive_error(e.to_string()))?;
    let mut tables = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive
            .by_index(index)
            .map_err(|e| archive_error(e.to_string()))?;
        let name = member.name().to_string();
        if !expected.contains(&name) {
            debug!("Skipping unrequested archive member {}", name);
            continue;
        }

        let mut data = Vec::new();
        member
            .read_to_end(&mut data)
            .map_err(|e| archive_error(e.to_string()))?;
        tables.push(parse(&data[..]).map_err(|source| BatchError::Parse {
            file: name.clone(),
            source,
        })?);
        expected.remove(&name);
    }

    debug!("Parsed {} members of {}", tables.len(), url);
    Ok(tables)
}

//! Report file location
//!
//! [`ReportDescriptor`] derives a filename from `(kind, market date, archived)`
//! with no I/O. [`ReportLocator::resolve`] probes the two candidates through a
//! [`Transport`]: the unarchived file first, then the monthly archive. Absence of
//! both is a normal outcome and yields `None`.

use chrono::NaiveDate;
use tracing::debug;

use super::ReportKind;
use crate::transport::{Transport, TransportResult};

/// A report file for one market date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportDescriptor {
    /// Report kind
    pub kind: ReportKind,
    /// Market day the report describes
    pub market_date: NaiveDate,
    /// Monthly zip archive rather than the daily file
    pub archived: bool,
}

impl ReportDescriptor {
    /// Daily file descriptor
    pub fn unarchived(kind: ReportKind, market_date: NaiveDate) -> Self {
        Self {
            kind,
            market_date,
            archived: false,
        }
    }

    /// Monthly archive descriptor
    pub fn archived(kind: ReportKind, market_date: NaiveDate) -> Self {
        Self {
            kind,
            market_date,
            archived: true,
        }
    }

    /// Date the file is named by: the market date, or the next day for
    /// reports named by their publish date.
    pub fn file_date(&self) -> NaiveDate {
        if self.kind.naming().named_by_publish_date {
            self.market_date.succ_opt().unwrap_or(self.market_date)
        } else {
            self.market_date
        }
    }

    /// Deterministic filename
    pub fn filename(&self) -> String {
        let naming = self.kind.naming();
        let date = self.file_date();
        if self.archived {
            format!(
                "{}_{}_{}.zip",
                date.format("%Y%m"),
                naming.suffix,
                naming.extension
            )
        } else {
            format!(
                "{}_{}.{}",
                date.format("%Y%m%d"),
                naming.suffix,
                naming.extension
            )
        }
    }

    /// Name of the daily file for this market date, whether or not it is archived.
    /// Archive members carry this name.
    pub fn member_name(&self) -> String {
        ReportDescriptor::unarchived(self.kind, self.market_date).filename()
    }
}

/// A market date whose report was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReport {
    /// Descriptor of the candidate that exists
    pub descriptor: ReportDescriptor,
    /// URL of that candidate
    pub url: String,
}

impl ResolvedReport {
    /// Requested market date
    pub fn market_date(&self) -> NaiveDate {
        self.descriptor.market_date
    }
}

/// Maps descriptors to URLs and resolves which candidate exists
#[derive(Debug, Clone)]
pub struct ReportLocator {
    base_url: String,
}

impl ReportLocator {
    /// Locator for reports under `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a descriptor
    pub fn url(&self, descriptor: &ReportDescriptor) -> String {
        format!("{}/{}", self.base_url, descriptor.filename())
    }

    /// Candidates in probe order: unarchived, then archived
    pub fn candidates(&self, kind: ReportKind, market_date: NaiveDate) -> [ReportDescriptor; 2] {
        [
            ReportDescriptor::unarchived(kind, market_date),
            ReportDescriptor::archived(kind, market_date),
        ]
    }

    /// Find the first existing candidate.
    ///
    /// Returns `Ok(None)` when neither exists; any error other than a 404
    /// propagates.
    pub async fn resolve<T>(
        &self,
        transport: &T,
        kind: ReportKind,
        market_date: NaiveDate,
    ) -> TransportResult<Option<ResolvedReport>>
    where
        T: Transport + ?Sized,
    {
        for descriptor in self.candidates(kind, market_date) {
            let url = self.url(&descriptor);
            if transport.exists_at(&url).await? {
                debug!("Resolved {} for {} to {}", kind, market_date, url);
                return Ok(Some(ResolvedReport { descriptor, url }));
            }
        }
        debug!("No {} report found for {}", kind, market_date);
        Ok(None)
    }
}

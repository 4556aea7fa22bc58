//! Live-API reference ids
//!
//! Every live payload carries a reference id such as
//! `"19-Oct-2026 - Interval 14:35 EST"` naming the interval it describes.

use chrono::{DateTime, NaiveDateTime};
use chrono_tz::Tz;

use super::{ParseError, ParseResult};
use crate::timezone::MarketTimezone;

const ZONE_TOKEN: &str = "EST";
const REFID_FORMAT: &str = "%d-%b-%Y - Interval %H:%M";

/// Parse a reference id into the interval instant it names.
///
/// The trailing zone token must be `EST` and the second and third tokens must
/// be `-` and `Interval`.
pub fn parse_reference_id(refid: &str, tz: &MarketTimezone) -> ParseResult<DateTime<Tz>> {
    let malformed = || ParseError::MalformedReferenceId(refid.to_string());

    let tokens: Vec<&str> = refid.split_whitespace().collect();
    if tokens.last() != Some(&ZONE_TOKEN) || tokens.get(1..3) != Some(&["-", "Interval"][..]) {
        return Err(malformed());
    }

    let body = refid
        .trim_end()
        .strip_suffix(ZONE_TOKEN)
        .ok_or_else(malformed)?
        .trim();
    let naive = NaiveDateTime::parse_from_str(body, REFID_FORMAT).map_err(|_| malformed())?;

    Ok(tz.localize(naive)?)
}

use crate::error::DataError;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tabled::Tabled;

/// A calendar month. Ordering is chronological: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The month immediately after this one; December rolls over into
    /// January of the next year. `None` past the last representable year.
    pub fn succ(self) -> Option<Self> {
        if self.month >= 12 {
            Some(Self::new(self.year.checked_add(1)?, 1))
        } else {
            Some(Self::new(self.year, self.month + 1))
        }
    }

    /// First day of the month. Fails for months outside 1..=12.
    pub fn to_date(self) -> Result<NaiveDate, DataError> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or(DataError::InvalidMonth {
            year: self.year,
            month: self.month,
        })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive range of calendar months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl DateRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Self {
        Self { start, end }
    }

    /// Every month from `start` to `end` inclusive, in calendar order.
    /// Empty when `start > end`.
    pub fn months(&self) -> impl Iterator<Item = YearMonth> {
        let end = self.end;
        std::iter::successors(Some(self.start), |ym| ym.succ())
            .take_while(move |ym| *ym <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Composite key of a leaf entry. Field order gives the store its
/// crime type / neighbourhood / year / month iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesKey {
    pub crime_type: String,
    pub neighbourhood: String,
    pub year: i32,
    pub month: u32,
}

impl SeriesKey {
    pub fn year_month(&self) -> YearMonth {
        YearMonth::new(self.year, self.month)
    }
}

/// One input row after column extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRow {
    pub crime_type: String,
    pub neighbourhood: String,
    pub year: i32,
    pub month: u32,
    pub occurrences: u64,
}

/// Flat export record; also the row shape of the processed dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct CrimeCountRow {
    pub crime_type: String,
    pub neighbourhood: String,
    pub year: i32,
    pub month: u32,
    pub count: u64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CrimeTypeSummaryRow {
    #[serde(rename = "CrimeType")]
    #[tabled(rename = "CrimeType")]
    pub crime_type: String,
    #[serde(rename = "Neighbourhoods")]
    #[tabled(rename = "Neighbourhoods")]
    pub neighbourhoods: usize,
    #[serde(rename = "TotalOccurrences")]
    #[tabled(rename = "TotalOccurrences")]
    pub total_occurrences: String,
    #[serde(rename = "AvgMonthly")]
    #[tabled(rename = "AvgMonthly")]
    pub avg_monthly: String,
    #[serde(rename = "MedianMonthly")]
    #[tabled(rename = "MedianMonthly")]
    pub median_monthly: String,
    #[serde(rename = "PeakMonth")]
    #[tabled(rename = "PeakMonth")]
    pub peak_month: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct NeighbourhoodRankingRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Neighbourhood")]
    #[tabled(rename = "Neighbourhood")]
    pub neighbourhood: String,
    #[serde(rename = "TotalOccurrences")]
    #[tabled(rename = "TotalOccurrences")]
    pub total_occurrences: String,
    #[serde(rename = "TopCrimeType")]
    #[tabled(rename = "TopCrimeType")]
    pub top_crime_type: String,
    #[serde(rename = "TopShare")]
    #[tabled(rename = "TopShare")]
    pub top_share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AnnualTrendRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "CrimeType")]
    #[tabled(rename = "CrimeType")]
    pub crime_type: String,
    #[serde(rename = "TotalOccurrences")]
    #[tabled(rename = "TotalOccurrences")]
    pub total_occurrences: u64,
    #[serde(rename = "YoYChange")]
    #[tabled(rename = "YoYChange")]
    pub yoy_change: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_entries: usize,
    pub total_crime_types: usize,
    pub total_neighbourhoods: usize,
    pub total_series: usize,
    pub total_occurrences: u64,
    pub first_month: Option<String>,
    pub last_month: Option<String>,
}

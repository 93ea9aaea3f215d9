//! In-memory aggregate of monthly crime counts.
//!
//! Counts are kept in a single ordered map keyed by
//! (crime type, neighbourhood, year, month). Because keys sort in that
//! order, everything belonging to one crime type or to one
//! (crime type, neighbourhood) series is a contiguous range of the map.
use crate::types::{DateRange, SeriesKey, YearMonth};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrimeData {
    occurrences: BTreeMap<SeriesKey, u64>,
}

impl CrimeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the count for the given key, creating the entry if it
    /// does not exist yet. An `amount` of 0 still creates the entry.
    pub fn increment_crime(
        &mut self,
        crime_type: &str,
        neighbourhood: &str,
        year: i32,
        month: u32,
        amount: u64,
    ) {
        let key = SeriesKey {
            crime_type: crime_type.to_string(),
            neighbourhood: neighbourhood.to_string(),
            year,
            month,
        };
        *self.occurrences.entry(key).or_insert(0) += amount;
    }

    /// Give every (crime type, neighbourhood) series already in the store an
    /// explicit entry for each month of `range`, inserting zeros where a
    /// month is missing. Existing entries are left alone and series that
    /// are not in the store are not created. Returns the number of entries
    /// inserted; a range with `start > end` inserts nothing.
    pub fn fill_gaps(&mut self, range: DateRange) -> usize {
        let mut inserted = 0usize;
        for (crime_type, neighbourhood) in self.pairs() {
            for ym in range.months() {
                let key = SeriesKey {
                    crime_type: crime_type.clone(),
                    neighbourhood: neighbourhood.clone(),
                    year: ym.year,
                    month: ym.month,
                };
                if let Entry::Vacant(slot) = self.occurrences.entry(key) {
                    slot.insert(0);
                    inserted += 1;
                }
            }
        }
        debug!(%range, inserted, "filled gaps");
        inserted
    }

    #[cfg(test)]
    pub fn get(&self, crime_type: &str, neighbourhood: &str, year: i32, month: u32) -> Option<u64> {
        let key = SeriesKey {
            crime_type: crime_type.to_string(),
            neighbourhood: neighbourhood.to_string(),
            year,
            month,
        };
        self.occurrences.get(&key).copied()
    }

    /// All leaf entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, u64)> {
        self.occurrences.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn total_occurrences(&self) -> u64 {
        self.occurrences.values().sum()
    }

    /// Distinct crime types, sorted.
    pub fn crime_types(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for key in self.occurrences.keys() {
            if out.last() != Some(&key.crime_type.as_str()) {
                out.push(&key.crime_type);
            }
        }
        out
    }

    /// Neighbourhoods that have a series for `crime_type`, sorted.
    pub fn neighbourhoods(&self, crime_type: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (key, _) in self.scan(crime_type, "") {
            if key.crime_type != crime_type {
                break;
            }
            if out.last() != Some(&key.neighbourhood.as_str()) {
                out.push(&key.neighbourhood);
            }
        }
        out
    }

    /// Distinct (crime type, neighbourhood) pairs, sorted.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Vec::new();
        for key in self.occurrences.keys() {
            let same = out
                .last()
                .is_some_and(|(c, n)| *c == key.crime_type && *n == key.neighbourhood);
            if !same {
                out.push((key.crime_type.clone(), key.neighbourhood.clone()));
            }
        }
        out
    }

    /// The monthly counts of one series in calendar order.
    pub fn series(&self, crime_type: &str, neighbourhood: &str) -> Vec<(YearMonth, u64)> {
        self.scan(crime_type, neighbourhood)
            .take_while(|(k, _)| k.crime_type == crime_type && k.neighbourhood == neighbourhood)
            .map(|(k, v)| (k.year_month(), *v))
            .collect()
    }

    /// Earliest and latest month present in the store.
    pub fn span(&self) -> Option<(YearMonth, YearMonth)> {
        let mut months = self.occurrences.keys().map(SeriesKey::year_month);
        let first = months.next()?;
        Some(months.fold((first, first), |(lo, hi), ym| (lo.min(ym), hi.max(ym))))
    }

    // Entries from the first possible key of (crime_type, neighbourhood)
    // onwards. Callers stop once the prefix no longer matches.
    fn scan<'a>(
        &'a self,
        crime_type: &str,
        neighbourhood: &str,
    ) -> impl Iterator<Item = (&'a SeriesKey, &'a u64)> {
        let lower = SeriesKey {
            crime_type: crime_type.to_string(),
            neighbourhood: neighbourhood.to_string(),
            year: i32::MIN,
            month: 0,
        };
        self.occurrences.range(lower..)
    }
}

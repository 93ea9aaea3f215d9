use crate::store::CrimeData;
use crate::types::{
    AnnualTrendRow, CrimeTypeSummaryRow, NeighbourhoodRankingRow, SummaryStats, YearMonth,
};
use crate::util::{average, format_int, format_number, median};
use std::collections::{BTreeMap, HashMap, HashSet};

pub fn generate_crime_type_summary(data: &CrimeData) -> Vec<CrimeTypeSummaryRow> {
    let mut rows: Vec<(u64, CrimeTypeSummaryRow)> = Vec::new();
    for crime_type in data.crime_types() {
        let neighbourhoods = data.neighbourhoods(crime_type);
        let mut monthly: Vec<f64> = Vec::new();
        let mut total = 0u64;
        let mut by_month: BTreeMap<YearMonth, u64> = BTreeMap::new();
        for neighbourhood in &neighbourhoods {
            for (ym, count) in data.series(crime_type, neighbourhood) {
                monthly.push(count as f64);
                total += count;
                *by_month.entry(ym).or_insert(0) += count;
            }
        }

        // earliest month wins a tie
        let mut peak: Option<(YearMonth, u64)> = None;
        for (ym, c) in &by_month {
            if peak.map_or(true, |(_, best)| *c > best) {
                peak = Some((*ym, *c));
            }
        }

        let row = CrimeTypeSummaryRow {
            crime_type: crime_type.to_string(),
            neighbourhoods: neighbourhoods.len(),
            total_occurrences: format_int(total),
            avg_monthly: format_number(average(&monthly), 2),
            median_monthly: format_number(median(monthly), 2),
            peak_month: peak
                .map(|(ym, _)| ym.to_string())
                .unwrap_or_else(|| "-".to_string()),
        };
        rows.push((total, row));
    }

    rows.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.crime_type.cmp(&b.1.crime_type)));
    rows.into_iter().map(|(_, row)| row).collect()
}

pub fn generate_neighbourhood_ranking(data: &CrimeData) -> Vec<NeighbourhoodRankingRow> {
    #[derive(Default)]
    struct Acc<'a> {
        total: u64,
        by_type: HashMap<&'a str, u64>,
    }

    let mut map: HashMap<&str, Acc> = HashMap::new();
    for (key, count) in data.iter() {
        let e = map.entry(key.neighbourhood.as_str()).or_default();
        e.total += count;
        *e.by_type.entry(key.crime_type.as_str()).or_insert(0) += count;
    }

    let mut tmp: Vec<(&str, u64, &str, u64)> = map
        .into_iter()
        .map(|(neighbourhood, acc)| {
            let (top_type, top_count) = acc
                .by_type
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
                .unwrap_or(("-", 0));
            (neighbourhood, acc.total, top_type, top_count)
        })
        .collect();
    tmp.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    tmp.into_iter()
        .take(15)
        .enumerate()
        .map(|(idx, (neighbourhood, total, top_type, top_count))| {
            let share = if total == 0 {
                0.0
            } else {
                top_count as f64 / total as f64 * 100.0
            };
            NeighbourhoodRankingRow {
                rank: idx + 1,
                neighbourhood: neighbourhood.to_string(),
                total_occurrences: format_int(total),
                top_crime_type: top_type.to_string(),
                top_share: format_number(share, 2),
            }
        })
        .collect()
}

pub fn generate_annual_trends(data: &CrimeData) -> Vec<AnnualTrendRow> {
    let mut totals: BTreeMap<(&str, i32), u64> = BTreeMap::new();
    for (key, count) in data.iter() {
        *totals.entry((key.crime_type.as_str(), key.year)).or_insert(0) += count;
    }

    let mut rows: Vec<AnnualTrendRow> = totals
        .iter()
        .map(|(&(crime_type, year), &total)| {
            let prev = year
                .checked_sub(1)
                .and_then(|prev_year| totals.get(&(crime_type, prev_year)));
            let yoy_change = match prev {
                Some(&prev) if prev > 0 => {
                    let change = (total as f64 - prev as f64) / prev as f64 * 100.0;
                    format!("{:.2}", change)
                }
                _ => "-".to_string(),
            };
            AnnualTrendRow {
                year,
                crime_type: crime_type.to_string(),
                total_occurrences: total,
                yoy_change,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| b.total_occurrences.cmp(&a.total_occurrences))
            .then_with(|| a.crime_type.cmp(&b.crime_type))
    });
    rows
}

pub fn generate_summary(data: &CrimeData) -> SummaryStats {
    let neighbourhoods: HashSet<&str> = data
        .iter()
        .map(|(k, _)| k.neighbourhood.as_str())
        .collect();
    let span = data.span();
    SummaryStats {
        total_entries: data.len(),
        total_crime_types: data.crime_types().len(),
        total_neighbourhoods: neighbourhoods.len(),
        total_series: data.pairs().len(),
        total_occurrences: data.total_occurrences(),
        first_month: span.map(|(first, _)| first.to_string()),
        last_month: span.map(|(_, last)| last.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> CrimeData {
        let mut data = CrimeData::new();
        data.increment_crime("Theft", "Kitsilano", 2003, 1, 4);
        data.increment_crime("Theft", "Kitsilano", 2003, 2, 0);
        data.increment_crime("Theft", "Strathcona", 2003, 1, 2);
        data.increment_crime("Theft", "Strathcona", 2003, 2, 6);
        data.increment_crime("Theft", "Strathcona", 2004, 1, 12);
        data.increment_crime("Mischief", "Strathcona", 2003, 1, 1);
        data.increment_crime("Mischief", "Strathcona", 2004, 1, 0);
        data
    }

    #[test]
    fn crime_type_summary_totals_and_peak() {
        let rows = generate_crime_type_summary(&fixture());
        assert_eq!(rows.len(), 2);

        let theft = &rows[0];
        assert_eq!(theft.crime_type, "Theft");
        assert_eq!(theft.neighbourhoods, 2);
        assert_eq!(theft.total_occurrences, "24");
        assert_eq!(theft.avg_monthly, "4.80");
        assert_eq!(theft.median_monthly, "4.00");
        assert_eq!(theft.peak_month, "2004-01");

        let mischief = &rows[1];
        assert_eq!(mischief.crime_type, "Mischief");
        assert_eq!(mischief.peak_month, "2003-01");
    }

    #[test]
    fn neighbourhood_ranking_orders_by_total() {
        let rows = generate_neighbourhood_ranking(&fixture());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].neighbourhood, "Strathcona");
        assert_eq!(rows[0].total_occurrences, "21");
        assert_eq!(rows[0].top_crime_type, "Theft");
        assert_eq!(rows[0].top_share, "95.24");
        assert_eq!(rows[1].neighbourhood, "Kitsilano");
        assert_eq!(rows[1].top_share, "100.00");
    }

    #[test]
    fn neighbourhood_ranking_keeps_top_fifteen() {
        let mut data = CrimeData::new();
        for i in 0..20u64 {
            data.increment_crime("Theft", &format!("N{:02}", i), 2003, 1, i + 1);
        }
        let rows = generate_neighbourhood_ranking(&data);
        assert_eq!(rows.len(), 15);
        assert_eq!(rows[0].neighbourhood, "N19");
        assert_eq!(rows[14].neighbourhood, "N05");
    }

    #[test]
    fn annual_trends_compare_against_previous_year() {
        let rows = generate_annual_trends(&fixture());
        let find = |year: i32, crime_type: &str| {
            rows.iter()
                .find(|r| r.year == year && r.crime_type == crime_type)
                .cloned()
                .unwrap()
        };

        assert_eq!(find(2003, "Theft").total_occurrences, 12);
        assert_eq!(find(2003, "Theft").yoy_change, "-");
        assert_eq!(find(2004, "Theft").yoy_change, "0.00");
        assert_eq!(find(2004, "Mischief").yoy_change, "-100.00");
        assert_eq!(rows[0].crime_type, "Theft");
        assert_eq!(rows[0].year, 2003);
    }

    #[test]
    fn annual_trends_accept_extreme_years() {
        let mut data = CrimeData::new();
        data.increment_crime("Theft", "X", i32::MIN, 1, 3);
        data.increment_crime("Theft", "X", i32::MAX, 12, 4);
        let rows = generate_annual_trends(&data);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.yoy_change == "-"));
    }

    #[test]
    fn summary_counts_distinct_keys() {
        let summary = generate_summary(&fixture());
        assert_eq!(summary.total_entries, 7);
        assert_eq!(summary.total_crime_types, 2);
        assert_eq!(summary.total_neighbourhoods, 2);
        assert_eq!(summary.total_series, 3);
        assert_eq!(summary.total_occurrences, 25);
        assert_eq!(summary.first_month.as_deref(), Some("2003-01"));
        assert_eq!(summary.last_month.as_deref(), Some("2004-01"));
    }

    #[test]
    fn summary_of_empty_store() {
        let summary = generate_summary(&CrimeData::new());
        assert_eq!(summary.total_entries, 0);
        assert_eq!(summary.first_month, None);
    }
}

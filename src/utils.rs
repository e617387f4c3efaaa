// src/utils.rs
use crate::models::Table;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

/// Longest leading decimal literal of `text` ("1.2.3" reads as 1.2)
pub fn leading_float(text: &str) -> Option<f64> {
    static LEADING_NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = LEADING_NUMBER.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").unwrap()
    });

    let literal = re.find(text)?.as_str();
    literal.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `12.3%`, or `-` when there is no value
pub fn format_percent(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}%", decimals, v),
        None => "-".to_string(),
    }
}

/// Integer part grouped by thousands: `1234567.5` -> `1,234,567.5`
pub fn format_number(value: Option<f64>) -> String {
    let Some(v) = value else {
        return "-".to_string();
    };
    let text = v.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if v < 0.0 {
        grouped.insert(0, '-');
    }
    if let Some(f) = frac_part {
        grouped.push('.');
        grouped.push_str(f);
    }
    grouped
}

/// Percentage change, undefined when the old value is 0
pub fn calc_change(old: f64, new: f64) -> Option<f64> {
    if old == 0.0 {
        return None;
    }
    Some((new - old) / old * 100.0)
}

pub fn trend_indicator(change: Option<f64>) -> String {
    match change {
        None => "-".to_string(),
        Some(c) if c > 0.0 => format!("↑ +{}", format_percent(Some(c), 1)),
        Some(c) if c < 0.0 => format!("↓ {}", format_percent(Some(c), 1)),
        Some(_) => "→ 0%".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Sort table rows by one column in place.
///
/// Cells compare numerically when both parse after dropping `,` and `%`;
/// numeric cells rank before text, text compares lexically. Rows missing
/// the cell always sort last. The sort is stable.
pub fn sort_rows(table: &mut Table, column_index: usize, direction: SortDirection) {
    let Some(column) = table.headers.get(column_index).cloned() else {
        return;
    };

    table.rows.sort_by(|a, b| {
        match (a.get(&column), b.get(&column)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => {
                let ordering = compare_cells(a.trim(), b.trim());
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            }
        }
    });
}

fn compare_cells(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| leading_float(&s.replace([',', '%'], ""));
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;

    fn table(values: &[&str]) -> Table {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, v)| -> Row {
                [("id", i.to_string()), ("value", v.to_string())]
                    .into_iter()
                    .collect()
            })
            .collect();
        Table::new(vec!["id".to_string(), "value".to_string()], rows)
    }

    fn column(table: &Table, name: &str) -> Vec<String> {
        table
            .rows
            .iter()
            .filter_map(|r| r.get(name).cloned())
            .collect()
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_percent(Some(12.345), 1), "12.3%");
        assert_eq!(format_percent(None, 1), "-");
        assert_eq!(format_number(Some(1234567.0)), "1,234,567");
        assert_eq!(format_number(Some(-1234.5)), "-1,234.5");
        assert_eq!(format_number(Some(999.0)), "999");
    }

    #[test]
    fn test_calc_change_and_indicator() {
        assert_eq!(calc_change(0.0, 5.0), None);
        assert_eq!(calc_change(200.0, 150.0), Some(-25.0));

        assert_eq!(trend_indicator(Some(12.5)), "↑ +12.5%");
        assert_eq!(trend_indicator(Some(-25.0)), "↓ -25.0%");
        assert_eq!(trend_indicator(Some(0.0)), "→ 0%");
        assert_eq!(trend_indicator(None), "-");
    }

    #[test]
    fn test_sort_rows_numeric() {
        let mut t = table(&["1,200", "35%", "9"]);

        sort_rows(&mut t, 1, SortDirection::Ascending);
        assert_eq!(column(&t, "value"), vec!["9", "35%", "1,200"]);

        sort_rows(&mut t, 1, SortDirection::Ascending.toggle());
        assert_eq!(column(&t, "value"), vec!["1,200", "35%", "9"]);
    }

    #[test]
    fn test_sort_rows_text_is_stable() {
        let mut t = table(&["b", "a", "b", "-"]);

        sort_rows(&mut t, 1, SortDirection::Ascending);

        assert_eq!(column(&t, "value"), vec!["-", "a", "b", "b"]);
        assert_eq!(column(&t, "id"), vec!["3", "1", "0", "2"]);
    }

    #[test]
    fn test_sort_rows_ragged_mixed_column() {
        let values = ["12", "b", "3.5", "a", "1,000", "-", "7%"];
        let rows: Vec<Row> = (0..21)
            .map(|i| {
                let mut row: Row = [("id", i.to_string())].into_iter().collect();
                if i % 3 != 0 {
                    row.insert("value", values[i % values.len()].to_string());
                }
                row
            })
            .collect();
        let mut t = Table::new(vec!["id".to_string(), "value".to_string()], rows);

        sort_rows(&mut t, 1, SortDirection::Ascending);

        let cells: Vec<Option<&String>> = t.rows.iter().map(|r| r.get("value")).collect();
        let first_missing = cells.iter().position(|c| c.is_none()).unwrap();
        assert_eq!(first_missing, 14);
        assert!(cells[first_missing..].iter().all(|c| c.is_none()));

        let present: Vec<&str> = cells[..first_missing]
            .iter()
            .flatten()
            .map(|s| s.as_str())
            .collect();
        let is_text = |v: &&str| leading_float(&v.replace([',', '%'], "")).is_none();
        let first_text = present.iter().position(is_text).unwrap();
        assert!(present[first_text..].iter().all(is_text));
        assert_eq!(present[0], "3.5");
        assert_eq!(present[first_text - 1], "1,000");

        sort_rows(&mut t, 1, SortDirection::Descending);
        assert!(t.rows[14..].iter().all(|r| r.get("value").is_none()));
    }

    #[test]
    fn test_leading_float_prefix() {
        assert_eq!(leading_float("1.2.3"), Some(1.2));
        assert_eq!(leading_float("2e3x"), Some(2000.0));
        assert_eq!(leading_float("-"), None);
        assert_eq!(leading_float("abc"), None);
    }

    #[test]
    fn test_sort_rows_out_of_range_column_is_noop() {
        let mut t = table(&["b", "a"]);
        sort_rows(&mut t, 5, SortDirection::Descending);
        assert_eq!(column(&t, "value"), vec!["b", "a"]);
    }
}

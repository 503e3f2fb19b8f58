//! The derivation stages of a view: filter, sort and paginate.
//!
//! Stages work on row indices into the raw dataset so that no record is copied
//! while the view is derived. Each function is pure and never fails.

use std::cmp::Ordering;

use crate::domain::SortDirection;
use crate::record::{Record, Value};

/// One page worth of rows plus the page count of the whole sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub rows: Vec<usize>,
    pub total_pages: usize,
}

/// Text a record is searched in: all values space joined, in field order, lowercased.
pub fn haystack(record: &Record) -> String {
    record
        .values()
        .map(Value::to_string)
        .collect::<Vec<String>>()
        .join(" ")
        .to_lowercase()
}

/// Indices of all records whose haystack contains `term`, case-insensitive.
pub fn filter_rows(records: &[Record], term: &str) -> Vec<usize> {
    if term.is_empty() {
        return (0..records.len()).collect();
    }
    let needle = term.to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| haystack(record).contains(&needle))
        .map(|(idx, _)| idx)
        .collect()
}

// Orders values of different kinds: absent/null < bool < number < string
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) => 1,
        Some(Value::Int(_)) | Some(Value::Float(_)) => 2,
        Some(Value::Str(_)) => 3,
    }
}

// -0.0 equals 0.0, NaNs go to the end matching their sign.
fn compare_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b))
}

// Exact, without rounding `i` to the nearest f64.
fn compare_int_float(i: i64, f: f64) -> Ordering {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        return if f.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if f >= TWO_POW_63 {
        return Ordering::Less;
    }
    if f < -TWO_POW_63 {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    i.cmp(&(whole as i64)).then_with(|| compare_floats(0.0, f - whole))
}

/// Native ordering of two cells, without coercing between kinds.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Int(a)), Some(Value::Int(b))) => a.cmp(b),
        (Some(Value::Int(a)), Some(Value::Float(b))) => compare_int_float(*a, *b),
        (Some(Value::Float(a)), Some(Value::Int(b))) => compare_int_float(*b, *a).reverse(),
        (Some(Value::Float(a)), Some(Value::Float(b))) => compare_floats(*a, *b),
        (Some(Value::Str(a)), Some(Value::Str(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (a, b) => type_rank(a).cmp(&type_rank(b)),
    }
}

/// `rows` ordered by `column`. An empty column keeps the given order.
///
/// Rows with equal keys end up in an unspecified relative order.
pub fn sort_rows(
    records: &[Record],
    rows: &[usize],
    column: &str,
    direction: SortDirection,
) -> Vec<usize> {
    let mut sorted = rows.to_vec();
    if column.is_empty() {
        return sorted;
    }
    sorted.sort_unstable_by(|&a, &b| {
        let ord = compare_values(records[a].get(column), records[b].get(column));
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    sorted
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size)
}

/// Slice out page `page` (1 based). Pages out of range give an empty slice.
pub fn paginate(rows: &[usize], page: i64, page_size: usize) -> Page {
    let total_pages = total_pages(rows.len(), page_size);
    let start = page
        .checked_sub(1)
        .and_then(|p| usize::try_from(p).ok())
        .and_then(|p| p.checked_mul(page_size));
    let rows = match start {
        Some(start) if start < rows.len() => {
            let end = std::cmp::min(start + page_size, rows.len());
            rows[start..end].to_vec()
        }
        _ => Vec::new(),
    };
    Page { rows, total_pages }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Vec<Record> {
        vec![
            Record::new().with("id", 1).with("name", "Amit").with("age", 31),
            Record::new().with("id", 2).with("name", "sara").with("age", 27.5),
            Record::new().with("id", 3).with("name", "John").with("age", Value::Null),
            Record::new().with("id", 4).with("name", "Nina"),
        ]
    }

    #[test]
    fn haystack_joins_in_field_order() {
        let r = Record::new().with("id", 7).with("name", "Zara").with("x", Value::Null);
        assert_eq!(haystack(&r), "7 zara ");
    }

    #[test]
    fn empty_term_keeps_everything() {
        assert_eq!(filter_rows(&people(), ""), vec![0, 1, 2, 3]);
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let rows = filter_rows(&people(), "SAR");
        assert_eq!(rows, vec![1]);
        let rows = filter_rows(&people(), "in");
        assert_eq!(rows, vec![3]);
        assert!(filter_rows(&people(), "zzz").is_empty());
    }

    #[test]
    fn filter_matches_across_field_boundaries() {
        // "2 sara" only exists in the joined text
        assert_eq!(filter_rows(&people(), "2 sa"), vec![1]);
    }

    #[test]
    fn compare_is_type_sensitive() {
        let one = Value::Int(1);
        let half = Value::Float(0.5);
        let text = Value::from("1");
        assert_eq!(compare_values(Some(&half), Some(&one)), Ordering::Less);
        assert_eq!(compare_values(Some(&one), Some(&text)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&one)), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
        assert_eq!(
            compare_values(Some(&Value::from("B")), Some(&Value::from("a"))),
            Ordering::Less
        );
    }

    #[test]
    fn mixed_int_and_float_compare_exactly() {
        let big = 1i64 << 53;
        let cmp = |a: Value, b: Value| compare_values(Some(&a), Some(&b));
        assert_eq!(cmp(Value::Int(big + 1), Value::Float(big as f64)), Ordering::Greater);
        assert_eq!(cmp(Value::Float(big as f64), Value::Int(big)), Ordering::Equal);
        assert_eq!(cmp(Value::Float(big as f64), Value::Int(big + 1)), Ordering::Less);
        assert_eq!(cmp(Value::Int(0), Value::Float(0.5)), Ordering::Less);
        assert_eq!(cmp(Value::Int(-1), Value::Float(-0.5)), Ordering::Less);
        assert_eq!(cmp(Value::Int(0), Value::Float(-0.0)), Ordering::Equal);
        assert_eq!(cmp(Value::Float(-0.0), Value::Float(0.0)), Ordering::Equal);
        assert_eq!(cmp(Value::Int(i64::MAX), Value::Float(f64::INFINITY)), Ordering::Less);
        assert_eq!(cmp(Value::Int(i64::MIN), Value::Float(-1e19)), Ordering::Greater);
        assert_eq!(cmp(Value::Int(i64::MAX), Value::Float(f64::NAN)), Ordering::Less);
    }

    #[test]
    fn sort_mixed_numbers_above_float_precision() {
        let big = 1i64 << 53;
        let records = vec![
            Record::new().with("n", big + 1),
            Record::new().with("n", big as f64),
            Record::new().with("n", big - 1),
            Record::new().with("n", (big + 2) as f64),
        ];
        let sorted = sort_rows(&records, &[0, 1, 2, 3], "n", SortDirection::Ascending);
        assert_eq!(sorted, vec![2, 1, 0, 3]);
    }

    #[test]
    fn sort_without_column_is_passthrough() {
        let records = people();
        assert_eq!(
            sort_rows(&records, &[3, 0, 2], "", SortDirection::Descending),
            vec![3, 0, 2]
        );
    }

    #[test]
    fn sort_by_number_and_direction() {
        let records = people();
        let rows = vec![0, 1, 2, 3];
        // missing and null ages sort first, their mutual order is unspecified
        let asc = sort_rows(&records, &rows, "age", SortDirection::Ascending);
        assert_eq!(&asc[2..], &[1, 0]);
        let desc = sort_rows(&records, &rows, "age", SortDirection::Descending);
        assert_eq!(&desc[..2], &[0, 1]);
    }

    #[test]
    fn sort_does_not_touch_input() {
        let records = people();
        let rows = vec![3, 2, 1, 0];
        let sorted = sort_rows(&records, &rows, "id", SortDirection::Ascending);
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        assert_eq!(rows, vec![3, 2, 1, 0]);
    }

    #[test]
    fn page_count() {
        assert_eq!(total_pages(0, 5), 0);
        assert_eq!(total_pages(5, 5), 1);
        assert_eq!(total_pages(6, 5), 2);
    }

    #[test]
    fn pages_slice_without_clamping() {
        let rows: Vec<usize> = (0..6).collect();
        assert_eq!(paginate(&rows, 1, 5).rows, vec![0, 1, 2, 3, 4]);
        assert_eq!(paginate(&rows, 2, 5).rows, vec![5]);
        let past_end = paginate(&rows, 3, 5);
        assert!(past_end.rows.is_empty());
        assert_eq!(past_end.total_pages, 2);
        assert!(paginate(&rows, 0, 5).rows.is_empty());
        assert!(paginate(&rows, -4, 5).rows.is_empty());
        assert!(paginate(&rows, i64::MAX, 5).rows.is_empty());
        assert!(paginate(&rows, i64::MIN, 5).rows.is_empty());
    }

    #[test]
    fn empty_sequence_has_no_pages() {
        let page = paginate(&[], 1, 5);
        assert_eq!(page, Page { rows: vec![], total_pages: 0 });
    }
}

//! Genomic location filtering
//!
//! An adapter may be bounded to a region (`chr`, `start`, `end`, each
//! optional). Rows carrying coordinates are tested against that bound by a
//! [`LocationPredicate`].

use crate::adapter::reader::Row;
use crate::adapter::transform::RecordError;
use crate::graph::PropertyValue;

/// Strip every `chr`/`ch` marker: `chr1` → `1`, `chrX` → `X`.
pub fn normalize_chromosome(chr: &str) -> String {
    chr.replace("chr", "").replace("ch", "")
}

/// Region an adapter is bounded to. All parts optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenomicRegion {
    pub chr: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl GenomicRegion {
    pub fn new(chr: Option<&str>, start: Option<i64>, end: Option<i64>) -> Self {
        Self {
            chr: chr.map(normalize_chromosome).filter(|c| !c.is_empty()),
            start,
            end,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.chr.is_none() && self.start.is_none() && self.end.is_none()
    }
}

/// Coordinates of one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub chr: String,
    pub start: i64,
    pub end: i64,
}

/// Decides whether a locus falls inside a bound.
pub trait LocationPredicate {
    fn contains(&self, bound: &GenomicRegion, locus: &Locus) -> bool;
}

/// Default predicate: the locus must lie entirely within the bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct Containment;

impl LocationPredicate for Containment {
    fn contains(&self, bound: &GenomicRegion, locus: &Locus) -> bool {
        if bound.is_unbounded() {
            return true;
        }
        if let Some(chr) = &bound.chr {
            if normalize_chromosome(&locus.chr) != *chr {
                return false;
            }
        }
        if let Some(start) = bound.start {
            if locus.start < start {
                return false;
            }
        }
        if let Some(end) = bound.end {
            if locus.end > end {
                return false;
            }
        }
        true
    }
}

fn parse_coordinate(column: &str, value: &PropertyValue) -> Result<i64, RecordError> {
    let parsed = match value {
        PropertyValue::Int(n) => Some(*n),
        PropertyValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        PropertyValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| RecordError::Coordinate {
        column: column.to_string(),
        value: value.to_string(),
    })
}

/// Build the locus of a row.
///
/// `Ok(None)` when no chromosome column is configured or the row lacks it.
/// A missing start defaults to 0, a missing end to the start.
pub fn locus_from_row(
    row: &Row,
    chr_column: Option<&str>,
    start_column: Option<&str>,
    end_column: Option<&str>,
) -> Result<Option<Locus>, RecordError> {
    let Some(chr) = chr_column.and_then(|column| row.get(column)) else {
        return Ok(None);
    };

    let start = match start_column.and_then(|column| row.get(column).map(|v| (column, v))) {
        Some((column, value)) => parse_coordinate(column, value)?,
        None => 0,
    };
    let end = match end_column.and_then(|column| row.get(column).map(|v| (column, v))) {
        Some((column, value)) => parse_coordinate(column, value)?,
        None => start,
    };

    Ok(Some(Locus {
        chr: normalize_chromosome(&chr.to_string()),
        start,
        end,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locus(chr: &str, start: i64, end: i64) -> Locus {
        Locus {
            chr: chr.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn unbounded_region_passes_everything() {
        let bound = GenomicRegion::default();
        assert!(Containment.contains(&bound, &locus("7", 1, 2)));
    }

    #[test]
    fn chromosome_must_match() {
        let bound = GenomicRegion::new(Some("chr13"), None, None);
        assert_eq!(bound.chr.as_deref(), Some("13"));
        assert!(Containment.contains(&bound, &locus("13", 5, 10)));
        assert!(Containment.contains(&bound, &locus("chr13", 5, 10)));
        assert!(!Containment.contains(&bound, &locus("1", 5, 10)));
    }

    #[test]
    fn locus_must_lie_inside_bounds() {
        let bound = GenomicRegion::new(Some("1"), Some(100), Some(200));
        assert!(Containment.contains(&bound, &locus("1", 100, 200)));
        assert!(!Containment.contains(&bound, &locus("1", 99, 150)));
        assert!(!Containment.contains(&bound, &locus("1", 150, 201)));

        let open_end = GenomicRegion::new(None, Some(100), None);
        assert!(Containment.contains(&open_end, &locus("X", 1000, 5000)));
    }

    #[test]
    fn locus_from_row_applies_defaults() {
        let mut row = Row::new();
        row.insert("seqname".into(), "chr2".into());
        row.insert("start".into(), "150".into());

        let l = locus_from_row(&row, Some("seqname"), Some("start"), Some("end"))
            .unwrap()
            .unwrap();
        assert_eq!(l, locus("2", 150, 150));

        assert!(locus_from_row(&row, None, Some("start"), None).unwrap().is_none());
        assert!(locus_from_row(&row, Some("chrom"), None, None).unwrap().is_none());
    }

    #[test]
    fn unparsable_coordinate_is_an_error() {
        let mut row = Row::new();
        row.insert("chr".into(), "1".into());
        row.insert("start".into(), "abc".into());
        assert!(matches!(
            locus_from_row(&row, Some("chr"), Some("start"), None),
            Err(RecordError::Coordinate { .. })
        ));
    }
}

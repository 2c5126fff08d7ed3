//! Identifier normalization
//!
//! Two families of helpers live here:
//!
//! - adapter side: [`format_curie`] turns raw source identifiers into CURIEs
//!   (`PREFIX:local_id`), optionally stripping Ensembl-style version suffixes;
//! - writer side: [`normalize_id`], [`normalize_curie`] and
//!   [`normalize_label`] produce the keys sinks store, and [`ontology_of`]
//!   derives an ontology name from a normalized id.

/// Ordered prefix table used when no explicit prefix is configured.
///
/// The first entry whose pattern starts the id wins, so longer or more
/// specific patterns must come before shorter overlapping ones.
pub const ID_PREFIXES: &[(&str, &str)] = &[
    ("ENSG", "ENSEMBL"),
    ("ENST", "ENSEMBL"),
    ("ENSP", "ENSEMBL"),
    ("ENSR", "ENSEMBL"),
    ("ENSE", "ENSEMBL"),
    ("rs", "DBSNP"),
    ("UP", "UniProtKB"),
    ("UBERON", "UBERON"),
    ("GO", "GO"),
    ("R-", "REACT"),
    ("FB", "FLYBASE"),
    ("DOID", "DOID"),
    ("HP", "HP"),
    ("CHEBI", "CHEBI"),
    ("SO", "SO"),
    ("CL", "CL"),
    ("EFO", "EFO"),
    ("MI", "MI"),
];

/// Values that stand for "no identifier" and are never formatted.
pub fn is_sentinel(id: &str) -> bool {
    matches!(id, "" | "NA" | "N/A")
}

/// Remove a trailing `.digits` version (`ENSG00000123456.1` → `ENSG00000123456`).
pub fn strip_version(id: &str) -> &str {
    match id.rsplit_once('.') {
        Some((base, version)) if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) => base,
        _ => id,
    }
}

/// Format an identifier as a CURIE.
///
/// Ids that already contain `:` are returned as they are (after the optional
/// version strip). Ids that match no known prefix come back unchanged; no
/// prefix is ever invented.
pub fn format_curie(id: &str, explicit_prefix: Option<&str>, strip: bool) -> String {
    if is_sentinel(id) {
        return id.to_string();
    }

    let id = if strip { strip_version(id) } else { id };

    if id.contains(':') {
        return id.to_string();
    }

    if let Some(prefix) = explicit_prefix.filter(|p| !p.is_empty()) {
        return format!("{}:{}", prefix, id);
    }

    ID_PREFIXES
        .iter()
        .find(|(pattern, _)| id.starts_with(pattern))
        .map(|(_, prefix)| format!("{}:{}", prefix, id))
        .unwrap_or_else(|| id.to_string())
}

/// Document-store id style: lowercase, trimmed, `' '` and `':'` become `_`.
pub fn normalize_id(id: &str) -> String {
    id.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == ':' { '_' } else { c })
        .collect()
}

/// CURIE-preserving id style used by the symbolic sink.
///
/// The prefix is upper-cased, the local part lowercased with spaces turned
/// into `_`, and a repeated `prefix_` at the start of the local part dropped
/// (`GO:go_0001234` → `GO:0001234`). URLs are kept verbatim. Ids without `:`
/// fall back to [`normalize_id`].
pub fn normalize_curie(id: &str) -> String {
    if is_url(id) {
        return id.trim().to_string();
    }
    match id.split_once(':') {
        Some((prefix, local)) => {
            let prefix = prefix.trim().to_uppercase();
            let local = local.to_lowercase();
            let duplicated = format!("{}_", prefix.to_lowercase());
            let local = local.replace(&duplicated, "");
            let local = local.trim().replace(' ', "_");
            format!("{}:{}", prefix, local)
        }
        None => normalize_id(id),
    }
}

/// `http://` or `https://` link
pub fn is_url(value: &str) -> bool {
    let value = value.trim_start();
    value.starts_with("http://") || value.starts_with("https://")
}

/// Schema label style: lowercase with spaces turned into `_`.
pub fn normalize_label(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}

/// Derive the ontology a term id belongs to from its first `_` segment.
///
/// `GO:0001234` → `go`, `UBERON_0002107` → `uberon`. This is a naming
/// heuristic: ontologies whose local ids themselves start with `_`-separated
/// words, or ids without any prefix, will not resolve meaningfully.
pub fn ontology_of(id: &str) -> String {
    let normalized = normalize_id(id);
    normalized
        .split('_')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_are_returned_unchanged() {
        for id in ["BRCA2", "12345", "xyz_1", "P04637"] {
            assert_eq!(format_curie(id, None, false), id);
            assert_eq!(format_curie(id, None, true), id);
        }
    }

    #[test]
    fn strips_version_and_adds_prefix() {
        assert_eq!(format_curie("ENSG00000123.4", None, true), "ENSEMBL:ENSG00000123");
        assert_eq!(format_curie("ENSG00000123.4", None, false), "ENSEMBL:ENSG00000123.4");
    }

    #[test]
    fn existing_curies_are_untouched() {
        assert_eq!(format_curie("GO:0001234", None, true), "GO:0001234");
        assert_eq!(format_curie("GO:0001234", Some("XX"), true), "GO:0001234");
        let once = format_curie("ENSG00000139618.3", None, true);
        assert_eq!(format_curie(&once, None, true), once);
    }

    #[test]
    fn explicit_prefix_wins_over_table() {
        assert_eq!(format_curie("ENSG1", Some("MYDB"), true), "MYDB:ENSG1");
        assert_eq!(format_curie("1234", Some("NCBIGene"), true), "NCBIGene:1234");
    }

    #[test]
    fn prefix_table_is_case_sensitive_and_ordered() {
        assert_eq!(format_curie("rs12345", None, true), "DBSNP:rs12345");
        assert_eq!(format_curie("RS12345", None, true), "RS12345");
        assert_eq!(format_curie("R-HSA-123", None, false), "REACT:R-HSA-123");
        assert_eq!(format_curie("UBERON_0002107", None, true), "UBERON:UBERON_0002107");
    }

    #[test]
    fn sentinels_pass_through() {
        for id in ["", "NA", "N/A"] {
            assert_eq!(format_curie(id, Some("X"), true), id);
        }
    }

    #[test]
    fn strip_version_requires_digits() {
        assert_eq!(strip_version("ENSG1.12"), "ENSG1");
        assert_eq!(strip_version("ENSG1."), "ENSG1.");
        assert_eq!(strip_version("file.txt"), "file.txt");
        assert_eq!(strip_version("ENSG1_PAR_Y"), "ENSG1_PAR_Y");
    }

    #[test]
    fn normalize_id_lowercases_and_replaces_separators() {
        assert_eq!(normalize_id(" ENSEMBL:ENSG1 "), "ensembl_ensg1");
        assert_eq!(normalize_id("cell line"), "cell_line");
    }

    #[test]
    fn normalize_curie_keeps_prefix() {
        assert_eq!(normalize_curie("ensembl:ENSG1"), "ENSEMBL:ensg1");
        assert_eq!(normalize_curie("GO:GO_0001234"), "GO:0001234");
        assert_eq!(normalize_curie("plain id"), "plain_id");
    }

    #[test]
    fn normalize_curie_keeps_urls() {
        let url = "http://example.com/path:with:colons";
        assert_eq!(normalize_curie(url), url);
        assert!(is_url(" https://example.org"));
        assert!(!is_url("GO:0001234"));
    }

    #[test]
    fn ontology_of_uses_first_segment() {
        assert_eq!(ontology_of("GO:0001234"), "go");
        assert_eq!(ontology_of("UBERON_0002107"), "uberon");
        assert_eq!(ontology_of("CL:0000540"), "cl");
    }

    #[test]
    fn normalize_label_replaces_spaces() {
        assert_eq!(normalize_label("Transcribed To"), "transcribed_to");
    }
}

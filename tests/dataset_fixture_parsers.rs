#[path = "../src/dataset.rs"]
mod dataset;
#[path = "../src/resolver.rs"]
mod resolver;

use dataset::{DatasetSource, MissingSourcePolicy, TextEncoding};
use std::path::PathBuf;

fn fixture_path(rel: &str) -> PathBuf {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    base.join(rel)
}

fn load_fixture(rel: &str) -> dataset::LoadedTable {
    dataset::load(&DatasetSource {
        path: fixture_path(rel),
        missing: MissingSourcePolicy::Fail,
    })
    .unwrap_or_else(|e| panic!("load {}: {}", rel, e))
}

#[test]
fn every_row_is_found_at_its_own_rank() {
    let loaded = load_fixture("fixtures/results/g12_results.csv");
    let roles = resolver::resolve_roles(loaded.table.columns());
    let id_col = roles.identifier.as_ref().expect("identifier").index;

    let mut seen = std::collections::HashSet::new();
    for (pos, row) in loaded.table.rows().enumerate() {
        let id = row[id_col].to_uppercase();
        // Later duplicates resolve to the first occurrence.
        if !seen.insert(id.clone()) {
            continue;
        }
        let rec = resolver::find(&loaded.table, &roles, &id).expect("row found");
        assert_eq!(rec.rank, pos + 1, "rank for {}", id);
    }
    assert_eq!(seen.len(), 6);
}

#[test]
fn semicolon_file_without_status_column() {
    let loaded = load_fixture("fixtures/results/semicolon_no_status.csv");
    assert_eq!(loaded.provenance.delimiter, Some(b';'));
    assert_eq!(loaded.table.len(), 4);

    let roles = resolver::resolve_roles(loaded.table.columns());
    assert_eq!(roles.identifier.as_ref().unwrap().name, "Seat No");
    assert_eq!(roles.display_name.as_ref().unwrap().name, "Student Name");
    assert_eq!(roles.score.as_ref().unwrap().name, "Total Degree");
    assert!(roles.status.is_none());

    let status = |seat: &str| {
        resolver::find(&loaded.table, &roles, seat)
            .expect("found")
            .status
            .as_str()
            .to_string()
    };
    assert_eq!(status("s-1"), "PASS");
    assert_eq!(status("S-2"), "FAIL");
    assert_eq!(status("S-3"), "FAIL");
    assert_eq!(status("S-4"), "PASS");

    // The blank line is skipped, so S-3 sits at rank 3.
    assert_eq!(resolver::find(&loaded.table, &roles, "S-3").unwrap().rank, 3);
}

#[test]
fn cp1256_file_decodes_arabic_headers() {
    let loaded = load_fixture("fixtures/results/cp1256_results.csv");
    assert_eq!(loaded.provenance.encoding, Some(TextEncoding::Windows1256));
    assert_eq!(loaded.table.columns()[0], "رقم الجلوس");

    let roles = resolver::resolve_roles(loaded.table.columns());
    let rec = resolver::find(&loaded.table, &roles, "1001").expect("found");
    assert_eq!(rec.name, "سارة");
    assert_eq!(rec.status, resolver::Status::Pass);
}

#[test]
fn ragged_file_fails_without_partial_table() {
    let err = dataset::load(&DatasetSource {
        path: fixture_path("fixtures/results/ragged.csv"),
        missing: MissingSourcePolicy::Sample,
    })
    .expect_err("ragged rows");
    assert!(matches!(err, dataset::LoadError::Parse { .. }));
}

#[test]
fn delimiter_only_lines_do_not_count_toward_rank() {
    let decoded = dataset::decode_table(b"seat,name\n,\nA2,x\n").expect("decode");
    assert_eq!(decoded.table.len(), 1);

    let roles = resolver::resolve_roles(decoded.table.columns());
    assert_eq!(resolver::find(&decoded.table, &roles, "A2").unwrap().rank, 1);
}

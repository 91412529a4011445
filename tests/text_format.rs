//! Reading and writing the CSR text format, including malformed fixtures

use std::path::PathBuf;

use csrmul::{
    distributed_spgemm, format_csr, local_spgemm, parse_csr, read_csr_file, write_csr_file,
    CsrMatrix, DistributedConfig, Error, FormatWarning, KernelConfig,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_read_well_formed_fixture() {
    let parsed = read_csr_file::<i64, _>(fixture("a_2x2.txt"), 2, 2).unwrap();

    assert!(parsed.warnings.is_empty());
    assert_eq!(
        parsed.matrix,
        CsrMatrix::new(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![1, 2, 3])
    );
}

#[test]
fn test_fixture_product_matches_concrete_example() {
    let a = read_csr_file::<i64, _>(fixture("a_2x2.txt"), 2, 2).unwrap().matrix;
    let b = read_csr_file::<i64, _>(fixture("identity_2x2.txt"), 2, 2).unwrap().matrix;

    let product = distributed_spgemm(&a, &b, &DistributedConfig::with_workers(2)).unwrap();
    assert_eq!(format_csr(&product.matrix), "Values: 1 2 3\nColumn_Indices: 0 1 1\nRow_Pointers: 0 2 3\n");
}

#[test]
fn test_labels_in_any_order_and_unknown_lines() {
    let parsed = read_csr_file::<i64, _>(fixture("reordered_labels_3x3.txt"), 3, 3).unwrap();

    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.matrix.row_ptr, vec![0, 0, 1, 1]);
    assert_eq!(parsed.matrix.col_idx, vec![2]);
    assert_eq!(parsed.matrix.values, vec![9]);
}

/// Three declared rows but only three row pointers: the file loads with a
/// warning and the multiplication then fails its bounds check on row 2
#[test]
fn test_truncated_row_pointers_fail_bounds_check() {
    let parsed = read_csr_file::<i64, _>(fixture("truncated_row_pointers_3x3.txt"), 3, 3).unwrap();
    assert_eq!(
        parsed.warnings,
        vec![FormatWarning::RowPointerCount { expected: 4, found: 3 }]
    );

    let a = parsed.matrix;
    let b = CsrMatrix::identity(3);

    match local_spgemm(&a, &b, &KernelConfig::default()) {
        Err(Error::Structure { matrix, reason }) => {
            assert_eq!(matrix, "A");
            assert_eq!(reason, "row pointer index out of bounds at row 2");
        }
        other => panic!("expected a structural error, got {:?}", other),
    }

    for workers in [1, 2, 3, 5] {
        let result = distributed_spgemm(&a, &b, &DistributedConfig::with_workers(workers));
        assert!(
            matches!(result, Err(Error::Structure { matrix: "A", .. })),
            "{} workers",
            workers
        );
    }
}

/// Surplus trailing row pointers are ignored: only the first `rows + 1` are read
#[test]
fn test_surplus_row_pointers_use_declared_rows() {
    let parsed = read_csr_file::<i64, _>(fixture("surplus_row_pointers_2x2.txt"), 2, 2).unwrap();
    assert_eq!(
        parsed.warnings,
        vec![FormatWarning::RowPointerCount { expected: 3, found: 5 }]
    );

    let b = CsrMatrix::identity(2);
    for workers in 1..=4 {
        let product = distributed_spgemm(&parsed.matrix, &b, &DistributedConfig::with_workers(workers)).unwrap();
        assert_eq!(product.matrix.row_ptr, vec![0, 2, 3]);
        assert_eq!(product.matrix.col_idx, vec![0, 1, 1]);
        assert_eq!(product.matrix.values, vec![1, 2, 3]);
    }
}

#[test]
fn test_entry_count_mismatch_is_a_warning() {
    let parsed = parse_csr::<i64>("Values: 1 2\nColumn_Indices: 0\nRow_Pointers: 0 1\n", 1, 2).unwrap();
    assert_eq!(
        parsed.warnings,
        vec![FormatWarning::EntryCountMismatch { values: 2, col_indices: 1 }]
    );
}

#[test]
fn test_values_and_columns_may_be_omitted() {
    let parsed = parse_csr::<i64>("Row_Pointers: 0 0 0\n", 2, 4).unwrap();

    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.matrix, CsrMatrix::zeros(2, 4));
}

#[test]
fn test_repeated_label_appends() {
    let text = "Values: 1 2\nValues: 3\nColumn_Indices: 0 1 1\nRow_Pointers: 0 2\nRow_Pointers: 3\n";
    let parsed = parse_csr::<i64>(text, 2, 2).unwrap();

    assert_eq!(parsed.matrix.values, vec![1, 2, 3]);
    assert_eq!(parsed.matrix.row_ptr, vec![0, 2, 3]);
}

#[test]
fn test_missing_row_pointers_is_fatal() {
    let missing = parse_csr::<i64>("Values: 1\nColumn_Indices: 0\n", 1, 1);
    assert!(matches!(missing, Err(Error::Format { .. })));

    let empty = parse_csr::<i64>("Values: 1\nColumn_Indices: 0\nRow_Pointers:\n", 1, 1);
    assert!(matches!(empty, Err(Error::Format { .. })));
}

#[test]
fn test_bad_token_reports_line() {
    let result = parse_csr::<i64>("Values: 1\nColumn_Indices: 0\nRow_Pointers: 0 x\n", 1, 1);

    match result {
        Err(Error::Format { reason }) => assert_eq!(reason, "line 3: invalid row pointer 'x'"),
        other => panic!("expected a format error, got {:?}", other.map(|p| p.matrix)),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let path = fixture("does_not_exist.txt");
    match read_csr_file::<i64, _>(&path, 1, 1) {
        Err(Error::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected an I/O error, got {:?}", other.map(|p| p.matrix)),
    }
}

#[test]
fn test_write_then_read_file() {
    let matrix = CsrMatrix::new(3, 4, vec![0, 1, 1, 3], vec![3, 0, 2], vec![-7i64, 5, 11]);
    let path = std::env::temp_dir().join(format!("csrmul_text_format_{}.txt", std::process::id()));

    write_csr_file(&path, &matrix).unwrap();
    let parsed = read_csr_file::<i64, _>(&path, 3, 4).unwrap();
    let _ = std::fs::remove_file(&path);

    assert!(parsed.warnings.is_empty());
    assert_eq!(parsed.matrix, matrix);
}

#[test]
fn test_format_empty_matrix() {
    let empty = CsrMatrix::<i64>::zeros(0, 2);
    assert_eq!(format_csr(&empty), "Values:\nColumn_Indices:\nRow_Pointers: 0\n");
}

//! Tests for corpus discovery and filtering.

use std::fs;

use vesper_harness::corpus::load_corpus;
use vesper_harness::HarnessError;

fn corpus_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

#[test]
fn discovery_is_name_sorted_and_extension_filtered() {
    let dir = corpus_dir(&[
        ("zeta.ves", "let main = 0;"),
        ("alpha.ves", "let main = 1;"),
        ("notes.txt", "not a test"),
    ]);

    let files = load_corpus(dir.path(), None).unwrap();
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["alpha.ves", "zeta.ves"]);
    for file in &files {
        assert_eq!(file.hash.len(), 64);
        assert!(!file.source.is_empty());
    }
}

#[test]
fn discovery_recurses_into_subdirectories() {
    let dir = corpus_dir(&[("top.ves", "let main = 0;")]);
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/inner.ves"), "let main = 2;").unwrap();

    let files = load_corpus(dir.path(), None).unwrap();
    let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["inner.ves", "top.ves"]);
}

#[test]
fn substring_filter_selects_matches() {
    let dir = corpus_dir(&[
        ("arith_add.ves", ""),
        ("arith_mul.ves", ""),
        ("strings.ves", ""),
    ]);

    let files = load_corpus(dir.path(), Some("arith")).unwrap();
    assert_eq!(files.len(), 2);

    let files = load_corpus(dir.path(), Some("^strings")).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "strings.ves");
}

#[test]
fn unmatched_filter_aborts() {
    let dir = corpus_dir(&[("arith_add.ves", "")]);
    let err = load_corpus(dir.path(), Some("zzz")).unwrap_err();
    assert!(matches!(err, HarnessError::FilterUnmatched { filter } if filter == "zzz"));
}

#[test]
fn empty_corpus_aborts() {
    let dir = corpus_dir(&[]);
    let err = load_corpus(dir.path(), None).unwrap_err();
    assert!(matches!(err, HarnessError::EmptyCorpus { .. }));
}

#[test]
fn identical_content_hashes_identically() {
    let dir = corpus_dir(&[("a.ves", "let main = 0;"), ("b.ves", "let main = 0;")]);
    let files = load_corpus(dir.path(), None).unwrap();
    assert_eq!(files[0].hash, files[1].hash);
}

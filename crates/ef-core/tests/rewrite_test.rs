use std::fs;

use ef_core::rewrite::{apply_edits, commit_file, content_hash, TextEdit};
use ef_core::EfError;

#[test]
fn insertions_at_one_offset_keep_their_order() {
    let original = "<li>{item}</li>";
    let edits = vec![
        TextEdit::insert(3, " data-testid=\"list-item\""),
        TextEdit::insert(3, " key={item}"),
        TextEdit::insert(3, " data-testid=\"list-item\""),
    ];

    let patched = apply_edits(original, &edits).unwrap();

    assert_eq!(patched, "<li data-testid=\"list-item\" key={item}>{item}</li>");
}

#[test]
fn overlapping_and_out_of_range_edits_are_rejected() {
    let original = "<a href=\"/\">Home</a>";
    let overlapping = vec![TextEdit::replace(2, 10, "x"), TextEdit::replace(5, 12, "y")];
    assert!(matches!(
        apply_edits(original, &overlapping),
        Err(EfError::OverlappingEdits { offset: 5 })
    ));

    let outside = vec![TextEdit::insert(original.len() + 1, "z")];
    assert!(matches!(
        apply_edits(original, &outside),
        Err(EfError::EditOutOfBounds { .. })
    ));
}

#[test]
fn commit_replaces_only_unchanged_files() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("Save.tsx");
    let original = "export const Save = () => <button>Save</button>;\n";
    fs::write(&path, original).unwrap();
    let hash = content_hash(original);

    let patched = apply_edits(original, &[TextEdit::insert(33, " data-testid=\"save-button\"")]).unwrap();
    commit_file(&path, &hash, &patched).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), patched);

    let err = commit_file(&path, &hash, "export const Save = () => null;\n").unwrap_err();
    assert!(matches!(err, EfError::WriteConflict { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), patched);
    assert_eq!(fs::read_dir(tmp_dir.path()).unwrap().count(), 1);
}

#[cfg(unix)]
#[test]
fn commit_keeps_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("Toolbar.tsx");
    let original = "export const Toolbar = () => <nav />;\n";
    fs::write(&path, original).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

    commit_file(&path, &content_hash(original), "export const Toolbar = () => <nav data-testid=\"toolbar\" />;\n").unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o640);
}

#[test]
fn unreadable_target_is_an_io_error() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("Gone.tsx");

    let err = commit_file(&path, &content_hash(""), "export {};\n").unwrap_err();
    assert!(matches!(err, EfError::Io(_)));
    assert_eq!(fs::read_dir(tmp_dir.path()).unwrap().count(), 0);
}

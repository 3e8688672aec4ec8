use std::fs;
use std::path::Path;

pub fn setup_test_dir(test_dir: &str) {
    if Path::new(test_dir).exists() {
        fs::remove_dir_all(test_dir).unwrap();
    }
    fs::create_dir_all(test_dir).unwrap();
}

/// Make sure `test_dir` itself is absent while its parent exists, for tests
/// that exercise the create-on-open path.
pub fn setup_missing_dir(test_dir: &str) {
    let parent = Path::new(test_dir).parent().unwrap();
    fs::create_dir_all(parent).unwrap();
    if Path::new(test_dir).exists() {
        fs::remove_dir_all(test_dir).unwrap();
    }
}

pub fn cleanup_test_dir(test_dir: &str) {
    if Path::new(test_dir).exists() {
        fs::remove_dir_all(test_dir).unwrap();
    }
}

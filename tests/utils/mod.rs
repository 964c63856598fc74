// Log directory fixtures shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write `content` to `root/relative`, creating parent directories
pub fn write_log(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

/// Normal service log lines with a varying user and duration
pub fn normal_lines(n: usize) -> String {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                format!("INFO connection opened for user{} in {} ms\n", i % 5, 10 + i)
            } else {
                format!("INFO connection closed for user{} after {} ms\n", i % 5, 20 + i)
            }
        })
        .collect()
}

/// Normal lines followed by a burst of failures never seen in normal runs
pub fn faulty_lines(n: usize) -> String {
    let mut lines = normal_lines(n);
    lines.push_str("ERROR kernel panic while mounting rootfs\n");
    lines.push_str("ERROR watchdog timeout fatal shutdown initiated\n");
    lines
}

/// Train runs `correct_1`, `correct_2`; test runs `correct_1`, `correct_3`
///
/// `correct_1` and `correct_2` use disjoint file names, but `app.log` appears
/// in both train and test.
pub fn train_test_dirs() -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let train = tmp.path().join("train");
    let test = tmp.path().join("test");

    write_log(&train, "correct_1/app.log", &normal_lines(12));
    write_log(&train, "correct_2/db.log", &normal_lines(8));
    write_log(&test, "correct_1/app.log", &normal_lines(10));
    write_log(&test, "correct_3/app.log", &faulty_lines(10));
    write_log(&test, "correct_3/cache.log", &normal_lines(4));

    (tmp, train, test)
}

use std::{fs, path::PathBuf};

/// Write `contents` to a scratch file unique to this process and test name.
pub fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = scratch_dir(name).join("data.txt");
    fs::write(&path, contents).expect("write scratch file");
    path
}

/// A fresh, empty scratch directory unique to this process and test name.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("seq-baseline-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

use fs2::FileExt;
use keyward_fs::{Error, RobustnessConfig, io};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_lock_timeout_is_respected() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("locked.txt");
    fs::write(&file_path, "original").unwrap();
    let lock_path = dir.path().join(".locked.txt.lock");

    // Hold the writer's lock file externally
    let lock_file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .unwrap();
    lock_file.lock_exclusive().unwrap();

    let config = RobustnessConfig {
        lock_timeout: Duration::from_millis(300),
        enable_fsync: false,
        tighten_parent: false,
    };
    let result = io::write_atomic(&file_path, b"content", config);

    drop(lock_file);

    assert!(matches!(result, Err(Error::LockFailed { .. })));
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "original");
}

#[test]
fn test_concurrent_writers_never_produce_hybrid_content() {
    let dir = tempdir().unwrap();
    let path = Arc::new(dir.path().join("manifest.json"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let body = format!("writer-{i}-").repeat(256);
                io::write_text(&path, &body).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let content = fs::read_to_string(path.as_ref()).unwrap();
    let first = content.split('-').take(2).collect::<Vec<_>>().join("-") + "-";
    assert_eq!(content, first.repeat(256), "content must come from exactly one writer");
}

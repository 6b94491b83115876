//! Integration tests for porter
//!
//! These tests drive the whole stack — manager, worker, executor, and the
//! atomic I/O layer — through realistic copy/move scenarios.

use porter_engine::{ManagerConfig, TaskManager, TaskStatus};
use porter_tests::test_utils::{
    create_test_directory_structure, create_test_file, wait_terminal,
};
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn manager() -> TaskManager {
    TaskManager::new(ManagerConfig::default())
}

#[tokio::test]
async fn test_copy_scenario_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("src.txt");
    let dest_dir = temp_dir.path().join("dst");
    fs::write(&source, "hello").unwrap();
    fs::create_dir(&dest_dir).unwrap();

    let manager = manager();
    let id = manager.enqueue_copy(vec![source.clone()], &dest_dir).unwrap();
    let snapshot = wait_terminal(&manager, id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(snapshot.done_items, 1);
    assert_eq!(snapshot.total_items, 1);
    assert_eq!(fs::read_to_string(dest_dir.join("src.txt")).unwrap(), "hello");
    // The source is unchanged and still present.
    assert_eq!(fs::read_to_string(&source).unwrap(), "hello");

    manager.shutdown();
    manager.join().await;
}

#[rstest]
#[case(0)]
#[case(1024)]
#[case(5 * 1024 * 1024)]
#[tokio::test]
async fn test_copy_preserves_content_across_sizes(#[case] size: usize) {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("data.bin");
    let dest_dir = temp_dir.path().join("dst");
    create_test_file(&source, size).unwrap();
    fs::create_dir(&dest_dir).unwrap();

    let manager = manager();
    let id = manager.enqueue_copy(vec![source.clone()], &dest_dir).unwrap();
    let snapshot = wait_terminal(&manager, id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert_eq!(
        fs::read(dest_dir.join("data.bin")).unwrap(),
        fs::read(&source).unwrap()
    );

    manager.shutdown();
    manager.join().await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_copy_preserves_permission_bits() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("tool.sh");
    let dest_dir = temp_dir.path().join("dst");
    fs::write(&source, "#!/bin/sh\n").unwrap();
    fs::set_permissions(&source, fs::Permissions::from_mode(0o711)).unwrap();
    fs::create_dir(&dest_dir).unwrap();

    let manager = manager();
    let id = manager.enqueue_copy(vec![source], &dest_dir).unwrap();
    wait_terminal(&manager, id).await;

    let mode = fs::metadata(dest_dir.join("tool.sh")).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o711);

    manager.shutdown();
    manager.join().await;
}

#[tokio::test]
async fn test_move_scenario_directory() {
    let temp_dir = TempDir::new().unwrap();
    let source_dir = temp_dir.path().join("a/dir");
    let dest_dir = temp_dir.path().join("b");
    fs::create_dir_all(&source_dir).unwrap();
    fs::create_dir(&dest_dir).unwrap();
    fs::write(source_dir.join("file.txt"), "payload").unwrap();

    let manager = manager();
    let id = manager.enqueue_move(vec![source_dir.clone()], &dest_dir).unwrap();
    let snapshot = wait_terminal(&manager, id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    assert!(!source_dir.exists());
    assert_eq!(
        fs::read_to_string(dest_dir.join("dir/file.txt")).unwrap(),
        "payload"
    );

    manager.shutdown();
    manager.join().await;
}

#[tokio::test]
async fn test_directory_recursion_reproduces_structure() {
    let temp_dir = TempDir::new().unwrap();
    let source_dir = temp_dir.path().join("tree");
    let dest_dir = temp_dir.path().join("dst");
    fs::create_dir_all(&source_dir).unwrap();
    fs::create_dir(&dest_dir).unwrap();
    let relative_files = create_test_directory_structure(&source_dir).unwrap();

    let manager = manager();
    let id = manager.enqueue_copy(vec![source_dir.clone()], &dest_dir).unwrap();
    let snapshot = wait_terminal(&manager, id).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    let copied_root = dest_dir.join("tree");
    for relative in relative_files {
        assert_eq!(
            fs::read(copied_root.join(&relative)).unwrap(),
            fs::read(source_dir.join(&relative)).unwrap(),
            "mismatch at {}",
            relative.display()
        );
    }

    manager.shutdown();
    manager.join().await;
}

#[tokio::test]
async fn test_idempotent_overwrite() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("src.txt");
    let dest_dir = temp_dir.path().join("dst");
    fs::create_dir(&dest_dir).unwrap();

    let manager = manager();

    fs::write(&source, "first").unwrap();
    let first = manager.enqueue_copy(vec![source.clone()], &dest_dir).unwrap();
    wait_terminal(&manager, first).await;

    fs::write(&source, "second").unwrap();
    let second = manager.enqueue_copy(vec![source.clone()], &dest_dir).unwrap();
    let snapshot = wait_terminal(&manager, second).await;

    assert_eq!(snapshot.status, TaskStatus::Completed);
    // Last write wins, no duplicate-naming side effect.
    assert_eq!(fs::read_to_string(dest_dir.join("src.txt")).unwrap(), "second");
    let entries: Vec<_> = fs::read_dir(&dest_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);

    manager.shutdown();
    manager.join().await;
}

#[tokio::test]
async fn test_all_completed_tasks_listed_in_reverse_completion_order() {
    let temp_dir = TempDir::new().unwrap();
    let dest_dir = temp_dir.path().join("dst");
    fs::create_dir(&dest_dir).unwrap();

    let manager = manager();
    let mut ids = Vec::new();
    for i in 0..4 {
        let source = temp_dir.path().join(format!("file{i}.txt"));
        fs::write(&source, format!("{i}")).unwrap();
        ids.push(manager.enqueue_copy(vec![source], &dest_dir).unwrap());
    }
    for id in &ids {
        wait_terminal(&manager, *id).await;
    }

    let listed = manager.list();
    assert_eq!(listed.len(), ids.len());
    assert!(listed.iter().all(|s| s.status == TaskStatus::Completed));
    // Tasks execute in FIFO order, so the listing is the exact reverse of
    // the enqueue order, with nothing pending or current.
    let expected: Vec<_> = ids.iter().rev().copied().collect();
    let actual: Vec<_> = listed.iter().map(|s| s.id).collect();
    assert_eq!(actual, expected);

    manager.shutdown();
    manager.join().await;
}

#[tokio::test]
async fn test_history_retains_exactly_the_most_recent() {
    let temp_dir = TempDir::new().unwrap();
    let dest_dir = temp_dir.path().join("dst");
    fs::create_dir(&dest_dir).unwrap();

    let config = ManagerConfig {
        history_capacity: 4,
        ..ManagerConfig::default()
    };
    let manager = TaskManager::new(config);

    let mut ids = Vec::new();
    for i in 0..10 {
        let source = temp_dir.path().join(format!("file{i}.txt"));
        fs::write(&source, format!("{i}")).unwrap();
        ids.push(manager.enqueue_copy(vec![source], &dest_dir).unwrap());
    }
    wait_terminal(&manager, *ids.last().unwrap()).await;

    let listed = manager.list();
    assert_eq!(listed.len(), 4);
    let actual: Vec<_> = listed.iter().map(|s| s.id).collect();
    let expected: Vec<_> = ids[6..].iter().rev().copied().collect();
    assert_eq!(actual, expected);

    manager.shutdown();
    manager.join().await;
}

#[tokio::test]
async fn test_cancel_pending_task_leaves_sources_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let dest_dir = temp_dir.path().join("dst");
    let first = temp_dir.path().join("first.txt");
    let second = temp_dir.path().join("second.txt");
    fs::create_dir(&dest_dir).unwrap();
    fs::write(&first, "1").unwrap();
    fs::write(&second, "2").unwrap();

    let manager = manager();
    let first_id = manager.enqueue_copy(vec![first], &dest_dir).unwrap();
    let second_id = manager
        .enqueue_move(vec![second.clone()], &dest_dir)
        .unwrap();
    // No await has happened since enqueueing, so the single-threaded test
    // runtime has not yet run the worker: the second task is still pending.
    manager.cancel(second_id).unwrap();

    let cancelled = manager
        .list()
        .into_iter()
        .find(|s| s.id == second_id)
        .unwrap();
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    wait_terminal(&manager, first_id).await;
    let final_snapshot = wait_terminal(&manager, second_id).await;
    assert_eq!(final_snapshot.status, TaskStatus::Cancelled);
    // The move never ran: its source is intact and nothing was created.
    assert_eq!(fs::read_to_string(&second).unwrap(), "2");
    assert!(!dest_dir.join("second.txt").exists());

    manager.shutdown();
    manager.join().await;
}

#[tokio::test]
async fn test_failure_surfaces_offending_path() {
    let temp_dir = TempDir::new().unwrap();
    let dest_dir = temp_dir.path().join("dst");
    let missing: PathBuf = temp_dir.path().join("not-there.txt");
    fs::create_dir(&dest_dir).unwrap();

    let manager = manager();
    let id = manager.enqueue_copy(vec![missing.clone()], &dest_dir).unwrap();
    let snapshot = wait_terminal(&manager, id).await;

    assert_eq!(snapshot.status, TaskStatus::Failed);
    assert_eq!(snapshot.failures.len(), 1);
    assert_eq!(snapshot.failures[0].source, missing);
    let error = snapshot.error.unwrap();
    assert!(error.contains("not-there.txt"), "error was: {error}");

    manager.shutdown();
    manager.join().await;
}

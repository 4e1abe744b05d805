//! End-to-end flows over the real storage and worktree layers with a mock
//! multiplexer: catalog → session manager → worktree → session.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use keymux::{
    session_name_for, Database, Group, GroupStore, MockMultiplexer, SessionManager, SessionStatus,
    Shortcut, ShortcutStore, Synchronizer, Tool, ToolPaths, WorktreeManager,
};
use tempfile::tempdir;

use common::git_fixtures::TestRepo;

fn manager(mux: &MockMultiplexer, worktree_root: PathBuf) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(
        Arc::new(mux.clone()),
        WorktreeManager::new(worktree_root),
        ToolPaths::default(),
    ))
}

#[tokio::test]
async fn launch_from_catalog_creates_session_in_project_dir() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("keymux.db")).unwrap();
    let store = ShortcutStore::new(db.connection());

    let shortcut = Shortcut::new("x", "Api", PathBuf::from("/tmp/api"), Tool::Claude);
    store.save(&shortcut).unwrap();

    let mux = MockMultiplexer::new();
    let manager = manager(&mux, dir.path().join("worktrees"));

    let loaded = store.get_by_key("x").unwrap().unwrap();
    let session = manager.find_or_create_for_shortcut(&loaded).await.unwrap();

    assert_eq!(session.mux_session, session_name_for(shortcut.id));
    let record = mux.session(&session.mux_session).unwrap();
    assert_eq!(record.cwd, PathBuf::from("/tmp/api"));
    assert_eq!(record.command.as_deref(), Some("claude"));
}

#[tokio::test]
async fn worktree_shortcut_lands_in_provisioned_directory() {
    let repo = TestRepo::new();
    let data = tempdir().unwrap();

    let mut shortcut = Shortcut::new("w", "Feature Work", repo.path.clone(), Tool::Shell);
    shortcut.use_worktree = true;

    let mux = MockMultiplexer::new();
    let manager = manager(&mux, data.path().join("worktrees"));

    let session = manager.find_or_create_for_shortcut(&shortcut).await.unwrap();

    assert_ne!(session.working_dir, repo.path);
    assert!(session.working_dir.exists());
    assert_eq!(TestRepo::branch_at(&session.working_dir), "keymux/feature-work");

    // Relaunching after the session died reuses the same worktree
    mux.remove_session(&session.mux_session);
    let again = manager.find_or_create_for_shortcut(&shortcut).await.unwrap();
    assert_eq!(again.working_dir, session.working_dir);
}

#[tokio::test]
async fn worktree_uses_develop_base_when_present() {
    let repo = TestRepo::with_branches(&["develop"]);
    let data = tempdir().unwrap();

    let mut shortcut = Shortcut::new("d", "Dev Based", repo.path.clone(), Tool::Shell);
    shortcut.use_worktree = true;
    shortcut.use_base_develop = true;

    let mux = MockMultiplexer::new();
    let manager = manager(&mux, data.path().join("worktrees"));

    let session = manager.find_or_create_for_shortcut(&shortcut).await.unwrap();
    assert!(session.working_dir.exists());
    assert_eq!(TestRepo::branch_at(&session.working_dir), "keymux/dev-based");
}

#[tokio::test]
async fn key_rename_preserves_session_identity() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("keymux.db")).unwrap();
    let store = ShortcutStore::new(db.connection());

    let mut shortcut = Shortcut::new("x", "Stable", PathBuf::from("/tmp/p"), Tool::Shell);
    store.save(&shortcut).unwrap();

    let mux = MockMultiplexer::new();
    let manager = manager(&mux, dir.path().join("worktrees"));

    let before = manager.find_or_create_for_shortcut(&shortcut).await.unwrap();

    // Rebind the same shortcut to a different key
    shortcut.key = "z".to_string();
    store.save(&shortcut).unwrap();
    let reloaded = store.get_by_key("z").unwrap().unwrap();

    let after = manager.find_or_create_for_shortcut(&reloaded).await.unwrap();
    assert_eq!(before.mux_session, after.mux_session);
    assert_eq!(mux.create_calls(&before.mux_session), 1);
}

#[tokio::test]
async fn synchronizer_reflects_full_catalog_state() {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("keymux.db")).unwrap();
    let shortcuts = ShortcutStore::new(db.connection());
    let groups = GroupStore::new(db.connection());

    let running = Shortcut::new("a", "Running", PathBuf::from("/p"), Tool::Claude);
    let stopped = Shortcut::new("b", "Stopped", PathBuf::from("/p"), Tool::Claude);
    shortcuts.save(&running).unwrap();
    shortcuts.save(&stopped).unwrap();
    groups.save(&Group::new("work")).unwrap();

    let mux = MockMultiplexer::new();
    let manager = manager(&mux, dir.path().join("worktrees"));
    let name = session_name_for(running.id);
    mux.insert_session(&name, PathBuf::from("/p"));
    mux.set_pane(&name, "✻ Running tests… (esc to interrupt)");

    let sync = Synchronizer::new(shortcuts, groups, manager);
    let snapshot = sync.refresh().await.unwrap();

    assert_eq!(snapshot.shortcuts.len(), 2);
    assert_eq!(snapshot.groups.len(), 1);
    assert_eq!(snapshot.statuses[&running.id], SessionStatus::Running);
    assert_eq!(snapshot.statuses[&stopped.id], SessionStatus::Stopped);
}

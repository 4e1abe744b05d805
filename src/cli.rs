//! Command-line surface
//!
//! The launch path is deliberately synchronous end to end: it resolves the
//! shortcut, finds or creates its session, then replaces this process with
//! the multiplexer attach. Everything else is a thin wrapper over the core
//! for driving it without the interactive surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::data::{Database, Group, GroupStore, Shortcut, ShortcutStore};
use crate::git::WorktreeManager;
use crate::mux::{exec_attach, TmuxClient};
use crate::registry;
use crate::session::{SessionError, SessionManager, Synchronizer};
use crate::tool::Tool;
use crate::util::paths;

#[derive(Parser)]
#[command(name = "keymux", version, about = "Bind keystrokes to coding-agent tmux sessions")]
pub struct Cli {
    /// Launch the shortcut bound to KEY and attach to its session
    #[arg(short = 's', long = "shortcut", value_name = "KEY")]
    pub shortcut: Option<String>,

    /// Override the data directory (default ~/.keymux)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Launch a shortcut by key and attach to its session
    Launch {
        /// The shortcut's launch key
        key: String,
    },
    /// List shortcuts with their live session status
    List,
    /// Bind a new shortcut
    Add {
        /// Launch key (1-2 printable characters)
        key: String,
        /// Display name
        name: String,
        /// Project directory
        project: PathBuf,
        /// Tool to run: claude, opencode, gemini, codex, custom, shell
        #[arg(long, default_value = "claude")]
        tool: String,
        /// Extra arguments appended to the tool invocation
        #[arg(long, default_value = "")]
        cli_options: String,
        /// Group path, e.g. work/backend
        #[arg(long, default_value = "")]
        group: String,
        /// Pass the permission-skipping flag (claude only)
        #[arg(long)]
        skip_permissions: bool,
        /// Run inside a dedicated git worktree
        #[arg(long)]
        worktree: bool,
        /// Worktree branch (default: derived from the name)
        #[arg(long, default_value = "")]
        branch: String,
        /// Base the worktree on the develop branch
        #[arg(long)]
        base_develop: bool,
    },
    /// Remove a shortcut by key
    Remove {
        key: String,
    },
    /// List groups and how many shortcuts each holds
    Groups,
    /// Kill the session behind a shortcut
    Kill {
        key: String,
    },
}

struct App {
    shortcuts: ShortcutStore,
    groups: GroupStore,
    manager: Arc<SessionManager>,
}

impl App {
    fn open() -> Result<Self> {
        // Storage failure at startup is fatal; nothing can run unmigrated
        let db = Database::open(paths::database_path())
            .context("failed to open the shortcut database")?;
        let config = Config::load().context("failed to load config.toml")?;

        let mux = Arc::new(TmuxClient::with_timeout(config.mux_timeout));
        let worktrees = WorktreeManager::new(paths::worktrees_dir())
            .with_develop_branch(config.develop_branch.clone());
        let manager = Arc::new(SessionManager::new(mux, worktrees, config.tool_paths));

        Ok(Self {
            shortcuts: ShortcutStore::new(db.connection()),
            groups: GroupStore::new(db.connection()),
            manager,
        })
    }

    fn shortcut_by_key_or_exit(&self, key: &str) -> Result<Shortcut> {
        match self.shortcuts.get_by_key(key)? {
            Some(shortcut) => Ok(shortcut),
            None => {
                eprintln!("Error: no shortcut bound to key \"{}\"", key);
                eprintln!("Run `keymux list` to see bound keys");
                std::process::exit(1);
            }
        }
    }
}

/// Dispatch a parsed invocation. The launch path only returns on failure.
pub async fn run(cli: Cli) -> Result<()> {
    let command = match (cli.shortcut, cli.command) {
        (Some(key), _) => Command::Launch { key },
        (None, Some(command)) => command,
        (None, None) => Command::List,
    };

    let app = App::open()?;

    match command {
        Command::Launch { key } => launch(&app, &key).await,
        Command::List => list(&app).await,
        Command::Add {
            key,
            name,
            project,
            tool,
            cli_options,
            group,
            skip_permissions,
            worktree,
            branch,
            base_develop,
        } => {
            let mut shortcut = Shortcut::new(key, name, project, Tool::parse(&tool));
            shortcut.cli_options = cli_options;
            shortcut.group_path = group;
            shortcut.skip_permissions = skip_permissions;
            shortcut.use_worktree = worktree;
            shortcut.worktree_branch = branch;
            shortcut.use_base_develop = base_develop;
            add(&app, shortcut)
        }
        Command::Remove { key } => remove(&app, &key),
        Command::Groups => groups(&app),
        Command::Kill { key } => kill(&app, &key).await,
    }
}

async fn launch(app: &App, key: &str) -> Result<()> {
    let shortcut = app.shortcut_by_key_or_exit(key)?;

    let session = match app.manager.find_or_create_for_shortcut(&shortcut).await {
        // An out-of-band race invalidates one attempt, not the algorithm
        Err(SessionError::CreateConflict(_)) => {
            app.manager.find_or_create_for_shortcut(&shortcut).await?
        }
        other => other?,
    };

    // Only returns on failure; on success the process image is replaced
    let err = exec_attach(app.manager.multiplexer().as_ref(), &session.mux_session);
    Err(anyhow!(err).context("failed to attach to session"))
}

async fn list(app: &App) -> Result<()> {
    let sync = Synchronizer::new(
        app.shortcuts.clone(),
        app.groups.clone(),
        app.manager.clone(),
    );
    let snapshot = sync.refresh().await?;

    if snapshot.shortcuts.is_empty() {
        println!("No shortcuts bound. Add one with `keymux add <key> <name> <project>`");
        return Ok(());
    }

    for shortcut in &snapshot.shortcuts {
        let status = snapshot
            .statuses
            .get(&shortcut.id)
            .copied()
            .unwrap_or(crate::status::SessionStatus::Stopped);
        let group = if shortcut.group_path.is_empty() {
            String::new()
        } else {
            format!("  [{}]", shortcut.group_path)
        };
        println!(
            "{} {:<2} {:<20} {:<12} {}{}",
            status.icon(),
            shortcut.key,
            shortcut.name,
            shortcut.tool.as_str(),
            shortcut.project_path.display(),
            group,
        );
    }
    Ok(())
}

fn add(app: &App, mut shortcut: Shortcut) -> Result<()> {
    let existing = app.shortcuts.load_all()?;
    registry::validate_shortcut(&shortcut, &existing)?;
    shortcut.order = registry::next_order(&shortcut.group_path, &existing);

    if !shortcut.group_path.is_empty() && app.groups.get(&shortcut.group_path)?.is_none() {
        app.groups.save(&Group::new(shortcut.group_path.clone()))?;
    }

    app.shortcuts.save(&shortcut)?;
    println!("Bound \"{}\" to {}", shortcut.key, shortcut.name);
    Ok(())
}

fn remove(app: &App, key: &str) -> Result<()> {
    let shortcut = app.shortcut_by_key_or_exit(key)?;
    app.shortcuts.delete(shortcut.id)?;
    println!("Removed shortcut \"{}\"", key);
    Ok(())
}

fn groups(app: &App) -> Result<()> {
    let groups = app.groups.load_all()?;
    if groups.is_empty() {
        println!("No groups");
        return Ok(());
    }

    let shortcuts = app.shortcuts.load_all()?;
    for group in groups {
        let count = shortcuts
            .iter()
            .filter(|s| s.group_path == group.path || s.group_path.starts_with(&format!("{}/", group.path)))
            .count();
        println!("{:<30} {} shortcut(s)", group.path, count);
    }
    Ok(())
}

async fn kill(app: &App, key: &str) -> Result<()> {
    let shortcut = app.shortcut_by_key_or_exit(key)?;
    if app.manager.kill_for_shortcut(&shortcut).await? {
        println!("Killed session for \"{}\"", key);
    } else {
        println!("No live session for \"{}\"", key);
    }
    Ok(())
}

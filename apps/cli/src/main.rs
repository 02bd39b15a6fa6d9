mod logging;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use codepad_core::{EditorBuffer, FsDisk, TextBuffer};
use codepad_project::{ManifestStore, NamePolicy, ProjectSession, SessionOptions, METADATA_DIR};
use codepad_settings::{Preferences, PreferencesStore};
use tracing::debug;

type Session = ProjectSession<FsDisk, TextBuffer>;

#[derive(Parser)]
#[command(
    name = "codepad-cli",
    about = "Manage the files of a codepad project",
    author,
    version
)]
struct Cli {
    /// 專案資料夾；預設為目前目錄。 / Project directory (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    project: Option<PathBuf>,
    /// 顯示除錯日誌。 / Print debug logs to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 初始化專案（必要時建立預設檔案）。 / Open the project, creating the default file when empty.
    Init,
    /// 列出專案檔案。 / List project files; the selected one is marked with `*`.
    List(ListArgs),
    /// 建立新檔案。 / Create a file (an untitled name is picked when NAME is omitted).
    New(NewArgs),
    /// 重新命名檔案。 / Rename a file; refuses to overwrite an existing one.
    Rename(RenameArgs),
    /// 刪除檔案。 / Delete a file.
    Delete(NameArg),
    /// 選取檔案。 / Select the file the editor shows.
    Select(NameArg),
    /// 輸出檔案內容。 / Print a file (the selected one by default).
    Show(OptionalNameArg),
    /// 以標準輸入或檔案取代內容。 / Replace a file's content from stdin or `--file`.
    Edit(EditArgs),
    /// 檢視或修改專案偏好設定。 / Show or change project preferences.
    #[command(subcommand)]
    Preferences(PreferencesCommand),
}

#[derive(Args)]
struct ListArgs {
    /// 以 JSON 輸出。 / Emit JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct NewArgs {
    /// 檔名。 / File name.
    name: Option<String>,
    /// 建立後立即選取。 / Select the new file afterwards.
    #[arg(long)]
    select: bool,
}

#[derive(Args)]
struct RenameArgs {
    from: String,
    to: String,
}

#[derive(Args)]
struct NameArg {
    name: String,
}

#[derive(Args)]
struct OptionalNameArg {
    name: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    /// 要編輯的檔案（會被選取）；預設為目前選取的檔案。 / File to edit (it becomes selected); defaults to the selected file.
    name: Option<String>,
    /// 內容來源檔案；未指定時讀取標準輸入。 / Read content from this file instead of stdin.
    #[arg(long, value_name = "FILE")]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum PreferencesCommand {
    /// 輸出目前偏好設定。 / Print the effective preferences as JSON.
    Show,
    /// 設定單一偏好值。 / Set one preference value.
    Set(PreferencesSetArgs),
}

#[derive(Args)]
struct PreferencesSetArgs {
    /// 例如 `files.extension`、`editor.save_before_switch`。 / e.g. `files.extension`, `editor.save_before_switch`.
    key: String,
    value: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        project,
        verbose,
        command,
    } = Cli::parse();
    logging::init(verbose);
    let root = resolve_project(project)?;
    debug!(event = "cli.command", project = %root.display());

    match command {
        Commands::Init => execute_init(&root),
        Commands::List(args) => execute_list(args, &root),
        Commands::New(args) => execute_new(args, &root),
        Commands::Rename(args) => execute_rename(args, &root),
        Commands::Delete(args) => execute_delete(args, &root),
        Commands::Select(args) => execute_select(args, &root),
        Commands::Show(args) => execute_show(args, &root),
        Commands::Edit(args) => execute_edit(args, &root),
        Commands::Preferences(subcommand) => execute_preferences_command(subcommand, &root),
    }
}

fn execute_init(root: &Path) -> Result<()> {
    let session = open_session(root)?;
    let count = session.entries()?.len();
    println!(
        "Initialized project at {} ({count} file{})",
        root.display(),
        if count == 1 { "" } else { "s" }
    );
    Ok(())
}

fn execute_list(args: ListArgs, root: &Path) -> Result<()> {
    let session = open_session(root)?;
    let entries = session.entries()?;
    if args.json {
        let payload =
            serde_json::to_string_pretty(&entries).context("failed to serialise file list")?;
        println!("{payload}");
        return Ok(());
    }
    for entry in entries {
        let marker = if entry.is_selected { '*' } else { ' ' };
        println!("{marker} {}", entry.name);
    }
    Ok(())
}

fn execute_new(args: NewArgs, root: &Path) -> Result<()> {
    let mut session = open_session(root)?;
    let proposed = args.name.as_deref();
    let entry = if args.select {
        session.create_and_select(proposed)
    } else {
        session.create_file(proposed)
    }
    .with_context(|| match proposed {
        Some(name) => format!("failed to create {name}"),
        None => "failed to create file".to_string(),
    })?;
    println!("Created {}", entry.name);
    Ok(())
}

fn execute_rename(args: RenameArgs, root: &Path) -> Result<()> {
    let mut session = open_session(root)?;
    let entry = session
        .rename_file(&args.from, &args.to)
        .with_context(|| format!("failed to rename {} to {}", args.from, args.to))?;
    println!("Renamed {} to {}", args.from.trim(), entry.name);
    Ok(())
}

fn execute_delete(args: NameArg, root: &Path) -> Result<()> {
    let mut session = open_session(root)?;
    let outcome = session
        .delete_file(&args.name)
        .with_context(|| format!("failed to delete {}", args.name))?;
    println!("Deleted {}", outcome.removed.name);
    if let Some(healed) = outcome.healed {
        println!("Created empty {}", healed.name);
    }
    Ok(())
}

fn execute_select(args: NameArg, root: &Path) -> Result<()> {
    let mut session = open_session(root)?;
    let entry = session
        .select_file(&args.name)
        .with_context(|| format!("failed to select {}", args.name))?;
    println!("Selected {}", entry.name);
    Ok(())
}

fn execute_show(args: OptionalNameArg, root: &Path) -> Result<()> {
    let session = open_session(root)?;
    let bytes = match args.name.as_deref() {
        Some(name) => session
            .store()?
            .read_file(name)
            .with_context(|| format!("failed to read {name}"))?,
        None => session.editor().content().to_vec(),
    };
    print!("{}", String::from_utf8_lossy(&bytes));
    Ok(())
}

fn execute_edit(args: EditArgs, root: &Path) -> Result<()> {
    let mut session = open_session(root)?;
    if let Some(name) = args.name.as_deref() {
        session
            .select_file(name)
            .with_context(|| format!("failed to select {name}"))?;
    }
    let bytes = match &args.file {
        Some(path) => {
            let path = resolve_input_path(path)?;
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?
        }
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };
    let len = bytes.len();
    session.editor_mut().replace(bytes);
    session.save().context("failed to save file")?;
    let name = session
        .editor()
        .bound_file()
        .ok_or_else(|| anyhow!("editor is not bound to a file"))?;
    println!("Wrote {len} bytes to {name}");
    Ok(())
}

fn execute_preferences_command(command: PreferencesCommand, root: &Path) -> Result<()> {
    match command {
        PreferencesCommand::Show => show_preferences(root),
        PreferencesCommand::Set(args) => set_preference(args, root),
    }
}

fn show_preferences(root: &Path) -> Result<()> {
    let store = load_preferences(root)?;
    let payload = serde_json::to_string_pretty(store.preferences())
        .context("failed to serialise preferences")?;
    println!("{payload}");
    Ok(())
}

fn set_preference(args: PreferencesSetArgs, root: &Path) -> Result<()> {
    let mut store = load_preferences(root)?;
    let mut next = store.preferences().clone();
    apply_preference(&mut next, &args.key, &args.value)?;
    store
        .overwrite(next)
        .with_context(|| format!("failed to save preferences to {}", store.path().display()))?;
    println!("Set {} = {}", args.key, args.value);
    Ok(())
}

fn apply_preference(preferences: &mut Preferences, key: &str, value: &str) -> Result<()> {
    match key {
        "files.default_stem" => preferences.files.default_stem = value.to_string(),
        "files.extension" => preferences.files.extension = value.to_string(),
        "files.untitled_stem" => preferences.files.untitled_stem = value.to_string(),
        "files.untitled_start" => {
            preferences.files.untitled_start = value
                .parse()
                .with_context(|| format!("`{value}` is not a positive number"))?;
        }
        "editor.save_before_switch" => {
            preferences.editor.save_before_switch = value
                .parse()
                .with_context(|| format!("`{value}` is not true or false"))?;
        }
        other => bail!("unknown preference `{other}`"),
    }
    Ok(())
}

fn open_session(root: &Path) -> Result<Session> {
    let preferences = load_preferences(root)?;
    let preferences = preferences.preferences();
    let disk = FsDisk::open(root)
        .with_context(|| format!("failed to open project {}", root.display()))?;
    let mut session = ProjectSession::new(TextBuffer::new(), SessionOptions::from(&preferences.editor));
    session
        .open(
            disk,
            NamePolicy::from(&preferences.files),
            Some(ManifestStore::for_project(root)),
        )
        .with_context(|| format!("failed to load project {}", root.display()))?;
    Ok(session)
}

fn load_preferences(root: &Path) -> Result<PreferencesStore> {
    let path = preferences_path(root);
    PreferencesStore::load(&path)
        .with_context(|| format!("failed to load preferences from {}", path.display()))
}

fn preferences_path(root: &Path) -> PathBuf {
    root.join(METADATA_DIR).join("preferences.json")
}

fn resolve_project(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(path) => resolve_input_path(&path),
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}

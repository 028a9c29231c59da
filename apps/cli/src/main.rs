use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use texdesk_core::{Desk, DeskConfig, DeskError, ErrorKind, TreeNode, TRASH_DIR_NAME};
use texdesk_settings::ConfigStore;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TEXDESK_LOG";

#[derive(Parser)]
#[command(
    name = "texdesk-cli",
    about = "Manage and compile LaTeX workspaces",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 設定檔路徑；預設為 `<workspace>/.texdesk/config.json`。 / Config file (defaults to `<workspace>/.texdesk/config.json`).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 顯示除錯訊息。 / Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出工作區樹狀結構。 / Print the workspace tree.
    Tree {
        #[arg(long)]
        json: bool,
    },
    /// 輸出文件內容。 / Print a document.
    Read { path: String },
    /// 寫入文件內容。 / Replace a document's content.
    Write(WriteArgs),
    /// 建立資料夾。 / Create a folder (root-level folders are seeded from templates).
    Mkdir { path: String },
    /// 在原資料夾內更名。 / Rename an item within its folder.
    Rename { path: String, new_name: String },
    /// 永久刪除。 / Delete permanently.
    Delete { path: String },
    /// 移至垃圾桶。 / Move an item to the trash.
    Trash { path: String },
    /// 從垃圾桶還原。 / Restore a trash slot such as `.trash/notes.txt_2024-05-01_10-11-12`.
    Restore { slot_path: String },
    /// 列出垃圾桶內容。 / List trashed items.
    TrashList {
        #[arg(long)]
        json: bool,
    },
    /// 對帳垃圾桶紀錄。 / Drop stale ledger entries and report untracked slots.
    TrashReconcile,
    /// 編譯 LaTeX 文件為 PDF。 / Compile a `.tex` document to PDF.
    Compile(CompileArgs),
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["content", "from"])))]
struct WriteArgs {
    path: String,
    /// 直接提供內容。 / Inline content.
    #[arg(long)]
    content: Option<String>,
    /// 從本機檔案讀取內容。 / Read content from a local file.
    #[arg(long, value_name = "FILE")]
    from: Option<PathBuf>,
}

#[derive(Args)]
struct CompileArgs {
    path: String,
    /// PDF 輸出路徑。 / Where to write the PDF.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
    /// 覆寫編譯程式。 / Override the typesetting program.
    #[arg(long, value_name = "PROGRAM")]
    program: Option<String>,
    /// 覆寫每次編譯的逾時秒數。 / Override the per-pass timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DeskError>().map(DeskError::kind) {
        Some(ErrorKind::InvalidPath) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::AlreadyExists) => 4,
        Some(ErrorKind::Validation) => 5,
        Some(ErrorKind::Compilation) => 6,
        Some(ErrorKind::ToolMissing) => 7,
        Some(ErrorKind::Timeout) => 8,
        Some(ErrorKind::Io) | None => 1,
    }
}

fn run(cli: Cli) -> Result<()> {
    let workspace = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().context("failed to determine current directory")?,
    };
    let mut config = load_config(&workspace, cli.config.as_deref())?;
    if let Commands::Compile(args) = &cli.command {
        if let Some(program) = &args.program {
            config.compiler.program = program.clone();
        }
        if let Some(timeout) = args.timeout {
            config.compiler.timeout_secs = timeout;
        }
        config.sanitize();
    }

    let desk = Desk::open(&workspace, config)?;
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Tree { json } => {
            let tree = desk.list_tree()?;
            if json {
                writeln!(stdout, "{}", serde_json::to_string_pretty(&tree)?)?;
            } else {
                print_tree(&mut stdout, &tree, 0)?;
            }
        }
        Commands::Read { path } => {
            let content = desk.read(&path)?;
            stdout.write_all(content.as_bytes())?;
        }
        Commands::Write(args) => {
            let content = match (args.content, args.from) {
                (Some(content), _) => content,
                (None, Some(file)) => fs::read_to_string(&file)
                    .with_context(|| format!("failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("either --content or --from is required"),
            };
            desk.write(&args.path, &content)?;
        }
        Commands::Mkdir { path } => desk.mkdir(&path)?,
        Commands::Rename { path, new_name } => {
            let renamed = desk.rename(&path, &new_name)?;
            writeln!(stdout, "{renamed}")?;
        }
        Commands::Delete { path } => desk.delete(&path)?,
        Commands::Trash { path } => {
            let entry = desk.trash(&path)?;
            writeln!(stdout, "{}", entry.slot_path(TRASH_DIR_NAME))?;
        }
        Commands::Restore { slot_path } => {
            let restored = desk.restore(&slot_path)?;
            writeln!(stdout, "{restored}")?;
        }
        Commands::TrashList { json } => {
            let entries = desk.list_trash()?;
            if json {
                writeln!(stdout, "{}", serde_json::to_string_pretty(&entries)?)?;
            } else {
                for entry in entries {
                    writeln!(
                        stdout,
                        "{}\t{}\t{}",
                        entry.slot_path(TRASH_DIR_NAME),
                        entry.original_path,
                        entry.deleted_at.format("%Y-%m-%d %H:%M:%S"),
                    )?;
                }
            }
        }
        Commands::TrashReconcile => {
            let report = desk.reconcile_trash()?;
            for entry in &report.dropped {
                writeln!(stdout, "dropped\t{}\t{}", entry.slot_name, entry.original_path)?;
            }
            for slot in &report.orphans {
                writeln!(stdout, "untracked\t{slot}")?;
            }
        }
        Commands::Compile(args) => {
            let pdf = desk.compile(&args.path)?;
            fs::write(&args.output, &pdf)
                .with_context(|| format!("failed to write {}", args.output.display()))?;
            writeln!(stdout, "{}", args.output.display())?;
        }
    }
    Ok(())
}

fn load_config(workspace: &Path, explicit: Option<&Path>) -> Result<DeskConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ConfigStore::default_path(workspace));
    let store = ConfigStore::load(&path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    tracing::debug!(
        workspace = %workspace.display(),
        config = %path.display(),
        found = path.exists(),
        "resolved configuration"
    );
    Ok(store.into_config())
}

fn print_tree(out: &mut impl Write, nodes: &[TreeNode], depth: usize) -> io::Result<()> {
    for node in nodes {
        let indent = "  ".repeat(depth);
        if let Some(children) = &node.children {
            writeln!(out, "{indent}{}/", node.name)?;
            print_tree(out, children, depth + 1)?;
        } else {
            writeln!(out, "{indent}{}", node.name)?;
        }
    }
    Ok(())
}

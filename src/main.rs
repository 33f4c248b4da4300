use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use todostore::{FileBlobStore, Filter, Intent, Outcome, Session, Store, View};
use tracing::info;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - a persistent todo list for the terminal")]
#[command(version)]
struct Cli {
    /// Directory holding the saved list (default: the user's local data directory)
    #[arg(short, long)]
    store_path: Option<PathBuf>,

    /// Filter applied before rows are numbered and shown
    #[arg(short, long, value_enum, default_value_t = Filter::All)]
    filter: Filter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an item
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Toggle an item's completion by row number or id
    Toggle { row: String },

    /// Delete an item by row number or id
    Delete { row: String },

    /// Replace an item's text
    Edit {
        row: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Remove every completed item
    ClearCompleted,

    /// Show the list
    List,

    /// Read commands interactively from stdin
    Shell,
}

fn main() -> Result<()> {
    // Logs go to stderr so frames on stdout stay readable
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();

    let store_path = cli.store_path.unwrap_or_else(default_store_path);
    info!(path = ?store_path, "Opening store");
    let blob = FileBlobStore::open(&store_path)?;

    let mut view = View::new(Store::open(blob));
    if cli.filter != Filter::All {
        view.handle(Intent::SelectFilter(cli.filter))?;
    }

    let intent = match cli.command {
        Commands::Add { text } => Intent::Submit(text.join(" ")),
        Commands::Toggle { row } => Intent::Toggle(view.resolve_row(&row)),
        Commands::Delete { row } => Intent::Delete(view.resolve_row(&row)),
        Commands::Edit { row, text } => {
            view.edit_row(&row, &text.join(" "))?;
            print!("{}", view.frame().paint());
            return Ok(());
        }
        Commands::ClearCompleted => Intent::ClearCompleted,
        Commands::List => {
            print!("{}", view.frame().paint());
            return Ok(());
        }
        Commands::Shell => return run_shell(Session::new(view)),
    };

    view.handle(intent)?;
    print!("{}", view.frame().paint());
    Ok(())
}

fn run_shell(mut session: Session<FileBlobStore>) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("Type 'help' for commands.");
    print!("{}", session.view().frame().paint());

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).context("Failed to read command")? == 0 {
            break;
        }

        match session.execute(&line) {
            Ok(Outcome::Continue(Some(text))) => println!("{}", text.trim_end()),
            Ok(Outcome::Continue(None)) => {}
            Ok(Outcome::Quit) => break,
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    Ok(())
}

fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("todostore"))
        .unwrap_or_else(|| PathBuf::from(".todostore"))
}

//! Wenmai CLI — analyze Chinese novels into a property graph.
//!
//! Usage:
//!   wenmai analyze <file> --id my-novel [--title 标题] [--db path]
//!   wenmai stats --id my-novel [--db path]

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wenmai::{
    ingest, CancelSignal, GraphStore, Lexicons, NodeFilter, NodeLabel, OpenStore, Orchestrator,
    SqliteStore,
};

#[derive(Parser)]
#[command(
    name = "wenmai",
    version,
    about = "Narrative knowledge graph engine for Chinese fiction"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a plain-text novel and write its graph to the store
    Analyze {
        /// Path to a UTF-8 .txt novel
        file: PathBuf,
        /// Novel identifier in the graph store
        #[arg(long)]
        id: String,
        /// Display title (defaults to the file stem)
        #[arg(long)]
        title: Option<String>,
        /// Path to the SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Directory of lexicon overlay files
        #[arg(long)]
        lexicons: Option<PathBuf>,
    },
    /// Print stored statistics for an analyzed novel
    Stats {
        /// Novel identifier in the graph store
        #[arg(long)]
        id: String,
        /// Path to the SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("wenmai")
        .join("graph.db")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("WENMAI_LOG").unwrap_or_else(|_| "wenmai=info".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Analyze {
            file,
            id,
            title,
            db,
            lexicons,
        } => run_analyze(file, id, title, db, lexicons).await,
        Commands::Stats { id, db } => run_stats(id, db),
    };
    std::process::exit(code);
}

async fn run_analyze(
    file: PathBuf,
    id: String,
    title: Option<String>,
    db: Option<PathBuf>,
    lexicons: Option<PathBuf>,
) -> i32 {
    let title = title.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| id.clone())
    });

    let lexicons = match lexicons {
        Some(dir) => match Lexicons::from_dir(&dir) {
            Ok(lex) => lex,
            Err(e) => {
                eprintln!("error: {e}");
                return 1;
            }
        },
        None => Lexicons::builtin(),
    };

    let novel = match ingest::read_novel(&file, &id, &title) {
        Ok(novel) => novel,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let store = match SqliteStore::open(db.unwrap_or_else(default_db_path)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: cannot open graph store: {e}");
            return 1;
        }
    };

    let orchestrator = Orchestrator::new(lexicons, Default::default());
    let progress = |pct: u8, msg: &str| {
        eprintln!("[{pct:>3}%] {msg}");
    };
    let bundle = match orchestrator
        .analyze_and_store(&novel, &store, Some(&progress), &CancelSignal::new())
        .await
    {
        Ok(bundle) => bundle,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };

    let stats = &bundle.statistics;
    println!("novel:            {} ({})", bundle.novel_title, bundle.novel_id);
    println!("chapters:         {}", stats.chapters);
    println!("words:            {}", stats.words);
    println!("characters:       {}", stats.characters);
    println!("relations:        {}", stats.relations);
    println!("events:           {}", stats.events);
    println!("locations:        {}", stats.locations);
    println!("main plot events: {}", stats.main_plot_events);
    if bundle.is_empty() {
        println!("note: no entities found; bundle is empty");
    }
    if !bundle.persisted {
        eprintln!("warning: graph store write failed; results were not persisted");
        return 2;
    }
    0
}

fn run_stats(id: String, db: Option<PathBuf>) -> i32 {
    let store = match SqliteStore::open(db.unwrap_or_else(default_db_path)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("error: cannot open graph store: {e}");
            return 1;
        }
    };
    let labels = [
        NodeLabel::Chapter,
        NodeLabel::Character,
        NodeLabel::Event,
        NodeLabel::Location,
        NodeLabel::Emotion,
        NodeLabel::State,
    ];
    for label in labels {
        match store.find_nodes(&id, &NodeFilter::new().with_label(label)) {
            Ok(nodes) => println!("{:<10} {}", label.as_str(), nodes.len()),
            Err(e) => {
                eprintln!("error: {e}");
                return 1;
            }
        }
    }
    0
}

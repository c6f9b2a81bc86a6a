// Command-line interface for blockshift
//
// This binary drives the blockshift library against a SQLite content store.
//
// A typical migration imports legacy documents, converts them, checks the
// result and, if something went wrong, restores the originals:
//
//  blockshift import post.html --id 7           - Store a document's live content
//  blockshift convert 7 8 | --all               - Convert stored documents
//  blockshift show 7 [--column original]        - Print one stored view of a document
//  blockshift restore [--ids 7,8]               - Put the original content back
//  blockshift restore --blocks [--ids 7,8]      - Put the converted content back
//  blockshift pipeline post.html                - Convert a file without touching the store
//
// Configuration comes from the embedded defaults, ./blockshift.toml when it
// exists, and an explicit --config file, in that order.

use blockshift::{
    engine_with_settings, restore, ConversionEngine, DocumentId, NoopCache, PatcherSettings,
    RestoreScope, RestoreTarget, SnapshotStore, SqliteStore,
};
use blockshift_config::{BlockshiftConfig, Loader, PROJECT_FILE};
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::fs;
use std::path::PathBuf;

const RESTORE_TARGETS: &[&str] = &["original", "converted"];
const SHOW_COLUMNS: &[&str] = &["live", "original", "converted"];

fn build_cli() -> Command {
    Command::new("blockshift")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert legacy HTML content into block markup, reversibly")
        .long_about(
            "blockshift converts freeform HTML documents into block markup.\n\n\
            The first conversion of a document snapshots its original content, and every\n\
            later conversion starts from that snapshot. Restoring copies either the original\n\
            or the last converted output back into the document.\n\n\
            Commands:\n  \
            - pipeline: Convert a file and print the blocks\n  \
            - import:   Store a file as a document's live content\n  \
            - convert:  Convert stored documents\n  \
            - show:     Print a stored view of a document\n  \
            - restore:  Copy a snapshot back into the live content\n\n\
            Logging goes to stderr. Set RUST_LOG to override the configured filter.",
        )
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a blockshift.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .help("SQLite database to use instead of storage.path")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("pipeline")
                .about("Convert an HTML file and print the blocks")
                .long_about(
                    "Run the configured chain and conversion step on a file and print the\n\
                    resulting block markup. Nothing is read from or written to the store.\n\n\
                    Examples:\n  \
                    blockshift pipeline post.html\n  \
                    blockshift pipeline post.html --id 42     # id shown in error reports",
                )
                .arg(
                    Arg::new("file")
                        .help("HTML file to convert")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("id")
                        .long("id")
                        .value_name("ID")
                        .help("Document id used in logs and errors")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("0"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Store a file as a document's live content")
                .arg(
                    Arg::new("file")
                        .help("File holding the document content")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("id")
                        .long("id")
                        .value_name("ID")
                        .help("Document id")
                        .required(true)
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert stored documents")
                .long_about(
                    "Convert stored documents one at a time. A document that fails is left\n\
                    untouched and reported; the others are still converted. The command exits\n\
                    with status 1 if any document failed.\n\n\
                    Examples:\n  \
                    blockshift convert 7 8\n  \
                    blockshift convert --all",
                )
                .arg(
                    Arg::new("ids")
                        .help("Document ids to convert")
                        .index(1)
                        .num_args(1..)
                        .value_parser(clap::value_parser!(u64))
                        .required_unless_present("all")
                        .conflicts_with("all"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .help("Convert every stored document")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("show")
                .about("Print a stored view of a document")
                .arg(
                    Arg::new("id")
                        .help("Document id")
                        .required(true)
                        .index(1)
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("column")
                        .long("column")
                        .help("Which view to print")
                        .value_parser(clap::builder::PossibleValuesParser::new(SHOW_COLUMNS))
                        .default_value("live"),
                ),
        )
        .subcommand(
            Command::new("restore")
                .about("Copy a snapshot back into the live content")
                .long_about(
                    "Copy the original or the converted snapshot of documents back into their\n\
                    live content. Documents without a snapshot are never touched.\n\n\
                    Examples:\n  \
                    blockshift restore                        # originals, every snapshot\n  \
                    blockshift restore --ids 7,8              # originals of 7 and 8\n  \
                    blockshift restore --blocks --ids 7       # converted blocks of 7",
                )
                .arg(
                    Arg::new("target")
                        .long("target")
                        .help("Snapshot to restore (defaults to restore.target)")
                        .value_parser(clap::builder::PossibleValuesParser::new(RESTORE_TARGETS))
                        .conflicts_with("blocks"),
                )
                .arg(
                    Arg::new("blocks")
                        .long("blocks")
                        .help("Shorthand for --target converted")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("ids")
                        .long("ids")
                        .value_name("CSV")
                        .help("Comma-separated document ids (default: every snapshot)"),
                ),
        )
}

fn main() {
    let matches = build_cli().get_matches();

    let mut config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));
    if let Some(db) = matches.get_one::<String>("db") {
        config.storage.path = PathBuf::from(db);
    }
    init_logging(&config);

    match matches.subcommand() {
        Some(("pipeline", sub_matches)) => handle_pipeline_command(sub_matches, &config),
        Some(("import", sub_matches)) => handle_import_command(sub_matches, &config),
        Some(("convert", sub_matches)) => handle_convert_command(sub_matches, &config),
        Some(("show", sub_matches)) => handle_show_command(sub_matches, &config),
        Some(("restore", sub_matches)) => handle_restore_command(sub_matches, &config),
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

/// Handle the pipeline command
fn handle_pipeline_command(matches: &ArgMatches, config: &BlockshiftConfig) {
    let path = required::<String>(matches, "file");
    let id = DocumentId(*required::<u64>(matches, "id"));

    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    });

    let engine = build_engine(config);
    let blocks = engine.convert_content(id, &source).unwrap_or_else(|e| {
        eprintln!("Conversion error: {e}");
        std::process::exit(1);
    });

    println!("{blocks}");
}

/// Handle the import command
fn handle_import_command(matches: &ArgMatches, config: &BlockshiftConfig) {
    let path = required::<String>(matches, "file");
    let id = DocumentId(*required::<u64>(matches, "id"));

    let source = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        std::process::exit(1);
    });

    let store = open_store(config);
    store.set_live_content(id, &source).unwrap_or_else(|e| {
        eprintln!("Storage error: {e}");
        std::process::exit(1);
    });

    println!("Imported document {id}");
}

/// Handle the convert command
fn handle_convert_command(matches: &ArgMatches, config: &BlockshiftConfig) {
    let store = open_store(config);

    let ids: Vec<DocumentId> = if matches.get_flag("all") {
        store.document_ids().unwrap_or_else(|e| {
            eprintln!("Storage error: {e}");
            std::process::exit(1);
        })
    } else {
        matches
            .get_many::<u64>("ids")
            .map(|values| values.copied().map(DocumentId).collect())
            .unwrap_or_default()
    };

    let engine = build_engine(config);
    let report = engine.convert_batch(&store, &ids);

    for id in &report.converted {
        println!("converted {id}");
    }
    for err in &report.failed {
        eprintln!("failed {}: {err}", err.document_id());
    }
    println!(
        "{} converted, {} failed",
        report.converted.len(),
        report.failed.len()
    );

    if !report.is_clean() {
        std::process::exit(1);
    }
}

/// Handle the show command
fn handle_show_command(matches: &ArgMatches, config: &BlockshiftConfig) {
    let id = DocumentId(*required::<u64>(matches, "id"));
    let column = required::<String>(matches, "column").as_str();

    let store = open_store(config);
    let doc = store.document(id).unwrap_or_else(|e| {
        eprintln!("Storage error: {e}");
        std::process::exit(1);
    });

    let content = match column {
        "original" => doc.original_content,
        "converted" => doc.converted_content,
        _ => Some(doc.live_content),
    };

    match content {
        Some(content) => println!("{content}"),
        None => {
            eprintln!("Document {id} has no {column} content");
            std::process::exit(1);
        }
    }
}

/// Handle the restore command
fn handle_restore_command(matches: &ArgMatches, config: &BlockshiftConfig) {
    let target = if matches.get_flag("blocks") {
        RestoreTarget::Converted
    } else {
        match matches.get_one::<String>("target") {
            Some(raw) => raw.parse::<RestoreTarget>().unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }),
            None => config.restore.target,
        }
    };

    let scope = match matches.get_one::<String>("ids") {
        Some(raw) => RestoreScope::from_csv(raw).unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }),
        None => RestoreScope::All,
    };

    let store = open_store(config);
    match restore(&store, target, &scope, &mut NoopCache) {
        Ok(count) => println!("Restored {target} content for {count} document(s)"),
        Err(e) => {
            eprintln!("Restore error: {e}");
            std::process::exit(1);
        }
    }
}

fn required<'a, T: Clone + Send + Sync + 'static>(matches: &'a ArgMatches, id: &str) -> &'a T {
    matches.get_one::<T>(id).unwrap_or_else(|| {
        eprintln!("Missing required argument '{id}'");
        std::process::exit(1);
    })
}

fn load_cli_config(explicit_path: Option<&str>) -> BlockshiftConfig {
    let loader = Loader::new().with_optional_file(PROJECT_FILE);
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn init_logging(config: &BlockshiftConfig) {
    let env = env_logger::Env::default().default_filter_or(config.logging.filter.as_str());
    env_logger::Builder::from_env(env).format_timestamp(None).init();
}

fn build_engine(config: &BlockshiftConfig) -> ConversionEngine {
    let settings = PatcherSettings::from(config);
    engine_with_settings(&settings, &config.chain.pre, &config.chain.post).unwrap_or_else(|e| {
        eprintln!("Invalid patch chain: {e}");
        std::process::exit(1);
    })
}

fn open_store(config: &BlockshiftConfig) -> SqliteStore {
    let path = &config.storage.path;
    log::debug!("opening store at {}", path.display());
    SqliteStore::open(path).unwrap_or_else(|e| {
        eprintln!("Error opening store '{}': {e}", path.display());
        std::process::exit(1);
    })
}

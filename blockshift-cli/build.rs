use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of the command tree in src/main.rs
// Build scripts can't access src/ modules, so the shape is repeated here
const RESTORE_TARGETS: &[&str] = &["original", "converted"];
const SHOW_COLUMNS: &[&str] = &["live", "original", "converted"];

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("blockshift")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert legacy HTML content into block markup, reversibly")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("pipeline")
                .arg(Arg::new("file").index(1).value_hint(ValueHint::FilePath))
                .arg(Arg::new("id").long("id")),
        )
        .subcommand(
            Command::new("import")
                .arg(Arg::new("file").index(1).value_hint(ValueHint::FilePath))
                .arg(Arg::new("id").long("id")),
        )
        .subcommand(
            Command::new("convert")
                .arg(Arg::new("ids").index(1).num_args(1..))
                .arg(Arg::new("all").long("all").action(ArgAction::SetTrue)),
        )
        .subcommand(
            Command::new("show").arg(Arg::new("id").index(1)).arg(
                Arg::new("column")
                    .long("column")
                    .value_parser(clap::builder::PossibleValuesParser::new(SHOW_COLUMNS)),
            ),
        )
        .subcommand(
            Command::new("restore")
                .arg(
                    Arg::new("target")
                        .long("target")
                        .value_parser(clap::builder::PossibleValuesParser::new(
                            RESTORE_TARGETS,
                        )),
                )
                .arg(Arg::new("blocks").long("blocks").action(ArgAction::SetTrue))
                .arg(Arg::new("ids").long("ids")),
        );

    // Generate completions for bash
    generate_to(Bash, &mut cmd, "blockshift", &outdir)?;

    // Generate completions for zsh
    generate_to(Zsh, &mut cmd, "blockshift", &outdir)?;

    // Generate completions for fish
    generate_to(Fish, &mut cmd, "blockshift", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}

use clap::{Parser, Subcommand};
use colored::*;
use dafdb::{evaluate, DafReader, FilesDaf, FormatReader, FormatWriter, MemoryDaf};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;

#[derive(Parser)]
#[command(name = "dafdb")]
#[command(version = "0.1")]
#[command(about = "dafdb: typed scientific data in named axes", long_about = None)]
struct Cli {
    /// Directory of a files dataset; in-memory scratch data when omitted
    #[arg(long)]
    path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the query REPL (default)
    Repl,
    /// Run a script of queries, one per line
    Run {
        /// Path to the script file
        file: String,
    },
    /// Create an empty files dataset at --path
    Create {
        /// Dataset name recorded in the manifest
        #[arg(long, default_value = "daf")]
        name: String,
    },
    /// Print a summary of the dataset contents
    Describe,
}

fn open_dataset(path: &Option<String>) -> Result<Box<dyn FormatWriter>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Box::new(FilesDaf::open(path)?)),
        None => Ok(Box::new(MemoryDaf::new("scratch"))),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Create { name }) => {
            let path = cli
                .path
                .ok_or("create requires --path pointing at the dataset directory")?;
            let daf = FilesDaf::create(&path, &name)?;
            println!(
                "Created the daf data: {} at: {}",
                daf.name().green(),
                path.green()
            );
            Ok(())
        }
        Some(Commands::Describe) => {
            let daf = open_dataset(&cli.path)?;
            println!("{}", daf.description());
            Ok(())
        }
        Some(Commands::Run { file }) => {
            let daf = open_dataset(&cli.path)?;
            let content = fs::read_to_string(&file)?;
            run_script(daf.as_ref(), &content)
        }
        Some(Commands::Repl) | None => {
            let daf = open_dataset(&cli.path)?;
            run_repl(daf.as_ref())
        }
    }
}

fn run_script(
    daf: &dyn FormatWriter,
    content: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    for (idx, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        match evaluate(daf, line) {
            Ok(output) => println!("{}", output),
            Err(e) => {
                eprintln!("Error on line {}: {}", idx + 1, e);
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn run_repl(daf: &dyn FormatWriter) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "dafdb query REPL".bold().blue());
    println!("type a query like {}, or 'help'", "vec(cell, age) | Sum".green());

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("daf> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                match line {
                    "exit" | "quit" => break,
                    "help" => {
                        println!("queries: scalar(name) | vec(axis, name) | mat(rows, cols, name) | axis(name)");
                        println!("stages:  at(entry), slice(e1, e2, ...), mask(vector), Abs, Log(base=2), Sum, Mean, ...");
                        println!("other:   describe, exit");
                    }
                    "describe" => println!("{}", daf.description()),
                    query => match evaluate(daf, query) {
                        Ok(output) => println!("{}", output),
                        Err(e) => eprintln!("{}: {}", "Error".red(), e),
                    },
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                break;
            }
        }
    }
    Ok(())
}

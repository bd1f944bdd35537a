use clap::{Parser, ValueEnum};
use log::{LevelFilter, Log, Metadata, Record};
use std::path::Path;
use std::process::exit;

use atn_forge::{
    atn::AtnPrinter,
    automata::create_atn,
    backends::dot::DotGenerator,
    grammar::Grammar,
    tool::ErrorManager,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Dot,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Grammar description in JSON format
    #[arg(short, long, required = true)]
    grammar: String,

    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Only dump this rule
    #[arg(short, long)]
    rule: Option<String>,

    /// Log factory progress to stderr (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    let name = Path::new(&args.grammar)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Grammar".to_string());

    let grammar = match Grammar::parser(name).json_grammar(&args.grammar).map(|b| b.build()) {
        Ok(Ok(grammar)) => grammar,
        Ok(Err(e)) => {
            eprintln!("{}", e);
            exit(1);
        },
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        },
    };

    if let Some(rule) = &args.rule {
        if grammar.rule(rule).is_none() {
            eprintln!("Grammar {} has no rule {}", grammar.name(), rule);
            exit(1);
        }
    }

    let mut errors = ErrorManager::new();
    let atn = match create_atn(&grammar, &mut errors) {
        Ok(atn) => atn,
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        },
    };

    for diagnostic in errors.diagnostics() {
        eprintln!("{}", diagnostic);
    }

    match args.format {
        Format::Text => {
            for rule in grammar.rules() {
                if args.rule.as_ref().map(|r| r != rule.name()).unwrap_or(false) {
                    continue;
                }

                println!("{}:", rule.name());
                print!("{}", AtnPrinter::new(&grammar, &atn, atn.rule_to_start_state()[rule.index()]).as_string());
                println!();
            }
        },
        Format::Dot => {
            let mut generator = DotGenerator::new();

            if let Some(rule) = args.rule {
                generator = generator.rule(rule);
            }

            print!("{}", generator.render(&grammar, &atn));
        },
    }

    if errors.num_errors() > 0 {
        exit(1);
    }
}

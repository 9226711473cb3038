use std::fmt;

use storage::repository::Storage;
use vocab_core::model::{VocabId, VocabItem};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    level: u32,
    items: u32,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLevel { raw: String },
    InvalidItems { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidItems { raw } => write!(f, "invalid --items value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("VOCAB_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3".into());
        let mut level = std::env::var("VOCAB_LEVEL")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(1);
        let mut items = std::env::var("VOCAB_ITEMS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(10);

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--level" => {
                    let value = require_value(&mut args, "--level")?;
                    level = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidLevel { raw: value.clone() })?;
                }
                "--items" => {
                    let value = require_value(&mut args, "--items")?;
                    items = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidItems { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            level,
            items,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3)");
    eprintln!("  --level <n>               Level assigned to seeded items (default: 1)");
    eprintln!("  --items <n>               Number of sample items to upsert (default: 10)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  VOCAB_DB_URL, VOCAB_LEVEL, VOCAB_ITEMS");
}

const SAMPLES: [(&str, Option<&str>, &str); 10] = [
    ("水", Some("みず"), "water"),
    ("火", Some("ひ"), "fire"),
    ("山", Some("やま"), "mountain"),
    ("川", Some("かわ"), "river"),
    ("食べる", Some("たべる"), "to eat"),
    ("飲む", Some("のむ"), "to drink"),
    ("大きい", Some("おおきい"), "big"),
    ("小さい", Some("ちいさい"), "small"),
    ("こんにちは", None, "hello"),
    ("ありがとう", None, "thank you"),
];

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    for i in 0..args.items {
        let (term, reading, meaning) = SAMPLES[(i as usize) % SAMPLES.len()];
        // Cycle the sample list with a suffix so every seeded term is unique.
        let term = if (i as usize) < SAMPLES.len() {
            term.to_owned()
        } else {
            format!("{term} ({i})")
        };
        let item = VocabItem::new(
            VocabId::new(u64::from(i + 1)),
            i,
            args.level,
            term,
            reading.map(ToOwned::to_owned),
            meaning,
        )?;
        storage.catalog.upsert_item(&item).await?;
    }

    println!(
        "Seeded {} vocabulary items at level {} into {}",
        args.items, args.level, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

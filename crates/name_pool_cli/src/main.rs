//! Name Pool CLI
//!
//! Saves newline-separated names as a batch, loads batches back, and
//! prints pool diagnostics.

use std::path::{Path, PathBuf};
use std::sync::Once;

use name_pool::{
    global_pool, load_name_batch, reserve_name_batch, save_name_batch, tear_down, BatchError,
    FindName, NameEntryId, NameError, NamePool, NAME_NO_NUMBER,
};
use thiserror::Error;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber for debug output.
///
/// Enable with `RUST_LOG=name_pool=debug`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Usage(&'static str),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Name { line: usize, source: NameError },

    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Intern the lines of `input`, write `<output>.names` and `<output>.hashes`.
    Save { input: PathBuf, output: PathBuf },
    /// Load `<prefix>.names` and `<prefix>.hashes` and print the names.
    Load { prefix: PathBuf },
    Stats { input: PathBuf },
    Dump { input: PathBuf },
}

const USAGE: &str = "\
Usage: npool <command> [args]

Commands:
  save <names.txt> <prefix>   Write <prefix>.names and <prefix>.hashes
  load <prefix>               Load a saved batch and print its names
  stats <names.txt>           Intern the file and print pool counters
  dump <names.txt>            Intern the file and print every entry

Environment:
  NAME_POOL_CASE_PRESERVING   Keep per-spelling display entries (1/0)
  NAME_POOL_MAX_NAME_LEN      Longest accepted name
  NAME_POOL_SCRAMBLE_KEY      Hex key for scrambled entry storage
  RUST_LOG                    Tracing filter, e.g. name_pool=debug";

fn parse_args(args: &[String]) -> Result<Command, CliError> {
    let arg = |index: usize, usage: &'static str| {
        args.get(index)
            .map(PathBuf::from)
            .ok_or(CliError::Usage(usage))
    };

    match args.get(1).map(String::as_str) {
        Some("save") => Ok(Command::Save {
            input: arg(2, "Usage: npool save <names.txt> <prefix>")?,
            output: arg(3, "Usage: npool save <names.txt> <prefix>")?,
        }),
        Some("load") => Ok(Command::Load {
            prefix: arg(2, "Usage: npool load <prefix>")?,
        }),
        Some("stats") => Ok(Command::Stats {
            input: arg(2, "Usage: npool stats <names.txt>")?,
        }),
        Some("dump") => Ok(Command::Dump {
            input: arg(2, "Usage: npool dump <names.txt>")?,
        }),
        _ => Err(CliError::Usage(USAGE)),
    }
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })
}

fn write(path: &Path, data: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, data).map_err(|source| CliError::Io {
        path: path.to_owned(),
        source,
    })
}

fn with_extension(prefix: &Path, extension: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    PathBuf::from(path)
}

/// Interns every non-empty line verbatim, number suffixes included.
fn intern_lines(pool: &NamePool, input: &Path) -> Result<Vec<NameEntryId>, CliError> {
    let text = String::from_utf8_lossy(&read(input)?).into_owned();
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(index, line)| {
            pool.try_intern_with_number(line, NAME_NO_NUMBER, FindName::Add)
                .map(|name| name.display_id())
                .map_err(|source| CliError::Name {
                    line: index + 1,
                    source,
                })
        })
        .collect()
}

fn run(command: Command, pool: &NamePool) -> Result<(), CliError> {
    match command {
        Command::Save { input, output } => {
            let ids = intern_lines(pool, &input)?;
            let batch = save_name_batch(pool, &ids);
            write(&with_extension(&output, "names"), &batch.names)?;
            write(&with_extension(&output, "hashes"), &batch.hashes)?;
            println!(
                "saved {} names ({} name bytes)",
                batch.num_names(),
                batch.names.len()
            );
        }
        Command::Load { prefix } => {
            let names = read(&with_extension(&prefix, "names"))?;
            let hashes = read(&with_extension(&prefix, "hashes"))?;
            reserve_name_batch(pool, names.len(), hashes.len());
            for id in load_name_batch(pool, &names, &hashes)? {
                println!("{}", pool.resolve(id));
            }
        }
        Command::Stats { input } => {
            intern_lines(pool, &input)?;
            let stats = pool.stats();
            println!("entries:      {}", stats.entries);
            println!("  ansi:       {}", stats.ansi_entries);
            println!("  wide:       {}", stats.wide_entries);
            println!("blocks:       {}", stats.blocks);
            println!("slots:        {}", stats.slots);
            println!("entry bytes:  {}", stats.entry_memory_bytes);
        }
        Command::Dump { input } => {
            intern_lines(pool, &input)?;
            for entry in pool.debug_dump() {
                println!("{:>10}  {entry}", entry.id().to_unstable_int());
            }
        }
    }
    Ok(())
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let result = parse_args(&args).and_then(|command| {
        let pool = global_pool();
        let result = run(command, &pool);
        tear_down();
        result
    });

    if let Err(err) = result {
        match err {
            CliError::Usage(usage) => eprintln!("{usage}"),
            err => eprintln!("error: {err}"),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("npool")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_args(&args(&["save", "in.txt", "out/batch"])).ok(),
            Some(Command::Save {
                input: PathBuf::from("in.txt"),
                output: PathBuf::from("out/batch"),
            })
        );
        assert_eq!(
            parse_args(&args(&["load", "out/batch"])).ok(),
            Some(Command::Load {
                prefix: PathBuf::from("out/batch"),
            })
        );
        assert_eq!(
            parse_args(&args(&["dump", "in.txt"])).ok(),
            Some(Command::Dump {
                input: PathBuf::from("in.txt"),
            })
        );
    }

    #[test]
    fn test_parse_rejects_missing_arguments() {
        assert!(matches!(parse_args(&args(&[])), Err(CliError::Usage(USAGE))));
        assert!(matches!(parse_args(&args(&["frobnicate"])), Err(CliError::Usage(_))));
        assert!(matches!(parse_args(&args(&["save", "in.txt"])), Err(CliError::Usage(_))));
    }

    #[test]
    fn test_with_extension_appends() {
        assert_eq!(
            with_extension(Path::new("dir/batch.v1"), "names"),
            PathBuf::from("dir/batch.v1.names")
        );
    }

    #[test]
    fn test_save_then_load_through_files() {
        let dir = std::env::temp_dir().join(format!("npool-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("{e}"));
        let input = dir.join("names.txt");
        std::fs::write(&input, "Alpha\nbeta_2\n\n\u{3042}\n").unwrap_or_else(|e| panic!("{e}"));
        let prefix = dir.join("batch");

        let pool = NamePool::new();
        let saved = intern_lines(&pool, &input).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(saved.len(), 3);
        run(
            Command::Save {
                input,
                output: prefix.clone(),
            },
            &pool,
        )
        .unwrap_or_else(|e| panic!("{e}"));

        let names = read(&with_extension(&prefix, "names")).unwrap_or_else(|e| panic!("{e}"));
        let hashes = read(&with_extension(&prefix, "hashes")).unwrap_or_else(|e| panic!("{e}"));
        let fresh = NamePool::new();
        let loaded = load_name_batch(&fresh, &names, &hashes).unwrap_or_else(|e| panic!("{e}"));
        let strings: Vec<String> = loaded.iter().map(|id| fresh.resolve(*id).to_string()).collect();
        assert_eq!(strings, ["Alpha", "beta_2", "\u{3042}"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}

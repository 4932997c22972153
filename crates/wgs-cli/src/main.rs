use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use wgs_core::{
    BatchReport, ConvertOptions, Locator, OutputMode, RootStrategy, SaveContainer,
};

#[derive(Parser, Debug)]
#[command(
    name = "wgs2steam",
    about = "Convert Rogue Trader Game Pass (WGS) saves into Steam .zks saves",
    version
)]
struct Cli {
    /// WGS root to scan (defaults to the Game Pass package under the user profile)
    #[arg(short, long, env = "WGS2STEAM_SOURCE", value_name = "DIR")]
    source: Option<PathBuf>,
    /// Steam save folder to write into (created if missing)
    #[arg(
        short,
        long,
        env = "WGS2STEAM_DEST",
        value_name = "DIR",
        alias = "steam-save-path"
    )]
    dest: Option<PathBuf>,
    /// List containers and pick which ones to convert
    #[arg(short, long, default_value_t = false)]
    interactive: bool,
    /// Only convert the most recently modified container
    #[arg(long, default_value_t = false, conflicts_with = "interactive")]
    latest: bool,
    /// Re-zip the save with its screenshots and header instead of copying the payload
    #[arg(long, default_value_t = false)]
    assemble: bool,
    /// Clear DLC references in header.json and player.json (needs --assemble)
    #[arg(long, default_value_t = false)]
    fix_dlc: bool,
    /// Do everything except writing files
    #[arg(long, alias = "dryrun", default_value_t = false)]
    dry_run: bool,
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let profile = wgs_core::user_profile();
    let strategies = match (&cli.source, &profile) {
        (Some(src), _) => vec![RootStrategy::Exact(src.clone())],
        (None, Some(home)) => wgs_core::default_strategies(home),
        (None, None) => {
            eprintln!("error: no --source given and neither USERPROFILE nor HOME is set");
            std::process::exit(2);
        }
    };
    let dest = match (&cli.dest, &profile) {
        (Some(d), _) => d.clone(),
        (None, Some(home)) => wgs_core::default_destination(home),
        (None, None) => {
            eprintln!("error: no --dest given and neither USERPROFILE nor HOME is set");
            std::process::exit(2);
        }
    };

    let locator = Locator::from_strategies(&strategies).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(2);
    });
    if locator.is_empty() {
        eprintln!("error: no save containers in {}", locator.root().display());
        std::process::exit(2);
    }

    if cli.fix_dlc && !cli.assemble {
        log::warn!("--fix-dlc has no effect without --assemble");
    }
    let opts = ConvertOptions {
        dest_dir: dest,
        mode: if cli.assemble { OutputMode::Assemble } else { OutputMode::Verbatim },
        fix_dlc: cli.fix_dlc,
        dry_run: cli.dry_run,
    };

    let selected: Vec<&Path> = if cli.interactive {
        cmd_pick(&locator, &opts)
    } else if cli.latest {
        match locator.latest() {
            Some(p) => vec![p],
            None => {
                eprintln!("error: cannot read container timestamps");
                std::process::exit(2);
            }
        }
    } else {
        locator.container_dirs().iter().map(PathBuf::as_path).collect()
    };
    if selected.is_empty() {
        println!("Nothing selected.");
        return;
    }

    if !opts.dry_run {
        wgs_core::ensure_dest_dir(&opts.dest_dir).unwrap_or_else(|e| {
            eprintln!("error: {}", e);
            std::process::exit(2);
        });
    }
    let report = wgs_core::convert_all(selected, &opts);
    print_summary(&report, opts.dry_run);
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn cmd_pick<'a>(locator: &'a Locator, opts: &ConvertOptions) -> Vec<&'a Path> {
    let dirs = locator.container_dirs();
    for (i, dir) in dirs.iter().enumerate() {
        println!("{:>3}. {}", i + 1, describe(dir, opts));
    }
    print!("Convert which? [all | 1,2,... | empty to cancel]: ");
    io::stdout().flush().ok();

    let mut line = String::new();
    if let Err(e) = io::stdin().lock().read_line(&mut line) {
        eprintln!("error reading selection: {}", e);
        std::process::exit(3);
    }
    match parse_selection(&line, dirs.len()) {
        Ok(idx) => idx.into_iter().map(|i| dirs[i].as_path()).collect(),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(3);
        }
    }
}

fn describe(dir: &Path, opts: &ConvertOptions) -> String {
    let name = dir.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let c = match SaveContainer::open(dir) {
        Ok(c) => c,
        Err(e) => return format!("{}\t{}", name, e),
    };
    let when = c
        .modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "?".into());
    let verdict = match wgs_core::probe(&c, opts) {
        Ok(s) => format!(
            "looks convertible ({} by {})",
            s.payload.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            s.rule
        ),
        Err(e) => e.to_string(),
    };
    format!(
        "{}\t{}\t{} blob(s), {:.2} MB\t{}",
        name,
        when,
        c.blobs.len(),
        c.total_size() as f64 / (1024.0 * 1024.0),
        verdict
    )
}

/// `all`, or 1-based indices separated by commas/spaces. Empty input selects nothing.
fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input.eq_ignore_ascii_case("all") || input == "*" {
        return Ok((0..count).collect());
    }
    let mut out = Vec::new();
    for tok in input.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
        let n: usize = tok.parse().map_err(|_| format!("not a number: {}", tok))?;
        if n == 0 || n > count {
            return Err(format!("out of range: {} (1..={})", n, count));
        }
        if !out.contains(&(n - 1)) {
            out.push(n - 1);
        }
    }
    Ok(out)
}

fn print_summary(report: &BatchReport, dry_run: bool) {
    println!();
    for o in &report.outcomes {
        match &o.result {
            Ok(s) if s.written => println!("ok     {} -> {} ({} bytes)", o.id, s.dest.display(), s.len),
            Ok(s) => println!("dry    {} -> {} ({} bytes, not written)", o.id, s.dest.display(), s.len),
            Err(e) => println!("FAILED {}: {}", o.id, e),
        }
    }
    println!(
        "{} succeeded, {} failed{}",
        report.successes(),
        report.failures(),
        if dry_run { " (dry run)" } else { "" }
    );
}

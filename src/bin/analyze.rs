//! CLI companion for the analysis engine (spec §6).
//!
//! Grounded on the clap-derive argument-parsing convention used throughout
//! `hostd/src/main.rs`, reduced to the single subcommand this crate needs.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use modwarden::config::{cache_root, GameRegistry};
use modwarden::coordinator::AnalysisCoordinator;
use modwarden::masterlist::MasterlistStore;
use modwarden::model::{AnalysisOverrides, AnalysisRequest, HardwareProfile};

#[derive(Parser, Debug)]
#[command(name = "analyze", about = "Analyze a Bethesda-game mod list for compatibility problems")]
struct Args {
    #[arg(long)]
    game: String,

    /// Path to the mod list, or `-` for stdin.
    #[arg(long, default_value = "-")]
    input: String,

    #[arg(long)]
    hardware_tier: Option<String>,

    #[arg(long)]
    vram_gb: Option<f64>,

    #[arg(long)]
    info_cap: Option<usize>,

    #[arg(long)]
    masterlist_version: Option<String>,

    #[arg(long, default_value_t = false)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let _ = dotenv::dotenv();
    modwarden::logging::init();

    let args = Args::parse();
    let exit_code = run(args).await;
    std::process::exit(exit_code);
}

async fn run(args: Args) -> i32 {
    let raw_list = match read_input(&args.input) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("failed to read input: {e}");
            return 2;
        }
    };

    let hardware_profile = match (args.hardware_tier, args.vram_gb) {
        (Some(tier), Some(vram_gb)) => Some(HardwareProfile { tier, vram_gb }),
        (None, None) => None,
        _ => {
            eprintln!("--hardware-tier and --vram-gb must be supplied together");
            return 2;
        }
    };

    let options = AnalysisOverrides {
        info_cap: args.info_cap,
        freshness_window_days: None,
        heaviest_n: None,
        masterlist_version: args.masterlist_version,
    };

    let request = AnalysisRequest {
        raw_list,
        game: args.game,
        hardware_profile,
        options: Some(options),
    };

    let store = MasterlistStore::new(cache_root());
    let coordinator = AnalysisCoordinator::new(store, GameRegistry::default());

    match coordinator.analyze(request, Duration::from_secs(30)).await {
        Ok(report) => {
            print_report(&report, args.json);
            0
        }
        Err(e) => {
            if args.json {
                let body = serde_json::json!({ "kind": e.kind(), "message": e.to_string() });
                println!("{body}");
            } else {
                eprintln!("{}: {}", e.kind(), e);
            }
            e.exit_code()
        }
    }
}

fn print_report(report: &modwarden::CanonicalReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("failed to serialize report: {e}"),
        }
        return;
    }

    println!("game: {}", report.game);
    println!("masterlist version: {}", report.masterlist_version);
    println!(
        "entries: {} enabled, {} disabled",
        report.list_summary.enabled_entries, report.list_summary.disabled_entries
    );
    println!(
        "findings: {} errors, {} warnings, {} info{}",
        report.findings_by_severity.errors.len(),
        report.findings_by_severity.warnings.len(),
        report.findings_by_severity.info.len(),
        if report.info_capped { format!(" ({} dropped)", report.dropped_info) } else { String::new() }
    );
    for finding in &report.findings_by_severity.errors {
        println!("  [error] {}", finding.message);
    }
    for finding in &report.findings_by_severity.warnings {
        println!("  [warning] {}", finding.message);
    }
    println!("suggested order: {}", report.suggested_order.order.join(", "));
    println!("total pressure: {}", report.impact_report.total_pressure);
}

fn read_input(path: &str) -> std::io::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(PathBuf::from(path))
    }
}

use anyhow::{Context, Result};
use canarias_rd::data_quality::DataQualityEngine;
use canarias_rd::locale::{format_decimal, format_optional};
use canarias_rd::summary::{country_ranking, sector_breakdown, summarize, tooltip_lines};
use canarias_rd::{load_dataset, DashboardConfig, EntityCatalog, RecordMatcher, Sector, Severity};
use std::env;
use std::path::Path;
use std::sync::Arc;

const USAGE: &str = "\
Usage:
  canarias-rd summary <file> <entity> <year> [sector]
  canarias-rd rank    <file> <year> [sector]
  canarias-rd sectors <file> <entity> <year>
  canarias-rd audit   <file>
  canarias-rd ui      <file> [year]

Environment:
  CANARIAS_RD_CONFIG  JSON config file
  CANARIAS_RD_LOCALE  es | en";

fn main() -> Result<()> {
    let config = DashboardConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let catalog = Arc::new(EntityCatalog::with_defaults());
    let matcher = RecordMatcher::from_config(catalog, &config);

    let args: Vec<String> = env::args().skip(1).collect();
    let arg = |i: usize, name: &str| {
        args.get(i)
            .map(String::as_str)
            .with_context(|| format!("Missing <{}>\n\n{}", name, USAGE))
    };

    match args.first().map(String::as_str) {
        Some("summary") => run_summary(
            &matcher,
            arg(1, "file")?,
            arg(2, "entity")?,
            parse_year(arg(3, "year")?)?,
            parse_sector(args.get(4))?,
        ),
        Some("rank") => run_rank(
            &matcher,
            arg(1, "file")?,
            parse_year(arg(2, "year")?)?,
            parse_sector(args.get(3))?,
        ),
        Some("sectors") => run_sectors(
            &matcher,
            arg(1, "file")?,
            arg(2, "entity")?,
            parse_year(arg(3, "year")?)?,
        ),
        Some("audit") => run_audit(matcher, arg(1, "file")?),
        Some("ui") => {
            let year = args.get(2).map(|y| parse_year(y)).transpose()?;
            run_ui_mode(matcher, arg(1, "file")?, year)
        }
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn parse_year(raw: &str) -> Result<i32> {
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid year: {}", raw))
}

fn parse_sector(raw: Option<&String>) -> Result<Sector> {
    match raw {
        Some(s) => Ok(s.parse::<Sector>()?),
        None => Ok(Sector::Total),
    }
}

fn run_summary(matcher: &RecordMatcher, file: &str, entity: &str, year: i32, sector: Sector) -> Result<()> {
    let dataset = load_dataset(Path::new(file))?;
    let locale = matcher.locale;

    println!("📊 {} ({} observations)", dataset.name, dataset.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    match summarize(matcher, &dataset.observations, entity, year, sector) {
        Some(summary) => {
            for line in tooltip_lines(&summary, locale) {
                println!("  {}", line);
            }
            if let Some(strategy) = summary.strategy {
                println!("  ({})", strategy.as_str());
            }
        }
        None => println!("❌ {}: {}", entity, locale.no_data()),
    }

    Ok(())
}

fn run_rank(matcher: &RecordMatcher, file: &str, year: i32, sector: Sector) -> Result<()> {
    let dataset = load_dataset(Path::new(file))?;
    let locale = matcher.locale;
    let ranking = country_ranking(matcher, &dataset.observations, year, sector);

    println!("🏆 {} · {} · {}", dataset.name, year, sector.name(locale));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if ranking.is_empty() {
        println!("  {}", locale.no_data());
    }
    for entry in &ranking {
        println!(
            "  {:>3}/{:<3} {:<32} {:>10}",
            entry.position.rank,
            entry.position.total,
            entry.name,
            format_decimal(entry.value, 2, locale)
        );
    }

    Ok(())
}

fn run_sectors(matcher: &RecordMatcher, file: &str, entity: &str, year: i32) -> Result<()> {
    let dataset = load_dataset(Path::new(file))?;
    let locale = matcher.locale;
    let breakdown = sector_breakdown(matcher, &dataset.observations, entity, year);
    let name = matcher.catalog().display_name(entity, locale);

    println!("🧩 {} · {}", name, year);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "  {:<28} {:>10}",
        Sector::Total.name(locale),
        format_optional(breakdown.total, 2, locale)
    );
    for share in &breakdown.sectors {
        println!(
            "  {:<28} {:>10} {:>10}",
            share.sector.name(locale),
            format_optional(share.value, 2, locale),
            match share.share {
                Some(s) => format!("{} %", format_decimal(s, 1, locale)),
                None => locale.no_data().to_string(),
            }
        );
    }

    Ok(())
}

fn run_audit(matcher: RecordMatcher, file: &str) -> Result<()> {
    let dataset = load_dataset(Path::new(file))?;
    let engine = DataQualityEngine::new(matcher);

    println!("✅ Data quality audit: {}", dataset.name);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let audit = engine.audit(&dataset);
    for report in audit.with_issues() {
        for issue in &report.issues {
            let icon = match issue.severity {
                Severity::Critical => "❌",
                Severity::Warning => "⚠️ ",
                Severity::Info => "ℹ️ ",
            };
            println!("  {} {} [{}] {}", icon, report.observation_ref, issue.field, issue.issue);
        }
    }

    println!("\n{}", audit.summary.summary());
    println!("Version: {}", &audit.version[..12.min(audit.version.len())]);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(matcher: RecordMatcher, file: &str, year: Option<i32>) -> Result<()> {
    let dataset = load_dataset(Path::new(file))?;
    let year = year
        .or_else(|| dataset.years().last().copied())
        .with_context(|| format!("{} has no observations", dataset.name))?;

    println!("🖥️  Starting UI... (Press 'q' to quit)\n");

    let mut app = canarias_rd::ui::App::new(dataset, matcher, year);
    canarias_rd::ui::run_ui(&mut app)?;

    println!("\n✅ UI closed");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_matcher: RecordMatcher, _file: &str, _year: Option<i32>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    std::process::exit(1);
}

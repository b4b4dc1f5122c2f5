//! fireflycache - quick expense entry for Firefly III from the terminal.
//!
//! Reads come from the local store and trigger a background refresh; the
//! `sync` command waits for a full refresh instead.

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{Local, NaiveDate};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fireflycache_core::models::{EXPENSE, REVENUE};
use fireflycache_core::{
    AccountList, Config, Coordinates, Error, FireflyClient, Store, SyncEngine, TransactionDraft,
    TransactionKind,
};

const USAGE: &str = "\
Usage: fireflycache <command>

Commands:
  settings [show]                 Show the remote settings
  settings set [<url> <token>]    Save remote settings (falls back to FIREFLY_URL / FIREFLY_TOKEN)
  sync                            Refresh every category and wait for it
  accounts <type>                 List cached accounts (asset, expense, revenue)
  budgets                         List cached budgets
  nearby <lat> <lon> [type]       Suggest the closest remembered counterparty
  new-account <name> <type>       Create an expense or revenue account
  add <kind> <amount> <asset_id> <other_id> [options]
      kind: withdrawal | deposit | transfer
      --budget <id> --description <text> --date <YYYY-MM-DD>
      --receipt <file> --lat <lat> --lon <lon>";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr and to a daily rolling file under the data directory.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=fireflycache_core=debug).
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fireflycache.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load().context("Failed to load config")?;
    let _guard = init_tracing(&config);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    if command == "--help" || command == "-h" || command == "help" {
        println!("{}", USAGE);
        return Ok(());
    }

    let store_path = config.store_path()?;
    let store = Arc::new(
        Store::open(&store_path)
            .with_context(|| format!("Failed to open store at {}", store_path.display()))?,
    );
    let client = FireflyClient::with_timeout(store.settings(), config.request_timeout())?;
    let engine = SyncEngine::new(store, Arc::new(client));
    info!(store = %store_path.display(), command = %command, "fireflycache starting");

    let result = run(&engine, command, &args[1..]).await;
    // Reads start background refreshes; let them commit before the runtime goes away.
    engine.shutdown().await;

    if let Err(ref e) = result {
        if let Some(hint) = error_hint(e) {
            eprintln!("{}", hint);
        }
    }
    result
}

async fn run(engine: &SyncEngine, command: &str, rest: &[String]) -> Result<()> {
    match command {
        "settings" => settings(engine, rest),
        "sync" => sync(engine).await,
        "accounts" => accounts(engine, rest),
        "budgets" => budgets(engine),
        "nearby" => nearby(engine, rest),
        "new-account" => new_account(engine, rest).await,
        "add" => add(engine, rest).await,
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn settings(engine: &SyncEngine, args: &[String]) -> Result<()> {
    match args.first().map(String::as_str) {
        None | Some("show") => {
            let settings = engine.settings();
            if settings.is_configured() {
                println!("url:   {}", settings.url);
                println!("token: (set)");
            } else {
                println!("Not configured. Run `fireflycache settings set <url> <token>`.");
            }
            Ok(())
        }
        Some("set") => {
            let url = args
                .get(1)
                .cloned()
                .or_else(|| std::env::var("FIREFLY_URL").ok())
                .ok_or_else(|| anyhow!("Missing <url> (or FIREFLY_URL)"))?;
            let token = args
                .get(2)
                .cloned()
                .or_else(|| std::env::var("FIREFLY_TOKEN").ok())
                .ok_or_else(|| anyhow!("Missing <token> (or FIREFLY_TOKEN)"))?;
            engine.save_settings(&url, &token)?;
            println!("Saved settings for {}", url);
            Ok(())
        }
        Some(other) => bail!("Unknown settings command '{}'", other),
    }
}

async fn sync(engine: &SyncEngine) -> Result<()> {
    require_settings(engine)?;
    for report in engine.refresh_all().await {
        let status = if report.is_complete() { "ok" } else { "partial" };
        println!(
            "{:<18} {:>3}/{:<3} pages  {:>5} records  {}",
            report.category.to_string(),
            report.pages_committed,
            report.total_pages,
            report.records_written,
            status
        );
    }
    Ok(())
}

fn accounts(engine: &SyncEngine, args: &[String]) -> Result<()> {
    let account_type = args
        .first()
        .ok_or_else(|| anyhow!("Missing <type>"))?
        .as_str();
    match engine.accounts(account_type)? {
        AccountList::Assets(assets) => {
            for asset in assets {
                println!("{:>6}  {}", asset.id, asset.name);
            }
        }
        AccountList::Others(others) => {
            for other in others {
                let preferred = other
                    .preferred_asset
                    .map(|id| format!("  (asset {})", id))
                    .unwrap_or_default();
                println!("{:>6}  {}{}", other.id, other.name, preferred);
            }
        }
    }
    Ok(())
}

fn budgets(engine: &SyncEngine) -> Result<()> {
    for budget in engine.budgets()? {
        println!("{:>6}  {}", budget.id, budget.name);
    }
    Ok(())
}

fn nearby(engine: &SyncEngine, args: &[String]) -> Result<()> {
    let at = coordinates(args.first(), args.get(1))?;
    let account_type = args.get(2).map(String::as_str).unwrap_or(EXPENSE);

    match engine.suggest(at, account_type) {
        Some(suggestion) => {
            println!(
                "{} ({}) {:.0} m away",
                suggestion.other.name, suggestion.other.id, suggestion.distance_meters
            );
            if let Some(asset) = suggestion.preferred_asset {
                println!("  asset:  {} ({})", asset.name, asset.id);
            }
            if let Some(budget) = suggestion.preferred_budget {
                println!("  budget: {} ({})", budget.name, budget.id);
            }
        }
        None => println!("No remembered {} account nearby", account_type),
    }
    Ok(())
}

async fn new_account(engine: &SyncEngine, args: &[String]) -> Result<()> {
    require_settings(engine)?;
    let (Some(name), Some(account_type)) = (args.first(), args.get(1)) else {
        bail!("Usage: fireflycache new-account <name> <type>");
    };
    if account_type != EXPENSE && account_type != REVENUE {
        bail!("Account type must be expense or revenue");
    }
    let created = engine.save_other(name, account_type).await?;
    println!("Created {} account {} ({})", created.account_type, created.name, created.id);
    Ok(())
}

async fn add(engine: &SyncEngine, args: &[String]) -> Result<()> {
    require_settings(engine)?;
    if args.len() < 4 {
        bail!("Usage: fireflycache add <kind> <amount> <asset_id> <other_id> [options]");
    }
    let kind = parse_kind(&args[0])?;
    let amount_minor = parse_amount(&args[1])?;
    let asset_id = args[2].parse().context("Invalid <asset_id>")?;
    let other_id = args[3].parse().context("Invalid <other_id>")?;

    let mut draft = TransactionDraft {
        kind,
        amount_minor,
        description: String::new(),
        date: Local::now().date_naive(),
        asset_id,
        other_id,
        budget_id: None,
    };
    let mut receipt = None;
    let mut lat = None;
    let mut lon = None;

    let mut options = args[4..].iter();
    while let Some(flag) = options.next() {
        let value = options
            .next()
            .ok_or_else(|| anyhow!("Missing value for {}", flag))?;
        match flag.as_str() {
            "--budget" => draft.budget_id = Some(value.parse().context("Invalid --budget")?),
            "--description" => draft.description = value.clone(),
            "--date" => {
                draft.date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .context("Invalid --date, expected YYYY-MM-DD")?
            }
            "--receipt" => receipt = Some(read_receipt(Path::new(value))?),
            "--lat" => lat = Some(value),
            "--lon" => lon = Some(value),
            other => bail!("Unknown option '{}'", other),
        }
    }
    let location = match (lat, lon) {
        (None, None) => None,
        (lat, lon) => Some(coordinates(lat, lon)?),
    };

    let response = engine
        .save_transaction(draft.into_submission(receipt, location))
        .await?;
    let id = response
        .pointer("/data/id")
        .and_then(|id| id.as_str())
        .unwrap_or("?");
    println!("Saved transaction {}", id);
    Ok(())
}

/// Follow-up advice for failures the user can act on.
fn error_hint(err: &anyhow::Error) -> Option<&'static str> {
    match err.downcast_ref::<Error>()? {
        Error::Transport(e) if e.is_unauthorized() => Some(
            "The server rejected the access token. Save a new one with `fireflycache settings set <url> <token>`.",
        ),
        Error::Network(_) => {
            Some("Could not reach the server. Check the URL with `fireflycache settings show`.")
        }
        e if e.is_remote() => Some("The Firefly III server refused the request."),
        _ => None,
    }
}

fn require_settings(engine: &SyncEngine) -> Result<()> {
    if !engine.settings().is_configured() {
        bail!("Not configured. Run `fireflycache settings set <url> <token>` first.");
    }
    Ok(())
}

fn parse_kind(raw: &str) -> Result<TransactionKind> {
    match raw {
        "withdrawal" => Ok(TransactionKind::Withdrawal),
        "deposit" => Ok(TransactionKind::Deposit),
        "transfer" => Ok(TransactionKind::Transfer),
        other => bail!("Unknown transaction kind '{}'", other),
    }
}

/// Parse "12.95" or "12" into cents.
fn parse_amount(raw: &str) -> Result<i64> {
    let raw = raw.trim().replace(',', ".");
    let (whole, fraction) = raw.split_once('.').unwrap_or((raw.as_str(), ""));
    if whole.is_empty() || fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid amount '{}'", raw);
    }
    let whole: i64 = whole.parse().with_context(|| format!("Invalid amount '{}'", raw))?;
    if whole < 0 {
        bail!("Amount must be positive");
    }
    let fraction: i64 = format!("{:0<2}", fraction).parse()?;
    Ok(whole * 100 + fraction)
}

fn coordinates(lat: Option<&String>, lon: Option<&String>) -> Result<Coordinates> {
    let (Some(lat), Some(lon)) = (lat, lon) else {
        bail!("Both latitude and longitude are required");
    };
    let latitude: f64 = lat.parse().context("Invalid latitude")?;
    let longitude: f64 = lon.parse().context("Invalid longitude")?;
    Ok(Coordinates::new(latitude, longitude))
}

fn read_receipt(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read receipt {}", path.display()))?;
    Ok(BASE64_STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.95").unwrap(), 1295);
        assert_eq!(parse_amount("12,5").unwrap(), 1250);
        assert_eq!(parse_amount("7").unwrap(), 700);
        assert!(parse_amount("1.234").is_err());
        assert!(parse_amount("-3").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_error_hint() {
        use fireflycache_core::RequestError;

        let unauthorized = anyhow::Error::from(Error::Transport(RequestError {
            status: 401,
            message: "Unauthorized".to_string(),
        }))
        .context("Failed to sync");
        assert!(error_hint(&unauthorized).unwrap().contains("access token"));

        let rejected = anyhow::Error::from(Error::RemoteValidation {
            message: "The given data was invalid.".to_string(),
            errors: serde_json::json!({"name": ["taken"]}),
        });
        assert!(error_hint(&rejected).unwrap().contains("refused"));

        let local = anyhow::Error::from(Error::Storage("disk full".to_string()));
        assert!(error_hint(&local).is_none());
        assert!(error_hint(&anyhow!("Missing <type>")).is_none());
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("deposit").unwrap(), TransactionKind::Deposit);
        assert!(parse_kind("refund").is_err());
    }

    #[test]
    fn test_coordinates_need_both() {
        let lat = "52.52".to_string();
        assert!(coordinates(Some(&lat), None).is_err());
        let at = coordinates(Some(&lat), Some(&"13.40".to_string())).unwrap();
        assert_eq!(at, Coordinates::new(52.52, 13.40));
    }
}

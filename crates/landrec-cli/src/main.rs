//! landrec - a terminal client for the municipal property-records service.
//!
//! Thin front-end over `landrec-core`: logs staff in and out, looks up
//! parcel records, and prints the report feeds. All session handling
//! (token refresh, 401 replay, redirect-to-login) lives in the core.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use landrec_core::api::transport::HttpTransport;
use landrec_core::api::RecordSearch;
use landrec_core::auth::CredentialStore;
use landrec_core::models::Record;
use landrec_core::{ApiClient, Config, SessionManager, SessionStore};

/// Group whose members get the administrative screens. Claims are decoded
/// locally and gate display only; the backend re-checks every call.
const ADMIN_GROUP: &str = "Administrators";

fn usage() -> &'static str {
    "landrec - property records client

USAGE:
    landrec login [username] [--remember]
    landrec logout
    landrec status
    landrec records [--recent]
    landrec search <UPIN>
    landrec search --archive <code> | --service <v> | --kebele <v> | --proof <v> | --possession <v>
    landrec files <UPIN>
    landrec stats
    landrec dashboard
    landrec audit
    landrec users
    landrec groups

Set LANDREC_API_URL (or a .env file) to point at a non-default backend.
RUST_LOG controls log verbosity; logs go to the cache directory."
}

fn init_tracing(log_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let appender = tracing_appender::rolling::daily(log_dir, "landrec.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{}", usage());
        return Ok(());
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    let session_dir = config.session_dir()?;
    let _guard = init_tracing(&session_dir);
    info!(command = %args[0], "landrec starting");

    let transport = Arc::new(HttpTransport::new().context("Failed to build HTTP client")?);
    let mut store = SessionStore::new(session_dir);
    store.load().context("Failed to load saved session")?;
    let session = SessionManager::new(transport, config.api_base_url.clone(), store);
    let client = ApiClient::new(session);

    match args[0].as_str() {
        "login" => login(&client, &mut config, &args[1..]).await,
        "logout" => {
            client.session().logout().await;
            println!("Logged out.");
            Ok(())
        }
        "status" => status(&client).await,
        command => {
            // Everything else needs a live session.
            if !client.session().verify_auth().await {
                anyhow::bail!("Not logged in (or session expired). Run `landrec login` first.");
            }
            match command {
                "records" => records(&client, &args[1..]).await,
                "search" => search(&client, &args[1..]).await,
                "files" => files(&client, &args[1..]).await,
                "stats" => stats(&client).await,
                "dashboard" => dashboard(&client).await,
                "audit" => audit(&client).await,
                "users" => users(&client).await,
                "groups" => groups(&client).await,
                other => anyhow::bail!("Unknown command '{other}'.\n\n{}", usage()),
            }
        }
    }
}

async fn login(client: &ApiClient, config: &mut Config, args: &[String]) -> Result<()> {
    let remember = args.iter().any(|a| a == "--remember");
    let username = match args.iter().find(|a| !a.starts_with("--")) {
        Some(name) => name.clone(),
        None => match &config.last_username {
            Some(name) => name.clone(),
            None => prompt("Username: ")?,
        },
    };

    let password = match CredentialStore::lookup(&username) {
        Ok(saved) => {
            println!("Using remembered password for {username}.");
            saved
        }
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    let profile = client.session().login(&username, &password).await?;

    if remember {
        if let Err(error) = CredentialStore::store(&username, &password) {
            eprintln!("Warning: could not remember password: {error:#}");
        }
    }
    config.last_username = Some(username);
    config.save()?;

    println!("Logged in as {} ({})", profile.username, profile.email);
    let claims = client.session().claims().await;
    if claims.is_superuser || claims.groups.iter().any(|g| g == ADMIN_GROUP) {
        println!("Administrative screens available.");
    }
    Ok(())
}

async fn status(client: &ApiClient) -> Result<()> {
    if !client.session().verify_auth().await {
        println!("Not logged in.");
        return Ok(());
    }
    let claims = client.session().claims().await;
    match client.session().profile().await {
        Some(profile) => {
            println!("Logged in as {} (user id {})", profile.username, profile.user_id);
            if !profile.email.is_empty() {
                println!("Email:  {}", profile.email);
            }
        }
        None => println!("Logged in (user id {})", claims.user_id),
    }
    if !claims.groups.is_empty() {
        println!("Groups: {}", claims.groups.join(", "));
    }
    let admin = claims.is_superuser || claims.groups.iter().any(|g| g == ADMIN_GROUP);
    println!("Admin:  {}", if admin { "yes" } else { "no" });
    Ok(())
}

fn print_records(records: &[Record]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }
    println!(
        "{:<16} {:<28} {:<8} {:<18} {}",
        "UPIN", "Owner", "Kebele", "Service", "Possession"
    );
    for record in records {
        println!(
            "{:<16} {:<28} {:<8} {:<18} {}",
            record.upin,
            record.property_owner_name,
            record.kebele,
            record.service_of_estate,
            record.possession_status
        );
    }
    println!("{} record(s).", records.len());
}

async fn records(client: &ApiClient, args: &[String]) -> Result<()> {
    let records = if args.iter().any(|a| a == "--recent") {
        client.recent_records().await?
    } else {
        client.list_records().await?
    };
    print_records(&records);
    Ok(())
}

async fn search(client: &ApiClient, args: &[String]) -> Result<()> {
    let records = match args {
        [flag, value] => match flag.as_str() {
            "--archive" => {
                client
                    .search_records(RecordSearch::ArchiveCode(value.as_str()))
                    .await?
            }
            "--service" => client.search_by_service(value).await?,
            "--kebele" => client.search_by_kebele(value).await?,
            "--proof" => client.search_by_proof(value).await?,
            "--possession" => client.search_by_possession(value).await?,
            other => anyhow::bail!("Unknown search flag '{other}'.\n\n{}", usage()),
        },
        [upin] => client.search_records(RecordSearch::Upin(upin.as_str())).await?,
        _ => anyhow::bail!("search needs a UPIN or a flag with a value.\n\n{}", usage()),
    };
    print_records(&records);
    Ok(())
}

async fn files(client: &ApiClient, args: &[String]) -> Result<()> {
    let [upin] = args else {
        anyhow::bail!("files needs a UPIN.\n\n{}", usage());
    };
    let files = client.list_files(upin).await?;
    if files.is_empty() {
        println!("No documents attached to {upin}.");
        return Ok(());
    }
    for file in &files {
        let marker = if file.is_required() { "required" } else { "additional" };
        println!(
            "#{:<5} {:<32} [{}] {}",
            file.id, file.display_name, marker, file.uploaded_file
        );
    }
    Ok(())
}

async fn stats(client: &ApiClient) -> Result<()> {
    println!("Proof of possession:");
    for row in client.proof_of_possession_stats().await? {
        println!("  {:<24} {}", row.proof_of_possession, row.count);
    }
    println!("Service of estate:");
    for row in client.service_of_estate_stats().await? {
        println!("  {:<24} {}", row.service_of_estate, row.count);
    }
    println!("Amounts paid:");
    for row in client.amount_paid_stats().await? {
        println!("  {:<24} {}", row.name, row.count);
    }
    Ok(())
}

async fn dashboard(client: &ApiClient) -> Result<()> {
    require_admin(client).await?;
    let metrics = client.dashboard_metrics().await?;
    println!("Total records:       {}", metrics.total_records);
    println!("Registered users:    {}", metrics.registered_users);
    println!("Reports generated:   {}", metrics.reports_generated);
    println!("Files this month:    {}", metrics.files_uploaded);
    println!("Active users (7d):   {}", metrics.recent_active_users);
    Ok(())
}

async fn audit(client: &ApiClient) -> Result<()> {
    require_admin(client).await?;
    for entry in client.audit_logs().await? {
        println!(
            "{}  {:<8} {:<12} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.action.as_str(),
            entry.user.as_deref().unwrap_or("-"),
            entry.details
        );
    }
    Ok(())
}

async fn users(client: &ApiClient) -> Result<()> {
    require_admin(client).await?;
    for user in client.list_users().await? {
        let flags = match (user.is_superuser, user.is_staff) {
            (true, _) => "superuser",
            (false, true) => "staff",
            _ => "",
        };
        println!(
            "#{:<5} {:<20} {:<28} {:<10} {}",
            user.id,
            user.username,
            user.email,
            flags,
            user.groups.join(", ")
        );
    }
    Ok(())
}

async fn groups(client: &ApiClient) -> Result<()> {
    require_admin(client).await?;
    for group in client.list_groups().await? {
        println!("#{:<5} {}", group.id, group.name);
    }
    Ok(())
}

async fn require_admin(client: &ApiClient) -> Result<()> {
    let claims = client.session().claims().await;
    if claims.is_superuser || claims.groups.iter().any(|g| g == ADMIN_GROUP) {
        Ok(())
    } else {
        anyhow::bail!("This command needs an administrator account.")
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

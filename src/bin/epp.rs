//! EPP command line client.
//!
//! Thin front end over [`epp::Session`]: every subcommand loads the config,
//! resumes the stored session and runs one operation.
//!
//! # Commands
//!
//! - `hello`, `login`, `logout` - drive the session explicitly
//! - `check-domain`, `check-contact` - availability
//! - `info-domain`, `info-contact` - snapshots
//! - `delete-domain`, `delete-contact`, `restore-domain`
//! - `transfer` - query / request / cancel / approve / reject
//! - `poll`, `ack` - message queue
//! - `status` - show stored session state without contacting the registry

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use epp::{Config, HttpTransport, FileStore, Reply, Session, TransferOp, VERSION};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "epp")]
#[command(version = VERSION)]
#[command(about = "EPP over HTTP registrar client", long_about = None)]
struct Cli {
    /// Config file (TOML); EPP_* environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange greetings
    Hello,

    /// Log in, optionally changing the password
    Login {
        /// New password to set on success
        #[arg(long)]
        new_password: Option<String>,
    },

    /// Log out
    Logout,

    /// Check domain availability
    CheckDomain {
        /// Domain names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Check contact handle availability
    CheckContact {
        /// Contact handles
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show a domain
    InfoDomain {
        /// Domain name
        name: String,

        /// Auth password for domains sponsored by others
        #[arg(long)]
        auth_pw: Option<String>,
    },

    /// Show a contact
    InfoContact {
        /// Contact handle
        id: String,

        /// Auth password for contacts sponsored by others
        #[arg(long)]
        auth_pw: Option<String>,
    },

    /// Delete a domain
    DeleteDomain {
        /// Domain name
        name: String,
    },

    /// Delete a contact
    DeleteContact {
        /// Contact handle
        id: String,
    },

    /// Restore a domain in redemption
    RestoreDomain {
        /// Domain name
        name: String,
    },

    /// Domain transfer operation
    Transfer {
        /// query, request, cancel, approve or reject
        op: TransferOp,

        /// Domain name
        name: String,

        /// Domain auth password
        #[arg(long)]
        auth_pw: Option<String>,
    },

    /// Read the head of the message queue
    Poll {
        /// Only audit the exchange when a message came back
        #[arg(long)]
        silence_empty: bool,
    },

    /// Acknowledge a message
    Ack {
        /// Message ID
        id: String,
    },

    /// Show stored session state
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?.apply_env(),
        None => Config::from_env(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(cli, config))
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    let json = cli.json;
    let mut session = config.open_session()?;

    match cli.command {
        Commands::Hello => {
            let greeting = session.hello().await?;
            match greeting {
                Some(greeting) if !json => println!(
                    "Greeting from {} at {}",
                    greeting.server_id.as_deref().unwrap_or("?"),
                    greeting.server_date.as_deref().unwrap_or("?")
                ),
                Some(greeting) => print_json(&greeting)?,
                None => println!("Already {}", session.status()),
            }
        }
        Commands::Login { new_password } => {
            let reply = session.login(new_password.as_deref()).await?;
            print_optional(reply, json, &session)?;
        }
        Commands::Logout => {
            let reply = session.logout().await?;
            print_optional(reply, json, &session)?;
        }
        Commands::CheckDomain { names } => {
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let reply = session.domain_check(&names).await?;
            print_reply(&reply, json, |r| {
                for item in &r.data.items {
                    let reason = item.reason.as_deref().unwrap_or("");
                    let avail = if item.avail { "available" } else { "unavailable" };
                    println!("{:<40} {avail:<12} {reason}", item.id);
                }
            })?;
        }
        Commands::CheckContact { ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            let reply = session.contact_check(&ids).await?;
            print_reply(&reply, json, |r| {
                for item in &r.data.items {
                    let avail = if item.avail { "available" } else { "unavailable" };
                    println!("{:<20} {avail}", item.id);
                }
            })?;
        }
        Commands::InfoDomain { name, auth_pw } => {
            let reply = session.domain_info(&name, auth_pw.as_deref()).await?;
            print_reply(&reply, json, |r| {
                let d = &r.data;
                println!("Domain:      {}", d.name);
                println!("Status:      {}", d.statuses.join(", "));
                if !d.registry_statuses.is_empty() {
                    println!("Registry:    {}", d.registry_statuses.join(", "));
                }
                println!("Registrant:  {}", d.registrant.as_deref().unwrap_or("-"));
                println!("Admin:       {}", d.admin_contacts.join(", "));
                println!("Tech:        {}", d.tech_contacts.join(", "));
                for ns in &d.nameservers {
                    let addrs: Vec<&str> = ns.ipv4.iter().chain(&ns.ipv6).map(String::as_str).collect();
                    println!("Nameserver:  {} {}", ns.name, addrs.join(" "));
                }
                if let Some(ex) = d.meta.ex_date {
                    println!("Expires:     {ex}");
                }
            })?;
        }
        Commands::InfoContact { id, auth_pw } => {
            let reply = session.contact_info(&id, auth_pw.as_deref()).await?;
            print_reply(&reply, json, |r| {
                let c = &r.data;
                println!("Contact:     {}", c.id);
                println!("Name:        {}", c.name);
                if let Some(org) = &c.org {
                    println!("Org:         {org}");
                }
                println!("Status:      {}", c.statuses.join(", "));
                println!("Email:       {}", c.email.as_deref().unwrap_or("-"));
                println!("Registrant:  {}", if c.is_registrant() { "yes" } else { "no" });
            })?;
        }
        Commands::DeleteDomain { name } => {
            let reply = session.domain_delete(&name).await?;
            print_reply(&reply, json, print_result)?;
        }
        Commands::DeleteContact { id } => {
            let reply = session.contact_delete(&id).await?;
            print_reply(&reply, json, print_result)?;
        }
        Commands::RestoreDomain { name } => {
            let reply = session.domain_restore(&name).await?;
            print_reply(&reply, json, print_result)?;
        }
        Commands::Transfer { op, name, auth_pw } => {
            let reply = session
                .domain_transfer(op, &name, auth_pw.as_deref(), None)
                .await?;
            print_reply(&reply, json, |r| {
                println!("{} transfer: {}", r.data.name, r.data.tr_status);
                if let Some(re_id) = &r.data.re_id {
                    println!("Requested by {re_id}");
                }
            })?;
        }
        Commands::Poll { silence_empty } => {
            let reply = session.poll(silence_empty).await?;
            print_reply(&reply, json, |r| match &r.data.queue {
                Some(q) => println!(
                    "[{}] ({} queued) {}",
                    q.id,
                    q.count,
                    q.message.as_deref().unwrap_or("")
                ),
                None => println!("No messages"),
            })?;
        }
        Commands::Ack { id } => {
            let reply = session.ack(&id).await?;
            print_reply(&reply, json, |r| {
                let left = r.data.queue.as_ref().map_or(0, |q| q.count);
                println!("Acknowledged {id}, {left} left");
            })?;
        }
        Commands::Status => {
            if json {
                print_json(&serde_json::json!({
                    "state": session.status(),
                    "cookies": session.cookies(),
                }))?;
            } else {
                println!("State:   {}", session.status());
                println!("Cookies: {}", session.cookies());
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_result<T>(reply: &Reply<T>) {
    println!("{} {}", reply.result.code, reply.result.message);
}

fn print_reply<T: Serialize>(
    reply: &Reply<T>,
    json: bool,
    human: impl FnOnce(&Reply<T>),
) -> anyhow::Result<()> {
    if json {
        print_json(reply)
    } else {
        human(reply);
        Ok(())
    }
}

fn print_optional(
    reply: Option<Reply<()>>,
    json: bool,
    session: &Session<HttpTransport, FileStore>,
) -> anyhow::Result<()> {
    match reply {
        Some(reply) => print_reply(&reply, json, print_result),
        None => {
            println!("Nothing to do, session is {}", session.status());
            Ok(())
        }
    }
}

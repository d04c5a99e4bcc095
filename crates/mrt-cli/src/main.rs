use clap::{Parser, Subcommand};
use std::time::Duration;

use async_trait::async_trait;
use mrt_core::capability::{Capability, PermissionGate, PermissionStatus};
use mrt_core::contacts::{section_by_initial, ContactsSource};
use mrt_core::memory::MemoryContacts;
use mrt_core::message::{group_keep_all, group_keep_latest, Mailbox, SmsQuery};
use mrt_core::notify::{Notifier, SmishingAlert};
use mrt_core::report::{BlockedContact, ContactBlocklist, ReportReason, ReportStore, ReportWorkflow};
use mrt_core::router::AppRoute;
use mrt_core::session::{load_profile, AuthProvider, ProfileStore};
use mrt_core::{TrainerConfig, TriageCoordinator};

mod stores;

use stores::{
    data_dir, FileAuthProvider, FileBlocklist, FilePermissionBroker, FileReportStore,
    FileSmsStore, ReplayFeed,
};

#[derive(Parser)]
#[command(name = "mrt", version, about = "Mobile Risk Trainer command-line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account in the dev user store
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Show the current session
    Whoami,

    /// Sign out
    Logout,

    /// Show the signed-in user's profile document
    Profile,

    /// Show capability grant state and the resulting route
    Permissions,

    /// Record a user grant for a capability (sms|receive|contacts|overlay)
    Grant {
        capability: String,
    },

    /// Record a user denial for a capability
    Deny {
        capability: String,
    },

    /// List messages from the device message file, most recent first
    Inbox {
        /// inbox or sent
        #[arg(long, default_value = "inbox")]
        r#box: String,
        #[arg(long, default_value_t = 30)]
        max: usize,
        #[arg(long, default_value = "messages.json")]
        file: String,
    },

    /// Show conversations grouped by sender
    Conversations {
        /// Keep the full per-sender thread instead of only the newest
        /// message
        #[arg(long)]
        full: bool,
        #[arg(long, default_value_t = 30)]
        max: usize,
        #[arg(long, default_value = "messages.json")]
        file: String,
    },

    /// List device contacts in alphabetical sections
    Contacts {
        #[arg(long, default_value = "contacts.json")]
        file: String,
    },

    /// Triage every inbox message once and print alerts
    Scan {
        #[arg(long, default_value = "messages.json")]
        file: String,
    },

    /// Replay the message file through the live triage loop
    Watch {
        #[arg(long, default_value = "messages.json")]
        file: String,
    },

    /// Report a sender number (fraud|spam|threat|unknown)
    Report {
        #[arg(long)]
        number: String,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        body: Option<String>,
    },

    /// List your submitted reports
    Reports,

    /// Add a contact to your blocklist
    Block {
        #[arg(long)]
        name: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        reason: String,
    },

    /// List your blocked contacts
    Blocked {
        #[arg(long)]
        search: Option<String>,
    },

    /// Remove a blocked contact by id
    Unblock {
        #[arg(long)]
        id: String,
    },
}

/// Notifier that prints alerts to stdout for the CLI surface.
struct PrintNotifier;

#[async_trait]
impl Notifier for PrintNotifier {
    async fn ensure_channel(&self) -> mrt_core::Result<()> {
        Ok(())
    }

    async fn post(&self, alert: &SmishingAlert) -> mrt_core::Result<()> {
        println!("[ALERT] {} (from {}): {}", alert.title, alert.sender, alert.body);
        Ok(())
    }
}

fn parse_capability(s: &str) -> anyhow::Result<Capability> {
    match s.to_ascii_lowercase().as_str() {
        "sms" | "read-sms" => Ok(Capability::ReadSms),
        "receive" | "receive-sms" => Ok(Capability::ReceiveSms),
        "contacts" => Ok(Capability::ReadContacts),
        "overlay" => Ok(Capability::Overlay),
        other => anyhow::bail!("unknown capability: {other} (expected sms|receive|contacts|overlay)"),
    }
}

fn capability_token(cap: Capability) -> &'static str {
    match cap {
        Capability::ReadSms => "sms",
        Capability::ReceiveSms => "receive",
        Capability::ReadContacts => "contacts",
        Capability::Overlay => "overlay",
    }
}

fn parse_mailbox(s: &str) -> anyhow::Result<Mailbox> {
    match s.to_ascii_lowercase().as_str() {
        "inbox" => Ok(Mailbox::Inbox),
        "sent" => Ok(Mailbox::Sent),
        other => anyhow::bail!("unknown mailbox: {other} (expected inbox|sent)"),
    }
}

fn format_date(epoch_ms: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(epoch_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

/// Denial is a first-class state: explain what is missing and how to
/// grant it, without failing the process.
async fn sms_ready(gate: &PermissionGate) -> bool {
    let state = gate.check_all().await;
    let missing = state.missing_for_sms();
    if missing.is_empty() {
        return true;
    }
    for cap in missing {
        println!(
            "{} is not granted. Run `mrt grant {}` to enable it.",
            cap.label(),
            capability_token(cap)
        );
    }
    false
}

fn require_login(auth: &FileAuthProvider) -> Option<String> {
    match auth.current_session() {
        Some(user) => Some(user),
        None => {
            println!("Not signed in. Run `mrt login` first.");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let dir = data_dir();
    let auth = FileAuthProvider::open(&dir)?;
    let broker = FilePermissionBroker::open(&dir);
    let config = TrainerConfig::load(&TrainerConfig::default_path())?;

    match cli.command {
        Commands::Register {
            username,
            phone,
            email,
            password,
            confirm,
        } => {
            let registration = mrt_core::session::Registration {
                username,
                phone_number: phone,
                email,
                password,
                confirm_password: confirm,
            };
            match auth.sign_up(&registration).await {
                Ok(user_id) => println!("Account created: {user_id}. Run `mrt login`."),
                Err(e) => eprintln!("Registration failed: {e}"),
            }
        }

        Commands::Login { email, password } => {
            let credentials = mrt_core::session::Credentials { email, password };
            match auth.sign_in(&credentials).await {
                Ok(user_id) => {
                    // Sign-in also verifies the profile document exists.
                    match auth.profile(&user_id).await? {
                        Some(profile) => {
                            println!("Signed in as {} ({user_id})", profile.username)
                        }
                        None => println!("No user found in our records. Please register."),
                    }
                }
                Err(e) => eprintln!("Login failed: {e}"),
            }
        }

        Commands::Whoami => match auth.current_session() {
            Some(user) => println!("Signed in as {user}"),
            None => println!("Not signed in"),
        },

        Commands::Logout => {
            auth.sign_out().await?;
            println!("Signed out.");
        }

        Commands::Profile => {
            let Some(user) = require_login(&auth) else {
                return Ok(());
            };
            match load_profile(&auth, &user).await? {
                mrt_core::session::ProfileView::Loaded(profile) => {
                    println!("Username: {}", profile.username);
                    println!("Email:    {}", profile.email);
                    println!("Phone:    {}", profile.phone_number);
                    println!("Role:     {}", profile.role);
                    println!("Since:    {}", profile.created_at.format("%Y-%m-%d"));
                }
                mrt_core::session::ProfileView::Missing => {
                    println!("Failed to load profile: no document for {user}");
                }
            }
        }

        Commands::Permissions => {
            let gate = PermissionGate::new(Box::new(broker));
            let state = gate.check_all().await;
            for cap in Capability::ALL {
                println!(
                    "{:<28} {:?}",
                    format!("{} ({})", cap.label(), capability_token(cap)),
                    state.status(cap)
                );
            }
            let session = auth.current_session();
            let route = AppRoute::derive(&state, session.as_ref());
            println!("Route: {route:?}");
        }

        Commands::Grant { capability } => {
            let cap = parse_capability(&capability)?;
            broker.record(cap, PermissionStatus::Granted)?;
            println!("Granted {}.", cap.label());
        }

        Commands::Deny { capability } => {
            let cap = parse_capability(&capability)?;
            broker.record(cap, PermissionStatus::Denied)?;
            println!(
                "Denied {}. Grant it again from `mrt grant {}` when ready.",
                cap.label(),
                capability_token(cap)
            );
        }

        Commands::Inbox { r#box, max, file } => {
            let gate = PermissionGate::new(Box::new(broker));
            if !sms_ready(&gate).await {
                return Ok(());
            }
            let store = FileSmsStore::open(file);
            let query = SmsQuery {
                mailbox: parse_mailbox(&r#box)?,
                max_count: max,
                min_date: None,
                max_date: None,
            };
            let messages = mrt_core::ingest::SmsStore::list(&store, &query).await?;
            if messages.is_empty() {
                println!("No messages found");
                return Ok(());
            }
            for msg in messages {
                println!("{}  {}  {}", format_date(msg.date), msg.address, msg.body);
            }
        }

        Commands::Conversations { full, max, file } => {
            let gate = PermissionGate::new(Box::new(broker));
            if !sms_ready(&gate).await {
                return Ok(());
            }
            let store = FileSmsStore::open(file);
            let messages =
                mrt_core::ingest::SmsStore::list(&store, &SmsQuery::inbox(max)).await?;
            if messages.is_empty() {
                println!("No messages found");
                return Ok(());
            }
            if full {
                for group in group_keep_all(&messages) {
                    println!("{} ({} messages)", group.address, group.messages.len());
                    for msg in &group.messages {
                        println!("  {}  {}", format_date(msg.date), msg.body);
                    }
                }
            } else {
                for summary in group_keep_latest(&messages) {
                    println!(
                        "{}  {}  {}",
                        format_date(summary.latest.date),
                        summary.address,
                        summary.latest.body
                    );
                }
            }
        }

        Commands::Contacts { file } => {
            let gate = PermissionGate::new(Box::new(broker));
            let state = gate.check_all().await;
            if !state.granted(Capability::ReadContacts) {
                println!("Permission to access contacts is denied. Run `mrt grant contacts`.");
                return Ok(());
            }
            let contacts: Vec<mrt_core::contacts::Contact> =
                serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let source = MemoryContacts::new(contacts);
            let sections = section_by_initial(source.all().await?);
            for section in sections {
                println!("{}", section.title);
                for contact in section.contacts {
                    println!(
                        "  {}  {}",
                        contact.display_name(),
                        contact.phone_numbers.join(", ")
                    );
                }
            }
        }

        Commands::Scan { file } => {
            let gate = PermissionGate::new(Box::new(broker));
            if !sms_ready(&gate).await {
                return Ok(());
            }
            let store = FileSmsStore::open(file);
            let messages = store.inbox_in_arrival_order()?;
            let mut flagged = 0usize;
            for msg in &messages {
                if mrt_core::triage::contains_url(&msg.body) {
                    flagged += 1;
                    PrintNotifier.post(&SmishingAlert::from_message(msg)).await?;
                }
            }
            println!("{} of {} messages flagged", flagged, messages.len());
        }

        Commands::Watch { file } => {
            let gate = PermissionGate::new(Box::new(broker));
            let store = FileSmsStore::open(file);
            let messages = store.inbox_in_arrival_order()?;
            let feed = ReplayFeed::new();

            let coordinator =
                match TriageCoordinator::new(&gate, &feed, Box::new(PrintNotifier), &config).await
                {
                    Ok(coordinator) => coordinator,
                    Err(e) => {
                        println!("{e}");
                        return Ok(());
                    }
                };

            let replay = tokio::spawn(async move {
                for msg in messages {
                    feed.deliver(msg).await;
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                // Dropping the feed ends the subscription.
            });

            coordinator.run().await?;
            replay.await?;
        }

        Commands::Report {
            number,
            reason,
            body,
        } => {
            let Some(user) = require_login(&auth) else {
                return Ok(());
            };
            let reason: ReportReason = reason.parse()?;
            let store = FileReportStore::open(&dir);

            let mut workflow = ReportWorkflow::new(number, Some(user), body);
            workflow.choose(reason)?;
            match workflow.submit(&store).await {
                Ok(report) => println!(
                    "Reported {} as {} at {}",
                    report.number,
                    report.reason,
                    report.reported_at.format("%Y-%m-%d %H:%M:%S")
                ),
                Err(e) => eprintln!("Report failed: {e}"),
            }
        }

        Commands::Reports => {
            let Some(user) = require_login(&auth) else {
                return Ok(());
            };
            let store = FileReportStore::open(&dir);
            let reports = store.list_by_reporter(&user).await?;
            if reports.is_empty() {
                println!("No reports submitted");
                return Ok(());
            }
            for report in reports {
                println!(
                    "{}  {}  {}",
                    report.reported_at.format("%Y-%m-%d %H:%M"),
                    report.number,
                    report.reason
                );
            }
        }

        Commands::Block {
            name,
            phone,
            reason,
        } => {
            let Some(user) = require_login(&auth) else {
                return Ok(());
            };
            let blocklist = FileBlocklist::open(&dir);
            let id = format!("b{}", chrono::Utc::now().timestamp_millis());
            blocklist
                .block(
                    &user,
                    BlockedContact {
                        id: id.clone(),
                        name,
                        phone,
                        reason,
                    },
                )
                .await?;
            println!("Blocked ({id}).");
        }

        Commands::Blocked { search } => {
            let Some(user) = require_login(&auth) else {
                return Ok(());
            };
            let blocklist = FileBlocklist::open(&dir);
            let entries = blocklist.list(&user).await?;
            let query = search.unwrap_or_default();
            let filtered = mrt_core::report::filter_blocked(&entries, &query);
            if filtered.is_empty() {
                println!("No blocked contacts");
                return Ok(());
            }
            for contact in filtered {
                println!(
                    "{}  {}  {} - {}",
                    contact.id, contact.name, contact.phone, contact.reason
                );
            }
        }

        Commands::Unblock { id } => {
            let Some(user) = require_login(&auth) else {
                return Ok(());
            };
            let blocklist = FileBlocklist::open(&dir);
            match blocklist.remove(&user, &id).await {
                Ok(()) => println!("Unblocked {id}."),
                Err(e) => eprintln!("Failed to remove contact: {e}"),
            }
        }
    }

    Ok(())
}

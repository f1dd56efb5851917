use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use haile_site::api::{ChildRegistration, ContactSubmission};
use haile_site::auth::{reset_token_from_url, FileTokenStore, TokenStore};
use haile_site::config::load_config;
use haile_site::forms::FormOutcome;
use haile_site::media::{format_views, MediaKind, Playback};
use haile_site::page::{Page, TerminalPage};
use haile_site::payment::{validate, DonationForm, DonationLimits};
use haile_site::schedule::{slot_start_utc, time_slots, timezone_for};
use haile_site::Site;

/// Haile site client: contact, registration, account, blog and media tools.
#[derive(Parser)]
#[command(name = "haile")]
#[command(about = "Talks to the Haile site backend the same way the public pages do.")]
#[command(version)]
struct Cli {
    /// Extra configuration file layered over ./config and HAILE__* variables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Session file (defaults to the platform data dir)
    #[arg(long, global = true, env = "HAILE_SESSION")]
    session: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether the backend answers
    Health,
    /// Send a contact message
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
    },
    /// Register a child for a class
    RegisterChild {
        #[arg(long)]
        child_name: String,
        #[arg(long)]
        father_name: String,
        #[arg(long)]
        mother_name: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        state: Option<String>,
        /// Class date, YYYY-MM-DD
        #[arg(long)]
        class_date: String,
        /// Slot as listed by `haile slots`
        #[arg(long)]
        time_slot: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        church: Option<String>,
    },
    /// Sign in and keep the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "HAILE_PASSWORD")]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "HAILE_PASSWORD")]
        password: String,
    },
    /// End the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Request a password reset link
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password from a reset token or reset link
    ResetPassword {
        /// Token, or the full link from the reset email
        #[arg(long)]
        token: String,
        #[arg(long, env = "HAILE_NEW_PASSWORD")]
        new_password: String,
    },
    /// List class time slots
    Slots,
    /// Convert a slot start to UTC for a location
    ToUtc {
        /// Slot (`9:00AM-9:30AM`) or slot start (`9:00AM`)
        #[arg(long)]
        slot: String,
        /// Date, YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        state: Option<String>,
    },
    /// Guess the visitor country from the public IP
    DetectCountry,
    /// Check a donation against the configured limits without sending it
    ValidateDonation {
        #[arg(long)]
        email: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        name: String,
    },
    /// List blog posts
    Blogs,
    /// Publish a blog post, or update one with --id (admin only)
    BlogPost {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        title: String,
        /// Post body as HTML
        #[arg(long)]
        content: String,
    },
    /// Delete a blog post (admin only)
    BlogDelete {
        #[arg(long)]
        id: String,
    },
    /// List media: youtube, tiktok, podcasts or lectures
    Media {
        #[arg(long, default_value = "youtube")]
        kind: MediaKind,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    // Commands that never touch the backend.
    match &cli.command {
        Commands::Slots => {
            for slot in time_slots() {
                println!("{slot}");
            }
            return Ok(());
        }
        Commands::ToUtc {
            slot,
            date,
            country,
            state,
        } => {
            let zone = timezone_for(country, state.as_deref());
            let utc = slot_start_utc(slot, country, state.as_deref(), date)?;
            println!("{utc} ({zone})");
            return Ok(());
        }
        Commands::ValidateDonation {
            email,
            amount,
            name,
        } => {
            let form = DonationForm::new(email.clone(), amount.clone(), name.clone());
            let donation = validate(&form, DonationLimits::from(&config.payments))?;
            println!(
                "OK: {} {} from {} <{}>",
                donation.amount_minor, config.payments.currency, donation.name, donation.email
            );
            return Ok(());
        }
        _ => {}
    }

    let page: Arc<dyn Page> = Arc::new(TerminalPage);
    let tokens: Arc<dyn TokenStore> = Arc::new(match &cli.session {
        Some(path) => FileTokenStore::new(path),
        None => FileTokenStore::default_location(),
    });
    let site = Site::new(&config, page, None, tokens)?;

    match cli.command {
        Commands::Health => {
            if site.api().health().await {
                println!("Backend at {} is healthy", site.api().base_url());
            } else {
                anyhow::bail!("backend at {} is unreachable", site.api().base_url());
            }
        }
        Commands::Contact {
            name,
            email,
            subject,
            message,
        } => {
            let outcome = site
                .contact()
                .submit(ContactSubmission {
                    name,
                    email,
                    subject,
                    message,
                })
                .await;
            ensure_submitted(outcome)?;
        }
        Commands::RegisterChild {
            child_name,
            father_name,
            mother_name,
            country,
            state,
            class_date,
            time_slot,
            email,
            phone,
            church,
        } => {
            let start_time_utc =
                slot_start_utc(&time_slot, &country, state.as_deref(), &class_date).ok();
            let outcome = site
                .registration()
                .submit(ChildRegistration {
                    child_name,
                    father_name,
                    mother_name,
                    country,
                    state,
                    class_date,
                    time_slot,
                    start_time_utc,
                    email,
                    phone,
                    church,
                })
                .await;
            ensure_submitted(outcome)?;
        }
        Commands::Login { email, password } => {
            site.auth().login(&email, &password).await?;
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            site.auth()
                .register(&first_name, &last_name, &email, &password)
                .await?;
        }
        Commands::Logout => {
            site.start().await?;
            site.auth().logout().await?;
        }
        Commands::Whoami => {
            site.start().await?;
            match site.auth().current_user().await {
                Some(user) => {
                    let role = user.role.as_deref().unwrap_or("member");
                    println!("{} ({role})", user.first_name);
                }
                None => println!("Not signed in"),
            }
        }
        Commands::ForgotPassword { email } => {
            site.auth().forgot_password(&email).await?;
        }
        Commands::ResetPassword {
            token,
            new_password,
        } => {
            let token = url::Url::parse(&token)
                .ok()
                .and_then(|link| reset_token_from_url(&link))
                .unwrap_or(token);
            site.auth().reset_password(&token, &new_password).await?;
        }
        Commands::DetectCountry => match site.geo().detect().await {
            Some(country) => println!("{country}"),
            None => println!("unknown"),
        },
        Commands::Blogs => {
            site.start().await?;
            site.blog().load().await;
        }
        Commands::BlogPost { id, title, content } => {
            site.start().await?;
            if let Some(id) = id {
                site.blog().edit(&id).await?;
            }
            site.blog().save(&title, &content).await?;
        }
        Commands::BlogDelete { id } => {
            site.start().await?;
            site.blog().delete(&id).await?;
        }
        Commands::Media { kind } => {
            for item in site.media().items(kind).await {
                let views = item.views.map(format_views).unwrap_or_default();
                let target = match item.playback() {
                    Playback::YouTube { embed_url } => embed_url,
                    Playback::TikTok { url, .. }
                    | Playback::Audio { url }
                    | Playback::Video { url }
                    | Playback::Unsupported { url } => url,
                };
                if views.is_empty() {
                    println!("{}\n  {target}", item.title);
                } else {
                    println!("{} ({views} views)\n  {target}", item.title);
                }
            }
        }
        Commands::Slots | Commands::ToUtc { .. } | Commands::ValidateDonation { .. } => {}
    }

    Ok(())
}

fn ensure_submitted(outcome: FormOutcome) -> anyhow::Result<()> {
    match outcome {
        FormOutcome::Submitted(_) => Ok(()),
        FormOutcome::Dropped => anyhow::bail!("submission dropped"),
        FormOutcome::Invalid(msg) | FormOutcome::Failed(msg) => anyhow::bail!(msg),
    }
}

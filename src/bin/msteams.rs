use anyhow::Context as _;
use clap::Parser as _;
use msteams_integration::services::{ChatsServiceTrait, TeamsServiceTrait, UsersServiceTrait};
use msteams_integration::{
    AuthStatus, MessageContent, TeamsConfigBuilder, TeamsError, TeamsSession,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_TOKEN_FILE: &str = ".msteams/tokens.json";
const USERS_SHOWN: usize = 20;

/// Microsoft Teams from the command line
#[derive(Debug, clap::Parser)]
#[command(name = "msteams")]
#[command(about = "Sign in to Microsoft Teams and work with teams, channels and chats")]
struct Cli {
    /// Token file (defaults to .msteams/tokens.json)
    #[arg(long, global = true, env = "MSTEAMS_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Sign in with the device code flow
    Login {
        /// Don't open the verification page in a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Remove stored tokens
    Logout,

    /// Show authentication status
    Status,

    /// List joined teams
    #[command(alias = "list")]
    Teams,

    /// List channels in a team
    Channels {
        /// Team ID (from `msteams teams`)
        team_id: String,
    },

    /// List users for direct messages
    Users {
        /// Filter by name or mail prefix
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of users to fetch
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Send a message to a channel or a user
    Send {
        /// Message text (HTML allowed)
        message: String,

        /// Team ID (defaults to MSTEAMS_DEFAULT_TEAM_ID)
        #[arg(short, long)]
        team: Option<String>,

        /// Channel ID (defaults to MSTEAMS_DEFAULT_CHANNEL_ID)
        #[arg(short, long)]
        channel: Option<String>,

        /// Send a direct message to this user instead
        #[arg(short, long, conflicts_with_all = ["team", "channel"])]
        email: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<TeamsError>() {
            Some(teams_err) => {
                tracing::debug!(
                    code = teams_err.error_code(),
                    status = ?teams_err.http_status(),
                    "Command failed"
                );
                eprintln!("Error: {}", teams_err.user_message());
            }
            None => eprintln!("Error: {:#}", err),
        }
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "msteams_integration=debug,msteams=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let token_file = cli
        .token_file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE));
    let config = TeamsConfigBuilder::from_env()?
        .token_file(token_file)
        .build()
        .context("Set MSTEAMS_TENANT_ID and MSTEAMS_CLIENT_ID")?;
    let session = TeamsSession::from_config(config)?;

    match cli.command {
        Commands::Login { no_browser } => login(&session, no_browser).await?,
        Commands::Logout => {
            if session.logout().await? {
                println!("Logged out. Tokens cleared.");
            } else {
                println!("No stored tokens.");
            }
        }
        Commands::Status => status(&session).await?,
        Commands::Teams => {
            let teams = session.teams_client().await?.teams().list_joined_teams().await?;
            if teams.is_empty() {
                println!("No teams found.");
            }
            for team in teams {
                println!("  {}\n    ID: {}", team.display_name, team.id);
            }
        }
        Commands::Channels { team_id } => {
            let channels = session
                .teams_client()
                .await?
                .teams()
                .list_channels(&team_id)
                .await?;
            if channels.is_empty() {
                println!("No channels found.");
            }
            for channel in channels {
                println!("  {}\n    ID: {}", channel.display_name, channel.id);
            }
        }
        Commands::Users { search, limit } => {
            let users = session
                .teams_client()
                .await?
                .users()
                .list_users(search.as_deref(), limit)
                .await?;
            if users.is_empty() {
                println!("No users found.");
            }
            for user in users.iter().take(USERS_SHOWN) {
                println!(
                    "  {}\n    Email: {}",
                    user.display_name,
                    user.address().unwrap_or("-")
                );
            }
            if users.len() > USERS_SHOWN {
                println!(
                    "\n  ... and {} more (use --search to filter)",
                    users.len() - USERS_SHOWN
                );
            }
        }
        Commands::Send {
            message,
            team,
            channel,
            email,
        } => send(&session, message, team, channel, email).await?,
    }

    Ok(())
}

async fn login(session: &TeamsSession, no_browser: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    println!("Authenticating with Microsoft Teams...");
    session
        .login(
            |code, uri| {
                println!("\nTo sign in, open: {}", uri);
                println!("Enter code: {}", code);
                println!("\nWaiting for authentication...");
                if !no_browser && webbrowser::open(uri).is_err() {
                    tracing::debug!("Could not open a browser");
                }
            },
            &cancel,
        )
        .await?;

    println!("Successfully authenticated!");
    if let AuthStatus::Authenticated(user) = session.status().await? {
        println!(
            "Signed in as: {} ({})",
            user.display_name,
            user.address().unwrap_or("-")
        );
    }
    Ok(())
}

async fn status(session: &TeamsSession) -> anyhow::Result<()> {
    let config = session.config();
    println!("Microsoft Teams Integration Status");
    println!("Tenant ID: {}", config.tenant_id);

    match session.status().await? {
        AuthStatus::Authenticated(user) => {
            println!("Authentication: Valid");
            println!(
                "User: {} ({})",
                user.display_name,
                user.address().unwrap_or("-")
            );
        }
        AuthStatus::Invalid(reason) => {
            println!("Authentication: Invalid ({})", reason);
            println!("Run: msteams login");
        }
        AuthStatus::NotAuthenticated => {
            println!("Authentication: Not authenticated");
            println!("Run: msteams login");
        }
    }

    if let Some(team) = &config.default_team_id {
        println!("Default Team: {}", team);
    }
    if let Some(channel) = &config.default_channel_id {
        println!("Default Channel: {}", channel);
    }
    Ok(())
}

async fn send(
    session: &TeamsSession,
    message: String,
    team: Option<String>,
    channel: Option<String>,
    email: Option<String>,
) -> anyhow::Result<()> {
    let client = session.teams_client().await?;

    if let Some(email) = email {
        println!("Sending DM to {}...", email);
        let chats = client.chats();
        let chat_id = chats.get_or_create_chat(&email).await?;
        chats
            .send_chat_message(&chat_id, MessageContent::html(message))
            .await?;
    } else {
        let config = session.config();
        let team_id = team
            .or_else(|| config.default_team_id.clone())
            .context("Specify --team or set MSTEAMS_DEFAULT_TEAM_ID")?;
        let channel_id = channel
            .or_else(|| config.default_channel_id.clone())
            .context("Specify --channel or set MSTEAMS_DEFAULT_CHANNEL_ID")?;

        println!("Sending to channel...");
        client
            .teams()
            .send_channel_message(&team_id, &channel_id, MessageContent::html(message))
            .await?;
    }

    println!("Message sent!");
    Ok(())
}

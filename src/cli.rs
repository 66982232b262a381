use std::io::Write;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::auth::{register, Account, AccountStorage, NsoClient, NsoSession, RefreshWindows};
use crate::discord::DiscordSink;
use crate::logging::{init_logging, ExchangeLog};
use crate::presence::PollLoop;
use crate::settings::{load_settings, Settings};

#[derive(Debug, Parser)]
#[command(name = "nxsence", version, about = "Share Nintendo Switch presence on Discord")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register a new account to use
    Register,
    /// Begin sharing Nintendo Switch game status to Discord
    Discord {
        /// The user to log in as
        main_user: String,
        /// The user whose status to share. Defaults to the logged-in user
        displayed_user: Option<String>,
        /// Write a log file that can be useful in debugging issues
        #[arg(long)]
        log: bool,
    },
    /// List registered accounts
    Accounts,
    /// List a user's friends
    Friends {
        /// The user whose friends to list
        user: String,
    },
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings().context("Failed to load settings")?;

    let log_to_file = matches!(cli.command, Command::Discord { log: true, .. });
    let _guard = init_logging(&settings, log_to_file);

    match cli.command {
        Command::Register => register_account(&settings).await,
        Command::Discord {
            main_user,
            displayed_user,
            log,
        } => share_presence(&settings, main_user, displayed_user, ExchangeLog::new(log)).await,
        Command::Accounts => list_accounts(&settings),
        Command::Friends { user } => list_friends(&settings, &user).await,
    }
}

fn client(settings: &Settings, exchange: ExchangeLog) -> anyhow::Result<NsoClient> {
    NsoClient::new(
        settings.endpoints.clone(),
        settings.product_version.clone(),
        exchange,
    )
    .context("Failed to build HTTP client")
}

async fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .context("Input task failed")??;

    Ok(line.trim().to_string())
}

async fn register_account(settings: &Settings) -> anyhow::Result<()> {
    tracing::info!("Starting registration");
    let client = client(settings, ExchangeLog::disabled())?;
    let request = register::create_authorization_request(client.endpoints())?;

    if let Err(e) = open::that(&request.auth_url) {
        tracing::warn!("Failed to open browser: {}", e);
        println!("Open this link in your browser:\n{}", request.auth_url);
    }

    let link = prompt("Right click \"Select this account\" and paste the link here: ").await?;
    let session_token = register::exchange_link(&client, &link, &request).await?;

    let mut session = NsoSession::new(
        client,
        Account::new(session_token),
        RefreshWindows::from_settings(settings),
    );
    session.login(now()).await?;
    let account = session.into_account();

    let storage = AccountStorage::new(&settings.users_dir);
    if storage.exists(&account.name) {
        println!(
            "Note: registering a *different* account with the same name as a registered account is not supported."
        );
        let answer =
            prompt("A user with this name already has been registered: Override? (y/n): ").await?;
        if !answer.eq_ignore_ascii_case("y") {
            println!("Quitting...");
            return Ok(());
        }
    }

    storage
        .save(&account)
        .with_context(|| format!("Failed to store account {}", account.name))?;
    println!("Registered {}.", account.name);
    Ok(())
}

async fn share_presence(
    settings: &Settings,
    main_user: String,
    displayed_user: Option<String>,
    exchange: ExchangeLog,
) -> anyhow::Result<()> {
    let storage = AccountStorage::new(&settings.users_dir);
    let account = storage.load(&main_user)?;

    let mut session = NsoSession::new(
        client(settings, exchange)?,
        account,
        RefreshWindows::from_settings(settings),
    );
    session.login(now()).await?;

    let mut sink = DiscordSink::new(settings.discord_app_id, exchange);
    sink.connect(settings.connect_retry()).await;

    let displayed = displayed_user.unwrap_or(main_user);
    println!(
        "Displaying status for {}. To exit, press CTRL+C.",
        displayed
    );

    let mut poll = PollLoop::new(session, sink, displayed).with_interval(settings.poll_interval());
    let result = poll.run().await;
    poll.sink_mut().disconnect().await;

    Ok(result?)
}

fn list_accounts(settings: &Settings) -> anyhow::Result<()> {
    let accounts = AccountStorage::new(&settings.users_dir).list()?;

    if accounts.is_empty() {
        println!("You have no accounts. Please register one.");
    } else {
        println!("List of accounts: {}", accounts.join(", "));
    }
    Ok(())
}

async fn list_friends(settings: &Settings, user: &str) -> anyhow::Result<()> {
    let account = AccountStorage::new(&settings.users_dir).load(user)?;

    let mut session = NsoSession::new(
        client(settings, ExchangeLog::disabled())?,
        account,
        RefreshWindows::from_settings(settings),
    );
    let now = now();
    session.login(now).await?;
    let friends = session.friends(now).await?;

    if friends.is_empty() {
        println!("You have no friends on this account.");
    } else {
        let names: Vec<&str> = friends.iter().map(|f| f.name.as_str()).collect();
        println!("List of friends: {}", names.join(", "));
    }
    Ok(())
}

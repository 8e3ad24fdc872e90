use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hashchat_cli::cli::commands::HELP;
use hashchat_cli::cli::tracing_setup::init_tracing;
use hashchat_cli::cli::{parse_line, ChannelView, CliConfig, LineCommand, TerminalNotifier};
use hashchat_core::notifications::{
    AlertPlayer, DesktopNotifier, LogNotifier, NotificationTrigger, RodioAlert, SilentAlert,
};
use hashchat_core::stats::SharedEventStats;
use hashchat_core::store::ChatState;
use hashchat_core::{CoreCommand, CoreEvent, CoreRuntime};
use nostr_sdk::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

#[derive(Parser)]
#[command(name = "hashchat")]
#[command(about = "Terminal client for #channel chat over Nostr relays")]
struct Cli {
    /// Path to JSON config file (relayUrl, dataDir, notificationSound, credentials)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Directory for preferences, cache and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Relay to join (overrides config and stored preference)
    #[arg(long, short = 'r')]
    relay: Option<String>,

    /// Do not open the audio device
    #[arg(long)]
    no_sound: bool,

    /// Send notifications to the log instead of the terminal
    #[arg(long, short = 'q')]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and stream channel traffic; reads /commands from stdin
    Listen {
        /// Channel to start in
        #[arg(long)]
        channel: Option<String>,
    },

    /// Print the cached channel list for the relay
    Channels,

    /// Wipe preferences and cache
    Clear,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Listen { ref channel } => {
            listen(config, channel.clone(), cli.no_sound, cli.quiet).await
        }
        Commands::Channels => print_channels(&config),
        Commands::Clear => clear(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<CliConfig> {
    let config = match cli.config {
        Some(ref path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    Ok(config.with_overrides(cli.data_dir.clone(), cli.relay.clone()))
}

fn print_channels(config: &CliConfig) -> Result<()> {
    let mut state = ChatState::open(&config.core_config())?;
    state.load_cache()?;
    let Some(relay_url) = state.relay_url().map(str::to_string) else {
        println!("No relay configured. Use --relay or set relayUrl.");
        return Ok(());
    };

    println!("{}", relay_url);
    let view = ChannelView::from_store(state.messages());
    for (line, channel) in view.render_channels().lines().zip(&view.channels) {
        println!("{}  ({} messages)", line, state.messages().len(channel));
    }
    Ok(())
}

fn clear(config: &CliConfig) -> Result<()> {
    let mut state = ChatState::open(&config.core_config())?;
    state.clear_all_site_data()?;
    println!("Cleared all data in {}", config.data_dir().display());
    Ok(())
}

async fn listen(
    config: CliConfig,
    channel: Option<String>,
    no_sound: bool,
    quiet: bool,
) -> Result<()> {
    let alert: Box<dyn AlertPlayer> = if no_sound {
        Box::new(SilentAlert)
    } else {
        Box::new(RodioAlert::new(config.alert_sound.as_deref()))
    };
    let desktop: Box<dyn DesktopNotifier> = if quiet {
        Box::new(LogNotifier::new())
    } else {
        Box::new(TerminalNotifier::new(true))
    };
    let notifier = NotificationTrigger::new(desktop, alert);

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut runtime =
        CoreRuntime::with_nostr_sdk(config.core_config(), command_rx, events_tx, notifier)
            .context("Failed to open data directory")?;

    if let Some(enabled) = config.notification_sound {
        let _ = command_tx.send(CoreCommand::SetNotificationSound(enabled));
    }
    if let Some(channel) = channel {
        let _ = command_tx.send(CoreCommand::SelectChannel {
            name: channel,
            response_tx: None,
        });
    }

    runtime.start().await?;

    let view = Arc::new(Mutex::new(ChannelView::from_store(runtime.state().messages())));
    let signer = match &config.credentials {
        Some(credentials) => Some(Arc::new(
            Keys::parse(&credentials.key).context("Invalid credentials key")?,
        ) as Arc<dyn NostrSigner>),
        None => None,
    };

    tokio::spawn(print_events(events_rx, view.clone()));
    tokio::spawn(read_commands(command_tx.clone(), view, runtime.stats(), signer));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = command_tx.send(CoreCommand::Shutdown);
        }
    });

    runtime.run().await
}

async fn print_events(mut events_rx: mpsc::UnboundedReceiver<CoreEvent>, view: Arc<Mutex<ChannelView>>) {
    while let Some(event) = events_rx.recv().await {
        let line = match view.lock() {
            Ok(mut view) => view.apply(&event),
            Err(_) => break,
        };
        if let Some(line) = line {
            println!("{}", line);
        }
    }
}

async fn read_commands(
    command_tx: mpsc::UnboundedSender<CoreCommand>,
    view: Arc<Mutex<ChannelView>>,
    stats: SharedEventStats,
    signer: Option<Arc<dyn NostrSigner>>,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let Some(command) = parse_line(&line) else {
            continue;
        };
        match command {
            LineCommand::Join(name) => {
                let (tx, rx) = oneshot::channel();
                if command_tx
                    .send(CoreCommand::SelectChannel {
                        name,
                        response_tx: Some(tx),
                    })
                    .is_err()
                {
                    break;
                }
                if let Ok(Err(e)) = rx.await {
                    println!("!! {}", e);
                }
            }
            LineCommand::Channels => {
                if let Ok(view) = view.lock() {
                    println!("{}", view.render_channels());
                }
            }
            LineCommand::Tidy => {
                let _ = command_tx.send(CoreCommand::ClearEmptyChannels { response_tx: None });
            }
            LineCommand::Status => {
                let connection = view
                    .lock()
                    .map(|v| format!("{:?} {}", v.connection, v.relay_url.as_deref().unwrap_or("-")))
                    .unwrap_or_default();
                println!("-- {}; {}", connection, stats.snapshot().summary());
            }
            LineCommand::Login => {
                let (tx, rx) = oneshot::channel();
                let _ = command_tx.send(CoreCommand::Login {
                    signer: signer.clone(),
                    response_tx: Some(tx),
                });
                if let Ok(Err(e)) = rx.await {
                    println!("!! {}", e);
                }
            }
            LineCommand::Away => {
                let _ = command_tx.send(CoreCommand::SetForeground(false));
                println!("-- away: new messages in the current channel are marked unread");
            }
            LineCommand::Back => {
                let _ = command_tx.send(CoreCommand::SetForeground(true));
                println!("-- back");
            }
            LineCommand::Save => {
                let _ = command_tx.send(CoreCommand::SaveCache);
            }
            LineCommand::Help => println!("{}", HELP),
            LineCommand::Quit => {
                let _ = command_tx.send(CoreCommand::Shutdown);
                break;
            }
            LineCommand::Unknown(text) => {
                println!("?? {} (this client is read-only; /help for commands)", text);
            }
        }
    }
}

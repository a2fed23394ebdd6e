//! Terminal front end for a paradrop table.
//!
//! Type a number (0-36) to select it, `bet` to place the fixed wager on the
//! selection, `clear` to drop the selection and `quit` to leave.

use anyhow::{Context, Result};
use clap::Parser;
use paradrop_client::{
    identity::default_identity_path,
    screen::{Descent, Screen, StatusKind},
    ClientConfig, Command, Driver, HttpApi, IdentityStore, RoundSyncClient, Surface,
};
use paradrop_types::{GameType, Number, RoundCode};
use std::{io::Write, path::PathBuf};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Play a paradrop table from the terminal")]
struct Args {
    /// Game server base URL (overrides PARADROP_URL)
    #[arg(short, long)]
    url: Option<String>,

    /// Game variant: silver, gold, diamond, platinum or roulette
    #[arg(short, long)]
    game: Option<GameType>,

    /// Round code of the table to follow
    #[arg(short, long)]
    table: Option<String>,

    /// Identity file (overrides PARADROP_IDENTITY_FILE)
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Wager per bet (defaults to the variant's amount)
    #[arg(long)]
    bet_amount: Option<i64>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

struct ConsoleSurface<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSurface<W> {
    fn draw(&mut self, screen: &Screen) -> std::io::Result<()> {
        let out = &mut self.out;
        writeln!(out)?;
        writeln!(
            out,
            "== {} == {} | pays {} | round {} | players {} | timer {}{}",
            screen.title,
            screen.username,
            screen.payout,
            if screen.round_code.is_empty() { "-" } else { &screen.round_code },
            screen.players,
            if screen.timer.is_empty() { "--" } else { &screen.timer },
            if screen.timer_urgent { " !" } else { "" },
        )?;

        let slots: Vec<String> = screen
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let label = match slot.number {
                    Some(number) => format!("{:>2} {}", number.get(), slot.username),
                    None => " .".to_string(),
                };
                let marker = match screen.descent {
                    Descent::Falling { slot: at } if at == index => "v",
                    Descent::Landed { slot: at, .. } if at == index => "*",
                    _ if slot.winning => "*",
                    _ => " ",
                };
                format!("[{marker}{label}]")
            })
            .collect();
        writeln!(out, "{}", slots.join(" "))?;

        let mine: Vec<String> = screen.my_bets.iter().map(Number::to_string).collect();
        writeln!(
            out,
            "wallet {}{} | selected {} | my bets [{}]{}",
            screen.wallet,
            if screen.wallet_bounce { " +" } else { "" },
            screen
                .selection
                .map(|number| number.to_string())
                .unwrap_or_else(|| "-".to_string()),
            mine.join(", "),
            if screen.bet_enabled { "" } else { " | betting closed" },
        )?;

        if !screen.status.text.is_empty() {
            let prefix = match screen.status.kind {
                StatusKind::Neutral => "",
                StatusKind::Ok => "ok: ",
                StatusKind::Error => "error: ",
            };
            writeln!(out, "{prefix}{}", screen.status.text)?;
        }
        out.flush()
    }
}

impl<W: Write> Surface for ConsoleSurface<W> {
    fn render(&mut self, screen: &Screen) {
        if let Err(err) = self.draw(screen) {
            debug!(?err, "failed to draw");
        }
    }
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "" => None,
        "bet" | "b" => Some(Command::PlaceBet),
        "clear" | "c" => Some(Command::ClearSelection),
        "quit" | "q" | "exit" => Some(Command::Quit),
        other => other
            .parse::<i64>()
            .ok()
            .map(|raw| Command::Select(Number::clamped(raw))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::from_env();
    if let Some(url) = args.url {
        config.base_url = url;
    }
    if let Some(game) = args.game {
        config.game = game;
    }
    if args.table.is_some() {
        config.table_code = args.table;
    }
    if args.identity_file.is_some() {
        config.identity_path = args.identity_file;
    }
    if args.bet_amount.is_some() {
        config.bet_amount = args.bet_amount;
    }

    let api = HttpApi::new(&config.base_url)
        .with_context(|| format!("invalid server URL {}", config.base_url))?;

    let identity_path = config
        .identity_path
        .clone()
        .or_else(default_identity_path)
        .context("no identity file location available")?;
    let mut store = IdentityStore::open(&identity_path)
        .with_context(|| format!("failed to read identity file {}", identity_path.display()))?;
    let identity = store
        .load_or_generate(config.game, &mut rand::thread_rng())
        .context("failed to store identity")?;
    info!(
        game = %config.game,
        user_id = %identity.user_id,
        username = %identity.username,
        url = %config.base_url,
        "starting"
    );

    let client = RoundSyncClient::new(config.game, identity)
        .with_bet_amount(config.bet_amount())
        .with_table(config.table_code.clone().map(RoundCode::new))
        .with_animation(config.animation);
    let surface = ConsoleSurface {
        out: std::io::stdout(),
    };
    let driver = Driver::new(client, api, &config, surface);

    let (commands, commands_rx) = mpsc::channel(64);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let Some(command) = parse_command(&line) else {
                continue;
            };
            let quit = command == Command::Quit;
            if commands.send(command).await.is_err() || quit {
                break;
            }
        }
    });

    driver.run(commands_rx).await.context("client stopped")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command(" bet "), Some(Command::PlaceBet));
        assert_eq!(parse_command("Q"), Some(Command::Quit));
        assert_eq!(parse_command("clear"), Some(Command::ClearSelection));
        assert_eq!(
            parse_command("7"),
            Some(Command::Select(Number::new(7).unwrap()))
        );
        assert_eq!(parse_command("99"), Some(Command::Select(Number::MAX)));
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_console_draws_board() {
        let mut screen = Screen::new("Parachute Drop", "Player1");
        screen.payout = 5_000;
        screen.round_code = "P1".to_string();
        screen.slots[0].number = Number::new(5).ok();
        screen.slots[0].username = "A".to_string();
        screen.slots[0].winning = true;

        let mut surface = ConsoleSurface { out: Vec::new() };
        surface.render(&screen);
        let text = String::from_utf8(surface.out).unwrap();
        assert!(text.contains("round P1"));
        assert!(text.contains("pays 5000"));
        assert!(text.contains("[* 5 A]"));
        assert!(text.contains("wallet 0"));
    }
}

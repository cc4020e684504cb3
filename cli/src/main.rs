use clap::Parser;
use clap_derive::{Parser, ValueEnum};
use config::{Settings, load_env_file};
use conversation::{DEFAULT_POLL_INTERVAL, Orchestrator, Tick, TurnRole};
use inventory::{Inventory, InventoryFilter, RiskLevel};
use platform::{RestQueryEngine, ServingClient, WarehouseClient};
use std::io::{self, BufRead, Write};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Copy, Clone, ValueEnum, Debug, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
enum Mode {
    /// Conversational questions against the inventory data.
    Chat,
    /// One-shot KPI and grid summary.
    Summary,
    /// AI allocation recommendation for one site and part.
    Recommend,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Chat)]
    mode: Mode,

    /// Filter to one site (summary), or the site to fix (recommend).
    #[arg(long)]
    site: Option<String>,

    /// Filter to one part (summary), or the part to fix (recommend).
    #[arg(long)]
    part: Option<String>,

    /// Filter to one piece of equipment (summary only).
    #[arg(long)]
    equipment: Option<String>,

    /// Filter to one risk level: stocked, low or out (summary only).
    #[arg(long)]
    risk: Option<String>,

    #[arg(long, short)]
    tracing: bool,
}

fn setup_tracing(enable: bool) {
    if enable {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::TRACE)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Setting default subscriber failed");
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::ERROR)
            .with_writer(|| std::io::sink())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Setting default subscriber failed");
    }
}

fn parse_risk(value: &str) -> anyhow::Result<RiskLevel> {
    match value.to_lowercase().as_str() {
        "stocked" => Ok(RiskLevel::Stocked),
        "low" | "low-stock" => Ok(RiskLevel::LowStock),
        "out" | "out-of-stock" => Ok(RiskLevel::OutOfStock),
        other => anyhow::bail!("unknown risk level: {} (use stocked, low or out)", other),
    }
}

fn print_status_bar(mode: Mode) {
    let terminal_width: usize = 80;
    let status = format!(" pitstock • {:?} ", mode).to_lowercase();
    let padding = terminal_width.saturating_sub(status.len());
    let left_pad = padding / 2;
    let right_pad = padding - left_pad;

    println!("┌{}┐", "─".repeat(terminal_width - 2));
    println!("│{}{}{}│", " ".repeat(left_pad), status, " ".repeat(right_pad));
    println!("└{}┘", "─".repeat(terminal_width - 2));
}

// Slash command parsing and handling
mod commands {
    pub enum Command {
        Quit,
        Help,
        Clear,
    }

    pub enum CommandResult {
        Continue,
        Exit,
        Cleared,
    }

    impl Command {
        pub fn parse(input: &str) -> Result<Self, String> {
            if !input.starts_with('/') {
                return Err("Not a command".to_string());
            }

            let parts: Vec<&str> = input[1..].split_whitespace().collect();
            if parts.is_empty() {
                return Err("Empty command".to_string());
            }

            match parts[0] {
                "quit" | "exit" => Ok(Command::Quit),
                "help" => Ok(Command::Help),
                "clear" => Ok(Command::Clear),
                _ => Err(format!(
                    "Unknown command: /{}. Type /help for available commands.",
                    parts[0]
                )),
            }
        }

        pub fn execute(self) -> CommandResult {
            match self {
                Command::Quit => {
                    println!("Goodbye!");
                    CommandResult::Exit
                }
                Command::Help => {
                    print_help();
                    println!();
                    CommandResult::Continue
                }
                Command::Clear => CommandResult::Cleared,
            }
        }
    }

    fn print_help() {
        println!("Available commands:");
        println!("  /quit, /exit           - Exit the chat");
        println!("  /clear                 - Clear conversation history");
        println!("  /help                  - Show this help message");
        println!("  Ctrl+D                 - Exit the chat");
    }
}

async fn run_chat(config: &config::ResolvedConfig) -> anyhow::Result<()> {
    let engine = RestQueryEngine::new(&config.host, &config.token, &config.space_id)?;
    let mut orchestrator = Orchestrator::new(engine);

    println!();
    println!("{}", orchestrator.turns()[0].text);
    println!();
    println!("Type /help for commands, Ctrl+D or /quit to exit.");
    println!();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print_status_bar(Mode::Chat);
        print!("> ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
            None => {
                println!();
                println!("Goodbye!");
                break;
            }
        };

        let input = line.trim();

        if input.is_empty() {
            continue;
        }

        if input.starts_with('/') {
            match commands::Command::parse(input) {
                Ok(cmd) => match cmd.execute() {
                    commands::CommandResult::Exit => break,
                    commands::CommandResult::Cleared => {
                        orchestrator.clear();
                        println!("Conversation history cleared.");
                        println!();
                        continue;
                    }
                    commands::CommandResult::Continue => continue,
                },
                Err(err) => {
                    println!("{}", err);
                    println!();
                    continue;
                }
            }
        }

        if let Err(e) = orchestrator.ask(input).await {
            println!("{}", e);
            println!();
            continue;
        }

        // Poll on a fixed cadence, echoing progress as it changes.
        let mut last_progress = String::new();
        while orchestrator.is_busy() {
            tokio::time::sleep(DEFAULT_POLL_INTERVAL).await;
            match orchestrator.tick().await {
                Tick::Waiting(progress) => {
                    if progress != last_progress {
                        println!("  {}", progress);
                        last_progress = progress;
                    }
                }
                Tick::Settled | Tick::Idle => break,
            }
        }

        if let Some(turn) = orchestrator.turns().last() {
            if turn.role == TurnRole::Assistant {
                println!();
                println!("{}", turn.text);
            }
        }
        println!();
    }

    let questions = orchestrator
        .turns()
        .iter()
        .filter(|t| t.role == TurnRole::User)
        .count();
    println!("Conversation had {} questions", questions);
    Ok(())
}

async fn run_summary(config: &config::ResolvedConfig, args: &Args) -> anyhow::Result<()> {
    let warehouse = WarehouseClient::new(&config.host, &config.token, &config.warehouse_id)?;
    let snapshot = Inventory::load(&warehouse, &config.inventory_table).await?;

    if snapshot.is_empty() {
        println!("No inventory data");
        return Ok(());
    }

    let filter = InventoryFilter {
        site: args.site.clone(),
        equipment: args.equipment.clone(),
        part: args.part.clone(),
        risk: args.risk.as_deref().map(parse_risk).transpose()?,
    };
    let matched = filter.apply(snapshot.records());
    let (lat, lon) = snapshot.map_center();

    println!();
    println!(
        "Sites: {}  Parts: {}  Map center: ({:.2}, {:.2})",
        snapshot.sites().len(),
        snapshot.parts().len(),
        lat,
        lon
    );
    println!();
    println!("{}", inventory::render_kpis(&inventory::site_kpis(&matched)));
    println!();
    println!("{}", inventory::render_grid(&inventory::grid_rows(&matched)));
    Ok(())
}

async fn run_recommend(config: &config::ResolvedConfig, args: &Args) -> anyhow::Result<()> {
    let site = args
        .site
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("recommend mode requires --site"))?;
    let part = args
        .part
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("recommend mode requires --part"))?;

    let warehouse = WarehouseClient::new(&config.host, &config.token, &config.warehouse_id)?;
    let snapshot = Inventory::load(&warehouse, &config.inventory_table).await?;
    let serving = ServingClient::new(&config.host, &config.token, &config.serving_endpoint)?;

    println!("Generating AI recommendations...");
    let recommendation =
        inventory::recommend::recommend(&serving, snapshot.records(), site, part).await?;
    println!();
    println!("{}", recommendation);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file();
    let args = Args::parse();

    setup_tracing(args.tracing);

    let config = Settings::load().resolve()?;

    match args.mode {
        Mode::Chat => run_chat(&config).await,
        Mode::Summary => run_summary(&config, &args).await,
        Mode::Recommend => run_recommend(&config, &args).await,
    }
}

//! Binary entrypoint for the gridmenus CLI.
//!
//! Commands:
//! - `init` - write a starter `gridmenus.toml` and an example menu
//! - `check` - load every menu file and report what was sanitized or rejected
//! - `list` - print the loaded menus and their commands
//! - `preview <menu> [--perm P]... [--balance N] [--level N]` - render a menu
//!   for a simulated player and print the slot grid
//!
//! See the library crate docs for module-level details: `gridmenus::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::Path;

use gridmenus::config::Config;
use gridmenus::host::{Experience, ItemStack};
use gridmenus::menu::{LoadOptions, MenuEngine, MenuRegistry, OpenOutcome};
use gridmenus::placeholders::MapPlaceholders;
use gridmenus::sim::{SimEconomy, SimEvent, SimHost, SimPermissions};

const EXAMPLE_MENU: &str = r#"# Example menu. Open in game with /gui main or /menu.
name = "§8Main Menu"
rows = 3
open_command = ["gui main", "menu"]
open_actions = ["[sound] random.click"]

[filler_item]
material = "gray_stained_glass_pane"
slots = "0-26"

[items.welcome]
slot = 13
material = "player_head"
display_name = "§aHello, %player_name%!"
lore = ["§7Balance: %vault_eco_balance%", "§7Click for a starter kit."]

[items.welcome.click_requirement]
success_actions = ["[takemoney] 10", "[console] give %player_name% bread 8", "[close]"]

[items.welcome.click_requirement.requirements.funds]
type = "has money"
amount = 10
deny_actions = ["[message] §cYou need 10 coins for the kit."]

[items.vip]
slot = 11
priority = 1
material = "diamond"
display_name = "§bVIP lounge"
actions = ["[opengui] vip"]

[items.vip.view_requirement.requirements.rank]
type = "has permission"
permission = "menus.vip"

[items.vip_locked]
slot = 11
material = "barrier"
display_name = "§cVIP only"

[items.close]
slot = 26
material = "arrow"
display_name = "§7Close"
actions = ["[close]"]
"#;

#[derive(Parser)]
#[command(name = "gridmenus")]
#[command(about = "Data-driven chest menus with requirements and an action language")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "gridmenus.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and an example menu
    Init,
    /// Load all menus and report problems
    Check,
    /// List loaded menus and the commands that open them
    List,
    /// Render a menu for a simulated player
    Preview {
        /// Menu id
        menu: String,
        /// Grant a permission to the simulated player (repeatable)
        #[arg(long = "perm")]
        perms: Vec<String>,
        /// Starting balance
        #[arg(long, default_value_t = 0.0)]
        balance: f64,
        /// Experience level
        #[arg(long, default_value_t = 0)]
        level: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new gridmenus configuration");
            if Path::new(&cli.config).exists() {
                return Err(anyhow!("{} already exists, not overwriting", cli.config));
            }
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let config = Config::default();
            tokio::fs::create_dir_all(&config.menus.dir).await?;
            let example = Path::new(&config.menus.dir).join("main.toml");
            if example.exists() {
                warn!("{} already exists, leaving it alone", example.display());
            } else {
                tokio::fs::write(&example, EXAMPLE_MENU).await?;
                info!("Example menu written to {}", example.display());
            }
        }
        Commands::Check => {
            let config = load_config(pre_config, &cli.config).await?;
            let (registry, report) = load_registry(&config).await?;
            for id in &report.loaded {
                if let Some(menu) = registry.get(id) {
                    println!(
                        "ok    {:<20} rows={} items={} commands=[{}]",
                        menu.id,
                        menu.rows,
                        menu.items.len(),
                        menu.open_commands.join(", ")
                    );
                }
            }
            for (path, reason) in &report.failed {
                println!("error {}: {}", path.display(), reason);
            }
            println!("{} loaded, {} failed", report.loaded.len(), report.failed.len());
            if !report.failed.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::List => {
            let config = load_config(pre_config, &cli.config).await?;
            let (registry, _) = load_registry(&config).await?;
            if registry.is_empty() {
                println!("No menus loaded from {}", config.menus.dir);
            }
            for (id, title) in registry.available() {
                let commands = registry
                    .get(&id)
                    .map(|m| m.open_commands.join(", "))
                    .unwrap_or_default();
                println!("{:<20} {:<30} /{}", id, title, commands.replace(", ", ", /"));
            }
            let custom = registry.custom_commands();
            if !custom.is_empty() {
                println!();
                println!("Custom commands:");
                for command in custom {
                    println!("  /{:<18} {:<20} {}", command.label, command.menu, command.description);
                }
            }
        }
        Commands::Preview {
            menu,
            perms,
            balance,
            level,
        } => {
            let config = load_config(pre_config, &cli.config).await?;
            let (registry, _) = load_registry(&config).await?;

            let mut host = SimHost::new();
            let player = host.add_player("Preview");
            for perm in &perms {
                host.grant_permission(player, perm);
            }
            host.set_experience(
                player,
                Experience {
                    level,
                    total_points: None,
                },
            );
            let economy = SimEconomy::new();
            economy.set_balance(player, balance);
            let mut placeholders = MapPlaceholders::new();
            placeholders.set(player, "player_name", "Preview");
            placeholders.set(player, "vault_eco_balance", format!("{:.2}", balance));

            let mut engine = MenuEngine::new(config.engine.clone(), registry)
                .with_placeholders(placeholders)
                .with_economy(economy)
                .with_permissions(SimPermissions::new());

            match engine.open_menu(&mut host, player, &menu)? {
                OpenOutcome::Opened => print_window(&host, player),
                OpenOutcome::Denied => println!("Open requirement denied '{}'", menu),
                OpenOutcome::Redirected(other) => {
                    println!("Close actions redirected to '{}'", other);
                    print_window(&host, player);
                }
            }
            for event in host.events() {
                match event {
                    SimEvent::Message { text, .. } => println!("message: {}", text),
                    SimEvent::Command { actor, command } => println!("command ({:?}): {}", actor, command),
                    SimEvent::Sound { sound, .. } => println!("sound: {}", sound.id),
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

async fn load_config(pre_config: Option<Config>, path: &str) -> Result<Config> {
    match pre_config {
        Some(config) => Ok(config),
        None => Config::load(path).await,
    }
}

async fn load_registry(config: &Config) -> Result<(MenuRegistry, gridmenus::menu::LoadReport)> {
    let mut registry = MenuRegistry::new(LoadOptions::from(&config.engine));
    let report = registry
        .load_dir(&config.menus.dir)
        .await
        .map_err(|e| anyhow!("Failed to load menus from {}: {}", config.menus.dir, e))?;
    Ok((registry, report))
}

fn cell(item: Option<&ItemStack>) -> String {
    match item {
        Some(item) => item.material.chars().take(4).collect(),
        None => ".".to_string(),
    }
}

fn print_window(host: &SimHost, player: gridmenus::host::PlayerId) {
    let Some(window) = host.window(player) else {
        println!("No window open");
        return;
    };
    println!("{}", gridmenus::logutil::strip_formatting(&window.title));
    for row in 0..usize::from(window.rows) {
        let cells: Vec<String> = (0..9)
            .map(|col| format!("{:<5}", cell(window.slots.get(&(row * 9 + col)))))
            .collect();
        println!("{}", cells.join("").trim_end());
    }
    for (slot, item) in &window.slots {
        let name = item
            .custom_name
            .as_deref()
            .map(gridmenus::logutil::strip_formatting)
            .unwrap_or_default();
        println!("  [{:>2}] {} x{} {}", slot, item.material, item.count, name.trim());
        for line in &item.lore {
            println!("         {}", gridmenus::logutil::strip_formatting(line));
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let log_file = config.as_ref().and_then(|c| c.logging.file.clone());
    match log_file.and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    }) {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Only echo to the console when attached to a terminal
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}

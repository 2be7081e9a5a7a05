mod config;
mod dispatcher;
mod protocol;
mod server;
mod session;
mod shutdown;
mod storage;

use clap::Parser;
use tracing::info;

use config::ServerConfig;
use storage::PersistentStore;

#[derive(Parser)]
#[command(name = "lexicond")]
#[command(about = "Dictionary server operations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, help = "Config file path")]
    config: Option<String>,

    #[arg(long, help = "Listen address (overrides config)")]
    listen: Option<String>,

    #[arg(long, help = "Backing file path (overrides config)")]
    store: Option<String>,

    #[arg(long, help = "Output as JSON")]
    json: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    Status,
    GenerateConfig {
        #[arg(long, default_value = "lexicond.toml", help = "Config file path")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("lexicond=info")
        .init();

    let cli = Cli::parse();

    let mut config = ServerConfig::load_or_create(cli.config.as_deref())?;

    if let Some(listen) = cli.listen {
        config.listen_address = listen;
    }
    if let Some(store) = cli.store {
        config.store_file = store.into();
    }

    match cli.command {
        Some(Commands::Status) => status(&config, cli.json),
        Some(Commands::GenerateConfig { output }) => generate_config(&output, cli.json),
        None => {
            if let Err(e) = config.ensure_directories() {
                if cli.json {
                    println!(
                        "{}",
                        serde_json::json!({"error": format!("Failed to create directories: {}", e)})
                    );
                } else {
                    eprintln!("❌ Failed to create directories: {}", e);
                }
                return Err(e);
            }

            info!("Starting lexicond on {}", config.listen_address);
            server::run(&config).await
        }
    }
}

fn status(config: &ServerConfig, json: bool) -> anyhow::Result<()> {
    if !config.store_file.exists() {
        if json {
            println!("{}", serde_json::json!({"status": "not_initialized"}));
        } else {
            println!("📊 Lexicond Status");
            println!("==================");
            println!("❌ Status: Not initialized");
            println!("   Backing file not found: {}", config.store_file.display());
        }
        return Ok(());
    }

    let dict = PersistentStore::new(config.store_file.clone()).load()?;

    if json {
        let status = serde_json::json!({
            "status": "ready",
            "store_file": config.store_file.display().to_string(),
            "listen_address": config.listen_address,
            "words": dict.len(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("📊 Lexicond Status");
        println!("==================");
        println!("✅ Status: Ready");
        println!("   Backing file: {}", config.store_file.display());
        println!("   Listen address: {}", config.listen_address);
        println!("   Words: {}", dict.len());
    }
    Ok(())
}

fn generate_config(output: &str, json: bool) -> anyhow::Result<()> {
    let config = ServerConfig::default();
    match config.save(output) {
        Ok(_) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "config_file": output,
                        "message": "Default configuration file created"
                    })
                );
            } else {
                println!("⚙️  Generate Configuration");
                println!("========================");
                println!("✅ Default configuration saved to: {}", output);
                println!("   Edit the file to customize server settings");
            }
            Ok(())
        }
        Err(e) => {
            if json {
                println!("{}", serde_json::json!({"error": e.to_string()}));
            } else {
                println!("⚙️  Generate Configuration");
                println!("========================");
                println!("❌ Failed to create config file: {}", e);
            }
            Err(e)
        }
    }
}

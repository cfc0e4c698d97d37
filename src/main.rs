use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use kalium::{
    App,
    app::serve_gate,
    config::{ServerConfig, ServerConfigValidator, load_config, load_config_file},
    core::{Request, Response},
    tracing_setup,
    utils::GracefulShutdown,
};
use serde_json::json;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "kalium.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        #[clap(short, long, default_value = "kalium.toml")]
        config: String,
    },
    /// Write a default configuration file
    Init {
        #[clap(short, long, default_value = "kalium.toml")]
        config: String,
    },
    /// Start the demo model server (default)
    Serve {
        #[clap(short, long, default_value = "kalium.toml")]
        config: String,
    },
}

/// Stand-in for an accelerator-resident model.
#[derive(Default)]
struct DemoModel {
    epochs_trained: AtomicU64,
}

fn predict(model: &DemoModel, request: Request) -> eyre::Result<Response> {
    let prompt = request
        .get("prompt")
        .and_then(|value| value.as_str())
        .ok_or_else(|| eyre!("request is missing a string 'prompt' field"))?;

    Ok(Response::ok(json!({
        "outputs": prompt.to_uppercase(),
        "epochs_trained": model.epochs_trained.load(Ordering::Acquire),
    })))
}

fn train(model: &DemoModel, request: Request) -> eyre::Result<Response> {
    let epochs = request
        .get("epochs")
        .and_then(|value| value.as_u64())
        .unwrap_or(1);

    for epoch in 1..=epochs {
        thread::sleep(Duration::from_secs(1));
        let total = model.epochs_trained.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::info!(epoch, total, "Finished training epoch");
    }
    Ok(Response::ok(json!({ "epochs": epochs })))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config),
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve_command(&config).await,
        None => serve_command(&args.config).await,
    }
}

async fn serve_command(config_path: &str) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    ServerConfigValidator::validate(&config).map_err(|e| eyre!("{e}"))?;

    tracing_setup::init_tracing_with_config(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    let app = App::<DemoModel>::new("kalium-demo")
        .handler("/", predict)?
        .background("/train", train)?;
    let gate = Arc::new(app.into_gate()?);

    // Completion watcher: the observer the event channel exists for
    let events = gate.events();
    tokio::spawn(async move {
        loop {
            if events.consume_async().await {
                tracing::info!("Background work finished, gate is free");
            }
        }
    });

    let shutdown = Arc::new(GracefulShutdown::with_timeout(config.shutdown_timeout()));
    let signal_handler_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_handler_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    println!(
        "Kalium listening on {} ({:?} backend)",
        config.listen_addr(),
        config.backend
    );
    serve_gate(gate, &config, &shutdown).await
}

/// Validate configuration file and exit
fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    let config = match load_config_file(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match ServerConfigValidator::validate(&config) {
        Ok(()) => {
            println!("✅ Configuration validation: OK");
            println!();
            println!("📋 Configuration Summary:");
            println!("   • Listen Address: {}", config.listen_addr());
            println!("   • Backend: {:?}", config.backend);
            println!("   • Log Level: {}", config.logging.level);
            println!("   • Shutdown Timeout: {}s", config.shutdown_timeout_secs);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Kalium server configuration

host = "0.0.0.0"
port = 8000

# "axum" dispatches on the blocking thread pool, "hyper" dispatches inline
backend = "axum"

# Seconds in-flight requests get to finish after SIGINT/SIGTERM
shutdown_timeout_secs = 30

[logging]
level = "info"
json = false
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'kalium serve --config {config_path}' to start the server");
    Ok(())
}

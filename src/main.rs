mod cli;

use hlsforge::{
    config, intake,
    pipeline::Pipeline,
    server::{self, auth},
};
use hlsforge_av::{check_ffmpeg, FfmpegEngine};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting hlsforge server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlsforge=trace,hlsforge_av=trace,hlsforge_common=debug,tower_http=debug".to_string()
        } else {
            "hlsforge=debug,hlsforge_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Transcode { input, storage } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(transcode_file(&input, storage, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hlsforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::HashPassword { password } => hash_password(&password),
    }
}

async fn transcode_file(
    input: &Path,
    storage: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;
    if let Some(root) = storage {
        config.storage.root = root;
    }

    let filename = input
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Input has no usable file name: {:?}", input))?
        .to_string();
    intake::check_extension(&filename)?;
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {:?}", input))?;

    let engine = FfmpegEngine::discover(config.transcode.ffmpeg_path.as_deref())?;
    let pipeline = Pipeline::from_config(&config, Arc::new(engine));

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    tracing::info!("Transcoding {:?}", input);
    let published = pipeline
        .process(ReaderStream::new(file), &filename, cancel)
        .await?;

    println!("{}", serde_json::to_string_pretty(&published)?);
    println!("Manifest: {}", published.manifest_path.display());
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tool = check_ffmpeg(config.transcode.ffmpeg_path.as_deref());

    let status = if tool.available { "✓" } else { "✗" };
    print!("{} {}", status, tool.name);
    if let Some(ref version) = tool.version {
        print!(" ({})", version.lines().next().unwrap_or(""));
    }
    if let Some(ref path) = tool.path {
        print!(" - {}", path.display());
    }
    println!();

    println!();
    if tool.available {
        println!("All required tools are available!");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is missing; install it or set transcode.ffmpeg_path")
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!(
                "  Upload password set: {}",
                config.server.auth.password_hash.is_some()
            );
            println!("  Storage root: {}", config.storage.root.display());
            println!("  Max upload bytes: {}", config.storage.max_upload_bytes);
            println!("  Transcode timeout: {}s", config.transcode.timeout_secs);
            println!(
                "  Max concurrent jobs: {}",
                config.transcode.max_concurrent_jobs
            );
            println!("  Reaper enabled: {}", config.reaper.enabled);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Storage root: {}", config.storage.root.display());
        }
    }

    Ok(())
}

fn hash_password(password: &str) -> Result<()> {
    let hash = auth::hash_password(password)?;
    println!("{}", hash);
    Ok(())
}

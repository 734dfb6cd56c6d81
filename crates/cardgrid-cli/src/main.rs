mod render_tools;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cardgrid_core::CardgridConfig;
use cardgrid_render::{video_decoder, ShaderProgram, Typeface};
use clap::{Parser, Subcommand};

const DEFAULT_CONFIG_FILE: &str = "cardgrid.toml";

#[derive(Parser)]
#[command(
    name = "cardgrid",
    version,
    about = "cardgrid: card textures for the infinite grid",
    long_about = "Render card decks to the foreground and blurred background textures the\ninfinite grid draws, and print the GLSL programs it renders them with."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every card of a JSON deck to PNG textures
    Render {
        /// Path to the card deck (a JSON array of cards or {"cards": [...]})
        #[arg()]
        file: PathBuf,

        /// Output directory (default: output/)
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Config file (default: ./cardgrid.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the GLSL source of the grid's shader programs
    Shaders {
        /// Only print one program: blur or post
        #[arg(long)]
        program: Option<String>,
    },

    /// Show configuration, font resolution and FFmpeg availability
    Info {
        /// Config file (default: ./cardgrid.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Manage the cardgrid.toml config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default cardgrid.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Render { file, output, config } => cmd_render(&file, &output, config.as_deref()),
        Commands::Shaders { program } => cmd_shaders(program.as_deref()),
        Commands::Info { config } => cmd_info(config.as_deref()),
        Commands::Config { command } => match command {
            ConfigCommands::Init { force } => cmd_config_init(Path::new(DEFAULT_CONFIG_FILE), force),
        },
    }
}

fn run_async<F>(future: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    runtime.block_on(future)
}

/// Explicit `--config`, else `./cardgrid.toml` when present, else defaults.
fn load_config(explicit: Option<&Path>) -> Result<CardgridConfig> {
    if let Some(path) = explicit {
        return CardgridConfig::load_from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display()));
    }
    let local = Path::new(DEFAULT_CONFIG_FILE);
    if local.exists() {
        tracing::debug!("Using {}", local.display());
        return CardgridConfig::load_from_file(local)
            .with_context(|| format!("failed to load config: {}", local.display()));
    }
    Ok(CardgridConfig::default())
}

fn cmd_render(file: &Path, output: &Path, config: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("Card deck not found: {}", file.display());
    }
    let config = load_config(config)?;
    run_async(async {
        let written = render_tools::render_deck(config, file, output).await?;
        println!("✓ Wrote {} textures to {}", written.len(), output.display());
        Ok(())
    })
}

fn cmd_shaders(program: Option<&str>) -> Result<()> {
    let programs: Vec<ShaderProgram> = match program {
        Some(name) => vec![ShaderProgram::by_name(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown shader program '{}' (expected blur or post)", name))?],
        None => ShaderProgram::all().to_vec(),
    };

    for program in programs {
        let uniforms: Vec<String> = program
            .uniforms()
            .iter()
            .map(|u| format!("{} {}", u.kind.glsl_name(), u.name))
            .collect();
        println!("// ── {} ──", program.name);
        println!("// uniforms: {}", uniforms.join(", "));
        println!("// vertex");
        println!("{}", program.vertex.trim());
        println!("// fragment");
        println!("{}", program.fragment.trim());
        println!();
    }
    Ok(())
}

fn cmd_info(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let typeface = Typeface::resolve(config.assets.font.as_deref()).context("failed to resolve card font")?;

    println!("🃏 cardgrid");
    println!("   Version:   {}", env!("CARGO_PKG_VERSION"));
    println!("   Card:      {}x{}", config.card.width, config.card.height);
    println!("   Blur:      σ={}", config.card.blur_radius);
    println!("   Cache key: {:?}", config.cache.key_policy);
    println!("   Assets:    {}", config.assets.root.display());
    println!("   Fallback:  {}", config.assets.placeholder_image);
    println!(
        "   Font:      {}",
        match (&config.assets.font, typeface.is_fallback()) {
            (Some(path), _) => path.display().to_string(),
            (None, false) => "system font".to_string(),
            (None, true) => "fallback glyphs".to_string(),
        }
    );
    println!(
        "   FFmpeg:    {}",
        if video_decoder::is_available() {
            "available ✓"
        } else {
            "NOT FOUND ✗"
        }
    );
    Ok(())
}

fn cmd_config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("'{}' already exists (use --force to overwrite)", path.display());
    }
    CardgridConfig::default()
        .save_to_file(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("✓ Wrote {}", path.display());
    Ok(())
}

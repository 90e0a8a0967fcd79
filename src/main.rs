mod api;
mod assets;
mod config;
mod logging;
mod pipeline;
mod sprite;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use api::{PokeApi, Provider};
use assets::IconTable;
use config::Config;
use pipeline::{Browser, ThreadSpawner};

#[derive(Parser, Debug)]
#[command(name = "dexview", version, about = "Terminal pokedex browser backed by PokeAPI")]
struct Cli {
    /// Configuration file (default: ~/.config/dexview/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the pokedex catalog, one name per line
    Catalog,
    /// Print the pokemon of one or more pokedexes, in order
    Members(MembersArgs),
    /// Print the detail rows of one pokemon
    Show(ShowArgs),
}

#[derive(Args, Debug)]
struct MembersArgs {
    /// Pokedex names, fetched in the given order
    #[arg(value_name = "GROUP", required = true)]
    groups: Vec<String>,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// National pokemon id or name
    #[arg(value_name = "ID")]
    id: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    let config = config::load(cli.config.as_deref())?;
    match &config.config_path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no configuration file, using defaults"),
    }

    let provider: Arc<dyn Provider> =
        Arc::new(PokeApi::new(&config.api).context("failed to build PokeAPI client")?);
    let icons = Arc::new(IconTable::new(
        config.assets.icon_dir.clone(),
        config.detail.icon_size,
    ));
    info!(icon_dir = %icons.dir().display(), "type icons");

    match cli.command {
        Some(Command::Catalog) => handle_catalog(provider.as_ref()),
        Some(Command::Members(args)) => handle_members(args, provider.as_ref()),
        Some(Command::Show(args)) => handle_show(args, provider.as_ref(), &icons, &config),
        None => run_browser(provider, icons, &config),
    }
}

fn run_browser(provider: Arc<dyn Provider>, icons: Arc<IconTable>, config: &Config) -> Result<()> {
    let mut browser = Browser::new(
        provider,
        icons,
        Box::new(ThreadSpawner),
        config.detail.clone(),
    );
    // Fail before the terminal is taken over
    let count = browser
        .load_catalog()
        .context("failed to load group catalog")?;
    info!(groups = count, "starting browser");

    let mut app = ui::app::App::new(config, browser);
    app.run()
}

fn handle_catalog(provider: &dyn Provider) -> Result<()> {
    let groups = provider
        .group_list()
        .context("failed to load group catalog")?;
    for group in groups {
        println!("{}", group.name);
    }
    Ok(())
}

fn handle_members(args: MembersArgs, provider: &dyn Provider) -> Result<()> {
    let mut failed = 0usize;
    pipeline::browser::fetch_members_in_order(
        provider,
        &args.groups,
        || true,
        |group, result| match result {
            Ok(members) => {
                for member in members {
                    println!("{}\t{}", member.ordinal, member.name);
                }
            }
            Err(err) => {
                failed += 1;
                eprintln!("warning: skipping {}: {}", group, err);
            }
        },
    );

    if failed == args.groups.len() {
        bail!("no pokedex could be loaded");
    }
    Ok(())
}

fn handle_show(
    args: ShowArgs,
    provider: &dyn Provider,
    icons: &IconTable,
    config: &Config,
) -> Result<()> {
    let detail = provider
        .item_detail(&args.id)
        .with_context(|| format!("failed to load pokemon {}", args.id))?;

    println!("{}", detail.name);
    for row in pipeline::browser::detail_rows(&detail, icons, config.detail.base_stats) {
        println!("{}\t{}", row.label, row.value);
    }
    match &detail.sprite_url {
        Some(url) => println!("sprite\t{}", url),
        None => println!("sprite\t-"),
    }
    Ok(())
}

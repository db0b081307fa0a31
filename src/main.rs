//! YGO Collection - Yu-Gi-Oh! card collection manager
//!
//! Browse the catalog, record owned quantities and export the collection
//! from the command line, or serve the same operations over HTTP.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use ygo_collection::config::{default_data_dir, DEFAULT_CATALOG_FILE};
use ygo_collection::view::DEFAULT_PAGE_SIZE;
use ygo_collection::web::{self, AppState};
use ygo_collection::{
    load_catalog_or_empty, CardKey, Catalog, EditEvent, EditOutcome, PageView, SavePolicy, Session,
    Settings, SortKey, UserId,
};

/// Yu-Gi-Oh! collection manager
#[derive(Parser, Debug)]
#[command(name = "ygo_collection")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the card catalog JSON file
    #[arg(short, long, default_value = DEFAULT_CATALOG_FILE)]
    catalog: PathBuf,

    /// Directory holding the per-user collection files
    #[arg(short, long, default_value_os_t = default_data_dir())]
    data_dir: PathBuf,

    /// When edits are written: after every change (auto) or on save (manual)
    #[arg(long, default_value_t = SavePolicy::Auto)]
    save_policy: SavePolicy,

    /// Cards per page when browsing
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show one page of the card listing
    Browse {
        /// Collection owner
        #[arg(short, long)]
        user: String,

        /// Case-insensitive substring of the card name
        #[arg(short, long)]
        search: Option<String>,

        /// Only list printings with a non-zero quantity
        #[arg(long, default_value_t = false)]
        owned_only: bool,

        /// Only list printings from this set (repeatable)
        #[arg(long = "set")]
        sets: Vec<String>,

        /// Sort by set, name or rarity
        #[arg(long)]
        sort: Option<SortKey>,

        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },

    /// Set the owned quantity of one printing
    Set {
        #[arg(short, long)]
        user: String,

        /// Card name
        #[arg(short, long)]
        name: String,

        /// Set name
        #[arg(short, long)]
        set_name: String,

        /// Set code; without code and rarity the first printing in the set is used
        #[arg(long, default_value = "")]
        code: String,

        #[arg(long, default_value = "")]
        rarity: String,

        #[arg(short, long)]
        quantity: u32,
    },

    /// Export owned printings to CSV
    Export {
        #[arg(short, long)]
        user: String,

        /// Output file (default: collection_<user>_owned_<date>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the set names in the catalog
    Sets,

    /// Serve the collection API
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings {
        catalog_path: args.catalog,
        data_dir: args.data_dir,
        page_size: args.page_size,
        save_policy: args.save_policy,
    };

    if let Err(e) = settings.validate() {
        log::error!("{}", e);
        std::process::exit(2);
    }

    log::debug!("Data directory: {}", settings.data_dir.display());

    // An unavailable catalog is shown as an empty listing
    let catalog = load_catalog_or_empty(&settings.catalog_path);

    if let Err(e) = run(args.command, catalog, settings).await {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, catalog: Catalog, settings: Settings) -> ygo_collection::Result<()> {
    match command {
        Command::Browse {
            user,
            search,
            owned_only,
            sets,
            sort,
            page,
        } => {
            let mut session = open_session(&user, catalog, &settings)?;
            session.apply_all(vec![
                EditEvent::SetSearch(search.unwrap_or_default()),
                EditEvent::SetOwnedOnly(owned_only),
                EditEvent::SetSets(sets),
                EditEvent::SetSort(sort),
                EditEvent::GoToPage(page),
            ])?;
            print_page(&session.render());
        }

        Command::Set {
            user,
            name,
            set_name,
            code,
            rarity,
            quantity,
        } => {
            let mut session = open_session(&user, catalog, &settings)?;
            let key = CardKey::new(name, set_name, code, rarity);
            match session.apply(EditEvent::SetQuantity {
                key: key.clone(),
                quantity,
            })? {
                EditOutcome::QuantityChanged { previous, .. } => {
                    println!("{}: {} -> {}", key, previous, quantity);
                }
                _ => println!("{}: already {}", key, quantity),
            }
            // The process ends here, so manual mode saves too
            if session.is_dirty() {
                session.save()?;
            }
        }

        Command::Export { user, output } => {
            let session = open_session(&user, catalog, &settings)?;
            let output = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "collection_{}_owned_{}.csv",
                    session.user(),
                    chrono::Local::now().format("%Y%m%d")
                ))
            });
            let count = session.export(&output)?;
            println!("Exported {} printings to {}", count, output.display());
        }

        Command::Sets => {
            for set_name in catalog.set_names() {
                println!("{}", set_name);
            }
        }

        Command::Serve { port } => {
            log::info!(
                "Serving {} printings (save policy: {})",
                catalog.len(),
                settings.save_policy
            );
            web::serve(AppState::new(catalog, settings), port).await?;
        }
    }

    Ok(())
}

fn open_session(user: &str, catalog: Catalog, settings: &Settings) -> ygo_collection::Result<Session> {
    let user = UserId::parse(user)?;
    let (session, warning) = Session::open(user, catalog, settings);
    if let Some(e) = warning {
        eprintln!("Warning: {} (quantities start at 0)", e);
    }
    Ok(session)
}

fn print_page(view: &PageView) {
    if view.total_rows == 0 {
        println!("No cards found.");
        return;
    }

    println!(
        "Page {}/{} ({} cards)",
        view.page, view.total_pages, view.total_rows
    );
    println!("-----------------------------------------------");
    for row in &view.rows {
        let card = &row.card;
        let code = if card.set_code.is_empty() {
            String::new()
        } else {
            format!("[{}] ", card.set_code)
        };
        println!(
            "{:>6}  {}  {}{}  {}  x{}",
            row.index, card.name, code, card.set_name, card.rarity, card.owned_quantity
        );
    }
}

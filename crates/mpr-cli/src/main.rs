use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "mpr")]
#[command(about = "Metal price reconciler CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order. Defaults to MPR_CONFIG.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Spot-price log
    Spot {
        #[command(subcommand)]
        cmd: SpotCmd,
    },

    /// Formula variants
    Formula {
        #[command(subcommand)]
        cmd: FormulaCmd,
    },

    /// Per-item pricing configuration
    Variant {
        #[command(subcommand)]
        cmd: VariantCmd,
    },

    /// Price inspection
    Price {
        #[command(subcommand)]
        cmd: PriceCmd,
    },

    /// Batch reconciliation against the catalog
    Reconcile {
        #[command(subcommand)]
        cmd: ReconcileCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    /// Apply SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum SpotCmd {
    /// Append one observation.
    Record {
        /// gold | silver | platinum | palladium
        #[arg(long)]
        metal: String,

        /// Gold only: 24K | 22K | 18K | 14K
        #[arg(long)]
        purity: Option<String>,

        /// Price per unit weight
        #[arg(long)]
        price: Decimal,

        /// Defaults to pricing.currency
        #[arg(long)]
        currency: Option<String>,

        /// RFC 3339 timestamp; defaults to now
        #[arg(long)]
        captured_at: Option<DateTime<Utc>>,
    },

    /// Import a CSV with headers metal,purity,price,currency,captured_at.
    Import {
        #[arg(long)]
        file: String,
    },

    /// Print the latest price of every bucket.
    Latest,
}

#[derive(Subcommand)]
enum FormulaCmd {
    List,
    /// Make one variant the only active one.
    Activate {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Subcommand)]
enum VariantCmd {
    Get {
        #[arg(long)]
        item_id: String,
    },
    /// Replace the whole config of one item. Omitted fields are cleared.
    Set(VariantSetArgs),
}

#[derive(Args)]
pub(crate) struct VariantSetArgs {
    #[arg(long)]
    pub item_id: String,
    #[arg(long)]
    pub metal_type: Option<String>,
    #[arg(long)]
    pub purity: Option<String>,
    #[arg(long)]
    pub weight: Option<Decimal>,
    #[arg(long)]
    pub diamond_price: Option<Decimal>,
    #[arg(long)]
    pub moissanite_price: Option<Decimal>,
    #[arg(long)]
    pub gemstone_price: Option<Decimal>,
    #[arg(long)]
    pub making_charges: Option<Decimal>,
    #[arg(long)]
    pub wastage_pct: Option<Decimal>,
    #[arg(long)]
    pub misc_charges: Option<Decimal>,
    #[arg(long)]
    pub shipping_pct: Option<Decimal>,
    #[arg(long)]
    pub markup_pct: Option<Decimal>,
    #[arg(long)]
    pub tax_pct: Option<Decimal>,
    #[arg(long)]
    pub compare_at_margin_pct: Option<Decimal>,
    #[arg(long)]
    pub remarks: Option<String>,
}

#[derive(Subcommand)]
enum PriceCmd {
    /// Show every step of one item's price with the active formula.
    Explain {
        #[arg(long)]
        item_id: String,
    },
}

#[derive(Subcommand)]
enum ReconcileCmd {
    /// Price every configured item and push it to the catalog.
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience).
    let _ = dotenvy::from_filename(".env.local");

    commands::init_tracing();

    let cli = Cli::parse();
    let config_paths = cli.config_paths;

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = mpr_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = mpr_db::status(&pool).await?;
                    println!("db_ok={} has_schema={}", s.ok, s.has_schema);
                }
                DbCmd::Migrate => {
                    mpr_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let loaded = mpr_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Spot { cmd } => match cmd {
            SpotCmd::Record {
                metal,
                purity,
                price,
                currency,
                captured_at,
            } => {
                commands::spot::spot_record(
                    &config_paths,
                    &metal,
                    purity.as_deref(),
                    price,
                    currency,
                    captured_at,
                )
                .await?
            }
            SpotCmd::Import { file } => commands::spot::spot_import(&config_paths, &file).await?,
            SpotCmd::Latest => commands::spot::spot_latest().await?,
        },

        Commands::Formula { cmd } => match cmd {
            FormulaCmd::List => commands::formula::formula_list().await?,
            FormulaCmd::Activate { id } => commands::formula::formula_activate(id).await?,
        },

        Commands::Variant { cmd } => match cmd {
            VariantCmd::Get { item_id } => commands::variant::variant_get(&item_id).await?,
            VariantCmd::Set(args) => commands::variant::variant_set(args).await?,
        },

        Commands::Price { cmd } => match cmd {
            PriceCmd::Explain { item_id } => commands::reconcile::price_explain(&item_id).await?,
        },

        Commands::Reconcile { cmd } => match cmd {
            ReconcileCmd::Run => commands::reconcile::reconcile_run(&config_paths).await?,
        },
    }

    Ok(())
}

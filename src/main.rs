use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use storefront_discovery::{
    catalog::ProductQuery,
    filter::{SortDir, SortField},
    review::{self, NewReview, ReviewReply},
    CharacteristicScope, Credential, FilterAggregator, Settings,
    StoreClient,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// JSON output nests one level per reply; deeper threads are printed flat.
const MAX_PRINTED_THREAD_DEPTH: usize = 128;

#[derive(Parser, Debug)]
#[command(version, about = "Storefront product discovery")]
struct Args {
    /// Path to the local configuration TOML file.
    #[arg(short, long, value_name = "CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List categories with their subcategories.
    Categories,
    /// List the sellers of a subcategory.
    Sellers {
        #[arg(long)]
        subcategory: i64,
    },
    /// Resolve the filterable characteristics of a scope.
    Characteristics {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        subcategory: Option<i64>,
    },
    /// Search products with a filter.
    Search {
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Characteristic selection, repeatable.
        #[arg(long, value_name = "TYPE=VALUE", value_parser = parse_selection)]
        select: Vec<(String, String)>,
        /// One of price, avgRating, views.
        #[arg(long)]
        sort: Option<SortField>,
        /// One of asc, desc.
        #[arg(long)]
        dir: Option<SortDir>,
    },
    /// Show the review threads of a product.
    Reviews { product_id: i64 },
    /// Post a review.
    ReviewCreate {
        #[arg(long)]
        product: i64,
        #[arg(long)]
        stars: u8,
        description: String,
        #[arg(long, env = "STOREFRONT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Reply to a review.
    ReviewReply {
        #[arg(long)]
        product: i64,
        #[arg(long)]
        parent: i64,
        description: String,
        #[arg(long, env = "STOREFRONT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Delete a review.
    ReviewDelete {
        review_id: i64,
        #[arg(long, env = "STOREFRONT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Problem while loading settings from {}", path.display()))?,
        None => Settings::with_defaults().context("Problem while loading default settings")?,
    };
    let client = StoreClient::from_settings(&settings.backend)
        .context("Problem while creating the backend client")?;
    info!("Using backend {}", settings.backend.base_url);

    match args.command {
        Command::Categories => print(&client.categories().await?),
        Command::Sellers { subcategory } => print(&client.sellers(subcategory).await?),
        Command::Characteristics {
            name,
            category,
            subcategory,
        } => {
            let scope = CharacteristicScope {
                name,
                category_id: category,
                subcategory_id: subcategory,
            };
            print(&client.resolve_characteristics(&scope).await?)
        }
        Command::Search {
            name,
            page,
            min_price,
            max_price,
            select,
            sort,
            dir,
        } => {
            let mut aggregator = FilterAggregator::new(settings.filter.quiet_period());
            if let Some(min_price) = min_price {
                aggregator.set_lower_price(min_price);
            }
            if let Some(max_price) = max_price {
                aggregator.set_upper_price(max_price);
            }
            for (kind, value) in &select {
                aggregator.select(kind, value);
            }
            if sort.is_some() || dir.is_some() {
                aggregator.set_sort_field(sort);
                aggregator.set_sort_dir(dir);
            }
            let filter = if aggregator.is_pending() {
                aggregator.next().await
            } else {
                aggregator.draft().canonical()
            };
            let query = ProductQuery::new(name, filter);
            print(
                &client
                    .search_products(&query, page, settings.search.page_size)
                    .await?,
            )
        }
        Command::Reviews { product_id } => {
            let threads = client.review_tree(product_id).await?;
            let depth = review::depth(&threads);
            if depth > MAX_PRINTED_THREAD_DEPTH {
                warn!("Reply threads are {depth} levels deep, printing them flat");
                print(&review::flatten(threads))
            } else {
                print(&threads)
            }
        }
        Command::ReviewCreate {
            product,
            stars,
            description,
            token,
        } => {
            let review = NewReview {
                product_id: product,
                description,
                stars,
            };
            let credential = token.map(Credential::new);
            print(&client.create_review(&review, credential.as_ref()).await?)
        }
        Command::ReviewReply {
            product,
            parent,
            description,
            token,
        } => {
            let reply = ReviewReply {
                product_id: product,
                parent_id: parent,
                description,
            };
            let credential = token.map(Credential::new);
            print(&client.reply_to_review(&reply, credential.as_ref()).await?)
        }
        Command::ReviewDelete { review_id, token } => {
            let credential = token.map(Credential::new);
            client.delete_review(review_id, credential.as_ref()).await?;
            info!("Review {review_id} deleted");
            Ok(())
        }
    }
}

fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_selection(s: &str) -> Result<(String, String), String> {
    let (kind, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=VALUE, got `{s}`"))?;
    Ok((kind.trim().to_string(), value.trim().to_string()))
}

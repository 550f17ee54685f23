use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use thiserror::Error;

use glowcrawl_core::crawler::{
    BrowserSessionFactory, CrawlError, CrawlOrchestrator, CrawlStats,
};
use glowcrawl_core::{load_crawler_config, CrawlerConfig, CsvSink, Product};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] glowcrawl_core::ConfigError),
    #[error("crawl error: {0}")]
    Crawl(#[from] CrawlError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Review crawl command-line interface", long_about = None)]
pub struct Cli {
    /// Path to crawler.toml
    #[arg(long, default_value = "configs/crawler.toml")]
    pub config: PathBuf,
    /// Override the search keyword
    #[arg(long)]
    pub keyword: Option<String>,
    /// Override the output directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Force headless mode on or off
    #[arg(long)]
    pub headless: Option<bool>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover products and write the product list without visiting them
    Discover,
    /// Run the full review crawl
    Crawl(CrawlArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Skip this many discovered products before processing
    #[arg(long)]
    pub start_at: Option<usize>,
    /// Cap the number of products processed
    #[arg(long)]
    pub max_products: Option<usize>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Completions(args) => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(args.shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
        Commands::Discover => {
            let config = load_config(&cli)?;
            let mut orchestrator = build_orchestrator(config);
            let products = orchestrator.discover_products().await?;
            render(&ProductList { rows: products }, cli.format)
        }
        Commands::Crawl(args) => {
            let mut config = load_config(&cli)?;
            if let Some(start_at) = args.start_at {
                config.search.start_at = start_at;
            }
            if args.max_products.is_some() {
                config.search.max_products = args.max_products;
            }
            let mut orchestrator = build_orchestrator(config);
            let stats = orchestrator.run().await?;
            render(&stats, cli.format)
        }
    }
}

fn load_config(cli: &Cli) -> Result<CrawlerConfig> {
    let mut config = load_crawler_config(&cli.config)?;
    if let Some(keyword) = &cli.keyword {
        config.search.keyword = keyword.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.to_string_lossy().into_owned();
    }
    if let Some(headless) = cli.headless {
        config.chromium.headless = headless;
    }
    Ok(config)
}

fn build_orchestrator(config: CrawlerConfig) -> CrawlOrchestrator<CsvSink> {
    let sink = CsvSink::new(&config.output);
    let factory = BrowserSessionFactory::new(config.chromium.clone());
    CrawlOrchestrator::new(config, Box::new(factory), sink)
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub rows: Vec<Product>,
}

impl DisplayFallback for ProductList {
    fn display(&self) -> String {
        if self.rows.is_empty() {
            return "No products discovered".to_string();
        }
        let mut lines = Vec::new();
        for product in &self.rows {
            lines.push(format!(
                "{} | {} | {}",
                product.name, product.brand, product.link
            ));
        }
        lines.join("\n")
    }
}

impl DisplayFallback for CrawlStats {
    fn display(&self) -> String {
        let mut lines = vec![format!("Keyword: {}", self.keyword)];
        lines.push(format!("Products discovered: {}", self.products_discovered));
        lines.push(format!("Products processed: {}", self.products_processed));
        lines.push(format!("Products failed: {}", self.products_failed));
        lines.push(format!("Reviews collected: {}", self.reviews_collected));
        lines.push(format!("Errors recovered or logged: {}", self.errors));
        lines.push(format!("Duration: {:.1}s", self.duration_secs));
        lines.join("\n")
    }
}

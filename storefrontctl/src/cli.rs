use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "storefrontctl", version)]
#[command(about = "Audit and repair storefront product-image ordering")]
pub struct Cli {
    /// Path to storefront.toml (overrides STOREFRONT_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to a .env file loaded before reading the environment
    #[arg(long, global = true, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect and repair product image galleries
    #[command(subcommand)]
    Images(ImagesCommand),
    /// Database maintenance
    #[command(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug)]
pub enum ImagesCommand {
    /// Report ordering violations without changing anything
    Audit(OutputArgs),
    /// Re-sequence positions and reassign primaries
    Repair(RepairArgs),
    /// Headline counts for the image catalog
    Summary(OutputArgs),
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Apply embedded schema migrations
    Migrate,
    /// Copy legacy image_order / sort_order values into display_order
    ConsolidateOrderColumns,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RepairArgs {
    /// Repair a single product instead of the whole catalog
    #[arg(long, value_name = "ID")]
    pub product: Option<i64>,

    /// Products repaired concurrently (overrides repair.parallelism)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub parallelism: Option<u16>,

    #[command(flatten)]
    pub output: OutputArgs,
}

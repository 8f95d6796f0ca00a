use std::{pin::pin, sync::Arc};

use anyhow::{Context, Result, bail};
use futures::StreamExt;
use serde::Serialize;
use storefront_config::Config;
use storefront_core::{
    database::PostgresDatabase,
    model::ProductId,
    ordering::{ImageOrderingService, OrderingOptions, RepairReport},
};
use tracing::{info, warn};

use crate::{
    cli::{Command, DbCommand, ImagesCommand, OutputArgs, RepairArgs},
    render::{self, RepairTotals},
};

pub async fn run(command: Command, config: &Config) -> Result<()> {
    let db = connect(config).await?;
    match command {
        Command::Images(command) => images(command, &db, config).await,
        Command::Db(command) => database(command, &db).await,
    }
}

async fn connect(config: &Config) -> Result<PostgresDatabase> {
    let url = config
        .database_url()
        .context("no database URL configured; set DATABASE_URL or database.url")?;
    PostgresDatabase::new(url, config.database.max_connections)
        .await
        .context("failed to connect to postgres")
}

async fn images(command: ImagesCommand, db: &PostgresDatabase, config: &Config) -> Result<()> {
    match command {
        ImagesCommand::Audit(output) => audit(db, output).await,
        ImagesCommand::Summary(output) => summary(db, output).await,
        ImagesCommand::Repair(args) => repair(db, config, args).await,
    }
}

async fn audit(db: &PostgresDatabase, output: OutputArgs) -> Result<()> {
    let service = ImageOrderingService::new(Arc::new(db.images()));
    let report = service
        .audit_consistency()
        .await
        .context("image audit failed")?;

    if output.json {
        println!("{}", render::json(&report)?);
    } else {
        print!("{}", render::audit(&report));
    }

    if !report.is_consistent() {
        bail!("audit found {} violation(s)", report.violation_count());
    }
    Ok(())
}

async fn summary(db: &PostgresDatabase, output: OutputArgs) -> Result<()> {
    let service = ImageOrderingService::new(Arc::new(db.images()));
    let summary = service
        .summarize_catalog()
        .await
        .context("failed to summarize image catalog")?;

    if output.json {
        println!("{}", render::json(&summary)?);
    } else {
        print!("{}", render::summary(&summary));
    }
    Ok(())
}

#[derive(Serialize)]
struct RepairOutput<'a> {
    reports: &'a [RepairReport],
    totals: RepairTotals,
}

async fn repair(db: &PostgresDatabase, config: &Config, args: RepairArgs) -> Result<()> {
    let requested = args
        .parallelism
        .map(usize::from)
        .unwrap_or(config.repair.parallelism);
    let parallelism = requested.min(config.parallelism_limit());
    if parallelism < requested {
        warn!(
            requested,
            parallelism,
            max_connections = config.database.max_connections,
            "lowering repair parallelism to fit the connection pool"
        );
    }
    let service = ImageOrderingService::with_options(
        Arc::new(db.images()),
        OrderingOptions { parallelism },
    );

    let json = args.output.json;
    let mut reports = Vec::new();
    let mut totals = RepairTotals::default();
    let mut record = |report: RepairReport| {
        if !json {
            println!("{}", render::repair_line(&report));
        }
        totals.record(&report);
        reports.push(report);
    };

    match args.product {
        Some(id) => record(service.repair_product(ProductId(id)).await),
        None => {
            let mut stream = pin!(
                service
                    .repair_all()
                    .await
                    .context("failed to enumerate products")?
            );
            while let Some(report) = stream.next().await {
                record(report);
            }
        }
    }

    if json {
        let output = RepairOutput {
            reports: &reports,
            totals,
        };
        println!("{}", render::json(&output)?);
    } else {
        println!("{}", render::repair_totals(&totals));
    }

    if totals.failed > 0 {
        bail!(
            "{} of {} product(s) failed to repair",
            totals.failed,
            totals.products
        );
    }
    Ok(())
}

async fn database(command: DbCommand, db: &PostgresDatabase) -> Result<()> {
    match command {
        DbCommand::Migrate => {
            db.migrate().await.context("failed to apply migrations")?;
            info!("migrations applied");
            println!("migrations applied");
        }
        DbCommand::ConsolidateOrderColumns => {
            let legacy = db
                .legacy_order_columns()
                .await
                .context("failed to inspect product_images columns")?;
            if legacy.aliases().is_empty() {
                println!("no legacy order columns found");
                return Ok(());
            }
            let copied = legacy
                .consolidate(db.pool())
                .await
                .context("failed to consolidate order columns")?;
            println!(
                "copied {copied} position(s) from {} into display_order",
                legacy.aliases().join(", ")
            );
        }
    }
    Ok(())
}

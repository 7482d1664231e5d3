// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Warehouse to Repository Exporter
//!
//! Streams the result of a Snowflake query into a CSV (optionally gzip
//! compressed) or Parquet file with bounded memory, then publishes that file
//! to a GitHub repository, either as a commit through the contents API or as
//! a release asset.
//!
//! This application follows the **Hexagonal Architecture** (Ports and Adapters)
//! to maintain a strict separation between business logic and infrastructure.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::orchestrator::ExportOrchestrator;
use crate::application::publisher::ArtifactPublisher;
use crate::config::{AppConfig, CliArgs, Command};
use crate::domain::errors::Result;
use crate::infrastructure::github::github_repository_adapter::GitHubRepositoryAdapter;
use crate::infrastructure::snowflake::snowflake_warehouse_adapter::SnowflakeWarehouseAdapter;
use clap::Parser;
use log::{error, info};
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    if let Err(e) = run(&args) {
        error!("{}", e);
        process::exit(e.exit_code());
    }
}

fn run(args: &CliArgs) -> Result<()> {
    // 3. Load Config
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.merge_cli(&args.command);

    let (export, publish) = match &args.command {
        Command::Export { .. } => (true, false),
        Command::Publish { .. } => (false, true),
        Command::Run { .. } => (true, true),
    };
    config.validate(export, publish)?;

    let today = chrono::Utc::now().format("%Y%m%d").to_string();

    // 4. Initialize Hexagonal Components
    let orchestrator = if export {
        let warehouse = SnowflakeWarehouseAdapter::new(config.snowflake_settings()?)?;
        Some(ExportOrchestrator::new(Arc::new(warehouse)))
    } else {
        None
    };
    let publisher = if publish {
        let (api_url, token) = config.github_api()?;
        let github = GitHubRepositoryAdapter::new(&api_url, token)?;
        Some(ArtifactPublisher::new(Arc::new(github)))
    } else {
        None
    };

    // 5. Run
    match (orchestrator, publisher) {
        (Some(orchestrator), Some(publisher)) => {
            let job = config.export_job(&today)?;
            let plan = config.delivery_plan(&job.output, &today)?;
            let (_, receipt) = orchestrator.export_and_publish(&job, &publisher, &plan)?;
            info!("Done: {}", receipt);
        }
        (Some(orchestrator), None) => {
            let job = config.export_job(&today)?;
            orchestrator.export(&job)?;
        }
        (None, Some(publisher)) => {
            let path = config.publish_path();
            let plan = config.delivery_plan(&path, &today)?;
            let receipt = publisher.publish(&path, &plan)?;
            info!("Done: {}", receipt);
        }
        (None, None) => {}
    }

    Ok(())
}

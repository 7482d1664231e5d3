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

//! Configuration: an optional YAML or JSON file, overridden by command line
//! flags, which fall back to the environment variables the export and push
//! jobs have always used.

use crate::application::orchestrator::ExportJob;
use crate::application::publisher::{DeliveryPlan, DEFAULT_COMMIT_LIMIT_BYTES};
use crate::domain::entities::{CommitTarget, FileFormat, ReleaseTarget};
use crate::domain::errors::{ExportError, Result};
use crate::infrastructure::github::github_repository_adapter::DEFAULT_API_URL;
use crate::infrastructure::sinks::SinkOptions;
use crate::infrastructure::snowflake::snowflake_warehouse_adapter::{
    SnowflakeSettings, DEFAULT_TOKEN_TYPE,
};
use crate::infrastructure::snowflake::sql_api_client::StatementContext;
use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SQL_FILE: &str = "sql/query.sql";
const DEFAULT_CHUNK_SIZE: usize = 20_000;
const DEFAULT_PUBLISH_PATH: &str = "data/export.csv.gz";
const DEFAULT_DEST_PATH: &str = "data/export.csv.gz";
const DEFAULT_BRANCH: &str = "main";
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const PARQUET_CODECS: &[&str] = &["snappy", "gzip", "zstd", "lz4", "brotli", "none"];

fn deserialize_secret<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.map(SecretString::from))
}

fn parse_secret(s: &str) -> std::result::Result<SecretString, std::convert::Infallible> {
    Ok(SecretString::from(s.to_string()))
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SnowflakeConfig {
    pub account: Option<String>,
    #[serde(deserialize_with = "deserialize_secret")]
    pub token: Option<SecretString>,
    pub token_type: Option<String>,
    pub warehouse: Option<String>,
    pub role: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
    pub sql_file: Option<String>,
    pub chunk_size: Option<usize>,
    pub statement_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ExportConfig {
    pub output: Option<String>,
    /// `csv` or `parquet`; inferred from the output suffix when absent.
    pub format: Option<String>,
    pub field_delimiter: Option<String>,
    pub parquet_compression: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GitHubConfig {
    #[serde(deserialize_with = "deserialize_secret")]
    pub token: Option<SecretString>,
    pub repo: Option<String>,
    /// `contents` (default) or `release`.
    pub mode: Option<String>,
    pub branch: Option<String>,
    pub dest_path: Option<String>,
    pub commit_message: Option<String>,
    pub release_tag: Option<String>,
    pub release_name: Option<String>,
    pub asset_name: Option<String>,
    pub api_url: Option<String>,
    pub max_commit_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub snowflake: SnowflakeConfig,
    pub export: ExportConfig,
    pub github: GitHubConfig,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the query and write the result file
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Publish an existing file to GitHub
    Publish {
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Export, then publish the file just written
    Run {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        output: OutputArgs,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
}

impl Command {
    pub fn source(&self) -> Option<&SourceArgs> {
        match self {
            Command::Export { source, .. } | Command::Run { source, .. } => Some(source),
            Command::Publish { .. } => None,
        }
    }

    pub fn output(&self) -> &OutputArgs {
        match self {
            Command::Export { output, .. }
            | Command::Publish { output, .. }
            | Command::Run { output, .. } => output,
        }
    }

    pub fn delivery(&self) -> Option<&DeliveryArgs> {
        match self {
            Command::Publish { delivery, .. } | Command::Run { delivery, .. } => Some(delivery),
            Command::Export { .. } => None,
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    #[arg(long, env = "SNOWFLAKE_ACCOUNT")]
    pub account: Option<String>,
    #[arg(long, env = "SNOWFLAKE_TOKEN", hide_env_values = true, value_parser = parse_secret)]
    pub snowflake_token: Option<SecretString>,
    #[arg(long, env = "SNOWFLAKE_TOKEN_TYPE")]
    pub token_type: Option<String>,
    #[arg(long, env = "SNOWFLAKE_WAREHOUSE")]
    pub warehouse: Option<String>,
    #[arg(long, env = "SNOWFLAKE_ROLE")]
    pub role: Option<String>,
    #[arg(long, env = "SNOWFLAKE_DATABASE")]
    pub database: Option<String>,
    #[arg(long, env = "SNOWFLAKE_SCHEMA")]
    pub schema: Option<String>,
    #[arg(long, env = "SNOWFLAKE_URL")]
    pub snowflake_url: Option<String>,
    #[arg(long, env = "SNOWFLAKE_SQL_FILE")]
    pub sql_file: Option<String>,
    #[arg(long, env = "CHUNK_SIZE")]
    pub chunk_size: Option<usize>,
    #[arg(long, env = "SNOWFLAKE_STATEMENT_TIMEOUT")]
    pub statement_timeout: Option<u64>,
    /// csv or parquet
    #[arg(long, env = "OUTPUT_FORMAT")]
    pub format: Option<String>,
    #[arg(long, env = "CSV_DELIMITER")]
    pub field_delimiter: Option<String>,
    #[arg(long, env = "PARQUET_COMPRESSION")]
    pub parquet_compression: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    #[arg(short, long, env = "OUTPUT_PATH")]
    pub output: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DeliveryArgs {
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_parser = parse_secret)]
    pub github_token: Option<SecretString>,
    /// owner/repo
    #[arg(long, env = "GITHUB_REPO")]
    pub repo: Option<String>,
    /// contents or release
    #[arg(long, env = "GITHUB_UPLOAD_MODE")]
    pub mode: Option<String>,
    #[arg(long, env = "GITHUB_BRANCH")]
    pub branch: Option<String>,
    #[arg(long, env = "GITHUB_DEST_PATH")]
    pub dest_path: Option<String>,
    #[arg(long, env = "GITHUB_COMMIT_MESSAGE")]
    pub commit_message: Option<String>,
    #[arg(long, env = "GITHUB_RELEASE_TAG")]
    pub release_tag: Option<String>,
    #[arg(long, env = "GITHUB_RELEASE_NAME")]
    pub release_name: Option<String>,
    #[arg(long, env = "GITHUB_ASSET_NAME")]
    pub asset_name: Option<String>,
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,
    #[arg(long, env = "GITHUB_MAX_COMMIT_BYTES")]
    pub max_commit_bytes: Option<u64>,
}

fn overlay<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        *target = value.clone();
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn required<'a>(value: &'a Option<String>, env: &str, key: &str) -> Result<&'a str> {
    present(value).ok_or_else(|| {
        ExportError::ConfigError(format!("Missing required setting {} ({})", env, key))
    })
}

/// `csv` or `parquet`, case-insensitive.
pub fn parse_format(s: &str) -> Result<FileFormat> {
    match s.trim().to_lowercase().as_str() {
        "csv" => Ok(FileFormat::Csv),
        "parquet" => Ok(FileFormat::Parquet),
        other => Err(ExportError::ConfigError(format!(
            "Unknown output format '{}': expected 'csv' or 'parquet'",
            other
        ))),
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ExportError::ConfigError(format!("Cannot read {}: {}", path, e)))?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("Invalid JSON in {}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ExportError::ConfigError(format!("Invalid YAML in {}: {}", path, e)))?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, command: &Command) {
        if let Some(s) = command.source() {
            let sf = &mut self.snowflake;
            overlay(&mut sf.account, &s.account);
            overlay(&mut sf.token, &s.snowflake_token);
            overlay(&mut sf.token_type, &s.token_type);
            overlay(&mut sf.warehouse, &s.warehouse);
            overlay(&mut sf.role, &s.role);
            overlay(&mut sf.database, &s.database);
            overlay(&mut sf.schema, &s.schema);
            overlay(&mut sf.url, &s.snowflake_url);
            overlay(&mut sf.sql_file, &s.sql_file);
            overlay(&mut sf.chunk_size, &s.chunk_size);
            overlay(&mut sf.statement_timeout_secs, &s.statement_timeout);
            overlay(&mut self.export.format, &s.format);
            overlay(&mut self.export.field_delimiter, &s.field_delimiter);
            overlay(&mut self.export.parquet_compression, &s.parquet_compression);
        }
        overlay(&mut self.export.output, &command.output().output);
        if let Some(d) = command.delivery() {
            let gh = &mut self.github;
            overlay(&mut gh.token, &d.github_token);
            overlay(&mut gh.repo, &d.repo);
            overlay(&mut gh.mode, &d.mode);
            overlay(&mut gh.branch, &d.branch);
            overlay(&mut gh.dest_path, &d.dest_path);
            overlay(&mut gh.commit_message, &d.commit_message);
            overlay(&mut gh.release_tag, &d.release_tag);
            overlay(&mut gh.release_name, &d.release_name);
            overlay(&mut gh.asset_name, &d.asset_name);
            overlay(&mut gh.api_url, &d.api_url);
            overlay(&mut gh.max_commit_bytes, &d.max_commit_bytes);
        }
    }

    /// Checks every setting the requested stages need before any work starts.
    pub fn validate(&self, export: bool, publish: bool) -> Result<()> {
        if export {
            let sf = &self.snowflake;
            required(&sf.account, "SNOWFLAKE_ACCOUNT", "snowflake.account")?;
            required(&sf.warehouse, "SNOWFLAKE_WAREHOUSE", "snowflake.warehouse")?;
            if sf.token.is_none() {
                return Err(ExportError::ConfigError(
                    "Missing required setting SNOWFLAKE_TOKEN (snowflake.token)".into(),
                ));
            }
            if sf.chunk_size == Some(0) {
                return Err(ExportError::ConfigError("CHUNK_SIZE must be at least 1".into()));
            }
            if let Some(f) = present(&self.export.format) {
                parse_format(f)?;
            }
            self.delimiter()?;
            if let Some(c) = present(&self.export.parquet_compression) {
                if !PARQUET_CODECS.contains(&c.to_lowercase().as_str()) {
                    return Err(ExportError::ConfigError(format!(
                        "Unknown Parquet compression '{}': expected one of {}",
                        c,
                        PARQUET_CODECS.join(", ")
                    )));
                }
            }
        }
        if publish {
            let gh = &self.github;
            if gh.token.is_none() {
                return Err(ExportError::ConfigError(
                    "Missing required setting GITHUB_TOKEN (github.token)".into(),
                ));
            }
            let repo = required(&gh.repo, "GITHUB_REPO", "github.repo")?;
            if repo.split('/').filter(|p| !p.is_empty()).count() != 2 {
                return Err(ExportError::ConfigError(format!(
                    "GITHUB_REPO must look like owner/repo, got '{}'",
                    repo
                )));
            }
            self.delivery_mode()?;
        }
        Ok(())
    }

    fn delimiter(&self) -> Result<u8> {
        match present(&self.export.field_delimiter) {
            None => Ok(b','),
            Some("\\t") | Some("tab") => Ok(b'\t'),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => Err(ExportError::ConfigError(format!(
                "Field delimiter must be a single byte, got '{}'",
                d
            ))),
        }
    }

    /// `true` for release mode, `false` for contents mode.
    fn delivery_mode(&self) -> Result<bool> {
        match present(&self.github.mode).map(str::to_lowercase).as_deref() {
            None | Some("contents") => Ok(false),
            Some("release") => Ok(true),
            Some(other) => Err(ExportError::UnknownDeliveryMode(other.to_string())),
        }
    }

    pub fn snowflake_settings(&self) -> Result<SnowflakeSettings> {
        let sf = &self.snowflake;
        let token = sf.token.clone().ok_or_else(|| {
            ExportError::ConfigError(
                "Missing required setting SNOWFLAKE_TOKEN (snowflake.token)".into(),
            )
        })?;
        Ok(SnowflakeSettings {
            account: required(&sf.account, "SNOWFLAKE_ACCOUNT", "snowflake.account")?.to_string(),
            token,
            token_type: present(&sf.token_type)
                .unwrap_or(DEFAULT_TOKEN_TYPE)
                .to_uppercase(),
            context: StatementContext {
                warehouse: required(&sf.warehouse, "SNOWFLAKE_WAREHOUSE", "snowflake.warehouse")?
                    .to_string(),
                role: present(&sf.role).map(str::to_string),
                database: present(&sf.database).map(str::to_string),
                schema: present(&sf.schema).map(str::to_string),
            },
            statement_timeout_secs: sf.statement_timeout_secs.unwrap_or(0),
            poll_interval: Duration::from_millis(
                sf.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            base_url: present(&sf.url).map(str::to_string),
        })
    }

    /// The export to run. `today` is the `YYYYMMDD` stamp used in default names.
    pub fn export_job(&self, today: &str) -> Result<ExportJob> {
        let explicit = present(&self.export.format).map(parse_format).transpose()?;
        let output = match present(&self.export.output) {
            Some(o) => PathBuf::from(o),
            None => match explicit {
                Some(FileFormat::Parquet) => PathBuf::from("data/export.parquet"),
                _ => PathBuf::from(format!("data/export_{}.csv.gz", today)),
            },
        };
        let format = explicit.unwrap_or_else(|| FileFormat::from_path(&output));

        Ok(ExportJob {
            sql_file: PathBuf::from(present(&self.snowflake.sql_file).unwrap_or(DEFAULT_SQL_FILE)),
            output,
            format,
            chunk_size: self.snowflake.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            sink: SinkOptions {
                delimiter: self.delimiter()?,
                parquet_compression: present(&self.export.parquet_compression).map(str::to_string),
            },
        })
    }

    /// The file a standalone publish sends.
    pub fn publish_path(&self) -> PathBuf {
        PathBuf::from(present(&self.export.output).unwrap_or(DEFAULT_PUBLISH_PATH))
    }

    pub fn github_api(&self) -> Result<(String, SecretString)> {
        let token = self.github.token.clone().ok_or_else(|| {
            ExportError::ConfigError("Missing required setting GITHUB_TOKEN (github.token)".into())
        })?;
        let url = present(&self.github.api_url).unwrap_or(DEFAULT_API_URL).to_string();
        Ok((url, token))
    }

    /// Where and how `artifact` is delivered.
    pub fn delivery_plan(&self, artifact: &Path, today: &str) -> Result<DeliveryPlan> {
        let gh = &self.github;
        let repo = required(&gh.repo, "GITHUB_REPO", "github.repo")?.to_string();

        if self.delivery_mode()? {
            let asset_name = match present(&gh.asset_name) {
                Some(a) => a.to_string(),
                None => artifact
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        ExportError::ConfigError(format!(
                            "Cannot derive an asset name from {}",
                            artifact.display()
                        ))
                    })?,
            };
            return Ok(DeliveryPlan::Release(ReleaseTarget {
                repo,
                tag: present(&gh.release_tag)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("data-{}", today)),
                name: Some(
                    present(&gh.release_name)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Data export {}", today)),
                ),
                asset_name,
            }));
        }

        let path = present(&gh.dest_path).unwrap_or(DEFAULT_DEST_PATH).to_string();
        Ok(DeliveryPlan::Commit {
            target: CommitTarget {
                repo,
                branch: present(&gh.branch).unwrap_or(DEFAULT_BRANCH).to_string(),
                message: present(&gh.commit_message)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("data: update {}", path)),
                path,
            },
            max_bytes: gh.max_commit_bytes.unwrap_or(DEFAULT_COMMIT_LIMIT_BYTES),
        })
    }
}

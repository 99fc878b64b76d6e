//! Administration commands
//!
//! Each command maps onto one service operation and yields a JSON value.

use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;
use warrant_common::WarrantError;
use warrant_consumer::{ContentOverrideDto, EffectiveOverride};
use warrant_persistence::OverrideParent;

use crate::model::AppState;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the storage backend is reachable
    Health,
    /// Print the effective content overrides of a consumer
    Resolve {
        consumer_id: String,
    },
    /// Print one page of an owner's consumers
    List {
        /// Owner id, or owner key with --by-key
        owner: String,
        /// Cursor returned by the previous page
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        /// Address the owner by its key instead of its id
        #[arg(long = "by-key")]
        by_key: bool,
    },
    /// Manage the content overrides of a consumer or an environment
    Overrides {
        #[command(subcommand)]
        action: OverrideAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum OverrideAction {
    List {
        #[command(flatten)]
        parent: ParentArgs,
    },
    /// Add an override, replacing the value of an existing one
    Add {
        #[command(flatten)]
        parent: ParentArgs,
        label: String,
        name: String,
        value: String,
    },
    /// Remove overrides: all of them, one label, or one (label, name) pair
    Delete {
        #[command(flatten)]
        parent: ParentArgs,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ParentArgs {
    #[arg(long)]
    pub consumer: Option<String>,
    #[arg(long)]
    pub environment: Option<String>,
}

impl ParentArgs {
    pub fn parent(&self) -> Result<OverrideParent, WarrantError> {
        match (&self.consumer, &self.environment) {
            (Some(id), None) => Ok(OverrideParent::Consumer(id.clone())),
            (None, Some(id)) => Ok(OverrideParent::Environment(id.clone())),
            _ => Err(WarrantError::InvalidArgument(
                "exactly one of --consumer or --environment is required".to_string(),
            )),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, WarrantError> {
    serde_json::to_value(value)
        .map_err(|e| WarrantError::InternalError(format!("failed to serialize output: {}", e)))
}

/// Run one command against the shared services
pub async fn execute(command: &Command, state: &AppState) -> Result<Value, WarrantError> {
    debug!(?command, "Executing command");

    match command {
        Command::Health => {
            state.persistence.health_check().await?;
            Ok(json!({
                "status": "UP",
                "storageMode": state.persistence.storage_mode().to_string(),
            }))
        }
        Command::Resolve { consumer_id } => {
            let effective = state.resolver.resolve_effective_overrides(consumer_id).await?;
            Ok(json!({
                "consumerId": consumer_id,
                "overrides": to_json(&EffectiveOverride::from_map(&effective))?,
            }))
        }
        Command::List {
            owner,
            cursor,
            limit,
            by_key,
        } => {
            let page = if *by_key {
                state
                    .feed
                    .list_consumers_by_owner_key(owner, cursor.as_deref(), *limit)
                    .await?
            } else {
                state
                    .feed
                    .list_consumers(owner, cursor.as_deref(), *limit)
                    .await?
            };
            to_json(&page)
        }
        Command::Overrides { action } => execute_override_action(action, state).await,
    }
}

async fn execute_override_action(
    action: &OverrideAction,
    state: &AppState,
) -> Result<Value, WarrantError> {
    let list = match action {
        OverrideAction::List { parent } => state.overrides.list(&parent.parent()?).await?,
        OverrideAction::Add {
            parent,
            label,
            name,
            value,
        } => {
            state
                .overrides
                .add(
                    &parent.parent()?,
                    &[ContentOverrideDto::new(label, name, value)],
                )
                .await?
        }
        OverrideAction::Delete {
            parent,
            label,
            name,
        } => {
            let entries = match (label, name) {
                (None, None) => Vec::new(),
                _ => vec![ContentOverrideDto::selector(
                    label.as_deref(),
                    name.as_deref(),
                )],
            };
            state.overrides.delete(&parent.parent()?, &entries).await?
        }
    };

    to_json(&list)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use clap::Parser;
    use config::Config;
    use tempfile::TempDir;
    use warrant_persistence::{EmbeddedPersistService, PersistenceService};

    use super::*;
    use crate::model::{Cli, Configuration};

    async fn create_test_state() -> (AppState, TempDir) {
        let tmp = TempDir::new().unwrap();
        let persistence: Arc<dyn PersistenceService> =
            Arc::new(EmbeddedPersistService::open(tmp.path()).unwrap());

        let owner = persistence.owner_create("acme", "Acme").await.unwrap();
        let env = persistence
            .environment_create(&owner.id, "dev", 1)
            .await
            .unwrap();
        for id in ["c1", "c2", "c3"] {
            persistence
                .consumer_create(Some(id), &owner.id, id, None)
                .await
                .unwrap();
        }
        persistence
            .consumer_set_environments("c1", &[env.id.clone()])
            .await
            .unwrap();

        let configuration = Configuration::from_config(
            Config::builder()
                .set_override("cursor.secret", "test")
                .unwrap()
                .build()
                .unwrap(),
        );
        (AppState::new(configuration, persistence), tmp)
    }

    fn parse(args: &[&str]) -> Command {
        let mut argv = vec!["warrant-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _tmp) = create_test_state().await;
        let out = execute(&parse(&["health"]), &state).await.unwrap();
        assert_eq!(out["status"], "UP");
        assert_eq!(out["storageMode"], "standalone_embedded");
    }

    #[tokio::test]
    async fn test_list_pages_by_key() {
        let (state, _tmp) = create_test_state().await;

        let first = execute(&parse(&["list", "acme", "--by-key", "--limit", "2"]), &state)
            .await
            .unwrap();
        assert_eq!(first["consumers"].as_array().unwrap().len(), 2);
        let cursor = first["nextCursor"].as_str().unwrap().to_string();

        let second = execute(
            &parse(&["list", "acme", "--by-key", "--limit", "2", "--cursor", &cursor]),
            &state,
        )
        .await
        .unwrap();
        assert_eq!(second["consumers"][0]["id"], "c3");
        assert!(second["nextCursor"].is_null());
    }

    #[tokio::test]
    async fn test_list_rejects_non_positive_limit() {
        let (state, _tmp) = create_test_state().await;
        let err = execute(&parse(&["list", "acme", "--by-key", "--limit", "-1"]), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, WarrantError::InvalidCursor(_)));
    }

    #[tokio::test]
    async fn test_resolve_layers_overrides() {
        let (state, _tmp) = create_test_state().await;
        let consumer = state
            .persistence
            .consumer_find_by_id("c1")
            .await
            .unwrap()
            .unwrap();
        let env_id = consumer.environments[0].id.clone();

        execute(
            &parse(&["overrides", "add", "--environment", &env_id, "repo", "enabled", "1"]),
            &state,
        )
        .await
        .unwrap();
        execute(
            &parse(&["overrides", "add", "--consumer", "c1", "repo", "Enabled", "0"]),
            &state,
        )
        .await
        .unwrap();

        let out = execute(&parse(&["resolve", "c1"]), &state).await.unwrap();
        assert_eq!(
            out["overrides"],
            json!([{ "contentLabel": "repo", "name": "enabled", "value": "0" }])
        );

        let err = execute(&parse(&["resolve", "missing"]), &state)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_override_delete() {
        let (state, _tmp) = create_test_state().await;
        for (label, name) in [("repo-a", "enabled"), ("repo-a", "gpgcheck"), ("repo-b", "enabled")] {
            execute(
                &parse(&["overrides", "add", "--consumer", "c2", label, name, "1"]),
                &state,
            )
            .await
            .unwrap();
        }

        let out = execute(
            &parse(&["overrides", "delete", "--consumer", "c2", "--label", "repo-a"]),
            &state,
        )
        .await
        .unwrap();
        assert_eq!(out.as_array().unwrap().len(), 1);

        let out = execute(&parse(&["overrides", "delete", "--consumer", "c2"]), &state)
            .await
            .unwrap();
        assert!(out.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_override_parent_is_required() {
        assert!(Cli::try_parse_from(["warrant-server", "overrides", "list"]).is_err());
        assert!(
            Cli::try_parse_from([
                "warrant-server",
                "overrides",
                "list",
                "--consumer",
                "c1",
                "--environment",
                "e1",
            ])
            .is_err()
        );
    }
}

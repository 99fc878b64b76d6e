//! Schema bootstrap for the external database backend

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, Schema};

use crate::entity::prelude::{Consumer, ConsumerEnvironment, ContentOverride, Environment, Owner};
use crate::entity::{content_override, environment};

/// Create every Warrant table that does not exist yet.
///
/// Unique keys are part of the table definition and therefore exist on every
/// backend. Secondary indexes are only created on backends that understand
/// `CREATE INDEX IF NOT EXISTS`; MySQL deployments are expected to ship them
/// with their own DDL.
pub async fn create_tables(db: &DatabaseConnection) -> anyhow::Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    create_table(db, &schema, Owner, Vec::new()).await?;
    create_table(
        db,
        &schema,
        Environment,
        vec![
            Index::create()
                .name("uk_environment_owner_rank")
                .col(environment::Column::OwnerId)
                .col(environment::Column::EnvRank)
                .unique()
                .to_owned(),
        ],
    )
    .await?;
    create_table(db, &schema, Consumer, Vec::new()).await?;
    create_table(db, &schema, ConsumerEnvironment, Vec::new()).await?;
    // One unique key per parent column: the other parent column is NULL and
    // never collides.
    create_table(
        db,
        &schema,
        ContentOverride,
        vec![
            Index::create()
                .name("uk_override_consumer")
                .col(content_override::Column::ConsumerId)
                .col(content_override::Column::ContentLabel)
                .col(content_override::Column::Name)
                .unique()
                .to_owned(),
            Index::create()
                .name("uk_override_environment")
                .col(content_override::Column::EnvironmentId)
                .col(content_override::Column::ContentLabel)
                .col(content_override::Column::Name)
                .unique()
                .to_owned(),
        ],
    )
    .await?;

    tracing::info!(backend = ?backend, "Database schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
    unique_keys: Vec<IndexCreateStatement>,
) -> anyhow::Result<()> {
    let backend = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    for mut key in unique_keys {
        table.index(&mut key);
    }
    db.execute(backend.build(&table)).await?;

    if backend != DbBackend::MySql {
        for mut index in schema.create_index_from_entity(entity) {
            index.if_not_exists();
            db.execute(backend.build(&index)).await?;
        }
    }

    Ok(())
}

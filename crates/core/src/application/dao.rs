// Generic entity DAO over a session scope

use super::scope::{SessionLease, SessionScope};
use crate::domain::{DomainError, Entity, EntityMeta, Record, Statement, Value};
use crate::error::{PersistenceError, Result};
use crate::port::{Dao, DaoHooks, NoHooks};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct DaoHandler {
    scope: SessionScope,
    hooks: Arc<dyn DaoHooks>,
}

impl DaoHandler {
    pub fn new(scope: SessionScope) -> Self {
        Self {
            scope,
            hooks: Arc::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn DaoHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    async fn run_get_all(&self, meta: &EntityMeta, order_by: &[&str]) -> Result<Vec<Record>> {
        let statement = select_all(meta, order_by)?;
        let mut lease = self.scope.lease().await?;
        let outcome = lease.fetch_all(&statement).await;
        lease.release(outcome).await
    }

    async fn run_get(&self, meta: &EntityMeta, id: &Value) -> Result<Option<Record>> {
        let statement = select_by_id(meta, id);
        let mut lease = self.scope.lease().await?;
        let outcome = lease.fetch_all(&statement).await;
        lease
            .release(outcome)
            .await
            .map(|rows| rows.into_iter().next())
    }

    async fn run_save(&self, meta: &EntityMeta, record: &Record, id: &Value) -> Result<Record> {
        let upsert = upsert(meta, record)?;
        let mut lease = self.scope.lease().await?;
        let outcome = Self::merge(&mut lease, meta, &upsert, id).await;
        lease.release(outcome).await
    }

    async fn merge(
        lease: &mut SessionLease,
        meta: &EntityMeta,
        upsert: &Statement,
        id: &Value,
    ) -> Result<Record> {
        lease.begin().await?;
        let outcome = Self::merge_in(lease, meta, upsert, id).await;
        lease.finish(outcome).await
    }

    async fn merge_in(
        lease: &mut SessionLease,
        meta: &EntityMeta,
        upsert: &Statement,
        id: &Value,
    ) -> Result<Record> {
        if let Some(row) = lease.fetch_all(upsert).await?.into_iter().next() {
            return Ok(row);
        }
        // An id-only entity that already existed returns nothing from the upsert
        lease
            .fetch_all(&select_by_id(meta, id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(meta, id))
    }

    async fn run_remove(&self, meta: &EntityMeta, id: &Value) -> Result<bool> {
        let statement = delete_by_id(meta, id);
        let mut lease = self.scope.lease().await?;
        let outcome = Self::delete(&mut lease, &statement).await;
        lease.release(outcome).await
    }

    async fn delete(lease: &mut SessionLease, statement: &Statement) -> Result<bool> {
        lease.begin().await?;
        let outcome = lease.execute(statement).await.map(|n| n > 0);
        lease.finish(outcome).await
    }

    async fn refresh_entity<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let meta = EntityMeta::of::<T>();
        let id = entity.id();
        self.hooks.before_refresh(&meta, &id);
        let outcome = match self.run_get(&meta, &id).await {
            Ok(Some(row)) => T::from_record(&row)
                .map(|fresh| *entity = fresh)
                .map_err(PersistenceError::from),
            Ok(None) => Err(not_found(&meta, &id)),
            Err(e) => Err(e),
        };
        self.hooks.after_refresh(&meta, &id);
        outcome.map_err(|e| PersistenceError::failed("refresh", e))
    }
}

#[async_trait]
impl Dao for DaoHandler {
    async fn get_all<T: Entity>(&self, order_by: &[&str]) -> Result<Vec<T>> {
        let meta = EntityMeta::of::<T>();
        self.hooks.before_get_all(&meta);
        let outcome = self.run_get_all(&meta, order_by).await.and_then(|rows| {
            rows.iter()
                .map(|row| T::from_record(row).map_err(PersistenceError::from))
                .collect::<Result<Vec<T>>>()
        });
        self.hooks.after_get_all(&meta);
        if let Ok(entities) = &outcome {
            debug!(entity = meta.name, count = entities.len(), "get_all");
        }
        outcome.map_err(|e| PersistenceError::failed("get_all", e))
    }

    async fn get<T: Entity>(&self, id: Value) -> Result<Option<T>> {
        let meta = EntityMeta::of::<T>();
        self.hooks.before_get(&meta, &id);
        let outcome = self.run_get(&meta, &id).await.and_then(|row| {
            row.map(|r| T::from_record(&r).map_err(PersistenceError::from))
                .transpose()
        });
        self.hooks.after_get(&meta, &id);
        outcome.map_err(|e| PersistenceError::failed("get", e))
    }

    async fn save<T: Entity>(&self, entity: &T) -> Result<T> {
        let meta = EntityMeta::of::<T>();
        let record = entity.to_record();
        let id = entity.id();
        self.hooks.before_save(&meta, &record);
        let outcome = self
            .run_save(&meta, &record, &id)
            .await
            .and_then(|row| T::from_record(&row).map_err(PersistenceError::from));
        self.hooks.after_save(&meta, &record);
        outcome.map_err(|e| PersistenceError::failed("save", e))
    }

    async fn refresh<T: Entity>(&self, entity: &mut T) -> Result<()> {
        self.refresh_entity(entity).await
    }

    #[allow(deprecated)]
    async fn cancel<T: Entity>(&self, entity: &mut T) {
        if let Err(e) = self.refresh_entity(entity).await {
            warn!(entity = T::NAME, error = %e, "cancel failed");
        }
    }

    async fn remove<T: Entity>(&self, entity: &T) -> Result<bool> {
        let meta = EntityMeta::of::<T>();
        let id = entity.id();
        self.hooks.before_remove(&meta, &id);
        let outcome = self.run_remove(&meta, &id).await;
        self.hooks.after_remove(&meta, &id);
        outcome.map_err(|e| PersistenceError::failed("remove", e))
    }
}

fn not_found(meta: &EntityMeta, id: &Value) -> PersistenceError {
    PersistenceError::EntityNotFound(format!("{} with id {}", meta.name, id))
}

fn column_list(meta: &EntityMeta, alias: Option<&str>) -> String {
    meta.columns
        .iter()
        .map(|c| match alias {
            Some(a) => format!("{}.{}", a, c),
            None => (*c).to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SELECT .. FROM table AS e [ORDER BY e.f1, e.f2]`; fields must be mapped
fn select_all(meta: &EntityMeta, order_by: &[&str]) -> Result<Statement> {
    let mut sql = format!(
        "SELECT {} FROM {} AS e",
        column_list(meta, Some("e")),
        meta.table
    );
    if !order_by.is_empty() {
        let fields = order_by
            .iter()
            .map(|f| meta.column(f).map(|c| format!("e.{}", c)))
            .collect::<std::result::Result<Vec<_>, DomainError>>()?;
        sql.push_str(" ORDER BY ");
        sql.push_str(&fields.join(", "));
    }
    Ok(Statement::raw(sql))
}

fn select_by_id(meta: &EntityMeta, id: &Value) -> Statement {
    Statement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = ?",
            column_list(meta, None),
            meta.table,
            meta.id_column
        ),
        vec![id.clone()],
    )
}

/// Insert-or-update returning the stored row. A null id is left out of
/// the insert so the database assigns one.
fn upsert(meta: &EntityMeta, record: &Record) -> Result<Statement> {
    let mut columns = Vec::with_capacity(meta.columns.len());
    let mut args = Vec::with_capacity(meta.columns.len());
    for column in meta.columns {
        let value = record.require(column)?;
        if column.eq_ignore_ascii_case(meta.id_column) && value.is_null() {
            continue;
        }
        columns.push(*column);
        args.push(value.clone());
    }

    if columns.is_empty() {
        return Ok(Statement::new(
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                meta.table,
                column_list(meta, None)
            ),
            args,
        ));
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| !c.eq_ignore_ascii_case(meta.id_column))
        .map(|c| format!("{} = excluded.{}", c, c))
        .collect();
    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {} RETURNING {}",
        meta.table,
        columns.join(", "),
        placeholders,
        meta.id_column,
        conflict,
        column_list(meta, None)
    );
    Ok(Statement::new(sql, args))
}

fn delete_by_id(meta: &EntityMeta, id: &Value) -> Statement {
    Statement::new(
        format!("DELETE FROM {} WHERE {} = ?", meta.table, meta.id_column),
        vec![id.clone()],
    )
}

//! Caller-owned sessions: the facade never commits or closes them

mod common;

use common::{unit_config, Customer};
use vexpersist_core::domain::{Catalog, Params};
use vexpersist_core::port::{Dao, NamedQuery};
use vexpersist_core::{InjectedSession, PersistenceConfig, PersistenceError, PersistentFacade, PersistentSessionFacade};
use vexpersist_infra_sqlite::{SqlitePersistenceProvider, SqliteSessionFactory};

async fn factory(dir: &tempfile::TempDir) -> SqliteSessionFactory {
    let config = PersistenceConfig::default().with_unit("main", unit_config(dir));
    SqlitePersistenceProvider::new(config)
        .register::<Customer>("main")
        .connect("main")
        .await
        .unwrap()
}

/// Writes stay inside the owner's transaction until the owner decides
#[tokio::test]
async fn test_owner_controls_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let factory = factory(&dir).await;
    let session = InjectedSession::new(factory.open().await.unwrap());
    let facade = PersistentFacade::injected(session.clone());
    let dao = facade.dao_factory().create_dao();

    session.begin().await.unwrap();
    dao.save(&Customer::new("Ada", "Porto", 1.0)).await.unwrap();
    assert!(session.in_transaction().await);
    session.rollback().await.unwrap();

    let after: Vec<Customer> = dao.get_all(&[]).await.unwrap();
    assert!(after.is_empty());
    assert!(session.is_open().await);
}

/// Without an owner transaction each statement autocommits
#[tokio::test]
async fn test_autocommit_without_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let factory = factory(&dir).await;
    let session = InjectedSession::new(factory.open().await.unwrap());
    let facade = PersistentFacade::injected(session.clone());

    facade
        .dao_factory()
        .create_dao_with(false)
        .save(&Customer::new("Ada", "Porto", 1.0))
        .await
        .unwrap();

    let other = InjectedSession::new(factory.open().await.unwrap());
    let seen = PersistentFacade::injected(other.clone())
        .named_query_factory()
        .create_named_query()
        .find_by_named_query("Customer.byCity", Params::named([("city", "Porto")]))
        .await
        .unwrap();
    assert_eq!(seen.len(), 1);
    other.close().await.unwrap();
    assert!(session.is_open().await);
}

/// Once the owner closes the session, handlers report it
#[tokio::test]
async fn test_closed_session_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let factory = factory(&dir).await;
    let session = InjectedSession::new(factory.open().await.unwrap());
    let dao = PersistentFacade::injected(session.clone())
        .dao_factory()
        .create_dao();

    session.close().await.unwrap();
    let err = dao.get_all::<Customer>(&[]).await.unwrap_err();
    assert!(matches!(err.root(), PersistenceError::SessionClosed(_)));
}

/// The injected session carries the unit's catalog, entity queries included
#[tokio::test]
async fn test_catalog_includes_entity_queries() {
    let dir = tempfile::tempdir().unwrap();
    let catalog: std::sync::Arc<Catalog> = factory(&dir).await.catalog();
    assert!(catalog.named_query("Customer.byCity").is_ok());
    assert!(catalog.named_query("Customer.count").is_ok());
    assert!(catalog.procedure("transfer").is_ok());
}

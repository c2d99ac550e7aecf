//! Mocks shared by the unit tests of this crate.

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogMatch, CatalogSearch};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::library::{
    ImportCandidate, ImportItem, LibraryPlatform, ManualMatch, PlatformKind, ResyncSummary,
};
use core_runtime::events::EventBus;
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;

use crate::context::{SessionContext, SessionId, SessionSettings};
use crate::store::{SyncAction, SyncStore};

mock! {
    pub Platform {}

    #[async_trait]
    impl LibraryPlatform for Platform {
        fn kind(&self) -> PlatformKind;
        async fn fetch_library(&self, include_hidden: bool) -> BridgeResult<Vec<ImportCandidate>>;
        async fn resync(&self) -> BridgeResult<ResyncSummary>;
        async fn import_many(&self, items: &[ImportItem]) -> BridgeResult<()>;
        async fn skip(&self, platform_id: &str) -> BridgeResult<()>;
        async fn restore(&self, platform_id: &str) -> BridgeResult<()>;
        async fn set_manual_match(&self, manual_match: &ManualMatch) -> BridgeResult<()>;
    }
}

mock! {
    pub Catalog {}

    #[async_trait]
    impl CatalogSearch for Catalog {
        async fn search_games(&self, query: &str, limit: u32) -> BridgeResult<Vec<CatalogMatch>>;
    }
}

/// Context over a store preloaded with `library`, without search debounce.
pub(crate) fn context(
    platform: MockPlatform,
    catalog: MockCatalog,
    library: Vec<ImportCandidate>,
) -> SessionContext {
    let store = SyncStore::new();
    store.dispatch(SyncAction::LibraryLoaded(library));
    SessionContext {
        id: SessionId::new(),
        store,
        platform: Arc::new(platform),
        catalog: Arc::new(catalog),
        events: EventBus::new(64),
        settings: SessionSettings {
            search_debounce: Duration::ZERO,
            ..SessionSettings::default()
        },
    }
}

pub(crate) fn matched(platform_id: &str, catalog_id: u64) -> ImportCandidate {
    let mut candidate = ImportCandidate::new(platform_id, platform_id);
    candidate.catalog_id = Some(catalog_id);
    candidate
}

pub(crate) fn server_error() -> BridgeError {
    BridgeError::Api {
        status: 500,
        message: "backend down".to_string(),
    }
}

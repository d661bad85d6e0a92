use std::sync::Arc;

use container_station::fake::FakeContainerStation;
use tracing::subscriber;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use crate::{
    data_sources::ContainersDataSource,
    lifecycle::{Controller, ResourceKind},
    not_found::NotFoundRules,
    provider::ProviderData,
};

/// A provider wired to an in-memory Container Station.
pub struct TestProvider {
    pub fake: Arc<FakeContainerStation>,
    pub data: ProviderData,
}

impl TestProvider {
    pub fn new() -> Self {
        Self::with_fake(FakeContainerStation::new())
    }

    pub fn with_fake(fake: FakeContainerStation) -> Self {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trace"));
        let _ = subscriber::set_global_default(
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_filter(env_filter)),
        );

        let fake = Arc::new(fake);
        let data = ProviderData::new(fake.clone(), NotFoundRules::default());
        Self { fake, data }
    }

    pub fn controller<K: ResourceKind>(&self, kind: K) -> Controller<K> {
        let mut controller = Controller::new(kind);
        controller.configure(self.data.clone());
        controller
    }

    pub fn containers_data_source(&self) -> ContainersDataSource {
        let mut source = ContainersDataSource::new();
        source.configure(self.data.clone());
        source
    }
}

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::attr::{join, settle_list, settle_object, Attr, Settle};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultUrlModel {
    pub port: Attr<i32>,
    pub service: Attr<String>,
}

impl Settle for DefaultUrlModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.port.settle_at(&join(prefix, "port"), unresolved);
        self.service.settle_at(&join(prefix, "service"), unresolved);
    }
}

/// A container started for one of the application's services.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppContainerModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
}

impl Settle for AppContainerModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.id.settle_at(&join(prefix, "id"), unresolved);
        self.name.settle_at(&join(prefix, "name"), unresolved);
    }
}

/// Plan and state of a `qnap_app` resource (a compose application).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default, setter(into))]
pub struct AppModel {
    pub name: Attr<String>,
    pub yml: Attr<String>,
    pub status: Attr<String>,
    pub removeanonvolumes: Attr<bool>,
    pub default_url: Attr<DefaultUrlModel>,
    pub cpu_limit: Attr<i32>,
    pub mem_limit: Attr<i32>,
    pub mem_reservation: Attr<i32>,
    pub containers: Attr<Vec<AppContainerModel>>,
    pub last_updated: Attr<String>,
}

impl Settle for AppModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.name.settle_at(&join(prefix, "name"), unresolved);
        self.yml.settle_at(&join(prefix, "yml"), unresolved);
        self.status.settle_at(&join(prefix, "status"), unresolved);
        self.removeanonvolumes
            .settle_at(&join(prefix, "removeanonvolumes"), unresolved);
        settle_object(&mut self.default_url, &join(prefix, "default_url"), unresolved);
        self.cpu_limit.settle_at(&join(prefix, "cpu_limit"), unresolved);
        self.mem_limit.settle_at(&join(prefix, "mem_limit"), unresolved);
        self.mem_reservation
            .settle_at(&join(prefix, "mem_reservation"), unresolved);
        settle_list(&mut self.containers, &join(prefix, "containers"), unresolved);
        self.last_updated.settle_at(&join(prefix, "last_updated"), unresolved);
    }
}

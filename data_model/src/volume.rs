use std::collections::BTreeMap;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::attr::{join, Attr, Settle};

/// Plan and state of a `qnap_volume` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default, setter(into))]
pub struct VolumeModel {
    pub id: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub name: Attr<String>,
    pub driver: Attr<String>,
    pub labels: Attr<BTreeMap<String, String>>,
    pub mountpoint: Attr<String>,
    pub created: Attr<String>,
    pub last_updated: Attr<String>,
}

impl Settle for VolumeModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.id.settle_at(&join(prefix, "id"), unresolved);
        self.kind.settle_at(&join(prefix, "type"), unresolved);
        self.name.settle_at(&join(prefix, "name"), unresolved);
        self.driver.settle_at(&join(prefix, "driver"), unresolved);
        self.labels.settle_at(&join(prefix, "labels"), unresolved);
        self.mountpoint.settle_at(&join(prefix, "mountpoint"), unresolved);
        self.created.settle_at(&join(prefix, "created"), unresolved);
        self.last_updated.settle_at(&join(prefix, "last_updated"), unresolved);
    }
}

use std::collections::BTreeMap;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::attr::{join, settle_list, settle_object, Attr, Settle};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortBindingModel {
    pub host: Attr<i32>,
    pub container: Attr<i32>,
    pub protocol: Attr<String>,
    pub hostip: Attr<String>,
    pub containerip: Attr<String>,
}

impl Settle for PortBindingModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.host.settle_at(&join(prefix, "host"), unresolved);
        self.container.settle_at(&join(prefix, "container"), unresolved);
        self.protocol.settle_at(&join(prefix, "protocol"), unresolved);
        self.hostip.settle_at(&join(prefix, "hostip"), unresolved);
        self.containerip.settle_at(&join(prefix, "containerip"), unresolved);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMountModel {
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub name: Attr<String>,
    pub container: Attr<String>,
    pub source: Attr<String>,
    pub destination: Attr<String>,
    pub permission: Attr<String>,
}

impl Settle for VolumeMountModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.kind.settle_at(&join(prefix, "type"), unresolved);
        self.name.settle_at(&join(prefix, "name"), unresolved);
        self.container.settle_at(&join(prefix, "container"), unresolved);
        self.source.settle_at(&join(prefix, "source"), unresolved);
        self.destination.settle_at(&join(prefix, "destination"), unresolved);
        self.permission.settle_at(&join(prefix, "permission"), unresolved);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub name: Attr<String>,
    pub permission: Attr<String>,
}

impl Settle for DeviceModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.name.settle_at(&join(prefix, "name"), unresolved);
        self.permission.settle_at(&join(prefix, "permission"), unresolved);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestartPolicyModel {
    pub name: Attr<String>,
    pub maximumretrycount: Attr<i32>,
}

impl Settle for RestartPolicyModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.name.settle_at(&join(prefix, "name"), unresolved);
        self.maximumretrycount
            .settle_at(&join(prefix, "maximumretrycount"), unresolved);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CpuPinModel {
    pub cpuids: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
}

impl Settle for CpuPinModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.cpuids.settle_at(&join(prefix, "cpuids"), unresolved);
        self.kind.settle_at(&join(prefix, "type"), unresolved);
    }
}

/// A network the container is attached to, as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    pub id: Attr<String>,
    pub name: Attr<String>,
    pub displayname: Attr<String>,
    pub ipaddress: Attr<String>,
    pub macaddress: Attr<String>,
    pub gateway: Attr<String>,
    pub networktype: Attr<String>,
    pub isstaticip: Attr<bool>,
}

impl Settle for NetworkModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.id.settle_at(&join(prefix, "id"), unresolved);
        self.name.settle_at(&join(prefix, "name"), unresolved);
        self.displayname.settle_at(&join(prefix, "displayname"), unresolved);
        self.ipaddress.settle_at(&join(prefix, "ipaddress"), unresolved);
        self.macaddress.settle_at(&join(prefix, "macaddress"), unresolved);
        self.gateway.settle_at(&join(prefix, "gateway"), unresolved);
        self.networktype.settle_at(&join(prefix, "networktype"), unresolved);
        self.isstaticip.settle_at(&join(prefix, "isstaticip"), unresolved);
    }
}

/// Plan and state of a `qnap_container` resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default, setter(into))]
pub struct ContainerModel {
    pub id: Attr<String>,
    #[serde(rename = "type")]
    pub kind: Attr<String>,
    pub name: Attr<String>,
    pub image: Attr<String>,
    pub status: Attr<String>,
    pub removeanonvolumes: Attr<bool>,
    pub autoremove: Attr<bool>,
    pub tty: Attr<bool>,
    pub openstdin: Attr<bool>,
    pub network: Attr<String>,
    pub networktype: Attr<String>,
    pub hostname: Attr<String>,
    pub runtime: Attr<String>,
    pub privileged: Attr<bool>,
    pub env: Attr<BTreeMap<String, String>>,
    pub labels: Attr<BTreeMap<String, String>>,
    pub devices: Attr<Vec<DeviceModel>>,
    pub volumes: Attr<Vec<VolumeMountModel>>,
    pub portbindings: Attr<Vec<PortBindingModel>>,
    pub cpupin: Attr<CpuPinModel>,
    pub restartpolicy: Attr<RestartPolicyModel>,
    pub cmd: Attr<Vec<String>>,
    pub entrypoint: Attr<Vec<String>>,
    pub dns: Attr<Vec<String>>,
    pub networks: Attr<Vec<NetworkModel>>,
    pub last_updated: Attr<String>,
}

impl Settle for ContainerModel {
    fn settle(&mut self, prefix: &str, unresolved: &mut Vec<String>) {
        self.id.settle_at(&join(prefix, "id"), unresolved);
        self.kind.settle_at(&join(prefix, "type"), unresolved);
        self.name.settle_at(&join(prefix, "name"), unresolved);
        self.image.settle_at(&join(prefix, "image"), unresolved);
        self.status.settle_at(&join(prefix, "status"), unresolved);
        self.removeanonvolumes
            .settle_at(&join(prefix, "removeanonvolumes"), unresolved);
        self.autoremove.settle_at(&join(prefix, "autoremove"), unresolved);
        self.tty.settle_at(&join(prefix, "tty"), unresolved);
        self.openstdin.settle_at(&join(prefix, "openstdin"), unresolved);
        self.network.settle_at(&join(prefix, "network"), unresolved);
        self.networktype.settle_at(&join(prefix, "networktype"), unresolved);
        self.hostname.settle_at(&join(prefix, "hostname"), unresolved);
        self.runtime.settle_at(&join(prefix, "runtime"), unresolved);
        self.privileged.settle_at(&join(prefix, "privileged"), unresolved);
        self.env.settle_at(&join(prefix, "env"), unresolved);
        self.labels.settle_at(&join(prefix, "labels"), unresolved);
        settle_list(&mut self.devices, &join(prefix, "devices"), unresolved);
        settle_list(&mut self.volumes, &join(prefix, "volumes"), unresolved);
        settle_list(&mut self.portbindings, &join(prefix, "portbindings"), unresolved);
        settle_object(&mut self.cpupin, &join(prefix, "cpupin"), unresolved);
        settle_object(&mut self.restartpolicy, &join(prefix, "restartpolicy"), unresolved);
        self.cmd.settle_at(&join(prefix, "cmd"), unresolved);
        self.entrypoint.settle_at(&join(prefix, "entrypoint"), unresolved);
        self.dns.settle_at(&join(prefix, "dns"), unresolved);
        settle_list(&mut self.networks, &join(prefix, "networks"), unresolved);
        self.last_updated.settle_at(&join(prefix, "last_updated"), unresolved);
    }
}

use serde::{Deserialize, Serialize};

use crate::container::NetworkModel;

/// Port binding as listed by the `qnap_containers` data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryPortBindingModel {
    pub host: i32,
    pub container: i32,
    pub protocol: String,
    pub hostip: String,
    pub containerip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSummaryModel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image: String,
    pub imageid: String,
    pub status: String,
    pub project: String,
    pub runtime: String,
    pub memorylimit: i64,
    pub cpulimit: i64,
    pub cpupin: i64,
    pub uuid: String,
    pub usedbyinternalservice: String,
    pub privileged: bool,
    pub cpu: f32,
    pub memory: f32,
    pub tx: i64,
    pub rx: i64,
    pub read: i64,
    pub write: i64,
    pub created: String,
    pub startedat: String,
    pub cmd: String,
    pub portbindings: Vec<SummaryPortBindingModel>,
    pub networks: Vec<NetworkModel>,
}

/// State of the `qnap_containers` data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainersDataSourceModel {
    pub containers: Vec<ContainerSummaryModel>,
}

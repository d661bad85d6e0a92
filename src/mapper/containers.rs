use container_station::{ContainerSummary, PortBinding};
use data_model::{ContainerSummaryModel, SummaryPortBindingModel};

use super::container::network_model;

fn port_binding(binding: &PortBinding) -> SummaryPortBindingModel {
    SummaryPortBindingModel {
        host: binding.host,
        container: binding.container,
        protocol: binding.protocol.clone(),
        hostip: binding.host_ip.clone(),
        containerip: binding.container_ip.clone(),
    }
}

fn summary(container: &ContainerSummary) -> ContainerSummaryModel {
    ContainerSummaryModel {
        id: container.id.clone(),
        name: container.name.clone(),
        kind: container.kind.clone(),
        image: container.image.clone(),
        imageid: container.image_id.clone(),
        status: container.status.clone(),
        project: container.project.clone(),
        runtime: container.runtime.clone(),
        memorylimit: container.mem_limit,
        cpulimit: container.cpu_limit,
        cpupin: container.cpupin,
        uuid: container.uuid.clone(),
        usedbyinternalservice: container.used_by_internal_service.clone(),
        privileged: container.privileged,
        cpu: container.cpu as f32,
        memory: container.memory as f32,
        tx: container.tx,
        rx: container.rx,
        read: container.read,
        write: container.write,
        created: container.created.clone(),
        startedat: container.started_at.clone(),
        cmd: container.cmd.join(" "),
        portbindings: container.port_bindings.iter().map(port_binding).collect(),
        networks: container.networks.iter().map(network_model).collect(),
    }
}

/// Data source rows, in server order.
pub fn summaries(containers: &[ContainerSummary]) -> Vec<ContainerSummaryModel> {
    containers.iter().map(summary).collect()
}

#[cfg(test)]
mod tests {
    use container_station::NetworkAttachment;
    use data_model::Attr;

    use super::*;

    #[test]
    fn test_summaries() {
        let rows = summaries(&[
            ContainerSummary {
                id: "a1".to_string(),
                name: "web".to_string(),
                status: "running".to_string(),
                cmd: vec!["nginx".to_string(), "-g".to_string(), "daemon off;".to_string()],
                cpu: 0.25,
                tx: 5_000_000_000,
                port_bindings: vec![PortBinding {
                    host: 8080,
                    container: 80,
                    protocol: "tcp".to_string(),
                    ..Default::default()
                }],
                networks: vec![NetworkAttachment {
                    name: "eth0".to_string(),
                    is_static_ip: true,
                    ..Default::default()
                }],
                ..Default::default()
            },
            ContainerSummary {
                id: "b2".to_string(),
                name: "db".to_string(),
                ..Default::default()
            },
        ]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "web");
        assert_eq!(rows[0].cmd, "nginx -g daemon off;");
        assert_eq!(rows[0].cpu, 0.25);
        assert_eq!(rows[0].tx, 5_000_000_000);
        assert_eq!(rows[0].portbindings[0].host, 8080);
        assert_eq!(rows[0].networks[0].isstaticip, Attr::Value(true));
        assert_eq!(rows[1].cmd, "");
        assert!(rows[1].portbindings.is_empty());
    }
}

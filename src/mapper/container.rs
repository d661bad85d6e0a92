use container_station::{
    ContainerInfo,
    CpuPin,
    Device,
    NetworkAttachment,
    NewContainerSpec,
    PortBinding,
    RestartPolicy,
    VolumeMount,
};
use data_model::{
    Attr,
    AttributePath,
    ContainerModel,
    CpuPinModel,
    DeviceModel,
    Diagnostics,
    NetworkModel,
    PortBindingModel,
    RestartPolicyModel,
    VolumeMountModel,
};

use super::{convert_entries, list_value, normalize_status, skip_warning, string_list, string_map};

/// Whether a container request creates a new container or rebuilds an
/// existing one in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Recreate,
}

impl Operation {
    fn wire(&self) -> Option<String> {
        match self {
            Operation::Create => None,
            Operation::Recreate => Some("recreate".to_string()),
        }
    }
}

fn port_binding(entry: &PortBindingModel) -> Option<PortBinding> {
    Some(PortBinding {
        host: *entry.host.value()?,
        container: *entry.container.value()?,
        protocol: entry.protocol.value()?.clone(),
        host_ip: entry.hostip.value()?.clone(),
        container_ip: entry.containerip.value()?.clone(),
    })
}

fn volume_mount(entry: &VolumeMountModel) -> Option<VolumeMount> {
    Some(VolumeMount {
        kind: entry.kind.value()?.clone(),
        name: entry.name.value()?.clone(),
        container: entry.container.value()?.clone(),
        source: entry.source.value()?.clone(),
        destination: entry.destination.value()?.clone(),
        permission: entry.permission.value()?.clone(),
    })
}

fn device(entry: &DeviceModel) -> Option<Device> {
    Some(Device {
        name: entry.name.value()?.clone(),
        permission: entry.permission.value()?.clone(),
    })
}

fn restart_policy(block: &RestartPolicyModel) -> Option<RestartPolicy> {
    Some(RestartPolicy {
        name: block.name.value()?.clone(),
        maximum_retry_count: *block.maximumretrycount.value()?,
    })
}

fn cpu_pin(block: &CpuPinModel) -> Option<CpuPin> {
    Some(CpuPin {
        cpu_ids: block.cpuids.value()?.clone(),
        kind: block.kind.value()?.clone(),
    })
}

/// Converts a single nested block. Incomplete blocks are dropped with a
/// warning; null and unknown blocks are simply absent.
fn single_block<T, U>(
    attr: &Attr<T>,
    block: &str,
    diags: &mut Diagnostics,
    convert: impl Fn(&T) -> Option<U>,
) -> Option<U> {
    let value = attr.value()?;
    let converted = convert(value);
    if converted.is_none() {
        skip_warning(diags, AttributePath::root(block), block);
    }
    converted
}

/// Builds the create (or recreate) request from a plan.
pub fn to_request(plan: &ContainerModel, operation: Operation, diags: &mut Diagnostics) -> NewContainerSpec {
    NewContainerSpec {
        kind: plan.kind.known(),
        name: plan.name.known(),
        image: plan.image.known(),
        auto_remove: plan.autoremove.known(),
        tty: plan.tty.known(),
        open_stdin: plan.openstdin.known(),
        network: plan.network.known(),
        network_type: plan.networktype.known(),
        hostname: plan.hostname.known(),
        runtime: plan.runtime.known(),
        privileged: plan.privileged.known(),
        env: string_map(&plan.env),
        labels: string_map(&plan.labels),
        devices: convert_entries(&plan.devices, "devices", diags, device),
        volumes: convert_entries(&plan.volumes, "volumes", diags, volume_mount),
        port_bindings: convert_entries(&plan.portbindings, "portbindings", diags, port_binding),
        restart_policy: single_block(&plan.restartpolicy, "restartpolicy", diags, restart_policy),
        cpu_pin: single_block(&plan.cpupin, "cpupin", diags, cpu_pin),
        cmd: string_list(&plan.cmd),
        entrypoint: string_list(&plan.entrypoint),
        dns: string_list(&plan.dns),
        operation: operation.wire(),
    }
}

pub(crate) fn network_model(network: &NetworkAttachment) -> NetworkModel {
    NetworkModel {
        id: network.id.clone().into(),
        name: network.name.clone().into(),
        displayname: network.display_name.clone().into(),
        ipaddress: network.ip_address.clone().into(),
        macaddress: network.mac_address.clone().into(),
        gateway: network.gateway.clone().into(),
        networktype: network.network_type.clone().into(),
        isstaticip: network.is_static_ip.into(),
    }
}

fn port_binding_model(binding: &PortBinding) -> PortBindingModel {
    PortBindingModel {
        host: binding.host.into(),
        container: binding.container.into(),
        protocol: binding.protocol.clone().into(),
        hostip: binding.host_ip.clone().into(),
        containerip: binding.container_ip.clone().into(),
    }
}

fn volume_mount_model(mount: &VolumeMount) -> VolumeMountModel {
    VolumeMountModel {
        kind: mount.kind.clone().into(),
        name: mount.name.clone().into(),
        container: mount.container.clone().into(),
        source: mount.source.clone().into(),
        destination: mount.destination.clone().into(),
        permission: mount.permission.clone().into(),
    }
}

fn device_model(device: &Device) -> DeviceModel {
    DeviceModel {
        name: device.name.clone().into(),
        permission: device.permission.clone().into(),
    }
}

/// A server string that may be blank when the server did not echo it.
fn echoed(value: &str, fallback: &Attr<String>) -> Attr<String> {
    if value.is_empty() {
        fallback.clone()
    } else {
        Attr::Value(value.to_string())
    }
}

/// Writes everything the server reported back onto `base`.
///
/// Attributes the server does not echo (`type` when blank, `network`,
/// `networktype`, `removeanonvolumes`, `status`, `last_updated`) keep their
/// value from `base`.
fn merge_remote(base: &ContainerModel, info: &ContainerInfo) -> ContainerModel {
    ContainerModel {
        id: Attr::Value(info.id.clone()),
        kind: echoed(&info.kind, &base.kind),
        name: echoed(&info.name, &base.name),
        image: echoed(&info.image, &base.image),
        status: base.status.clone(),
        removeanonvolumes: base.removeanonvolumes.clone(),
        autoremove: info.auto_remove.into(),
        tty: info.tty.into(),
        openstdin: info.open_stdin.into(),
        network: echoed(&info.network, &base.network),
        networktype: echoed(&info.network_type, &base.networktype),
        hostname: info.hostname.clone().into(),
        runtime: info.runtime.clone().into(),
        privileged: info.privileged.into(),
        env: info.env.clone().into(),
        labels: info.labels.clone().into(),
        devices: list_value(&info.devices, device_model),
        volumes: list_value(&info.volumes, volume_mount_model),
        portbindings: list_value(&info.port_bindings, port_binding_model),
        cpupin: Attr::from_option(info.cpu_pin.as_ref().map(|pin| CpuPinModel {
            cpuids: pin.cpu_ids.clone().into(),
            kind: pin.kind.clone().into(),
        })),
        restartpolicy: Attr::from_option(info.restart_policy.as_ref().map(|policy| {
            RestartPolicyModel {
                name: policy.name.clone().into(),
                maximumretrycount: policy.maximum_retry_count.into(),
            }
        })),
        cmd: info.cmd.clone().into(),
        entrypoint: info.entrypoint.clone().into(),
        dns: info.dns.clone().into(),
        networks: list_value(&info.networks, network_model),
        last_updated: base.last_updated.clone(),
    }
}

/// State after a create or recreate call: the plan overlaid with the
/// server's answer. `status` stays as planned; reconciliation follows.
pub fn apply_response(plan: &ContainerModel, info: &ContainerInfo) -> ContainerModel {
    merge_remote(plan, info)
}

/// State after a read. The server is authoritative for what it reports;
/// `status` is the observed one, reduced to `running` or `stopped`.
pub fn from_remote(prior: &ContainerModel, info: &ContainerInfo) -> ContainerModel {
    let mut state = merge_remote(prior, info);
    if !info.status.is_empty() {
        state.status = Attr::Value(normalize_status(&info.status).to_string());
    }
    state
}

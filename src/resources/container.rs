//! `qnap_container`: a single container.

use async_trait::async_trait;
use container_station::{ApiError, ContainerInfo, ContainerStationApi, NewContainerSpec};
use data_model::{
    schema::patterns,
    Attr,
    Attribute,
    AttributePath,
    ContainerModel,
    Diagnostics,
    PlanModifier,
    Schema,
    Validator,
};

use crate::{
    lifecycle::{AttributeChange, ChangeSet, Identity, ResourceKind},
    mapper::{
        container::{self as mapper, Operation},
        known_list,
        DesiredStatus,
    },
    not_found::ObjectKind,
};

/// Container type assumed when state does not record one.
pub const DEFAULT_CONTAINER_TYPE: &str = "docker";

const STATUSES: &[&str] = &["running", "stopped"];
const CONTAINER_TYPES: &[&str] = &["docker"];
const NETWORK_TYPES: &[&str] = &["bridge", "host", "none", "ipvlan", "default"];
const RUNTIMES: &[&str] = &["runc", "kata-runtime"];
const PROTOCOLS: &[&str] = &["tcp", "udp"];
const RESTART_POLICIES: &[&str] = &["no", "on-failure", "always", "unless-stopped"];
const VOLUME_TYPES: &[&str] = &["host", "volume", "container"];
const VOLUME_PERMISSIONS: &[&str] = &["readOnly", "writable"];

const INVALID_NAME: &str = "Container name must be between 2 and 64 characters, starts with a letter or number. Valid characters: letters (A-Z, a-z), numbers (0-9), hyphen (-), period (.), underscore (_)";
const INVALID_IMAGE: &str =
    "Image name must be in a valid format (e.g. 'nginx:latest', 'myregistry.local:5000/nginx:latest').";
const INVALID_IP: &str = "IP Address must be in a valid format (e.g. 0.0.0.0').";
const INVALID_PATH: &str = "Path must be in a valid format (e.g. 'home/user' or '/home/user/file.txt').";
const INVALID_HOSTNAME: &str = "Hostname must be in a valid format (e.g. 'ubuntu' or 'ubuntu-1') long hostname are not valid only short hostname.";

fn port() -> Attribute {
    Attribute::int32()
        .optional()
        .computed()
        .validator(Validator::Int32Between(0, 65535))
}

fn ip() -> Attribute {
    Attribute::string()
        .optional()
        .computed()
        .validator(Validator::RegexMatches(patterns::IPV4, INVALID_IP))
}

fn path() -> Attribute {
    Attribute::string()
        .optional()
        .computed()
        .validator(Validator::RegexMatches(patterns::ABSOLUTE_PATH, INVALID_PATH))
}

fn optional_string(description: &'static str) -> Attribute {
    Attribute::string().optional().computed().description(description)
}

fn optional_bool(description: &'static str) -> Attribute {
    Attribute::bool().optional().computed().description(description)
}

fn network_attributes() -> Vec<(&'static str, Attribute)> {
    vec![
        ("id", Attribute::string().computed()),
        ("name", Attribute::string().computed()),
        ("displayname", Attribute::string().computed()),
        ("ipaddress", Attribute::string().computed()),
        ("macaddress", Attribute::string().computed()),
        ("gateway", Attribute::string().computed()),
        ("networktype", Attribute::string().computed()),
        ("isstaticip", Attribute::bool().computed()),
    ]
}

pub(crate) fn networks_attribute() -> Attribute {
    Attribute::list_nested(network_attributes())
        .computed()
        .description("The networks the container is attached to.")
}

pub fn container_schema() -> Schema {
    Schema::new("Manages a container on QNAP Container Station.")
        .attribute(
            "id",
            Attribute::string()
                .computed()
                .description("The ID of the container.")
                .plan_modifier(PlanModifier::UseStateForUnknown),
        )
        .attribute(
            "last_updated",
            Attribute::string()
                .computed()
                .description("The last updated timestamp of the container."),
        )
        .attribute(
            "status",
            Attribute::string()
                .required()
                .description("The state of the container (running, stopped).")
                .validator(Validator::OneOf(STATUSES)),
        )
        .attribute(
            "removeanonvolumes",
            Attribute::bool()
                .required()
                .description("Whether to remove anonymous volumes associated with the container.")
                .plan_modifier(PlanModifier::RequiresReplace),
        )
        .attribute(
            "type",
            Attribute::string()
                .required()
                .description("The type of the container.")
                .validator(Validator::OneOf(CONTAINER_TYPES))
                .plan_modifier(PlanModifier::RequiresReplace),
        )
        .attribute(
            "name",
            Attribute::string()
                .required()
                .description("The name of the container.")
                .validator(Validator::LengthBetween(1, 64))
                .validator(Validator::RegexMatches(patterns::CONTAINER_NAME, INVALID_NAME))
                .plan_modifier(PlanModifier::RequiresReplace),
        )
        .attribute(
            "image",
            Attribute::string()
                .required()
                .description("The image of the container.")
                .validator(Validator::RegexMatches(patterns::IMAGE_REFERENCE, INVALID_IMAGE)),
        )
        .attribute(
            "portbindings",
            Attribute::list_nested([
                ("host", port().description("The host port.")),
                ("container", port().description("The container port.")),
                (
                    "protocol",
                    optional_string("The protocol used for port binding.")
                        .validator(Validator::OneOf(PROTOCOLS)),
                ),
                ("hostip", ip().description("The host IP address.")),
                ("containerip", ip().description("The container IP address.")),
            ])
            .optional()
            .computed()
            .description("The port bindings of the container."),
        )
        .attribute(
            "restartpolicy",
            Attribute::single_nested([
                (
                    "name",
                    optional_string("The name of the restart policy.")
                        .validator(Validator::OneOf(RESTART_POLICIES)),
                ),
                (
                    "maximumretrycount",
                    Attribute::int32()
                        .optional()
                        .computed()
                        .description("The maximum number of retries for the restart policy.")
                        .validator(Validator::Int32Between(0, 1000)),
                ),
            ])
            .optional()
            .computed()
            .description("The restart policy of the container."),
        )
        .attribute("autoremove", optional_bool("Whether to automatically remove the container when it exits."))
        .attribute(
            "cmd",
            Attribute::string_list()
                .optional()
                .computed()
                .description("The command to run in the container."),
        )
        .attribute(
            "entrypoint",
            Attribute::string_list()
                .optional()
                .computed()
                .description("The entrypoint for the container."),
        )
        .attribute("tty", optional_bool("Whether to allocate a pseudo-TTY."))
        .attribute("openstdin", optional_bool("Whether to open stdin."))
        .attribute(
            "network",
            Attribute::string()
                .required()
                .description("The network to connect the container to."),
        )
        .attribute(
            "networktype",
            Attribute::string()
                .required()
                .description("The type of the network.")
                .validator(Validator::OneOf(NETWORK_TYPES)),
        )
        .attribute(
            "hostname",
            optional_string("The hostname of the container.")
                .validator(Validator::RegexMatches(patterns::HOSTNAME, INVALID_HOSTNAME)),
        )
        .attribute(
            "dns",
            Attribute::string_list()
                .optional()
                .computed()
                .description("The DNS servers for the container."),
        )
        .attribute(
            "env",
            Attribute::string_map()
                .optional()
                .computed()
                .description("The environment variables for the container."),
        )
        .attribute(
            "labels",
            Attribute::string_map()
                .optional()
                .computed()
                .description("The labels for the container."),
        )
        .attribute(
            "volumes",
            Attribute::list_nested([
                (
                    "type",
                    optional_string("The type of the volume.").validator(Validator::OneOf(VOLUME_TYPES)),
                ),
                ("name", optional_string("The name of the volume.")),
                ("container", optional_string("The container path for the volume.")),
                ("source", path().description("The source path for the volume.")),
                ("destination", path().description("The destination path for the volume.")),
                (
                    "permission",
                    optional_string("The permission for the volume.")
                        .validator(Validator::OneOf(VOLUME_PERMISSIONS)),
                ),
            ])
            .optional()
            .computed()
            .description("The volumes mounted into the container."),
        )
        .attribute(
            "runtime",
            optional_string("The runtime for the container.").validator(Validator::OneOf(RUNTIMES)),
        )
        .attribute("privileged", optional_bool("Whether to run the container in privileged mode."))
        .attribute(
            "devices",
            Attribute::list_nested([
                ("name", optional_string("The name of the device.")),
                ("permission", optional_string("The permission for the device.")),
            ])
            .optional()
            .computed()
            .description("The host devices passed to the container."),
        )
        .attribute(
            "cpupin",
            Attribute::single_nested([
                ("cpuids", optional_string("The CPU IDs for the container.")),
                ("type", optional_string("The type of CPU pinning.")),
            ])
            .optional()
            .computed()
            .description("The CPU pinning of the container."),
        )
        .attribute("networks", networks_attribute())
}

/// Runs the schema validators over every known value, nested entries
/// included.
fn validate(schema: &Schema, config: &ContainerModel, diags: &mut Diagnostics) {
    for (name, value) in [
        ("type", &config.kind),
        ("name", &config.name),
        ("image", &config.image),
        ("status", &config.status),
        ("networktype", &config.networktype),
        ("hostname", &config.hostname),
        ("runtime", &config.runtime),
    ] {
        schema.validate_string(&AttributePath::root(name), value, diags);
    }

    for (index, binding) in known_list(&config.portbindings).iter().enumerate() {
        let at = |name: &str| AttributePath::root("portbindings").index(index).attribute(name);
        schema.validate_int32(&at("host"), &binding.host, diags);
        schema.validate_int32(&at("container"), &binding.container, diags);
        schema.validate_string(&at("protocol"), &binding.protocol, diags);
        schema.validate_string(&at("hostip"), &binding.hostip, diags);
        schema.validate_string(&at("containerip"), &binding.containerip, diags);
    }

    for (index, volume) in known_list(&config.volumes).iter().enumerate() {
        let at = |name: &str| AttributePath::root("volumes").index(index).attribute(name);
        schema.validate_string(&at("type"), &volume.kind, diags);
        schema.validate_string(&at("source"), &volume.source, diags);
        schema.validate_string(&at("destination"), &volume.destination, diags);
        schema.validate_string(&at("permission"), &volume.permission, diags);
    }

    if let Some(policy) = config.restartpolicy.value() {
        let at = |name: &str| AttributePath::root("restartpolicy").attribute(name);
        schema.validate_string(&at("name"), &policy.name, diags);
        schema.validate_int32(&at("maximumretrycount"), &policy.maximumretrycount, diags);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerKind;

#[async_trait]
impl ResourceKind for ContainerKind {
    type Model = ContainerModel;
    type Request = NewContainerSpec;
    type Remote = ContainerInfo;

    const TYPE_SUFFIX: &'static str = "_container";
    const NOUN: &'static str = "container";
    const OBJECT: ObjectKind = ObjectKind::Container;

    fn schema(&self) -> Schema {
        container_schema()
    }

    fn validate_config(&self, schema: &Schema, config: &ContainerModel, diags: &mut Diagnostics) {
        validate(schema, config, diags);
    }

    fn identity(&self, model: &ContainerModel) -> Option<Identity> {
        let id = model.id.value().filter(|id| !id.is_empty())?;
        let kind = model
            .kind
            .value()
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONTAINER_TYPE);
        Some(Identity::new(id.as_str(), kind))
    }

    fn build_request(&self, plan: &ContainerModel, diags: &mut Diagnostics) -> Option<NewContainerSpec> {
        Some(mapper::to_request(plan, Operation::Create, diags))
    }

    fn recreate_request(&self, plan: &ContainerModel, diags: &mut Diagnostics) -> Option<NewContainerSpec> {
        Some(mapper::to_request(plan, Operation::Recreate, diags))
    }

    fn apply_response(&self, plan: &ContainerModel, remote: &ContainerInfo) -> ContainerModel {
        mapper::apply_response(plan, remote)
    }

    fn refresh(&self, prior: &ContainerModel, remote: &ContainerInfo) -> ContainerModel {
        mapper::from_remote(prior, remote)
    }

    fn changed_attributes(&self, prior: &ContainerModel, plan: &ContainerModel) -> Vec<AttributeChange> {
        ChangeSet::new()
            .compare("id", &prior.id, &plan.id)
            .compare("type", &prior.kind, &plan.kind)
            .compare("name", &prior.name, &plan.name)
            .compare("image", &prior.image, &plan.image)
            .compare("status", &prior.status, &plan.status)
            .compare("removeanonvolumes", &prior.removeanonvolumes, &plan.removeanonvolumes)
            .compare("autoremove", &prior.autoremove, &plan.autoremove)
            .compare("tty", &prior.tty, &plan.tty)
            .compare("openstdin", &prior.openstdin, &plan.openstdin)
            .compare("network", &prior.network, &plan.network)
            .compare("networktype", &prior.networktype, &plan.networktype)
            .compare("hostname", &prior.hostname, &plan.hostname)
            .compare("runtime", &prior.runtime, &plan.runtime)
            .compare("privileged", &prior.privileged, &plan.privileged)
            .compare("env", &prior.env, &plan.env)
            .compare("labels", &prior.labels, &plan.labels)
            .compare("devices", &prior.devices, &plan.devices)
            .compare("volumes", &prior.volumes, &plan.volumes)
            .compare("portbindings", &prior.portbindings, &plan.portbindings)
            .compare("cpupin", &prior.cpupin, &plan.cpupin)
            .compare("restartpolicy", &prior.restartpolicy, &plan.restartpolicy)
            .compare("cmd", &prior.cmd, &plan.cmd)
            .compare("entrypoint", &prior.entrypoint, &plan.entrypoint)
            .compare("dns", &prior.dns, &plan.dns)
            .compare("networks", &prior.networks, &plan.networks)
            .compare("last_updated", &prior.last_updated, &plan.last_updated)
            .into_fields()
    }

    fn remove_flag(&self, state: &ContainerModel) -> bool {
        state.removeanonvolumes.value().copied().unwrap_or(false)
    }

    fn desired_status(&self, model: &ContainerModel) -> Option<DesiredStatus> {
        DesiredStatus::from_attr(&model.status)
    }

    fn actual_status<'a>(&self, remote: &'a ContainerInfo) -> Option<&'a str> {
        Some(remote.status.as_str())
    }

    fn set_status(&self, model: &mut ContainerModel, status: DesiredStatus) {
        model.status = Attr::Value(status.to_string());
    }

    fn last_updated_mut<'a>(&self, model: &'a mut ContainerModel) -> &'a mut Attr<String> {
        &mut model.last_updated
    }

    async fn create(
        &self,
        api: &dyn ContainerStationApi,
        request: &NewContainerSpec,
    ) -> Result<ContainerInfo, ApiError> {
        api.create_container(request).await
    }

    async fn inspect(&self, api: &dyn ContainerStationApi, identity: &Identity) -> Result<ContainerInfo, ApiError> {
        api.inspect_container(&identity.key, &identity.object_type).await
    }

    async fn delete(
        &self,
        api: &dyn ContainerStationApi,
        identity: &Identity,
        remove_anon_volumes: bool,
    ) -> Result<(), ApiError> {
        api.delete_container(&identity.key, &identity.object_type, remove_anon_volumes)
            .await
    }

    async fn start(&self, api: &dyn ContainerStationApi, identity: &Identity) -> Result<(), ApiError> {
        api.start_container(&identity.key, &identity.object_type).await
    }

    async fn stop(&self, api: &dyn ContainerStationApi, identity: &Identity) -> Result<(), ApiError> {
        api.stop_container(&identity.key, &identity.object_type).await
    }
}

#[cfg(test)]
mod tests {
    use data_model::{
        test_objects::tests::{mock_container_plan, mock_container_plan_with_ports},
        PortBindingModel,
        Presence,
        RestartPolicyModel,
    };

    use super::*;

    fn errors_at(diags: &Diagnostics) -> Vec<String> {
        diags
            .errors()
            .map(|d| d.attribute.as_ref().map(|a| a.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_schema_presence() {
        let schema = container_schema();
        let presence = |name: &str| schema.lookup(&AttributePath::root(name)).unwrap().presence;
        for name in ["status", "removeanonvolumes", "type", "name", "image", "network", "networktype"] {
            assert_eq!(presence(name), Presence::Required, "{name}");
        }
        for name in ["id", "last_updated", "networks"] {
            assert_eq!(presence(name), Presence::Computed, "{name}");
        }
        for name in ["hostname", "env", "portbindings", "restartpolicy", "cmd", "cpupin"] {
            assert_eq!(presence(name), Presence::OptionalComputed, "{name}");
        }
        assert_eq!(schema.requires_replace(), vec!["name", "removeanonvolumes", "type"]);
    }

    #[test]
    fn test_valid_config() {
        let mut diags = Diagnostics::new();
        validate(&container_schema(), &mock_container_plan_with_ports("running"), &mut diags);
        assert!(diags.is_empty(), "{diags:?}");
    }

    #[test]
    fn test_rejects_out_of_range_ports() {
        let mut diags = Diagnostics::new();
        let mut config = mock_container_plan("running");
        config.portbindings = Attr::Value(vec![PortBindingModel {
            host: 70000.into(),
            container: 80.into(),
            protocol: "sctp".into(),
            hostip: "0.0.0.0".into(),
            containerip: "0.0.0.0".into(),
        }]);
        validate(&container_schema(), &config, &mut diags);
        assert_eq!(
            errors_at(&diags),
            vec!["portbindings[0].host", "portbindings[0].protocol"]
        );
    }

    #[test]
    fn test_rejects_unknown_restart_policy() {
        let mut diags = Diagnostics::new();
        let mut config = mock_container_plan("running");
        config.restartpolicy = Attr::Value(RestartPolicyModel {
            name: "sometimes".into(),
            maximumretrycount: 5000.into(),
        });
        validate(&container_schema(), &config, &mut diags);
        assert_eq!(
            errors_at(&diags),
            vec!["restartpolicy.name", "restartpolicy.maximumretrycount"]
        );
    }

    #[test]
    fn test_rejects_bad_top_level_values() {
        let mut diags = Diagnostics::new();
        let mut config = mock_container_plan("paused");
        config.name = "-x".into();
        config.networktype = "overlay".into();
        validate(&container_schema(), &config, &mut diags);
        assert_eq!(errors_at(&diags), vec!["name", "status", "networktype"]);
    }

    #[test]
    fn test_identity() {
        let mut model = mock_container_plan("running");
        assert_eq!(ContainerKind.identity(&model), None);
        model.id = "4f2a9c".into();
        assert_eq!(
            ContainerKind.identity(&model),
            Some(Identity::new("4f2a9c", "docker"))
        );
        assert!(ContainerKind.remove_flag(&model));
    }
}

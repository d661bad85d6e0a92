//! `qnap_volume`: a named container volume.

use async_trait::async_trait;
use container_station::{ApiError, ContainerStationApi, NewVolumeSpec, VolumeInfo};
use data_model::{
    schema::patterns,
    Attr,
    Attribute,
    AttributePath,
    Diagnostics,
    PlanModifier,
    Schema,
    Validator,
    VolumeModel,
};

use crate::{
    lifecycle::{AttributeChange, ChangeSet, Identity, ResourceKind},
    mapper::volume as mapper,
    not_found::ObjectKind,
    resources::container::DEFAULT_CONTAINER_TYPE,
};

const INVALID_NAME: &str =
    "Volume name must start with a letter or number. Valid characters: letters (A-Z, a-z), numbers (0-9), hyphen (-), period (.), underscore (_)";

pub fn volume_schema() -> Schema {
    Schema::new("Manages a volume on QNAP Container Station.")
        .attribute(
            "id",
            Attribute::string()
                .computed()
                .description("The ID of the volume.")
                .plan_modifier(PlanModifier::UseStateForUnknown),
        )
        .attribute(
            "type",
            Attribute::string()
                .required()
                .description("The type of the volume.")
                .validator(Validator::OneOf(&["docker"]))
                .plan_modifier(PlanModifier::RequiresReplace),
        )
        .attribute(
            "name",
            Attribute::string()
                .required()
                .description("The name of the volume.")
                .validator(Validator::LengthBetween(1, 64))
                .validator(Validator::RegexMatches(patterns::VOLUME_NAME, INVALID_NAME))
                .plan_modifier(PlanModifier::RequiresReplace),
        )
        .attribute(
            "driver",
            Attribute::string()
                .optional()
                .computed()
                .description("The volume driver.")
                .plan_modifier(PlanModifier::RequiresReplace),
        )
        .attribute(
            "labels",
            Attribute::string_map()
                .optional()
                .computed()
                .description("The labels for the volume.")
                .plan_modifier(PlanModifier::RequiresReplace),
        )
        .attribute(
            "mountpoint",
            Attribute::string()
                .computed()
                .description("Where the volume is mounted on the host."),
        )
        .attribute(
            "created",
            Attribute::string()
                .computed()
                .description("When the volume was created."),
        )
        .attribute(
            "last_updated",
            Attribute::string()
                .computed()
                .description("The last updated timestamp of the volume."),
        )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeKind;

#[async_trait]
impl ResourceKind for VolumeKind {
    type Model = VolumeModel;
    type Request = NewVolumeSpec;
    type Remote = VolumeInfo;

    const TYPE_SUFFIX: &'static str = "_volume";
    const NOUN: &'static str = "volume";
    const OBJECT: ObjectKind = ObjectKind::Volume;

    fn schema(&self) -> Schema {
        volume_schema()
    }

    fn validate_config(&self, schema: &Schema, config: &VolumeModel, diags: &mut Diagnostics) {
        schema.validate_string(&AttributePath::root("type"), &config.kind, diags);
        schema.validate_string(&AttributePath::root("name"), &config.name, diags);
    }

    fn identity(&self, model: &VolumeModel) -> Option<Identity> {
        let id = model.id.value().filter(|id| !id.is_empty())?;
        let kind = model
            .kind
            .value()
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONTAINER_TYPE);
        Some(Identity::new(id.as_str(), kind))
    }

    fn build_request(&self, plan: &VolumeModel, _diags: &mut Diagnostics) -> Option<NewVolumeSpec> {
        Some(mapper::to_request(plan))
    }

    fn apply_response(&self, plan: &VolumeModel, remote: &VolumeInfo) -> VolumeModel {
        mapper::apply_response(plan, remote)
    }

    fn refresh(&self, prior: &VolumeModel, remote: &VolumeInfo) -> VolumeModel {
        mapper::apply_response(prior, remote)
    }

    fn changed_attributes(&self, prior: &VolumeModel, plan: &VolumeModel) -> Vec<AttributeChange> {
        ChangeSet::new()
            .compare("id", &prior.id, &plan.id)
            .compare("type", &prior.kind, &plan.kind)
            .compare("name", &prior.name, &plan.name)
            .compare("driver", &prior.driver, &plan.driver)
            .compare("labels", &prior.labels, &plan.labels)
            .compare("mountpoint", &prior.mountpoint, &plan.mountpoint)
            .compare("created", &prior.created, &plan.created)
            .compare("last_updated", &prior.last_updated, &plan.last_updated)
            .into_fields()
    }

    fn last_updated_mut<'a>(&self, model: &'a mut VolumeModel) -> &'a mut Attr<String> {
        &mut model.last_updated
    }

    async fn create(&self, api: &dyn ContainerStationApi, request: &NewVolumeSpec) -> Result<VolumeInfo, ApiError> {
        api.create_volume(request).await
    }

    async fn inspect(&self, api: &dyn ContainerStationApi, identity: &Identity) -> Result<VolumeInfo, ApiError> {
        api.inspect_volume(&identity.key, &identity.object_type).await
    }

    async fn delete(
        &self,
        api: &dyn ContainerStationApi,
        identity: &Identity,
        _remove_anon_volumes: bool,
    ) -> Result<(), ApiError> {
        api.delete_volume(&identity.key, &identity.object_type).await
    }
}

//! `qnap_app`: a compose application.
//!
//! Container Station cannot change an application in place, so every
//! configurable attribute forces replacement.

use async_trait::async_trait;
use container_station::{ApiError, AppInfo, ContainerStationApi, NewAppRequest};
use data_model::{
    schema::patterns,
    AppModel,
    Attr,
    Attribute,
    AttributePath,
    Diagnostics,
    PlanModifier,
    Schema,
    Validator,
};

use crate::{
    lifecycle::{AttributeChange, ChangeSet, Identity, ResourceKind},
    mapper::{application as mapper, DesiredStatus},
    not_found::ObjectKind,
};

const INVALID_NAME: &str = "Application name must be between 2 and 32 characters, Valid characters: letters (a-z), numbers (0-9), hyphen (-), underscore (_)";

fn replaced(attribute: Attribute) -> Attribute {
    attribute.plan_modifier(PlanModifier::RequiresReplace)
}

fn limit(description: &'static str) -> Attribute {
    replaced(Attribute::int32().optional().computed().description(description))
}

pub fn application_schema() -> Schema {
    Schema::new("Manages a compose application on QNAP Container Station.")
        .attribute(
            "name",
            replaced(
                Attribute::string()
                    .required()
                    .description("The name of the application.")
                    .validator(Validator::LengthBetween(1, 32))
                    .validator(Validator::RegexMatches(patterns::APP_NAME, INVALID_NAME)),
            ),
        )
        .attribute(
            "status",
            replaced(
                Attribute::string()
                    .required()
                    .description(
                        "The state of the application (running, stopped). A change in status recreates the application.",
                    )
                    .validator(Validator::OneOf(&["running", "stopped"])),
            ),
        )
        .attribute(
            "yml",
            replaced(
                Attribute::string()
                    .required()
                    .description("The YAML configuration for the application.")
                    .plan_modifier(PlanModifier::UseStateForUnknown),
            ),
        )
        .attribute(
            "removeanonvolumes",
            replaced(
                Attribute::bool()
                    .required()
                    .description("Whether to remove anonymous volumes when the application is removed.")
                    .plan_modifier(PlanModifier::UseStateForUnknown),
            ),
        )
        .attribute(
            "containers",
            Attribute::list_nested([
                (
                    "id",
                    Attribute::string()
                        .computed()
                        .description("The ID of the container."),
                ),
                (
                    "name",
                    Attribute::string()
                        .computed()
                        .description("The name of the container."),
                ),
            ])
            .computed()
            .description("The list of containers in the application.")
            .plan_modifier(PlanModifier::UseStateForUnknown),
        )
        .attribute(
            "default_url",
            replaced(
                Attribute::single_nested([
                    (
                        "port",
                        Attribute::int32()
                            .optional()
                            .description("The port number for the default URL.")
                            .validator(Validator::Int32Between(0, 65535)),
                    ),
                    (
                        "service",
                        Attribute::string()
                            .optional()
                            .description("The service name for the default URL."),
                    ),
                ])
                .optional()
                .description("The default URL for the application.")
                .plan_modifier(PlanModifier::UseStateForUnknown),
            ),
        )
        .attribute("cpu_limit", limit("The CPU limit for the application."))
        .attribute("mem_limit", limit("The memory limit for the application."))
        .attribute("mem_reservation", limit("The memory reservation for the application."))
        .attribute(
            "last_updated",
            Attribute::string()
                .computed()
                .description("The last updated timestamp of the application."),
        )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationKind;

#[async_trait]
impl ResourceKind for ApplicationKind {
    type Model = AppModel;
    type Request = NewAppRequest;
    type Remote = AppInfo;

    const TYPE_SUFFIX: &'static str = "_app";
    const NOUN: &'static str = "app";
    const OBJECT: ObjectKind = ObjectKind::Application;

    fn schema(&self) -> Schema {
        application_schema()
    }

    fn validate_config(&self, schema: &Schema, config: &AppModel, diags: &mut Diagnostics) {
        schema.validate_string(&AttributePath::root("name"), &config.name, diags);
        schema.validate_string(&AttributePath::root("status"), &config.status, diags);
        if let Some(url) = config.default_url.value() {
            schema.validate_int32(
                &AttributePath::root("default_url").attribute("port"),
                &url.port,
                diags,
            );
        }
    }

    fn identity(&self, model: &AppModel) -> Option<Identity> {
        let name = model.name.value().filter(|name| !name.is_empty())?;
        Some(Identity::new(name.as_str(), ""))
    }

    fn build_request(&self, plan: &AppModel, diags: &mut Diagnostics) -> Option<NewAppRequest> {
        mapper::to_request(plan, diags)
    }

    fn apply_response(&self, plan: &AppModel, remote: &AppInfo) -> AppModel {
        mapper::apply_response(plan, remote)
    }

    fn refresh(&self, prior: &AppModel, remote: &AppInfo) -> AppModel {
        mapper::reconcile(prior, remote)
    }

    fn changed_attributes(&self, prior: &AppModel, plan: &AppModel) -> Vec<AttributeChange> {
        ChangeSet::new()
            .compare("name", &prior.name, &plan.name)
            .compare("yml", &prior.yml, &plan.yml)
            .compare("status", &prior.status, &plan.status)
            .compare("removeanonvolumes", &prior.removeanonvolumes, &plan.removeanonvolumes)
            .compare("default_url", &prior.default_url, &plan.default_url)
            .compare("cpu_limit", &prior.cpu_limit, &plan.cpu_limit)
            .compare("mem_limit", &prior.mem_limit, &plan.mem_limit)
            .compare("mem_reservation", &prior.mem_reservation, &plan.mem_reservation)
            .compare("containers", &prior.containers, &plan.containers)
            .compare("last_updated", &prior.last_updated, &plan.last_updated)
            .into_fields()
    }

    fn remove_flag(&self, state: &AppModel) -> bool {
        state.removeanonvolumes.value().copied().unwrap_or(false)
    }

    fn desired_status(&self, model: &AppModel) -> Option<DesiredStatus> {
        DesiredStatus::from_attr(&model.status)
    }

    fn actual_status<'a>(&self, remote: &'a AppInfo) -> Option<&'a str> {
        Some(remote.status.as_str())
    }

    fn set_status(&self, model: &mut AppModel, status: DesiredStatus) {
        model.status = Attr::Value(status.to_string());
    }

    fn last_updated_mut<'a>(&self, model: &'a mut AppModel) -> &'a mut Attr<String> {
        &mut model.last_updated
    }

    async fn create(&self, api: &dyn ContainerStationApi, request: &NewAppRequest) -> Result<AppInfo, ApiError> {
        api.create_application(request).await
    }

    async fn inspect(&self, api: &dyn ContainerStationApi, identity: &Identity) -> Result<AppInfo, ApiError> {
        api.inspect_application(&identity.key).await
    }

    async fn delete(
        &self,
        api: &dyn ContainerStationApi,
        identity: &Identity,
        remove_anon_volumes: bool,
    ) -> Result<(), ApiError> {
        api.delete_application(&identity.key, remove_anon_volumes).await
    }

    async fn start(&self, api: &dyn ContainerStationApi, identity: &Identity) -> Result<(), ApiError> {
        api.start_application(&identity.key).await
    }

    async fn stop(&self, api: &dyn ContainerStationApi, identity: &Identity) -> Result<(), ApiError> {
        api.stop_application(&identity.key).await
    }
}

#[cfg(test)]
mod tests {
    use data_model::test_objects::tests::{mock_app_plan, TEST_APP_NAME};

    use super::*;

    #[test]
    fn test_every_configurable_attribute_forces_replace() {
        assert_eq!(
            application_schema().requires_replace(),
            vec![
                "cpu_limit",
                "default_url",
                "mem_limit",
                "mem_reservation",
                "name",
                "removeanonvolumes",
                "status",
                "yml",
            ]
        );
    }

    #[test]
    fn test_validate_name() {
        let schema = application_schema();
        let mut diags = Diagnostics::new();
        ApplicationKind.validate_config(&schema, &mock_app_plan(), &mut diags);
        assert!(diags.is_empty(), "{diags:?}");

        let mut config = mock_app_plan();
        config.name = "bad name!".into();
        ApplicationKind.validate_config(&schema, &config, &mut diags);
        assert_eq!(
            diags.errors().next().unwrap().attribute.as_ref().unwrap().to_string(),
            "name"
        );
    }

    #[test]
    fn test_identity_is_the_name() {
        assert_eq!(
            ApplicationKind.identity(&mock_app_plan()),
            Some(Identity::new(TEST_APP_NAME, ""))
        );
        assert!(ApplicationKind.remove_flag(&mock_app_plan()));
    }
}

//! Generic create/read/update/delete engine shared by every resource.
//!
//! A [`ResourceKind`] describes one kind of remote object: how to address
//! it, how to map plan and state to wire types and which API calls move it
//! through its lifecycle. [`Controller`] runs the lifecycle for any kind and
//! turns failures into diagnostics.

use std::fmt;

use async_trait::async_trait;
use container_station::{ApiError, ContainerStationApi};
use data_model::{last_updated_now, Attr, AttributePath, Diagnostics, Presence, Schema, Settle};
use tracing::{debug, info, warn};

use crate::{mapper::DesiredStatus, not_found::ObjectKind, provider::ProviderData};

/// How a remote object is addressed: containers and volumes by id and
/// type, applications by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub key: String,
    pub object_type: String,
}

impl Identity {
    pub fn new(key: impl Into<String>, object_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            object_type: object_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDecision {
    NoChange,
    InPlaceUpdate(Vec<&'static str>),
    Replace(Vec<&'static str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeChange {
    pub name: &'static str,
    /// The configuration no longer sets the attribute.
    pub cleared: bool,
}

/// Attributes whose planned value differs from state.
#[derive(Debug, Default)]
pub struct ChangeSet(Vec<AttributeChange>);

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An unknown planned value is resolved at apply time and never counts.
    pub fn compare<T: PartialEq>(mut self, name: &'static str, prior: &Attr<T>, plan: &Attr<T>) -> Self {
        if !plan.is_unknown() && plan != prior {
            self.0.push(AttributeChange {
                name,
                cleared: plan.is_null(),
            });
        }
        self
    }

    pub fn into_fields(self) -> Vec<AttributeChange> {
        self.0
    }
}

#[async_trait]
pub trait ResourceKind: Send + Sync + 'static {
    type Model: Clone + fmt::Debug + PartialEq + Settle + Send + Sync;
    type Request: Send + Sync;
    type Remote: Send + Sync;

    /// Appended to the provider type name, e.g. `_container`.
    const TYPE_SUFFIX: &'static str;
    /// Used in diagnostics, e.g. "Error creating container".
    const NOUN: &'static str;
    const OBJECT: ObjectKind;

    fn schema(&self) -> Schema;

    /// Checks that go beyond the per-attribute validators of the schema.
    fn validate_config(&self, _schema: &Schema, _config: &Self::Model, _diags: &mut Diagnostics) {}

    fn identity(&self, model: &Self::Model) -> Option<Identity>;

    fn build_request(&self, plan: &Self::Model, diags: &mut Diagnostics) -> Option<Self::Request>;

    /// Request that rebuilds an existing object from `plan`. Kinds that can
    /// only be replaced return `None`.
    fn recreate_request(&self, _plan: &Self::Model, _diags: &mut Diagnostics) -> Option<Self::Request> {
        None
    }

    fn apply_response(&self, plan: &Self::Model, remote: &Self::Remote) -> Self::Model;

    fn refresh(&self, prior: &Self::Model, remote: &Self::Remote) -> Self::Model;

    fn changed_attributes(&self, prior: &Self::Model, plan: &Self::Model) -> Vec<AttributeChange>;

    /// Whether deleting also removes anonymous volumes.
    fn remove_flag(&self, _state: &Self::Model) -> bool {
        false
    }

    fn desired_status(&self, _model: &Self::Model) -> Option<DesiredStatus> {
        None
    }

    fn actual_status<'a>(&self, _remote: &'a Self::Remote) -> Option<&'a str> {
        None
    }

    fn set_status(&self, _model: &mut Self::Model, _status: DesiredStatus) {}

    fn last_updated_mut<'a>(&self, model: &'a mut Self::Model) -> &'a mut Attr<String>;

    async fn create(
        &self,
        api: &dyn ContainerStationApi,
        request: &Self::Request,
    ) -> Result<Self::Remote, ApiError>;

    async fn inspect(
        &self,
        api: &dyn ContainerStationApi,
        identity: &Identity,
    ) -> Result<Self::Remote, ApiError>;

    async fn delete(
        &self,
        api: &dyn ContainerStationApi,
        identity: &Identity,
        remove_anon_volumes: bool,
    ) -> Result<(), ApiError>;

    async fn start(&self, _api: &dyn ContainerStationApi, _identity: &Identity) -> Result<(), ApiError> {
        Ok(())
    }

    async fn stop(&self, _api: &dyn ContainerStationApi, _identity: &Identity) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Decides how `plan` can be reached from `prior`.
///
/// Only attributes the kind reports as changed are considered; computed-only
/// attributes never trigger a change, and neither does clearing an attribute
/// the server fills in when left unset. Any changed attribute marked
/// `RequiresReplace` makes the whole change a replacement.
pub fn plan_change<K: ResourceKind>(
    kind: &K,
    schema: &Schema,
    prior: &K::Model,
    plan: &K::Model,
) -> ChangeDecision {
    let changed: Vec<&'static str> = kind
        .changed_attributes(prior, plan)
        .into_iter()
        .filter(|change| {
            let Some(attribute) = schema.lookup(&AttributePath::root(change.name)) else {
                return true;
            };
            match attribute.presence {
                Presence::Computed => false,
                Presence::OptionalComputed => !change.cleared,
                Presence::Required | Presence::Optional => true,
            }
        })
        .map(|change| change.name)
        .collect();
    if changed.is_empty() {
        return ChangeDecision::NoChange;
    }

    let replace: Vec<&'static str> = changed
        .iter()
        .copied()
        .filter(|name| {
            schema
                .lookup(&AttributePath::root(*name))
                .is_some_and(|attribute| attribute.requires_replace())
        })
        .collect();
    if replace.is_empty() {
        ChangeDecision::InPlaceUpdate(changed)
    } else {
        ChangeDecision::Replace(replace)
    }
}

#[derive(Debug)]
pub struct CreateResponse<M> {
    /// `None` when nothing may be persisted.
    pub state: Option<M>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<M> {
    Present(M),
    /// The object no longer exists; the host drops it from state.
    Removed,
}

#[derive(Debug)]
pub struct ReadResponse<M> {
    pub outcome: ReadOutcome<M>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug)]
pub struct UpdateResponse<M> {
    /// The prior state when the update failed.
    pub state: M,
    pub diagnostics: Diagnostics,
}

#[derive(Debug)]
pub struct DeleteResponse {
    pub diagnostics: Diagnostics,
}

pub struct Controller<K: ResourceKind> {
    kind: K,
    schema: Schema,
    data: Option<ProviderData>,
}

impl<K: ResourceKind> Controller<K> {
    pub fn new(kind: K) -> Self {
        let schema = kind.schema();
        Self {
            kind,
            schema,
            data: None,
        }
    }

    pub fn configure(&mut self, data: ProviderData) {
        self.data = Some(data);
    }

    pub fn type_name(&self, provider_type_name: &str) -> String {
        format!("{provider_type_name}{}", K::TYPE_SUFFIX)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn validate_config(&self, config: &K::Model) -> Diagnostics {
        let mut diags = Diagnostics::new();
        self.kind.validate_config(&self.schema, config, &mut diags);
        diags
    }

    pub fn plan_change(&self, prior: &K::Model, plan: &K::Model) -> ChangeDecision {
        plan_change(&self.kind, &self.schema, prior, plan)
    }

    fn provider_data(&self, diags: &mut Diagnostics) -> Option<&ProviderData> {
        if self.data.is_none() {
            diags.add_error(
                "Unconfigured QNAP client",
                "Expected a configured QNAP client. Please report this issue to the provider developers.",
            );
        }
        self.data.as_ref()
    }

    fn identity(&self, model: &K::Model, diags: &mut Diagnostics) -> Option<Identity> {
        let identity = self.kind.identity(model);
        if identity.is_none() {
            diags.add_error(
                "Missing resource identity",
                format!("The {} state does not identify a remote object.", K::NOUN),
            );
        }
        identity
    }

    /// Stamps `last_updated` and resolves attributes still unknown after
    /// mapping to null.
    fn finish(&self, state: &mut K::Model, diags: &mut Diagnostics) {
        *self.kind.last_updated_mut(state) = Attr::Value(last_updated_now());
        settle(state, diags);
    }

    /// Issues one start or stop. Returns false, with an error diagnostic,
    /// when the call fails.
    async fn transition(
        &self,
        api: &dyn ContainerStationApi,
        identity: &Identity,
        desired: DesiredStatus,
        diags: &mut Diagnostics,
    ) -> bool {
        info!(
            resource = K::NOUN,
            key = %identity.key,
            status = %desired,
            "changing status"
        );
        let (verb, result) = match desired {
            DesiredStatus::Running => ("start", self.kind.start(api, identity).await),
            DesiredStatus::Stopped => ("stop", self.kind.stop(api, identity).await),
        };
        if let Err(err) = result {
            diags.add_error(
                format!("Error change {} state to match requested state", K::NOUN),
                format!("Could not {verb} {}, unexpected error: {err}", K::NOUN),
            );
            return false;
        }
        true
    }

    /// Transitions the object when the remote status differs from the
    /// desired one. The outcome is not re-verified.
    async fn reconcile_status(
        &self,
        api: &dyn ContainerStationApi,
        state: &K::Model,
        desired: Option<DesiredStatus>,
        actual: &str,
        diags: &mut Diagnostics,
    ) -> bool {
        let Some(desired) = desired else {
            return true;
        };
        if desired.satisfied_by(actual) {
            return true;
        }
        let Some(identity) = self.identity(state, diags) else {
            return false;
        };
        self.transition(api, &identity, desired, diags).await
    }

    #[tracing::instrument(skip_all, fields(resource = K::NOUN))]
    pub async fn create(&self, plan: &K::Model) -> CreateResponse<K::Model> {
        let mut diags = self.validate_config(plan);
        let state = self.create_inner(plan, &mut diags).await;
        CreateResponse {
            state,
            diagnostics: diags,
        }
    }

    async fn create_inner(&self, plan: &K::Model, diags: &mut Diagnostics) -> Option<K::Model> {
        if diags.has_error() {
            return None;
        }
        let api = self.provider_data(diags)?.api.clone();
        let request = self.kind.build_request(plan, diags)?;

        let remote = match self.kind.create(api.as_ref(), &request).await {
            Ok(remote) => remote,
            Err(err) => {
                warn!(resource = K::NOUN, "create failed: {err}");
                diags.add_error(
                    format!("Error creating {}", K::NOUN),
                    format!("Could not create {}, unexpected error: {err}", K::NOUN),
                );
                return None;
            }
        };

        let mut state = self.kind.apply_response(plan, &remote);
        let actual = self.kind.actual_status(&remote).unwrap_or_default();
        if !self
            .reconcile_status(api.as_ref(), &state, self.kind.desired_status(plan), actual, diags)
            .await
        {
            return None;
        }
        self.finish(&mut state, diags);
        if let Some(identity) = self.kind.identity(&state) {
            info!(resource = K::NOUN, key = %identity.key, "created");
        }
        Some(state)
    }

    #[tracing::instrument(skip_all, fields(resource = K::NOUN))]
    pub async fn read(&self, prior: &K::Model) -> ReadResponse<K::Model> {
        let mut diags = Diagnostics::new();
        let outcome = self
            .read_inner(prior, &mut diags)
            .await
            .unwrap_or_else(|| ReadOutcome::Present(prior.clone()));
        ReadResponse {
            outcome,
            diagnostics: diags,
        }
    }

    async fn read_inner(&self, prior: &K::Model, diags: &mut Diagnostics) -> Option<ReadOutcome<K::Model>> {
        let data = self.provider_data(diags)?;
        let identity = self.identity(prior, diags)?;

        match self.kind.inspect(data.api.as_ref(), &identity).await {
            Ok(remote) => {
                let mut state = self.kind.refresh(prior, &remote);
                settle(&mut state, diags);
                Some(ReadOutcome::Present(state))
            }
            Err(err) if data.not_found.matches(K::OBJECT, &err) => {
                info!(
                    resource = K::NOUN,
                    key = %identity.key,
                    "remote object is gone, removing from state"
                );
                Some(ReadOutcome::Removed)
            }
            Err(err) => {
                diags.add_error(
                    "Unable to Read Resource",
                    format!("An error occurred while reading the resource: {err}"),
                );
                None
            }
        }
    }

    #[tracing::instrument(skip_all, fields(resource = K::NOUN))]
    pub async fn update(&self, prior: &K::Model, plan: &K::Model) -> UpdateResponse<K::Model> {
        let mut diags = self.validate_config(plan);
        let state = self
            .update_inner(prior, plan, &mut diags)
            .await
            .unwrap_or_else(|| prior.clone());
        UpdateResponse {
            state,
            diagnostics: diags,
        }
    }

    async fn update_inner(
        &self,
        prior: &K::Model,
        plan: &K::Model,
        diags: &mut Diagnostics,
    ) -> Option<K::Model> {
        if diags.has_error() {
            return None;
        }
        let fields = match self.plan_change(prior, plan) {
            ChangeDecision::NoChange => {
                let mut state = prior.clone();
                self.finish(&mut state, diags);
                return Some(state);
            }
            ChangeDecision::Replace(fields) => {
                diags.add_error(
                    "Resource replacement required",
                    format!(
                        "Changing {} requires replacing the {}; plan a destroy and create instead.",
                        fields.join(", "),
                        K::NOUN
                    ),
                );
                return None;
            }
            ChangeDecision::InPlaceUpdate(fields) => fields,
        };
        debug!(resource = K::NOUN, ?fields, "updating in place");

        let api = self.provider_data(diags)?.api.clone();
        let identity = self.identity(prior, diags)?;

        if fields.as_slice() == ["status"] {
            let desired = self.kind.desired_status(plan)?;
            if !self.transition(api.as_ref(), &identity, desired, diags).await {
                return None;
            }
            let mut state = prior.clone();
            self.kind.set_status(&mut state, desired);
            self.finish(&mut state, diags);
            return Some(state);
        }

        let Some(request) = self.kind.recreate_request(plan, diags) else {
            if !diags.has_error() {
                diags.add_error(
                    format!("Error updating {}", K::NOUN),
                    format!("Changing {} in place is not supported.", fields.join(", ")),
                );
            }
            return None;
        };
        let remote = match self.kind.create(api.as_ref(), &request).await {
            Ok(remote) => remote,
            Err(err) => {
                diags.add_error(
                    format!("Error updating {}", K::NOUN),
                    format!("Could not update {}, unexpected error: {err}", K::NOUN),
                );
                return None;
            }
        };

        let mut state = self.kind.apply_response(plan, &remote);
        let actual = self.kind.actual_status(&remote).unwrap_or_default();
        if !self
            .reconcile_status(api.as_ref(), &state, self.kind.desired_status(plan), actual, diags)
            .await
        {
            return None;
        }
        self.finish(&mut state, diags);
        info!(resource = K::NOUN, key = %identity.key, "recreated");
        Some(state)
    }

    /// Deletes the object. The remove-anonymous-volumes flag comes from
    /// state, where it was recorded at create time.
    #[tracing::instrument(skip_all, fields(resource = K::NOUN))]
    pub async fn delete(&self, state: &K::Model) -> DeleteResponse {
        let mut diags = Diagnostics::new();
        self.delete_inner(state, &mut diags).await;
        DeleteResponse { diagnostics: diags }
    }

    async fn delete_inner(&self, state: &K::Model, diags: &mut Diagnostics) -> Option<()> {
        let data = self.provider_data(diags)?;
        let identity = self.identity(state, diags)?;
        let remove = self.kind.remove_flag(state);

        match self.kind.delete(data.api.as_ref(), &identity, remove).await {
            Ok(()) => {
                info!(resource = K::NOUN, key = %identity.key, remove_anon_volumes = remove, "deleted");
            }
            Err(err) if data.not_found.matches(K::OBJECT, &err) => {
                debug!(resource = K::NOUN, key = %identity.key, "already deleted");
            }
            Err(err) => {
                diags.add_error(
                    format!("Error deleting {}", K::NOUN),
                    format!("Could not delete {}, unexpected error: {err}", K::NOUN),
                );
            }
        }
        Some(())
    }
}

fn settle<M: Settle>(state: &mut M, diags: &mut Diagnostics) {
    let mut unresolved = Vec::new();
    state.settle("", &mut unresolved);
    if !unresolved.is_empty() {
        diags.add_warning(
            "Unresolved computed attributes",
            format!(
                "The server did not report a value for {}; they were set to null.",
                unresolved.join(", ")
            ),
        );
    }
}

use container_station::{AppContainer, AppInfo, DefaultUrl, NewAppRequest};
use data_model::{AppContainerModel, AppModel, Attr, AttributePath, DefaultUrlModel, Diagnostics};

use super::{list_value, normalize_status};
use crate::compose;

fn default_url(block: &DefaultUrlModel) -> Option<DefaultUrl> {
    Some(DefaultUrl {
        service: block.service.value()?.clone(),
        port: *block.port.value()?,
    })
}

/// Builds the create request. The compose document is validated and
/// normalized first; an invalid document yields an error diagnostic and no
/// request.
pub fn to_request(plan: &AppModel, diags: &mut Diagnostics) -> Option<NewAppRequest> {
    let yml = match compose::normalize(plan.yml.value().map(String::as_str).unwrap_or_default()) {
        Ok(yml) => yml,
        Err(err) => {
            diags.add_attribute_error(
                AttributePath::root("yml"),
                "error validating and converting YAML to string",
                err.to_string(),
            );
            return None;
        }
    };

    let default_url = plan.default_url.value().and_then(|block| {
        let converted = default_url(block);
        if converted.is_none() {
            diags.add_attribute_warning(
                AttributePath::root("default_url"),
                "missing default url attributes",
                "Both service and port must be set for the default url; it was not sent.",
            );
        }
        converted
    });

    Some(NewAppRequest {
        name: plan.name.known(),
        yml,
        cpu_limit: plan.cpu_limit.value().copied(),
        mem_limit: plan.mem_limit.value().copied(),
        mem_reservation: plan.mem_reservation.value().copied(),
        default_url,
    })
}

fn container_model(container: &AppContainer) -> AppContainerModel {
    AppContainerModel {
        id: container.id.clone().into(),
        name: container.name.clone().into(),
    }
}

/// Keeps the prior value when the server echoes nothing or the same thing.
fn adopt<T: Clone + PartialEq>(prior: &Attr<T>, remote: Option<T>) -> Attr<T> {
    match remote {
        Some(remote) if prior.value() != Some(&remote) => Attr::Value(remote),
        _ => prior.clone(),
    }
}

/// Folds a server view of the application into `prior`.
///
/// `name` and `removeanonvolumes` always come from `prior`. The compose
/// document is only replaced when it differs structurally, so formatting
/// applied by the server never shows up as drift. Limits are always the
/// reported ones, zero meaning unlimited. The container list is rebuilt from
/// the response.
pub fn reconcile(prior: &AppModel, info: &AppInfo) -> AppModel {
    let yml = match prior.yml.value() {
        Some(prior_yml) if info.yml.is_empty() || compose::equivalent(prior_yml, &info.yml) => {
            prior.yml.clone()
        }
        _ if info.yml.is_empty() => prior.yml.clone(),
        _ => Attr::Value(info.yml.clone()),
    };

    let status = if info.status.is_empty() {
        prior.status.clone()
    } else {
        adopt(&prior.status, Some(normalize_status(&info.status).to_string()))
    };

    let default_url = match &info.default_url {
        Some(url) if !url.service.is_empty() => Attr::Value(DefaultUrlModel {
            port: url.port.into(),
            service: url.service.clone().into(),
        }),
        _ => prior.default_url.clone(),
    };

    AppModel {
        name: prior.name.clone(),
        yml,
        status,
        removeanonvolumes: prior.removeanonvolumes.clone(),
        default_url,
        cpu_limit: adopt(&prior.cpu_limit, Some(info.cpu_limit)),
        mem_limit: adopt(&prior.mem_limit, Some(info.mem_limit)),
        mem_reservation: adopt(&prior.mem_reservation, Some(info.mem_reservation)),
        containers: list_value(&info.containers, container_model),
        last_updated: prior.last_updated.clone(),
    }
}

/// State after a create call. `status` and configured limits stay as
/// planned; limits left to the server take the reported value.
pub fn apply_response(plan: &AppModel, info: &AppInfo) -> AppModel {
    let mut state = reconcile(plan, info);
    state.status = plan.status.clone();
    for (attr, planned) in [
        (&mut state.cpu_limit, &plan.cpu_limit),
        (&mut state.mem_limit, &plan.mem_limit),
        (&mut state.mem_reservation, &plan.mem_reservation),
    ] {
        if planned.is_known() {
            *attr = planned.clone();
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use data_model::test_objects::tests::{mock_app_plan, TEST_APP_NAME, TEST_COMPOSE};

    use super::*;

    fn remote(yml: &str) -> AppInfo {
        AppInfo {
            name: TEST_APP_NAME.to_string(),
            yml: yml.to_string(),
            status: "running".to_string(),
            containers: vec![
                AppContainer {
                    id: "c1".to_string(),
                    name: format!("{TEST_APP_NAME}-phppgadmin-1"),
                },
                AppContainer {
                    id: "c2".to_string(),
                    name: format!("{TEST_APP_NAME}-postgres-1"),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_request_from_plan() {
        let mut diags = Diagnostics::new();
        let request = to_request(&mock_app_plan(), &mut diags).unwrap();
        assert!(diags.is_empty());
        assert_eq!(request.name, TEST_APP_NAME);
        assert!(compose::equivalent(&request.yml, TEST_COMPOSE));
        assert_eq!(request.cpu_limit, None);
        assert_eq!(request.default_url, None);
    }

    #[test]
    fn test_invalid_compose_blocks_request() {
        let mut diags = Diagnostics::new();
        let mut plan = mock_app_plan();
        plan.yml = "services:\n  web:\n    image: nginx\n".into();
        assert_eq!(to_request(&plan, &mut diags), None);
        let error = diags.errors().next().unwrap();
        assert_eq!(error.detail, "missing required field: version");
        assert_eq!(error.attribute.as_ref().unwrap().to_string(), "yml");
    }

    #[test]
    fn test_incomplete_default_url_is_omitted() {
        let mut diags = Diagnostics::new();
        let mut plan = mock_app_plan();
        plan.default_url = Attr::Value(DefaultUrlModel {
            port: Attr::Null,
            service: "phppgadmin".into(),
        });
        let request = to_request(&plan, &mut diags).unwrap();
        assert_eq!(request.default_url, None);
        let warning = diags.warnings().next().unwrap();
        assert_eq!(warning.summary, "missing default url attributes");
        assert!(!diags.has_error());
    }

    #[test]
    fn test_reconcile_keeps_equivalent_document() {
        let prior = apply_response(&mock_app_plan(), &remote(TEST_COMPOSE));
        let reformatted = compose::normalize(TEST_COMPOSE).unwrap();
        let state = reconcile(&prior, &remote(&reformatted));

        assert_eq!(state.yml, Attr::Value(TEST_COMPOSE.to_string()));
        assert_eq!(state.name, Attr::Value(TEST_APP_NAME.to_string()));
        assert_eq!(state.removeanonvolumes, Attr::Value(true));
        assert_eq!(state.containers.value().map(Vec::len), Some(2));
    }

    #[test]
    fn test_reconcile_adopts_remote_changes() {
        let prior = apply_response(&mock_app_plan(), &remote(TEST_COMPOSE));
        let changed = "version: '3'\nservices:\n  web:\n    image: nginx\n";
        let mut info = remote(changed);
        info.status = "exited".to_string();
        info.cpu_limit = 2;
        info.containers.truncate(1);
        let state = reconcile(&prior, &info);

        assert_eq!(state.yml, Attr::Value(changed.to_string()));
        assert_eq!(state.status, Attr::Value("stopped".to_string()));
        assert_eq!(state.cpu_limit, Attr::Value(2));
        assert_eq!(state.containers.value().map(Vec::len), Some(1));
    }

    #[test]
    fn test_reconcile_reports_removed_limits() {
        let mut plan = mock_app_plan();
        plan.cpu_limit = 2.into();
        plan.mem_limit = 512.into();
        let mut info = remote(TEST_COMPOSE);
        info.cpu_limit = 2;
        info.mem_limit = 512;
        let prior = apply_response(&plan, &info);
        assert_eq!(prior.cpu_limit, Attr::Value(2));

        // Limits lifted on the NAS show up as drift.
        info.cpu_limit = 0;
        info.mem_limit = 0;
        let state = reconcile(&prior, &info);
        assert_eq!(state.cpu_limit, Attr::Value(0));
        assert_eq!(state.mem_limit, Attr::Value(0));
        assert_eq!(state.mem_reservation, Attr::Value(0));
    }

    #[test]
    fn test_apply_response_keeps_planned_status() {
        let mut info = remote(TEST_COMPOSE);
        info.status = "created".to_string();
        let state = apply_response(&mock_app_plan(), &info);
        assert_eq!(state.status, Attr::Value("running".to_string()));
        assert_eq!(state.cpu_limit, Attr::Value(0));
        assert_eq!(state.containers.value().map(Vec::len), Some(2));
    }
}

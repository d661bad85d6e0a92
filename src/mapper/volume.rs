use container_station::{NewVolumeSpec, VolumeInfo};
use data_model::{Attr, VolumeModel};

use super::string_map;

pub fn to_request(plan: &VolumeModel) -> NewVolumeSpec {
    NewVolumeSpec {
        kind: plan.kind.known(),
        name: plan.name.known(),
        driver: plan.driver.known(),
        labels: string_map(&plan.labels),
    }
}

fn echoed(value: &str, fallback: &Attr<String>) -> Attr<String> {
    if value.is_empty() {
        fallback.clone()
    } else {
        Attr::Value(value.to_string())
    }
}

/// Overlays the server view on `base`. Used after create and on read.
pub fn apply_response(base: &VolumeModel, info: &VolumeInfo) -> VolumeModel {
    VolumeModel {
        id: echoed(&info.id, &base.id),
        kind: echoed(&info.kind, &base.kind),
        name: echoed(&info.name, &base.name),
        driver: echoed(&info.driver, &base.driver),
        labels: info.labels.clone().into(),
        mountpoint: info.mountpoint.clone().into(),
        created: info.created.clone().into(),
        last_updated: base.last_updated.clone(),
    }
}

#[cfg(test)]
mod tests {
    use data_model::test_objects::tests::{mock_volume_plan, TEST_VOLUME_NAME};

    use super::*;

    #[test]
    fn test_volume_round_trip() {
        let plan = mock_volume_plan();
        let request = to_request(&plan);
        assert_eq!(request.name, TEST_VOLUME_NAME);
        assert_eq!(request.driver, "local");
        assert!(request.labels.is_empty());

        let info = VolumeInfo {
            id: TEST_VOLUME_NAME.to_string(),
            kind: request.kind.clone(),
            name: request.name.clone(),
            mountpoint: "/share/Container/volumes/test-volume/_data".to_string(),
            ..Default::default()
        };
        let state = apply_response(&plan, &info);
        assert_eq!(state.id, Attr::Value(TEST_VOLUME_NAME.to_string()));
        assert_eq!(state.driver, Attr::Value("local".to_string()));
        assert_eq!(
            state.mountpoint,
            Attr::Value("/share/Container/volumes/test-volume/_data".to_string())
        );
        assert_eq!(state.created, Attr::Value(String::new()));
        assert_eq!(state.last_updated, Attr::Unknown);
    }
}

pub mod tests {
    use std::collections::BTreeMap;

    use crate::{
        AppModel,
        AppModelBuilder,
        Attr,
        ContainerModel,
        ContainerModelBuilder,
        PortBindingModel,
        VolumeModel,
        VolumeModelBuilder,
    };

    pub const TEST_CONTAINER_NAME: &str = "test-container";
    pub const TEST_IMAGE: &str = "nginx:latest";
    pub const TEST_NETWORK: &str = "eth0";
    pub const TEST_NETWORK_TYPE: &str = "bridge";
    pub const TEST_CONTAINER_TYPE: &str = "docker";
    pub const TEST_APP_NAME: &str = "terraform_test_full_coverage_2";
    pub const TEST_VOLUME_NAME: &str = "test-volume";

    pub const TEST_COMPOSE: &str = "version: '3'
services:
  postgres:
    image: postgres:15.1
    restart: always
    ports:
      - 127.0.0.1:5432:5432
    volumes:
      - postgres_db:/var/lib/postgresql/data
    environment:
      POSTGRES_USER: postgres_qnap_user
      POSTGRES_PASSWORD: postgres_qnap_pwd

  phppgadmin:
    image: qnapsystem/phppgadmin:7.13.0-1
    restart: on-failure
    ports:
      - 7070:80
    depends_on:
      - postgres
    environment:
      PHP_PG_ADMIN_SERVER_HOST: postgres
      PHP_PG_ADMIN_SERVER_PORT: 5432

volumes:
  postgres_db:
";

    /// A container plan as the host hands it over: computed attributes are
    /// unknown, optional attributes left out of the configuration are null.
    pub fn mock_container_plan(status: &str) -> ContainerModel {
        let mut plan = ContainerModelBuilder::default()
            .kind(TEST_CONTAINER_TYPE)
            .name(TEST_CONTAINER_NAME)
            .image(TEST_IMAGE)
            .status(status)
            .removeanonvolumes(true)
            .network(TEST_NETWORK)
            .networktype(TEST_NETWORK_TYPE)
            .build()
            .unwrap();
        plan.id = Attr::Unknown;
        plan.networks = Attr::Unknown;
        plan.last_updated = Attr::Unknown;
        plan
    }

    pub fn mock_container_plan_with_ports(status: &str) -> ContainerModel {
        let mut plan = mock_container_plan(status);
        plan.portbindings = Attr::Value(vec![PortBindingModel {
            host: 8080.into(),
            container: 80.into(),
            protocol: "tcp".into(),
            hostip: "0.0.0.0".into(),
            containerip: "0.0.0.0".into(),
        }]);
        plan.env = Attr::Value(BTreeMap::from([(
            "NGINX_PORT".to_string(),
            "80".to_string(),
        )]));
        plan.cmd = Attr::Value(vec!["nginx".to_string(), "-g".to_string(), "daemon off;".to_string()]);
        plan
    }

    pub fn mock_app_plan() -> AppModel {
        let mut plan = AppModelBuilder::default()
            .name(TEST_APP_NAME)
            .yml(TEST_COMPOSE)
            .status("running")
            .removeanonvolumes(true)
            .build()
            .unwrap();
        plan.cpu_limit = Attr::Unknown;
        plan.mem_limit = Attr::Unknown;
        plan.mem_reservation = Attr::Unknown;
        plan.containers = Attr::Unknown;
        plan.last_updated = Attr::Unknown;
        plan
    }

    pub fn mock_volume_plan() -> VolumeModel {
        let mut plan = VolumeModelBuilder::default()
            .kind(TEST_CONTAINER_TYPE)
            .name(TEST_VOLUME_NAME)
            .driver("local")
            .build()
            .unwrap();
        plan.id = Attr::Unknown;
        plan.mountpoint = Attr::Unknown;
        plan.created = Attr::Unknown;
        plan.last_updated = Attr::Unknown;
        plan
    }
}

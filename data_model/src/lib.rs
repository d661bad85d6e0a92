pub mod application;
pub mod attr;
pub mod container;
pub mod containers;
pub mod diagnostics;
pub mod schema;
pub mod volume;

#[cfg(any(test, feature = "testing"))]
pub mod test_objects;

use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

pub use application::{AppContainerModel, AppModel, AppModelBuilder, DefaultUrlModel};
pub use attr::{Attr, Settle};
pub use container::{
    ContainerModel,
    ContainerModelBuilder,
    CpuPinModel,
    DeviceModel,
    NetworkModel,
    PortBindingModel,
    RestartPolicyModel,
    VolumeMountModel,
};
pub use containers::{ContainerSummaryModel, ContainersDataSourceModel, SummaryPortBindingModel};
pub use diagnostics::{AttributePath, Diagnostic, Diagnostics, Severity};
pub use schema::{Attribute, AttributeType, PlanModifier, Presence, Schema, Validator};
pub use volume::{VolumeModel, VolumeModelBuilder};

// Monday, 02-Jan-06 15:04:05 UTC
const LAST_UPDATED_FORMAT: &[FormatItem<'static>] = format_description!(
    "[weekday], [day]-[month repr:short]-[year repr:last_two] [hour]:[minute]:[second] UTC"
);

/// Timestamp written to `last_updated` after every successful mutation.
pub fn last_updated_now() -> String {
    format_last_updated(OffsetDateTime::now_utc())
}

pub fn format_last_updated(at: OffsetDateTime) -> String {
    at.format(LAST_UPDATED_FORMAT)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_last_updated_format() {
        let at = datetime!(2006-01-02 15:04:05 UTC);
        assert_eq!(format_last_updated(at), "Monday, 02-Jan-06 15:04:05 UTC");
    }
}

pub mod containers;

pub use containers::ContainersDataSource;

mod convention;
mod local;
mod registry;
mod table;
mod topology;

pub use convention::ByConvention;
pub use local::LocalOnly;
pub use registry::ByRegistry;
pub use table::{ByTable, TableRoute};
pub use topology::{ByTopology, EnvironmentPublisher, ProcessEnvironment, RESOURCE_PATHS_ENV, SERVICE_NAME_ENV};

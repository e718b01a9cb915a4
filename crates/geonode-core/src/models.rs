pub mod filters;
pub mod pagination;
pub mod resource;
pub mod service;

pub use filters::{FilterAxis, OrderingField, SearchFilters};
pub use pagination::PaginationInfo;
pub use resource::{
    BoundingBox, BriefResource, Crs, FullDetails, FullResource, ResourceType, Style,
    TemporalExtent,
};
pub use service::{ApiCapability, GeonodeService};

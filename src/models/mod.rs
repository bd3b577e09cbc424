// Domain models: identities, summaries, detail records and the response envelope

mod detail;
mod identity;
mod summary;

pub use detail::{
    ApiResponse, DetailRecord, ErrorBody, ListMeta, PodCount, PodInfo, RelatedList,
    RelatedSection, ReplicaCount, ResponseStatus, SectionContent, SectionError, TypeMeta,
};
pub use identity::{ResourceIdentity, ResourceKind};
pub(crate) use identity::validate_segment;
pub use summary::{
    EventSummary, InvolvedObject, ObjectMetaView, PodPhase, PodSummary, ServicePortSummary,
    ServiceSummary, Summary,
};

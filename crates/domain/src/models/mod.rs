//! Domain model definitions.

pub mod access_request;
pub mod passcode;

pub use access_request::{
    AccessRequest, AccessRequestItem, AccessRequestStatus, ActionResponse,
    CreateAccessRequestRequest, CreateAccessRequestResponse, ListAccessRequestsQuery,
    ListAccessRequestsResponse, NewAccessRequest, Pagination, RequestSummary, DEFAULT_CATEGORY,
};
pub use passcode::Passcode;

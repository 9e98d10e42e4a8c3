/*
Recommend new retail store sites.

Candidates carry a predicted revenue; the selector walks them best first and keeps those
that stay a minimum great-circle distance away from existing stores and from each other.
*/

pub mod error;
pub mod filter;
pub mod geo;
pub mod proximity;
pub mod records;
pub mod selector;
pub mod site;
pub mod summary;

pub use error::{Result, SelectionError};
pub use filter::CandidateFilter;
pub use geo::{distance_miles, GeoPoint, EARTH_RADIUS_MILES};
pub use selector::{
    select, select_explained, Rejection, RejectionReason, Selection, SelectionParameters, Strategy,
};
pub use site::{Attributes, Candidate, ExistingFacility};
pub use summary::SelectionSummary;

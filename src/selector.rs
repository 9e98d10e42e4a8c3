/*
Greedy site selection under exclusion radii.

Candidates are scanned best revenue first and accepted whenever they keep their distance
from every existing store and from every candidate accepted so far. This is a greedy
packing heuristic: a high-revenue pick can crowd out two slightly poorer neighbours
whose combined revenue is larger, and nothing is revisited once accepted.
*/

use std::cmp::Reverse;

use clap::ValueEnum;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;

use crate::error::{Result, SelectionError};
use crate::proximity::{GridIndex, LinearScan, ProximityIndex};
use crate::site::{Candidate, ExistingFacility};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SelectionParameters {
    pub max_count: usize,
    pub min_distance_to_existing_miles: f64,
    pub min_distance_between_selected_miles: f64,
}

impl Default for SelectionParameters {
    fn default() -> Self {
        Self {
            max_count: 5,
            min_distance_to_existing_miles: 2.0,
            min_distance_between_selected_miles: 3.0,
        }
    }
}

impl SelectionParameters {
    pub fn new(
        max_count: usize,
        min_distance_to_existing_miles: f64,
        min_distance_between_selected_miles: f64,
    ) -> Result<Self> {
        let params = Self {
            max_count,
            min_distance_to_existing_miles,
            min_distance_between_selected_miles,
        };
        params.validate()?;
        Ok(params)
    }

    /// Rejects negative or NaN thresholds. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        let thresholds = [
            ("min_distance_to_existing_miles", self.min_distance_to_existing_miles),
            (
                "min_distance_between_selected_miles",
                self.min_distance_between_selected_miles,
            ),
        ];
        for (name, value) in thresholds {
            if !(value >= 0.0) {
                return Err(SelectionError::InvalidParameters(format!(
                    "{} must be a non-negative number of miles, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    InvalidLocation,
    TooCloseToExisting,
    /// Some existing store has no usable location, so no distance to it can be trusted.
    ExistingLocationInvalid,
    TooCloseToSelected,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    /// Position of the candidate in the caller's input slice.
    pub input_index: usize,
    pub reason: RejectionReason,
}

/// Accepted candidates in acceptance order, plus why each scanned candidate was turned down.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection<P> {
    pub selected: Vec<Candidate<P>>,
    pub rejections: Vec<Rejection>,
}

impl<P> Default for Selection<P> {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
            rejections: Vec::new(),
        }
    }
}

/// How exclusion-radius lookups are answered. Both give identical selections.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Compare against every point.
    #[default]
    Linear,
    /// Bucket points into lat/lon cells and only compare nearby ones.
    Grid,
}

impl Strategy {
    pub fn select<P: Clone, I>(
        &self,
        candidates: &[Candidate<P>],
        existing: &[ExistingFacility<I>],
        params: &SelectionParameters,
    ) -> Result<Vec<Candidate<P>>> {
        self.select_explained(candidates, existing, params)
            .map(|selection| selection.selected)
    }

    pub fn select_explained<P: Clone, I>(
        &self,
        candidates: &[Candidate<P>],
        existing: &[ExistingFacility<I>],
        params: &SelectionParameters,
    ) -> Result<Selection<P>> {
        match self {
            Strategy::Linear => select_explained_with::<LinearScan, P, I>(candidates, existing, params),
            Strategy::Grid => select_explained_with::<GridIndex, P, I>(candidates, existing, params),
        }
    }
}

/// Input positions ordered by revenue, highest first. Equal revenues keep input order and NaN
/// revenues go last.
pub fn ranked_order<P>(candidates: &[Candidate<P>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by_key(|&i| {
        let revenue = candidates[i].predicted_revenue;
        (revenue.is_nan(), Reverse(OrderedFloat(revenue)), i)
    });
    order
}

pub fn select<P: Clone, I>(
    candidates: &[Candidate<P>],
    existing: &[ExistingFacility<I>],
    params: &SelectionParameters,
) -> Result<Vec<Candidate<P>>> {
    Strategy::Linear.select(candidates, existing, params)
}

pub fn select_explained<P: Clone, I>(
    candidates: &[Candidate<P>],
    existing: &[ExistingFacility<I>],
    params: &SelectionParameters,
) -> Result<Selection<P>> {
    Strategy::Linear.select_explained(candidates, existing, params)
}

pub fn select_explained_with<X: ProximityIndex, P: Clone, I>(
    candidates: &[Candidate<P>],
    existing: &[ExistingFacility<I>],
    params: &SelectionParameters,
) -> Result<Selection<P>> {
    params.validate()?;
    let mut selection = Selection::default();
    if params.max_count == 0 || candidates.is_empty() {
        return Ok(selection);
    }

    let mut near_existing = X::with_radius(params.min_distance_to_existing_miles);
    let mut invalid_existing = 0;
    for (i, facility) in existing.iter().enumerate() {
        let location = facility.location;
        if !location.is_valid() {
            warn!(
                "Existing store #{} has an invalid location ({}, {}); no candidate can clear it",
                i, location.latitude, location.longitude
            );
            invalid_existing += 1;
            continue;
        }
        near_existing.insert(location);
    }
    let mut near_selected = X::with_radius(params.min_distance_between_selected_miles);

    for index in ranked_order(candidates) {
        if selection.selected.len() == params.max_count {
            break;
        }
        let candidate = &candidates[index];
        let location = &candidate.location;

        let rejected = if !location.is_valid() {
            warn!(
                "Candidate #{} has an invalid location ({}, {}); skipping",
                index, location.latitude, location.longitude
            );
            Some(RejectionReason::InvalidLocation)
        } else if invalid_existing > 0 {
            Some(RejectionReason::ExistingLocationInvalid)
        } else if !near_existing.is_empty() && near_existing.has_point_within(location) {
            Some(RejectionReason::TooCloseToExisting)
        } else if !near_selected.is_empty() && near_selected.has_point_within(location) {
            Some(RejectionReason::TooCloseToSelected)
        } else {
            None
        };

        match rejected {
            Some(reason) => selection.rejections.push(Rejection {
                input_index: index,
                reason,
            }),
            None => {
                debug!(
                    "Accepted candidate #{} at ({:.5}, {:.5}), predicted revenue {:.0}",
                    index, location.latitude, location.longitude, candidate.predicted_revenue
                );
                near_selected.insert(*location);
                selection.selected.push(candidate.clone());
            }
        }
    }

    info!(
        "Selected {} of {} candidates ({} rejected, {} existing stores)",
        selection.selected.len(),
        candidates.len(),
        selection.rejections.len(),
        existing.len()
    );
    Ok(selection)
}

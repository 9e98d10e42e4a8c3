use log::info;

use crate::site::{Attributes, Candidate};

/// Feasibility cut applied before selection. Every bound is inclusive.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateFilter {
    pub min_revenue: Option<f64>,
    pub min_attributes: Vec<(String, f64)>,
}

impl CandidateFilter {
    pub fn min_revenue(mut self, value: f64) -> Self {
        self.min_revenue = Some(value);
        self
    }

    pub fn min_attribute(mut self, name: &str, value: f64) -> Self {
        self.min_attributes.push((name.to_string(), value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min_revenue.is_none() && self.min_attributes.is_empty()
    }

    /// Candidates with a missing or non-numeric attribute never pass an attribute bound.
    pub fn accepts<P: Attributes>(&self, candidate: &Candidate<P>) -> bool {
        if let Some(min) = self.min_revenue {
            if !(candidate.predicted_revenue >= min) {
                return false;
            }
        }
        self.min_attributes.iter().all(|(name, min)| {
            candidate
                .payload
                .numeric(name)
                .map_or(false, |value| value >= *min)
        })
    }

    /// Keeps passing candidates in their original order.
    pub fn apply<P: Attributes>(&self, candidates: Vec<Candidate<P>>) -> Vec<Candidate<P>> {
        if self.is_empty() {
            return candidates;
        }
        let total = candidates.len();
        let kept: Vec<Candidate<P>> = candidates
            .into_iter()
            .filter(|c| self.accepts(c))
            .collect();
        info!("Filters kept {} of {} candidates", kept.len(), total);
        kept
    }
}

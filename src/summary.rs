use std::fmt;

use crate::site::Candidate;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SelectionSummary {
    pub selected: usize,
    pub total_revenue: f64,
    /// None for an empty selection.
    pub average_revenue: Option<f64>,
}

impl SelectionSummary {
    pub fn of<P>(selected: &[Candidate<P>]) -> Self {
        let total_revenue: f64 = selected.iter().map(|c| c.predicted_revenue).sum();
        let average_revenue = if selected.is_empty() {
            None
        } else {
            Some(total_revenue / selected.len() as f64)
        };
        Self {
            selected: selected.len(),
            total_revenue,
            average_revenue,
        }
    }
}

impl fmt::Display for SelectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Locations selected: {}", self.selected)?;
        writeln!(f, "Total predicted revenue: {:.0}", self.total_revenue)?;
        match self.average_revenue {
            Some(avg) => write!(f, "Average revenue per location: {:.0}", avg),
            None => write!(f, "Average revenue per location: n/a"),
        }
    }
}

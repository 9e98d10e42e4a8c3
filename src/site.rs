use crate::geo::GeoPoint;

/// A proposed new site. `payload` rides along untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate<P> {
    pub location: GeoPoint,
    pub predicted_revenue: f64,
    pub payload: P,
}

impl<P> Candidate<P> {
    pub fn new(location: GeoPoint, predicted_revenue: f64, payload: P) -> Self {
        Self {
            location,
            predicted_revenue,
            payload,
        }
    }
}

/// A store already in operation. Only its location matters to selection.
#[derive(Clone, Debug, PartialEq)]
pub struct ExistingFacility<I> {
    pub location: GeoPoint,
    pub identity: I,
}

impl<I> ExistingFacility<I> {
    pub fn new(location: GeoPoint, identity: I) -> Self {
        Self { location, identity }
    }
}

/// Read access to named numeric attributes of a candidate payload.
pub trait Attributes {
    fn numeric(&self, name: &str) -> Option<f64>;
}

impl Attributes for () {
    fn numeric(&self, _name: &str) -> Option<f64> {
        None
    }
}

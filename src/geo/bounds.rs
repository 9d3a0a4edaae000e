/// Width of the longitude domain in degrees.
pub const LNG_EXTENT: f64 = 360.0;

/// Height of the latitude domain in degrees.
pub const LAT_EXTENT: f64 = 180.0;

/// Geographic bounding box of an annotation.
///
/// `start_lat` is the southern edge and `end_lat` the northern edge, so the
/// projected `start` corner sits at the larger tile row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub start_lng: f64,
    pub end_lng: f64,
    pub start_lat: f64,
    pub end_lat: f64,
}

impl GeoBounds {
    pub fn new(start_lng: f64, end_lng: f64, start_lat: f64, end_lat: f64) -> Self {
        Self {
            start_lng,
            end_lng,
            start_lat,
            end_lat,
        }
    }

    /// Whether the box overlaps `[-180, 180] x [-90, 90]` at all.
    ///
    /// Edges are shifted into `[0, 360] x [0, 180]` and compared with strict
    /// inequalities, so a box that only touches the border is outside.
    pub fn intersects_domain(&self) -> bool {
        let lng_lo = self.start_lng.min(self.end_lng) + LNG_EXTENT / 2.0;
        let lng_hi = self.start_lng.max(self.end_lng) + LNG_EXTENT / 2.0;
        let lat_lo = self.start_lat.min(self.end_lat) + LAT_EXTENT / 2.0;
        let lat_hi = self.start_lat.max(self.end_lat) + LAT_EXTENT / 2.0;

        lng_lo < LNG_EXTENT && lng_hi > 0.0 && lat_lo < LAT_EXTENT && lat_hi > 0.0
    }
}

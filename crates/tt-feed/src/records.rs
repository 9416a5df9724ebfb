//! Typed feed records.
//!
//! Every `from_row` returns `None` for a *skippable row defect* (a required
//! identifier, coordinate or sequence that is missing or unparseable). Optional
//! fields never cause a skip; they are substituted with a safe default.

use crate::row::Row;

/// Route type used when `route_type` is absent (3 = bus).
pub const DEFAULT_ROUTE_TYPE: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgencyRecord {
    pub agency_id: Option<String>,
    pub name: String,
    pub url: Option<String>,
    pub timezone: Option<String>,
}

impl AgencyRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            agency_id: row.get_string("agency_id"),
            name: row.get_string("agency_name")?,
            url: row.get_string("agency_url"),
            timezone: row.get_string("agency_timezone"),
        })
    }

    /// Key under which this agency is entered into a run's agency map:
    /// the feed-native id, or the name when the feed omits ids.
    pub fn map_key(&self) -> &str {
        self.agency_id.as_deref().unwrap_or(&self.name)
    }
}

/// Outcome of reading the `route_type` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTypeValue {
    Parsed(i32),
    /// Column absent or blank.
    Missing,
    /// Present but not an integer.
    Invalid,
}

impl RouteTypeValue {
    fn read(row: &Row) -> Self {
        match row.get("route_type") {
            None => RouteTypeValue::Missing,
            Some(raw) => raw
                .parse::<i32>()
                .map(RouteTypeValue::Parsed)
                .unwrap_or(RouteTypeValue::Invalid),
        }
    }

    /// Value written when the route is created.
    pub fn for_insert(&self) -> i32 {
        match self {
            RouteTypeValue::Parsed(v) => *v,
            RouteTypeValue::Missing | RouteTypeValue::Invalid => DEFAULT_ROUTE_TYPE,
        }
    }

    /// Value written when the route already exists. `None` keeps the stored value.
    pub fn for_update(&self) -> Option<i32> {
        match self {
            RouteTypeValue::Parsed(v) => Some(*v),
            RouteTypeValue::Missing => Some(DEFAULT_ROUTE_TYPE),
            RouteTypeValue::Invalid => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub route_id: String,
    pub agency_id: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: RouteTypeValue,
    pub color: Option<String>,
    pub text_color: Option<String>,
}

impl RouteRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            route_id: row.get_string("route_id")?,
            agency_id: row.get_string("agency_id"),
            short_name: row.get_string("route_short_name"),
            long_name: row.get_string("route_long_name"),
            route_type: RouteTypeValue::read(row),
            color: row.get_string("route_color"),
            text_color: row.get_string("route_text_color"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripRecord {
    pub trip_id: String,
    pub route_id: String,
    pub shape_id: String,
}

impl TripRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            trip_id: row.get_string("trip_id")?,
            route_id: row.get_string("route_id")?,
            shape_id: row.get_string("shape_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopTimeRecord {
    pub trip_id: String,
    pub stop_id: String,
}

impl StopTimeRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            trip_id: row.get_string("trip_id")?,
            stop_id: row.get_string("stop_id")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopRecord {
    pub stop_id: String,
    pub parent_station: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl StopRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            stop_id: row.get_string("stop_id")?,
            parent_station: row.get_string("parent_station"),
            lat: parse_coord(row.get("stop_lat")),
            lon: parse_coord(row.get("stop_lon")),
        })
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapePointRecord {
    pub shape_id: String,
    pub sequence: i32,
    pub lat: f64,
    pub lon: f64,
}

impl ShapePointRecord {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            shape_id: row.get_string("shape_id")?,
            sequence: row.get("shape_pt_sequence")?.parse().ok()?,
            lat: parse_coord(row.get("shape_pt_lat"))?,
            lon: parse_coord(row.get("shape_pt_lon"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedInfoRecord {
    pub version: Option<String>,
}

impl FeedInfoRecord {
    pub fn from_row(row: &Row) -> Self {
        Self {
            version: row.get_string("feed_version"),
        }
    }
}

fn parse_coord(raw: Option<&str>) -> Option<f64> {
    raw?.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agency_keyed_by_id_then_name() {
        let with_id = Row::new().with("agency_id", "SL").with("agency_name", "Acme Transit");
        let without_id = Row::new().with("agency_name", "Acme Transit");

        assert_eq!(AgencyRecord::from_row(&with_id).unwrap().map_key(), "SL");
        assert_eq!(
            AgencyRecord::from_row(&without_id).unwrap().map_key(),
            "Acme Transit"
        );
        assert!(AgencyRecord::from_row(&Row::new().with("agency_id", "SL")).is_none());
    }

    #[test]
    fn route_type_missing_defaults_to_bus() {
        let row = Row::new().with("route_id", "R1");
        let r = RouteRecord::from_row(&row).unwrap();
        assert_eq!(r.route_type, RouteTypeValue::Missing);
        assert_eq!(r.route_type.for_insert(), 3);
        assert_eq!(r.route_type.for_update(), Some(3));
    }

    #[test]
    fn invalid_route_type_keeps_prior_value_on_update() {
        let row = Row::new().with("route_id", "R1").with("route_type", "tram");
        let r = RouteRecord::from_row(&row).unwrap();
        assert_eq!(r.route_type, RouteTypeValue::Invalid);
        assert_eq!(r.route_type.for_insert(), DEFAULT_ROUTE_TYPE);
        assert_eq!(r.route_type.for_update(), None);
    }

    #[test]
    fn route_without_id_is_skipped() {
        let row = Row::new().with("route_short_name", "4");
        assert!(RouteRecord::from_row(&row).is_none());
    }

    #[test]
    fn trip_requires_trip_route_and_shape() {
        let full = Row::new()
            .with("trip_id", "T1")
            .with("route_id", "R1")
            .with("shape_id", "S1");
        assert!(TripRecord::from_row(&full).is_some());

        let no_shape = Row::new().with("trip_id", "T1").with("route_id", "R1");
        assert!(TripRecord::from_row(&no_shape).is_none());
    }

    #[test]
    fn shape_point_requires_parseable_coordinates_and_sequence() {
        let ok = Row::new()
            .with("shape_id", "S1")
            .with("shape_pt_lat", "59.33")
            .with("shape_pt_lon", "18.06")
            .with("shape_pt_sequence", "1");
        let p = ShapePointRecord::from_row(&ok).unwrap();
        assert_eq!(p.sequence, 1);
        assert!((p.lat - 59.33).abs() < 1e-9);

        let bad_lat = ok.clone().with("shape_pt_lat", "north");
        assert!(ShapePointRecord::from_row(&bad_lat).is_none());

        let no_seq = Row::new()
            .with("shape_id", "S1")
            .with("shape_pt_lat", "59.33")
            .with("shape_pt_lon", "18.06");
        assert!(ShapePointRecord::from_row(&no_seq).is_none());

        let nan = ok.with("shape_pt_lon", "NaN");
        assert!(ShapePointRecord::from_row(&nan).is_none());
    }

    #[test]
    fn stop_keeps_parent_and_drops_bad_coordinates() {
        let platform = Row::new().with("stop_id", "B").with("parent_station", "P");
        let plain = Row::new().with("stop_id", "A").with("stop_lat", "junk");

        let platform = StopRecord::from_row(&platform).unwrap();
        let plain = StopRecord::from_row(&plain).unwrap();

        assert_eq!(platform.parent_station.as_deref(), Some("P"));
        assert_eq!(plain.parent_station, None);
        assert_eq!(plain.position(), None);
    }
}

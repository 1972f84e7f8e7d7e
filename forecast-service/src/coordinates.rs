use common::errors::AppError;
use std::fmt;
use std::str::FromStr;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Result<Self, AppError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::invalid_input(
                "Coordinates out of valid range: latitude must be -90 to 90, longitude must be -180 to 180",
            ));
        }
        Ok(Self { lat, lng })
    }

    /// Coordinates rounded to one decimal degree.
    ///
    /// A bucket spans roughly 11 km at the equator and narrows toward the poles.
    /// Rounding is half away from zero on the value scaled by ten.
    pub fn bucket(&self) -> (f64, f64) {
        (round_tenth(self.lat), round_tenth(self.lng))
    }
}

fn round_tenth(value: f64) -> f64 {
    // adding 0.0 folds -0.0 into 0.0 so both sides of zero share a bucket
    (value * 10.0).round() / 10.0 + 0.0
}

impl FromStr for Coordinates {
    type Err = AppError;

    /// Parses `"lat,lng"`, tolerating whitespace around each component.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            AppError::invalid_input(format!(
                "Invalid coordinates format. Expected 'lat,lng' but got: {:?}",
                s
            ))
        };

        let mut parts = s.split(',');
        let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

        Self::new(lat, lng)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_pair() {
        let coords: Coordinates = "53.5461,-113.4937".parse().unwrap();
        assert_eq!(coords, Coordinates { lat: 53.5461, lng: -113.4937 });
    }

    #[test]
    fn tolerates_whitespace() {
        let coords: Coordinates = " 42.3601  ,   -71.0589 ".parse().unwrap();
        assert_eq!(coords, Coordinates { lat: 42.3601, lng: -71.0589 });
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["invalid", "", "1", "1,", ",1", "a,b", "1,2,3"] {
            let err = input.parse::<Coordinates>().unwrap_err();
            assert!(
                err.to_string().starts_with("Invalid coordinates format"),
                "{input:?} gave {err}"
            );
        }
    }

    #[test]
    fn rejects_out_of_range() {
        for input in ["91,0", "-90.1,0", "0,181", "0,-180.5", "NaN,0", "inf,0"] {
            let err = input.parse::<Coordinates>().unwrap_err();
            assert!(
                err.to_string().starts_with("Coordinates out of valid range"),
                "{input:?} gave {err}"
            );
        }
    }

    #[test]
    fn accepts_range_boundaries() {
        assert!("90,180".parse::<Coordinates>().is_ok());
        assert!("-90,-180".parse::<Coordinates>().is_ok());
    }

    #[test]
    fn bucket_rounds_to_one_decimal() {
        let coords: Coordinates = "53.5461,-113.4937".parse().unwrap();
        assert_eq!(coords.bucket(), (53.5, -113.5));

        let near: Coordinates = "53.5201,-113.4601".parse().unwrap();
        assert_eq!(near.bucket(), coords.bucket());
    }

    #[test]
    fn bucket_folds_negative_zero() {
        let coords: Coordinates = "-0.04,0.04".parse().unwrap();
        let (lat, lng) = coords.bucket();
        assert_eq!(format!("{lat:.1},{lng:.1}"), "0.0,0.0");
    }

    #[test]
    fn displays_as_lat_lng() {
        let coords = Coordinates::new(42.36, -71.0589).unwrap();
        assert_eq!(coords.to_string(), "42.36,-71.0589");
    }
}

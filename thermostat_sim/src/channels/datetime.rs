// thermostat_sim/src/channels/datetime.rs

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use once_cell::unsync::OnceCell;
use tracing::debug;
use tzf_rs::DefaultFinder;

use crate::error::TimezoneError;

/// Looks up the IANA timezone of a coordinate pair.
///
/// Lookups are assumed to be expensive; [`DateTimeChannel`] makes sure each
/// one happens at most once per location.
pub trait TimezoneResolver {
    fn resolve(&self, latitude: f64, longitude: f64) -> Result<Tz, TimezoneError>;
}

// Building the finder loads the whole timezone polygon set, so it is done once per process.
static FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// Offline resolver backed by the `tzf-rs` polygon data.
#[derive(Debug, Clone, Copy, Default)]
pub struct TzfResolver;

impl TimezoneResolver for TzfResolver {
    fn resolve(&self, latitude: f64, longitude: f64) -> Result<Tz, TimezoneError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(TimezoneError::InvalidCoordinates {
                latitude,
                longitude,
            });
        }

        // tzf takes (longitude, latitude).
        let name = FINDER.get_tz_name(longitude, latitude);
        if name.is_empty() {
            return Err(TimezoneError::NotFound {
                latitude,
                longitude,
            });
        }
        name.parse::<Tz>()
            .map_err(|_| TimezoneError::UnknownZone(name.to_string()))
    }
}

/// The geographic context of a building: its coordinates and the timezone
/// derived from them.
///
/// The timezone is resolved lazily on first access and cached until the
/// location changes.
#[derive(Debug)]
pub struct DateTimeChannel<R = TzfResolver> {
    latitude: Option<f64>,
    longitude: Option<f64>,
    resolver: R,
    timezone: OnceCell<Option<Tz>>,
}

impl DateTimeChannel<TzfResolver> {
    pub fn new(latitude: Option<f64>, longitude: Option<f64>) -> Self {
        Self::with_resolver(latitude, longitude, TzfResolver)
    }
}

impl<R: TimezoneResolver> DateTimeChannel<R> {
    pub fn with_resolver(latitude: Option<f64>, longitude: Option<f64>, resolver: R) -> Self {
        Self {
            latitude,
            longitude,
            resolver,
            timezone: OnceCell::new(),
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Moves the channel. A changed location drops the cached timezone.
    pub fn set_location(&mut self, latitude: Option<f64>, longitude: Option<f64>) {
        if self.latitude != latitude || self.longitude != longitude {
            self.latitude = latitude;
            self.longitude = longitude;
            self.timezone = OnceCell::new();
        }
    }

    /// The timezone at the channel's location, `None` if either coordinate is missing.
    ///
    /// The resolver runs at most once per location; a failed lookup is not
    /// cached and will be retried on the next call.
    pub fn timezone(&self) -> Result<Option<Tz>, TimezoneError> {
        self.timezone
            .get_or_try_init(|| match (self.latitude, self.longitude) {
                (Some(latitude), Some(longitude)) => {
                    let tz = self.resolver.resolve(latitude, longitude)?;
                    debug!(latitude, longitude, timezone = %tz, "resolved timezone");
                    Ok(Some(tz))
                }
                _ => Ok(None),
            })
            .copied()
    }

    /// Converts a UTC instant to the channel's local time.
    pub fn localize(&self, utc: DateTime<Utc>) -> Result<Option<DateTime<Tz>>, TimezoneError> {
        Ok(self.timezone()?.map(|tz| utc.with_timezone(&tz)))
    }
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::{TemperatureUnit, WindSpeedUnit};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current conditions for one place, as returned by a single lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub temperature: f64,
    pub temperature_unit: TemperatureUnit,
    pub wind_speed: f64,
    pub wind_speed_unit: WindSpeedUnit,
    pub weather_code: WeatherCode,
    pub is_day: bool,
    /// Local time at the location (the forecast is requested with `timezone=auto`).
    pub time: NaiveDateTime,
    pub city: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl WeatherRecord {
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }
}

/// One autocomplete candidate from the geocoding API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    /// First-level administrative region (state, province).
    #[serde(default, rename = "admin1", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl SearchResult {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// "Name, Region, Country", skipping the parts that are missing.
    pub fn display_name(&self) -> String {
        std::iter::once(self.name.as_str())
            .chain(self.region.as_deref())
            .chain(self.country.as_deref())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// WMO weather interpretation code.
/// See: https://open-meteo.com/en/docs#weathervariables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum WeatherCode {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    DepositingRimeFog,
    LightDrizzle,
    ModerateDrizzle,
    DenseDrizzle,
    LightFreezingDrizzle,
    DenseFreezingDrizzle,
    SlightRain,
    ModerateRain,
    HeavyRain,
    LightFreezingRain,
    HeavyFreezingRain,
    SlightSnowFall,
    ModerateSnowFall,
    HeavySnowFall,
    SnowGrains,
    SlightRainShowers,
    ModerateRainShowers,
    ViolentRainShowers,
    SlightSnowShowers,
    HeavySnowShowers,
    Thunderstorm,
    ThunderstormSlightHail,
    ThunderstormHeavyHail,
    Unknown(i32),
}

impl WeatherCode {
    pub fn code(self) -> i32 {
        match self {
            Self::ClearSky => 0,
            Self::MainlyClear => 1,
            Self::PartlyCloudy => 2,
            Self::Overcast => 3,
            Self::Fog => 45,
            Self::DepositingRimeFog => 48,
            Self::LightDrizzle => 51,
            Self::ModerateDrizzle => 53,
            Self::DenseDrizzle => 55,
            Self::LightFreezingDrizzle => 56,
            Self::DenseFreezingDrizzle => 57,
            Self::SlightRain => 61,
            Self::ModerateRain => 63,
            Self::HeavyRain => 65,
            Self::LightFreezingRain => 66,
            Self::HeavyFreezingRain => 67,
            Self::SlightSnowFall => 71,
            Self::ModerateSnowFall => 73,
            Self::HeavySnowFall => 75,
            Self::SnowGrains => 77,
            Self::SlightRainShowers => 80,
            Self::ModerateRainShowers => 81,
            Self::ViolentRainShowers => 82,
            Self::SlightSnowShowers => 85,
            Self::HeavySnowShowers => 86,
            Self::Thunderstorm => 95,
            Self::ThunderstormSlightHail => 96,
            Self::ThunderstormHeavyHail => 99,
            Self::Unknown(code) => code,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::ClearSky => "Clear sky",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::DepositingRimeFog => "Depositing rime fog",
            Self::LightDrizzle => "Light drizzle",
            Self::ModerateDrizzle => "Moderate drizzle",
            Self::DenseDrizzle => "Dense drizzle",
            Self::LightFreezingDrizzle => "Light freezing drizzle",
            Self::DenseFreezingDrizzle => "Dense freezing drizzle",
            Self::SlightRain => "Slight rain",
            Self::ModerateRain => "Moderate rain",
            Self::HeavyRain => "Heavy rain",
            Self::LightFreezingRain => "Light freezing rain",
            Self::HeavyFreezingRain => "Heavy freezing rain",
            Self::SlightSnowFall => "Slight snow fall",
            Self::ModerateSnowFall => "Moderate snow fall",
            Self::HeavySnowFall => "Heavy snow fall",
            Self::SnowGrains => "Snow grains",
            Self::SlightRainShowers => "Slight rain showers",
            Self::ModerateRainShowers => "Moderate rain showers",
            Self::ViolentRainShowers => "Violent rain showers",
            Self::SlightSnowShowers => "Slight snow showers",
            Self::HeavySnowShowers => "Heavy snow showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::ThunderstormSlightHail => "Thunderstorm with slight hail",
            Self::ThunderstormHeavyHail => "Thunderstorm with heavy hail",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Icon for the card; clear and mostly clear skies differ between day and night.
    pub fn icon(self, is_day: bool) -> &'static str {
        match self {
            Self::ClearSky if is_day => "☀️",
            Self::ClearSky => "🌙",
            Self::MainlyClear | Self::PartlyCloudy if is_day => "⛅",
            Self::MainlyClear | Self::PartlyCloudy => "☁️",
            Self::Overcast => "☁️",
            Self::Fog | Self::DepositingRimeFog => "🌫️",
            Self::LightDrizzle
            | Self::ModerateDrizzle
            | Self::DenseDrizzle
            | Self::SlightRain
            | Self::ModerateRain
            | Self::HeavyRain
            | Self::SlightRainShowers
            | Self::ModerateRainShowers
            | Self::ViolentRainShowers => "🌧️",
            Self::LightFreezingDrizzle
            | Self::DenseFreezingDrizzle
            | Self::LightFreezingRain
            | Self::HeavyFreezingRain => "🌨️",
            Self::SlightSnowFall
            | Self::ModerateSnowFall
            | Self::HeavySnowFall
            | Self::SnowGrains
            | Self::SlightSnowShowers
            | Self::HeavySnowShowers => "❄️",
            Self::Thunderstorm | Self::ThunderstormSlightHail | Self::ThunderstormHeavyHail => {
                "⛈️"
            }
            Self::Unknown(_) => "❔",
        }
    }
}

impl From<i32> for WeatherCode {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 => Self::Fog,
            48 => Self::DepositingRimeFog,
            51 => Self::LightDrizzle,
            53 => Self::ModerateDrizzle,
            55 => Self::DenseDrizzle,
            56 => Self::LightFreezingDrizzle,
            57 => Self::DenseFreezingDrizzle,
            61 => Self::SlightRain,
            63 => Self::ModerateRain,
            65 => Self::HeavyRain,
            66 => Self::LightFreezingRain,
            67 => Self::HeavyFreezingRain,
            71 => Self::SlightSnowFall,
            73 => Self::ModerateSnowFall,
            75 => Self::HeavySnowFall,
            77 => Self::SnowGrains,
            80 => Self::SlightRainShowers,
            81 => Self::ModerateRainShowers,
            82 => Self::ViolentRainShowers,
            85 => Self::SlightSnowShowers,
            86 => Self::HeavySnowShowers,
            95 => Self::Thunderstorm,
            96 => Self::ThunderstormSlightHail,
            99 => Self::ThunderstormHeavyHail,
            other => Self::Unknown(other),
        }
    }
}

impl From<WeatherCode> for i32 {
    fn from(code: WeatherCode) -> Self {
        code.code()
    }
}

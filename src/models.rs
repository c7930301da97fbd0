use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Outward-facing dates are always `YYYY-MM-DD`.
pub mod ymd {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| NaiveDate::parse_from_str(&raw, super::FORMAT))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    #[serde(with = "ymd")]
    pub created: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Convention {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    #[serde(with = "ymd::option")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DriverTime {
    pub id: i64,
    #[sqlx(rename = "driver")]
    pub driver_id: String,
    #[sqlx(rename = "convention")]
    pub convention_id: i64,
    pub sector1: f64,
    pub sector2: f64,
    pub sector3: f64,
    pub laptime: f64,
}

/// Fastest value per column; every field is `None` when nothing matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BestSectors {
    pub best_sector1: Option<f64>,
    pub best_sector2: Option<f64>,
    pub best_sector3: Option<f64>,
    pub best_laptime: Option<f64>,
}

#[derive(Debug, Clone, Validate)]
pub struct NewDriver {
    #[validate(length(min = 1, message = "Driver id must not be empty"))]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "No valid name given"))]
    pub name: String,
    pub email: Option<String>,
}

impl NewDriver {
    pub fn new(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }
}

#[derive(Debug, Clone, Validate)]
pub struct NewConvention {
    #[validate(length(min = 1, message = "No valid name given"))]
    pub name: String,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
}

impl NewConvention {
    pub fn new(name: &str, location: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            location: location.map(String::from),
            date: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

#[derive(Debug, Clone, Validate)]
pub struct NewDriverTime {
    #[validate(length(min = 1, message = "No valid driver id given"))]
    pub driver_id: String,
    pub convention_id: i64,
    pub sector1: f64,
    pub sector2: f64,
    pub sector3: f64,
    pub laptime: f64,
}

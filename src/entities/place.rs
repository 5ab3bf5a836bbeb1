use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub description: String,
    pub coordinates: Coordinates,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Place {
    pub fn new(description: String, latitude: f64, longitude: f64) -> Self {
        Self {
            description,
            coordinates: Coordinates {
                latitude,
                longitude,
            },
        }
    }
}

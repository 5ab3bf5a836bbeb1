use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub role: Role,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Rider,
    Driver,
}

impl User {
    pub fn new_rider() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Rider,
        }
    }

    pub fn new_driver() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Driver,
        }
    }

    pub fn is_rider(&self) -> bool {
        self.role == Role::Rider
    }

    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }
}

use serde::{Deserialize, Serialize};

use crate::domain::{Owner, Status, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

/// `POST /clients` body. Status is assigned by whoever stores the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub description: String,
    pub price: f64,
}

/// `PATCH /clients/:id` body. The edit form always sends every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPatch {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub status: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub owner: Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: String,
    pub owner: Owner,
    pub status: Status,
}

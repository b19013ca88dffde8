//! Form normalisation and the pure list mutation shared by the remote and
//! offline paths.
//!
//! Request payloads are only ever built from forms here, and offline records
//! are only ever built by [`apply`], so both paths agree on trimming, price
//! coercion, id assignment and default status.

use shared::{
    domain::{Client, Owner, RecordId, Status, Task},
    protocol::{ClientPatch, NewClient, NewTask, TaskPatch},
};

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientForm {
    pub name: String,
    pub description: String,
    pub price: String,
}

impl ClientForm {
    pub fn normalize(&self) -> ClientResult<NewClient> {
        Ok(NewClient {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            price: coerce_price(&self.price)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientEditForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub status: Status,
}

impl ClientEditForm {
    pub fn normalize(&self) -> ClientResult<ClientPatch> {
        Ok(ClientPatch {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            price: coerce_price(&self.price)?,
            status: self.status,
        })
    }
}

impl From<&Client> for ClientEditForm {
    fn from(client: &Client) -> Self {
        Self {
            name: client.name.clone(),
            description: client.description.clone(),
            price: client.price.to_string(),
            status: client.status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub owner: Owner,
}

impl TaskForm {
    pub fn normalize(&self) -> NewTask {
        NewTask {
            title: self.title.trim().to_string(),
            owner: self.owner,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEditForm {
    pub title: String,
    pub owner: Owner,
    pub status: Status,
}

impl TaskEditForm {
    pub fn normalize(&self) -> TaskPatch {
        TaskPatch {
            title: self.title.trim().to_string(),
            owner: self.owner,
            status: self.status,
        }
    }
}

impl From<&Task> for TaskEditForm {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            owner: task.owner,
            status: task.status,
        }
    }
}

/// Empty input counts as zero; anything else must be a finite number.
pub fn coerce_price(raw: &str) -> ClientResult<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(price) if price.is_finite() => Ok(price),
        _ => Err(ClientError::Validation(format!(
            "price must be a number, got '{raw}'"
        ))),
    }
}

/// A list entry that can be created, patched and deleted locally.
pub trait Record: Clone {
    type Fields;
    type Patch;

    fn id(&self) -> &RecordId;
    fn create(id: RecordId, fields: &Self::Fields) -> Self;
    fn patch(&mut self, patch: &Self::Patch);
}

impl Record for Client {
    type Fields = NewClient;
    type Patch = ClientPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn create(id: RecordId, fields: &NewClient) -> Self {
        Self {
            id,
            name: fields.name.clone(),
            description: fields.description.clone(),
            price: fields.price,
            status: Status::Pendiente,
        }
    }

    fn patch(&mut self, patch: &ClientPatch) {
        self.name = patch.name.clone();
        self.description = patch.description.clone();
        self.price = patch.price;
        self.status = patch.status;
    }
}

impl Record for Task {
    type Fields = NewTask;
    type Patch = TaskPatch;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn create(id: RecordId, fields: &NewTask) -> Self {
        Self {
            id,
            title: fields.title.clone(),
            owner: fields.owner,
            status: Status::Pendiente,
        }
    }

    fn patch(&mut self, patch: &TaskPatch) {
        self.title = patch.title.clone();
        self.owner = patch.owner;
        self.status = patch.status;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<R: Record> {
    Create { id: RecordId, fields: R::Fields },
    Update { id: RecordId, patch: R::Patch },
    Delete { id: RecordId },
}

impl<R: Record> Mutation<R> {
    /// A create stamped with the current time in milliseconds.
    pub fn create_now(fields: R::Fields) -> Self {
        Self::Create {
            id: RecordId::Numeric(chrono::Utc::now().timestamp_millis()),
            fields,
        }
    }
}

/// Returns `records` with `mutation` applied. Creates append, updates patch
/// every entry with a matching id, deletes drop them. Unknown ids are a no-op.
pub fn apply<R: Record>(records: &[R], mutation: &Mutation<R>) -> Vec<R> {
    match mutation {
        Mutation::Create { id, fields } => {
            let mut next = records.to_vec();
            next.push(R::create(id.clone(), fields));
            next
        }
        Mutation::Update { id, patch } => records
            .iter()
            .cloned()
            .map(|mut record| {
                if record.id() == id {
                    record.patch(patch);
                }
                record
            })
            .collect(),
        Mutation::Delete { id } => records
            .iter()
            .filter(|record| record.id() != id)
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;

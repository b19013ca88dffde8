use std::sync::Arc;

use shared::{
    domain::{Client, Owner, RecordId, Status, Task, User},
    protocol::LoginRequest,
};
use storage::LocalStore;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    api::ApiClient,
    cache::LocalCache,
    error::{ClientError, ClientResult},
    mutation::{apply, ClientEditForm, ClientForm, Mutation, TaskEditForm, TaskForm},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticating,
    Authenticated(Session),
}

/// Where the current contents of an in-memory list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Remote,
    Snapshot,
    LocalMutation,
}

/// Result of a create/update/delete. `LocalOnly` means the backend write
/// failed and the change exists only in the local copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Synced,
    LocalOnly { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    SessionChanged(SessionState),
    BusyChanged(bool),
    ErrorChanged(Option<String>),
    ClientsUpdated {
        count: usize,
        source: ListSource,
    },
    TasksUpdated {
        owner: Owner,
        count: usize,
        source: ListSource,
    },
}

/// Owns the session, the in-memory client and task lists and the local
/// snapshots behind them. Every remote write is followed by a reload; every
/// failed remote write is applied locally instead.
pub struct SyncController {
    api: ApiClient,
    cache: LocalCache,
    session: SessionState,
    clients: Vec<Client>,
    tasks: Vec<Task>,
    task_owner: Owner,
    busy: bool,
    last_error: Option<String>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SyncController {
    /// Seeds the lists from the local snapshots so something is visible
    /// before the first fetch.
    pub async fn new(api: ApiClient, store: Arc<dyn LocalStore>) -> Self {
        let cache = LocalCache::new(store);
        let task_owner = Owner::default();
        let clients = cache.clients().await;
        let tasks = cache.tasks(task_owner).await;
        let (events, _) = broadcast::channel(256);
        Self {
            api,
            cache,
            session: SessionState::Anonymous,
            clients,
            tasks,
            task_owner,
            busy: false,
            last_error: None,
            events,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn user(&self) -> Option<&User> {
        match &self.session {
            SessionState::Authenticated(session) => Some(&session.user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.session, SessionState::Authenticated(_))
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task_owner(&self) -> Owner {
        self.task_owner
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<()> {
        self.begin_action();
        let previous = self.session.clone();
        self.set_session(SessionState::Authenticating);

        let result = self
            .api
            .login(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await;
        self.set_busy(false);

        match result {
            Ok(response) => {
                if let Err(err) = self.cache.store_token(&response.token).await {
                    warn!(error = %err, "failed to persist session token");
                }
                self.api.set_token(Some(response.token.clone()));
                info!(username = %response.user.username, "logged in");
                self.become_authenticated(Session {
                    token: response.token,
                    user: response.user,
                })
                .await;
                Ok(())
            }
            Err(err) => {
                warn!(username, error = %err, "login failed");
                self.set_session(previous);
                self.set_error(Some(err.banner_message()));
                Err(err)
            }
        }
    }

    /// Revalidates a persisted token. A rejected token is cleared; this never
    /// touches the error banner.
    pub async fn restore_session(&mut self) -> bool {
        let Some(token) = self.cache.token().await else {
            self.set_session(SessionState::Anonymous);
            return false;
        };

        self.api.set_token(Some(token.clone()));
        self.set_session(SessionState::Authenticating);

        match self.api.me().await {
            Ok(user) => {
                info!(username = %user.username, "restored session");
                self.become_authenticated(Session { token, user }).await;
                true
            }
            Err(err) => {
                warn!(
                    error = %err,
                    unauthorized = err.is_unauthorized(),
                    "persisted token rejected; clearing it"
                );
                self.drop_credentials().await;
                false
            }
        }
    }

    /// Forgets the session and empties the in-memory lists. Local snapshots
    /// are kept for the next login.
    pub async fn logout(&mut self) {
        self.drop_credentials().await;
        self.clients.clear();
        self.tasks.clear();
        self.emit(ControllerEvent::ClientsUpdated {
            count: 0,
            source: ListSource::LocalMutation,
        });
        self.emit(ControllerEvent::TasksUpdated {
            owner: self.task_owner,
            count: 0,
            source: ListSource::LocalMutation,
        });
        info!("logged out");
    }

    /// An empty remote list is treated like a failed fetch.
    pub async fn load_clients(&mut self) -> ListSource {
        let source = match self.api.list_clients().await {
            Ok(remote) if !remote.is_empty() => {
                if let Err(err) = self.cache.store_clients(&remote).await {
                    warn!(error = %err, "failed to persist client snapshot");
                }
                self.clients = remote;
                ListSource::Remote
            }
            Ok(_) => {
                debug!("remote client list is empty; using local snapshot");
                self.clients = self.cache.clients().await;
                ListSource::Snapshot
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch clients; using local snapshot");
                self.clients = self.cache.clients().await;
                ListSource::Snapshot
            }
        };
        self.emit(ControllerEvent::ClientsUpdated {
            count: self.clients.len(),
            source,
        });
        source
    }

    /// Loads `owner`'s tasks and makes `owner` the current task filter.
    pub async fn load_tasks(&mut self, owner: Owner) -> ListSource {
        self.task_owner = owner;
        let source = match self.api.list_tasks(owner).await {
            Ok(remote) if !remote.is_empty() => {
                if let Err(err) = self.cache.store_tasks(owner, &remote).await {
                    warn!(%owner, error = %err, "failed to persist task snapshot");
                }
                self.tasks = remote;
                ListSource::Remote
            }
            Ok(_) => {
                debug!(%owner, "remote task list is empty; using local snapshot");
                self.tasks = self.cache.tasks(owner).await;
                ListSource::Snapshot
            }
            Err(err) => {
                warn!(%owner, error = %err, "failed to fetch tasks; using local snapshot");
                self.tasks = self.cache.tasks(owner).await;
                ListSource::Snapshot
            }
        };
        self.emit(ControllerEvent::TasksUpdated {
            owner,
            count: self.tasks.len(),
            source,
        });
        source
    }

    pub async fn set_task_owner(&mut self, owner: Owner) -> ListSource {
        debug!(from = %self.task_owner, to = %owner, "switching task owner");
        self.load_tasks(owner).await
    }

    pub async fn create_client(&mut self, form: &ClientForm) -> ClientResult<MutationOutcome> {
        let fields = form.normalize().map_err(|err| self.reject(err))?;
        self.begin_action();
        let remote = self.api.create_client(&fields).await;
        Ok(self
            .settle_clients(remote, Mutation::create_now(fields))
            .await)
    }

    pub async fn update_client(
        &mut self,
        id: &RecordId,
        form: &ClientEditForm,
    ) -> ClientResult<MutationOutcome> {
        let patch = form.normalize().map_err(|err| self.reject(err))?;
        self.begin_action();
        let remote = self.api.update_client(id, &patch).await;
        Ok(self
            .settle_clients(
                remote,
                Mutation::Update {
                    id: id.clone(),
                    patch,
                },
            )
            .await)
    }

    pub async fn set_client_status(
        &mut self,
        id: &RecordId,
        status: Status,
    ) -> ClientResult<MutationOutcome> {
        let Some(client) = self.clients.iter().find(|client| &client.id == id) else {
            return Err(self.reject(ClientError::Validation(format!("no client with id {id}"))));
        };
        let form = ClientEditForm {
            status,
            ..ClientEditForm::from(client)
        };
        self.update_client(id, &form).await
    }

    pub async fn delete_client(&mut self, id: &RecordId) -> MutationOutcome {
        self.begin_action();
        let remote = self.api.delete_client(id).await;
        self.settle_clients(remote, Mutation::Delete { id: id.clone() })
            .await
    }

    pub async fn create_task(&mut self, form: &TaskForm) -> MutationOutcome {
        let fields = form.normalize();
        self.begin_action();
        let remote = self.api.create_task(&fields).await;
        self.settle_tasks(remote, Mutation::create_now(fields)).await
    }

    pub async fn update_task(&mut self, id: &RecordId, form: &TaskEditForm) -> MutationOutcome {
        let patch = form.normalize();
        self.begin_action();
        let remote = self.api.update_task(id, &patch).await;
        self.settle_tasks(
            remote,
            Mutation::Update {
                id: id.clone(),
                patch,
            },
        )
        .await
    }

    pub async fn set_task_status(
        &mut self,
        id: &RecordId,
        status: Status,
    ) -> ClientResult<MutationOutcome> {
        let Some(task) = self.tasks.iter().find(|task| &task.id == id) else {
            return Err(self.reject(ClientError::Validation(format!("no task with id {id}"))));
        };
        let form = TaskEditForm {
            status,
            ..TaskEditForm::from(task)
        };
        Ok(self.update_task(id, &form).await)
    }

    pub async fn delete_task(&mut self, id: &RecordId) -> MutationOutcome {
        self.begin_action();
        let remote = self.api.delete_task(id).await;
        self.settle_tasks(remote, Mutation::Delete { id: id.clone() })
            .await
    }

    async fn settle_clients(
        &mut self,
        remote: ClientResult<()>,
        mutation: Mutation<Client>,
    ) -> MutationOutcome {
        let outcome = match remote {
            Ok(()) => {
                self.load_clients().await;
                MutationOutcome::Synced
            }
            Err(err) => {
                warn!(error = %err, "client write failed; applying it locally");
                self.clients = apply(&self.clients, &mutation);
                if let Err(store_err) = self.cache.store_clients(&self.clients).await {
                    warn!(error = %store_err, "failed to persist client snapshot");
                }
                self.emit(ControllerEvent::ClientsUpdated {
                    count: self.clients.len(),
                    source: ListSource::LocalMutation,
                });
                self.local_only(&err)
            }
        };
        self.set_busy(false);
        outcome
    }

    /// Offline task changes land in the collection of the current filter.
    async fn settle_tasks(
        &mut self,
        remote: ClientResult<()>,
        mutation: Mutation<Task>,
    ) -> MutationOutcome {
        let owner = self.task_owner;
        let outcome = match remote {
            Ok(()) => {
                self.load_tasks(owner).await;
                MutationOutcome::Synced
            }
            Err(err) => {
                warn!(%owner, error = %err, "task write failed; applying it locally");
                self.tasks = apply(&self.tasks, &mutation);
                if let Err(store_err) = self.cache.store_tasks(owner, &self.tasks).await {
                    warn!(%owner, error = %store_err, "failed to persist task snapshot");
                }
                self.emit(ControllerEvent::TasksUpdated {
                    owner,
                    count: self.tasks.len(),
                    source: ListSource::LocalMutation,
                });
                self.local_only(&err)
            }
        };
        self.set_busy(false);
        outcome
    }

    async fn become_authenticated(&mut self, session: Session) {
        if let Some(owner) = session.user.owner() {
            self.task_owner = owner;
        }
        self.set_session(SessionState::Authenticated(session));
        self.load_clients().await;
        self.load_tasks(self.task_owner).await;
    }

    async fn drop_credentials(&mut self) {
        if let Err(err) = self.cache.clear_token().await {
            warn!(error = %err, "failed to clear persisted token");
        }
        self.api.set_token(None);
        self.set_session(SessionState::Anonymous);
    }

    fn local_only(&mut self, err: &ClientError) -> MutationOutcome {
        let message = err.banner_message();
        self.set_error(Some(message.clone()));
        MutationOutcome::LocalOnly { message }
    }

    fn reject(&mut self, err: ClientError) -> ClientError {
        self.set_error(Some(err.banner_message()));
        err
    }

    fn begin_action(&mut self) {
        self.set_error(None);
        self.set_busy(true);
    }

    fn set_busy(&mut self, busy: bool) {
        if self.busy != busy {
            self.busy = busy;
            self.emit(ControllerEvent::BusyChanged(busy));
        }
    }

    fn set_error(&mut self, error: Option<String>) {
        if self.last_error != error {
            self.last_error = error.clone();
            self.emit(ControllerEvent::ErrorChanged(error));
        }
    }

    fn set_session(&mut self, session: SessionState) {
        if self.session != session {
            self.session = session.clone();
            self.emit(ControllerEvent::SessionChanged(session));
        }
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

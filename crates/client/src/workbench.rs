//! Caller-owned mapping from role to live connection, plus the send/history
//! coupling.

use std::collections::HashMap;

use tokio::sync::watch;

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::history::HistoryStore;
use crate::role::Role;
use crate::session::{Bootstrapper, SessionPhase};
use crate::wire::{MessageRecord, RegistrationExtras};

/// One operator's console state: at most one connection per role, and a
/// persisted history log fed by successful sends.
///
/// Connections are fully independent across roles; each role only ever
/// touches its own map entry and its own history file.
pub struct Workbench {
    bootstrapper: Bootstrapper,
    history: HistoryStore,
    connections: HashMap<Role, Connection>,
}

impl Workbench {
    pub fn new(bootstrapper: Bootstrapper, history: HistoryStore) -> Self {
        Self {
            bootstrapper,
            history,
            connections: HashMap::new(),
        }
    }

    /// Replace any existing handle for `role` wholesale, then bootstrap a
    /// new one.
    pub async fn connect(
        &mut self,
        role: Role,
        otp: &str,
        extras: &RegistrationExtras,
    ) -> Result<()> {
        let (progress, _) = watch::channel(SessionPhase::Idle);
        self.connect_with_progress(role, otp, extras, progress).await
    }

    pub async fn connect_with_progress(
        &mut self,
        role: Role,
        otp: &str,
        extras: &RegistrationExtras,
        progress: watch::Sender<SessionPhase>,
    ) -> Result<()> {
        if let Some(old) = self.connections.remove(&role) {
            old.close().await;
        }
        let connection = self
            .bootstrapper
            .connect_with_progress(role, otp, extras, progress)
            .await?;
        self.connections.insert(role, connection);
        Ok(())
    }

    /// Send one message on `role`'s open connection and append it to the
    /// role's history. No append on any failure.
    pub async fn send(
        &self,
        role: Role,
        request_type: &str,
        data_text: &str,
    ) -> Result<MessageRecord> {
        let connection = self.connections.get(&role).ok_or(ClientError::NotConnected)?;
        let record = connection.send(request_type, data_text).await?;
        self.history.append(role, &record)?;
        Ok(record)
    }

    /// Re-send a past record verbatim, appending it to history again;
    /// `Ok(None)` when `index` is out of bounds.
    pub async fn resend(&self, role: Role, index: usize) -> Result<Option<MessageRecord>> {
        let Some(record) = self.history.get(role, index) else {
            return Ok(None);
        };
        let connection = self.connections.get(&role).ok_or(ClientError::NotConnected)?;
        connection.send_record(&record).await?;
        self.history.append(role, &record)?;
        Ok(Some(record))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Current phase for `role`; `Idle` when no connection was ever made.
    pub fn phase(&self, role: Role) -> SessionPhase {
        self.connections
            .get(&role)
            .map_or(SessionPhase::Idle, Connection::phase)
    }

    pub fn connection(&self, role: Role) -> Option<&Connection> {
        self.connections.get(&role)
    }

    /// Close and discard `role`'s connection; returns whether one existed.
    pub async fn close(&mut self, role: Role) -> bool {
        match self.connections.remove(&role) {
            Some(connection) => {
                connection.close().await;
                true
            }
            None => false,
        }
    }
}

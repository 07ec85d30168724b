//! Admin message manager: contact messages are write-once from the public
//! side, so the admin can only list and delete them.

use super::{Confirmation, ManagerError, Notice};
use crate::gateway::{AccessToken, Gateway};
use crate::models::{ContactMessage, ListQuery, RecordId};

pub struct MessageManager {
    gateway: Gateway,
    token: Option<AccessToken>,
    messages: Vec<ContactMessage>,
    notices: Vec<Notice>,
}

impl MessageManager {
    pub fn new(gateway: Gateway, token: Option<AccessToken>) -> Self {
        Self {
            gateway,
            token,
            messages: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ContactMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<ContactMessage> {
        self.messages
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Newest first; `false` when the fetch failed and the list is empty.
    pub async fn refresh(&mut self) -> bool {
        match self
            .gateway
            .messages
            .list(ListQuery::newest_first(), self.token.as_ref())
            .await
        {
            Ok(messages) => {
                self.messages = messages;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch contact messages");
                self.messages.clear();
                self.notices.push(Notice::error("Failed to fetch messages"));
                false
            }
        }
    }

    pub async fn delete(
        &mut self,
        id: &RecordId,
        confirmation: Confirmation,
    ) -> Result<(), ManagerError> {
        if confirmation != Confirmation::Confirmed {
            return Err(ManagerError::Unconfirmed);
        }

        if let Err(e) = self
            .gateway
            .messages
            .delete(id, self.token.as_ref())
            .await
        {
            tracing::error!(id = %id, error = %e, "failed to delete contact message");
            self.notices.push(Notice::error("Failed to delete message"));
            return Err(ManagerError::Delete(e));
        }

        self.notices
            .push(Notice::success("Message deleted successfully!"));
        self.refresh().await;
        Ok(())
    }
}

// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent operations received over the hub socket.

use std::sync::Arc;

use switchboard_core::{
    AgentOperation, AgentSession, Broadcaster, ConnectionId, PushEvent, SwitchboardError,
};
use tracing::{debug, warn};

use crate::archive::Archiver;
use crate::assignment::AssignmentEngine;
use crate::router::MessageRouter;

/// Maps each [`AgentOperation`] onto the component that performs it.
///
/// Failures are reported to the acting connection as `OperationFailed` and
/// never close the socket.
pub struct OperationDispatcher {
    router: Arc<MessageRouter>,
    assignment: Arc<AssignmentEngine>,
    archiver: Arc<Archiver>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl OperationDispatcher {
    pub fn new(
        router: Arc<MessageRouter>,
        assignment: Arc<AssignmentEngine>,
        archiver: Arc<Archiver>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            router,
            assignment,
            archiver,
            broadcaster,
        }
    }

    /// Decode one text frame and dispatch it.
    pub async fn dispatch_text(&self, connection: &ConnectionId, session: &AgentSession, frame: &str) {
        match serde_json::from_str::<AgentOperation>(frame) {
            Ok(op) => self.dispatch(connection, session, op).await,
            Err(e) => {
                debug!(%connection, error = %e, "undecodable hub frame");
                self.fail(connection, "Unknown", format!("invalid operation: {e}"));
            }
        }
    }

    pub async fn dispatch(&self, connection: &ConnectionId, session: &AgentSession, op: AgentOperation) {
        let kind = op.kind();
        debug!(%connection, user_id = %session.user_id, operation = kind, "hub operation");
        if let Err(e) = self.run(session, op).await {
            warn!(%connection, user_id = %session.user_id, operation = kind, error = %e, "hub operation failed");
            self.fail(connection, kind, e.to_string());
        }
    }

    async fn run(&self, session: &AgentSession, op: AgentOperation) -> Result<(), SwitchboardError> {
        match op {
            AgentOperation::AssignConversationToUser { conversation_id } => {
                self.assignment
                    .claim(&session.company_id, &conversation_id, &session.user_id)
                    .await?;
            }
            AgentOperation::SendMessageToCustomer {
                conversation_id,
                text,
            } => {
                self.router
                    .route_outbound(session, &conversation_id, &text)
                    .await?;
            }
            AgentOperation::CloseAndAnonymizeChat { customer_id } => {
                self.archiver
                    .archive(&session.company_id, &customer_id)
                    .await?;
            }
        }
        Ok(())
    }

    fn fail(&self, connection: &ConnectionId, operation: &str, message: String) {
        self.broadcaster.send_to_connection(
            connection,
            &PushEvent::OperationFailed {
                operation: operation.to_string(),
                message,
            },
        );
    }
}

//! # Factor Server

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use planning_if::{
    factor::{factor_topic, PlanningFactorArray},
    net::{topic_message, zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};

use crate::factor::FactorSink;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Publishes planning factor batches to ground over the factor socket.
pub struct FactorServer {
    socket: MonitoredSocket,

    /// Topic the batches are published under
    topic: String,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FactorServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the factor batch: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the factor batch: {0}")]
    SerializationError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl FactorServer {
    /// Create a new instance of the factor server for the given module.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        module: &str,
    ) -> Result<Self, FactorServerError> {
        // Create the socket options
        // TODO: Move these into a parameter file
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        // Connect the socket
        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.factor_endpoint)
            .map_err(FactorServerError::SocketError)?;

        // Create self
        Ok(Self {
            socket,
            topic: factor_topic(module),
        })
    }
}

impl FactorSink for FactorServer {
    type Error = FactorServerError;

    fn send(&mut self, batch: &PlanningFactorArray) -> Result<(), FactorServerError> {
        // Serialize the batch
        let batch_string =
            serde_json::to_string(batch).map_err(FactorServerError::SerializationError)?;

        // Send the batch under this module's topic
        self.socket
            .send(&topic_message(&self.topic, &batch_string), 0)
            .map_err(FactorServerError::SendError)
    }
}

//! Deployment of app definitions to a remote engine.

mod publisher;
mod transport;

pub use publisher::{DEPLOYED, DeploymentPublisher};
pub use transport::{
    DeploymentRequest, DeploymentResponse, DeploymentTransport, HttpDeploymentTransport,
    TransportError,
};

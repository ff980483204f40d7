//! overlay-services: membership state and the overlay protocols built on it.

pub mod departure;
pub mod directory;
pub mod directory_service;
pub mod negotiation;
pub mod neighbor;
pub mod node;
pub mod registration;
pub mod server;
pub mod transport;

pub use departure::DepartureReport;
pub use directory::{DirectoryRegistry, Outcome};
pub use directory_service::{Directory, DirectoryHandler};
pub use negotiation::{LinkError, LinkNegotiator, UnreachableReason};
pub use neighbor::{Admission, NeighborTable};
pub use node::{JoinOutcome, Node, NodeHandler, NodeOptions, RunningNode, StartupError};
pub use registration::{Registration, RegistrationError};
pub use server::RequestHandler;

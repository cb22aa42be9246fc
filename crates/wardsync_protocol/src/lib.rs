//! # Wardsync Protocol
//!
//! Remote record types and the data source contract for Wardsync.
//!
//! This crate provides:
//! - One record type per remote resource (users, locations, concepts, charts,
//!   patients, observations, orders, forms)
//! - [`RemoteSource`], the blocking "list everything" contract each sync
//!   phase fetches through
//! - [`MemoryRemote`], a snapshot-backed source with failure injection
//!
//! The wire format of the real server is out of scope; a source only has to
//! hand back complete record sets.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod model;
mod remote;

pub use error::{RemoteError, RemoteResult};
pub use memory::{MemoryRemote, RemoteSnapshot};
pub use model::{
    ChartSection, ObservationPage, RemoteChart, RemoteConcept, RemoteEncounter, RemoteForm,
    RemoteLocation, RemoteOrder, RemotePatient, RemotePatientRecord, RemoteUser,
    ORDER_EXECUTED_CONCEPT_UUID,
};
pub use remote::{RemoteSource, Resource};

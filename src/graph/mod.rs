//! Resource graph data model.
//!
//! Adapters emit [`ResourceDescriptor`]s; the normalizer turns them into
//! [`Node`]s; resolvers emit [`Edge`]s; the assembler produces a [`Graph`].

pub mod descriptor;
pub mod model;

pub use descriptor::{
    AdapterOutput, ConfigKind, ConfigRef, IngressBackendRef, RawReference, ReferenceKind,
    ReferenceTarget, ResourceAddress, ResourceDescriptor, ResourceHints, SourceKind,
};
pub use model::{Edge, EdgeReason, Graph, Node};

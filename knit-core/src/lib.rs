//! Knit Core - graph assembly engine.
//!
//! Turns flat lists of semantically tagged nodes, each carrying attributes and
//! forward relationship references, into linked graphs and exports them in
//! forms downstream stores can load.
//!
//! # Features
//!
//! - **Strategy dispatch**: builders register under strategy names; `auto`
//!   lets each builder score the input and picks the most confident one
//! - **Linking**: forward edges plus synthesized reverse edges
//!   (`hasParent` -> `hasChild`, ...)
//! - **Symbol resolution**: code import metadata becomes `imports` edges to
//!   the file or symbol node
//! - **Cypher export**: idempotent `MERGE` statements
//! - **Timelines and vector payloads** for media segments and text chunks
//! - **Parallel batches** using Rayon
//!
//! # Usage
//!
//! ```no_run
//! use knit_core::{Assembler, AssemblyOutput};
//! use serde_json::json;
//!
//! let payload = json!({
//!     "nodes": [
//!         {"id": "chunk-1", "class": "knit:Chunk", "relationships": {"knit:hasParent": "topic-1"}},
//!         {"id": "topic-1", "class": "knit:Topic"}
//!     ]
//! });
//!
//! let assembly = Assembler::new().run(&payload, "auto")?;
//! if let AssemblyOutput::Graph(graph) = &assembly.output {
//!     println!("{} edges", graph.edges.len());
//! }
//! # Ok::<(), knit_core::AssemblyError>(())
//! ```

pub mod assembler;
pub mod builders;
pub mod diagnostics;
pub mod embedder;
pub mod error;
pub mod model;
pub mod ontology;
pub mod registry;

pub use assembler::{Assembler, Assembly, AssemblySummary};
pub use builders::{AssemblyOutput, Builder, Built, VectorPayload};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use embedder::{EmbedError, Embedder};
pub use error::{AssemblyError, Result};
pub use model::{Dataset, Edge, Graph, GraphExport, GraphNode, GraphStats, Node};
pub use registry::{BuilderRegistry, Candidate, AUTO};

#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/collection_flow.rs"]
mod collection_flow;

#[path = "integration/ingest_failures.rs"]
mod ingest_failures;

#[path = "integration/artifacts.rs"]
mod artifacts;

#[path = "integration/controller.rs"]
mod controller;

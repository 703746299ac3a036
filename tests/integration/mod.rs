//! Integration Tests Module
//!
//! End-to-end tests of the analysis pipeline against scripted provider
//! transports. No test touches the network.

// Scripted LLM transport shared by the tests below
mod support;

// Reply-to-result scenarios
mod scenarios_test;

// Orchestrator properties: timeout, cancellation, policies, determinism
mod pipeline_test;

//! SkyGuard CLI - scripted scenarios for the command pipeline.
//!
//! Binaries:
//! - demo_scenario: walks every pipeline path and prints the resulting state

pub mod scenarios;

pub use scenarios::{create_authorization_tour, DemoExecutor, Expectation, Scenario, ScenarioStep};

// src/lib.rs

// 1. Data Structures (The "Nouns")
// explicit 'pub' makes them available to main.rs
pub mod models;

// 2. Interfaces (The "Contract")
pub mod traits;

// 3. Adapters (The "Plumbing")
pub mod connectors;

// 4. Option Math (The "Pricer")
pub mod pricing;

// 5. Business Logic (The "Brains")
pub mod strategy;

// 6. Day-by-Day Driver (The "Simulator")
pub mod simulation;

// 7. Batch Evaluation (The "Orchestrator")
pub mod backtest;

// 8. Configuration
pub mod config;

// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of matrix expansion, naming and image promotion that must hold
//! for every valid input.

mod topology_properties;

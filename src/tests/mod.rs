// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod support;
pub mod scenario_tests;

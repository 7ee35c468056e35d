// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Integration Tests for Camlink Core
//!
//! These tests drive the batch dispatcher end to end against the mock HTTP
//! backend: login, batching, encryption, redirects and binary replies.
//!
//! Run with: cargo test --test integration

#[path = "../common/mod.rs"]
mod common;

mod batch_workflow_test;
mod login_workflow_test;
mod redirect_workflow_test;

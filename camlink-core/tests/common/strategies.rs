// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Proptest Strategies
//!
//! Reusable proptest strategies for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use camlink_core::Request;

/// Command names drawn from a small pool so batches contain duplicates.
pub fn command_name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["GetTime", "GetChannelstatus", "GetDevInfo", "GetEnc", "GetOsd"])
        .prop_map(str::to_string)
}

/// Flat parameter maps with integer and string values.
pub fn params_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        "[a-z]{1,8}",
        prop_oneof![
            any::<i32>().prop_map(Value::from),
            "[a-zA-Z0-9 ]{0,12}".prop_map(Value::from),
        ],
        0..4,
    )
    .prop_map(|m| m.into_iter().collect())
}

/// A request with a random command, parameters and response detail.
pub fn request_strategy() -> impl Strategy<Value = Request> {
    (command_name_strategy(), params_strategy(), any::<bool>()).prop_map(
        |(cmd, params, detailed)| {
            let request = Request::new(cmd).with_params(params);
            if detailed {
                request.detailed()
            } else {
                request
            }
        },
    )
}

/// Non-empty batches of up to eight requests.
pub fn batch_strategy() -> impl Strategy<Value = Vec<Request>> {
    prop::collection::vec(request_strategy(), 1..8)
}

/// Arbitrary 16-byte keys.
pub fn key_strategy() -> impl Strategy<Value = [u8; 16]> {
    any::<[u8; 16]>()
}

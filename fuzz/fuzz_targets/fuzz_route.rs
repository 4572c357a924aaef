// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for request parsing and strategy routing

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use satchel_core::request::cache_key;
use satchel_core::{Method, Request};
use satchel_worker::{RouteTable, Router, Strategy};
use url::Url;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    method: &'a str,
    url: &'a str,
    accept: Option<&'a str>,
}

fuzz_target!(|input: Input<'_>| {
    let table = RouteTable::default();

    // Classification is total and deterministic
    let first = table.classify(input.url, input.accept);
    assert_eq!(first, table.classify(input.url, input.accept));

    let Ok(url) = Url::parse(input.url) else {
        return;
    };
    let _ = cache_key(&url);

    let mut request = Request::new(input.method.parse().unwrap_or(Method::Get), url.clone());
    if let Some(accept) = input.accept {
        request = request.with_header("Accept", accept);
    }

    // Opaque origins never equal themselves, so those pass through too
    let opaque = !url.origin().is_tuple();
    let router = Router::new(url, table);
    match router.intercept(&request) {
        None => assert!(!request.is_get() || opaque),
        Some(Strategy::StaleWhileRevalidate) => assert!(request.accepts_html()),
        Some(_) => {}
    }
});

//! Named tests known to the harness

use pane_webview::BackendKind;

use crate::scenarios;

/// A named entry point
#[derive(Debug, Clone, Copy)]
pub struct TestCase {
    pub name: &'static str,
    pub run: fn(BackendKind) -> anyhow::Result<()>,
}

/// Every test, in the order the all-tests runner executes them
pub const TESTS: &[TestCase] = &[
    TestCase {
        name: "terminate",
        run: scenarios::terminate,
    },
    TestCase {
        name: "c_api",
        run: scenarios::c_api,
    },
    TestCase {
        name: "bidir_comms",
        run: scenarios::bidir_comms,
    },
];

pub fn find(name: &str) -> Option<&'static TestCase> {
    TESTS.iter().find(|test| test.name == name)
}

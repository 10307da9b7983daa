//! Suites built into the `ctq` binary.

mod demo;
mod unittests;

use casetree::StaticLoader;

/// A loader holding every built-in suite.
pub fn builtin_loader() -> StaticLoader {
    let mut loader = StaticLoader::new();
    demo::register(&mut loader);
    unittests::register(&mut loader);
    loader
}

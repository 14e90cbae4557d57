pub mod branch;
pub mod definition;
pub mod flatten;
pub mod hooks;
pub mod names;
pub mod progress;
pub mod spec;
pub mod store;
#[cfg(test)]
pub(crate) mod test_support;
pub mod wizard;

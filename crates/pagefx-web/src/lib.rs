#![forbid(unsafe_code)]

//! Browser binding for the pagefx effect core.
//!
//! JavaScript calls [`attach`] once per page (optionally with a JSON config
//! override). From then on the binding owns the listeners, the
//! `IntersectionObserver`s, one `setTimeout` for the earliest pending deadline
//! and at most one outstanding `requestAnimationFrame`.

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::attach;

// Runner core is used by the wasm module and by native tests.
#[cfg(any(target_arch = "wasm32", test))]
mod runner_core;

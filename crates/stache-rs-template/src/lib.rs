//! # stache-rs-template
//!
//! A Mustache template engine that compiles a template once into a tree of
//! segments and executes that tree many times, concurrently if desired,
//! against arbitrary data.
//!
//! ```
//! use stache_rs_template::compiler::Compiler;
//! use stache_rs_template::value::Value;
//!
//! let template = Compiler::default()
//!     .compile("Hello {{name}}!{{#items}} {{.}}{{/items}}")
//!     .unwrap();
//!
//! let data = Value::from(serde_json::json!({
//!     "name": "World",
//!     "items": ["a", "b"],
//! }));
//! assert_eq!(template.execute(data).unwrap(), "Hello World! a b");
//! ```
//!
//! ## Modules
//!
//! - [`compiler`] - Compiler configuration and the `compile` entry point
//! - [`template`] - Compiled templates, fragments, and visitors
//! - [`value`] - The dynamic value model and host object capability
//! - [`collector`] - Variable fetchers, the fetcher cache, and collectors
//! - [`escape`] - Output escaping
//! - [`delims`] - Tag delimiters
//! - [`loaders`] - Partial template loaders

pub mod collector;
pub mod compiler;
pub mod context;
pub mod delims;
pub mod escape;
pub mod loaders;
pub mod parser;
pub mod segment;
pub mod template;
pub mod value;

pub use compiler::Compiler;
pub use template::{Fragment, Template, Visitor};
pub use value::{Lambda, Object, ToValue, Value};

//! Request and response rewriting.
//!
//! Turns `/{key}/{encoded target}` paths into absolute target URLs and turns
//! references found in upstream responses back into proxy paths.

pub mod context;
pub mod encoding;
pub mod html;
pub mod redirect;
pub mod target;

pub use context::RewriteContext;
pub use html::{HtmlRewrite, is_html, rewrite_html};
pub use redirect::{is_redirect, rewrite_location};
pub use target::{ResolvedTarget, TargetResolver};

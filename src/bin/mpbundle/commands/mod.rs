//! Command implementations

pub mod assemble;
pub mod assets;
pub mod completions;
pub mod entries;
pub mod explain;
pub mod plan;

use mpbundle::util::diagnostic::{self, Diagnostic};
use mpbundle::GlobalContext;

/// Print recovered errors and the closing warning count.
pub fn report(diagnostics: &[Diagnostic], ctx: &GlobalContext) {
    let warnings = diagnostic::emit_all(diagnostics, ctx.color());
    if warnings > 0 {
        eprintln!("{} warning(s)", warnings);
    }
}

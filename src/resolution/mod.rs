/// Expression resolution and call linking.
///
/// [`ExprResolver`] reduces syntax nodes to canonical type strings while a
/// unit is walked; [`CallLinker`] runs after all units are merged and turns
/// call sites into inbound/outbound edges.
mod expr;
mod linker;

pub use expr::ExprResolver;
pub use linker::CallLinker;

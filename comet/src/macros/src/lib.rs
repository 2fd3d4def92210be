mod lifecycle;

use proc_macro::TokenStream;

/// Implements `comet::core::Lifecycle` for a system type.
///
/// The hooks the type implements are listed in a `#[lifecycle(...)]` attribute. Each listed hook
/// must have a matching trait impl (`OnInit`, `OnStart`, `OnRender`, `OnHeartbeat`, `OnEnd`).
#[proc_macro_derive(Lifecycle, attributes(lifecycle))]
pub fn derive_lifecycle(item: TokenStream) -> TokenStream {
    lifecycle::derive_lifecycle(item)
}

//! Procedural macros for graphloop: `#[derive(State)]`, `#[derive(RouteLabel)]`
//! and `#[tools(...)]`.

use proc_macro::TokenStream;

mod route;
mod state;
mod tools;

/// Exposes methods of an impl block as tools.
///
/// ```ignore
/// #[tools(add = "Adds two numbers", save = "Saves the document")]
/// impl Calculator {
///     async fn add(&self, params: AddParams) -> Result<f64, ToolError> { .. }
///     async fn save(&self, params: SaveParams, memory: &mut ToolMemory) -> String { .. }
/// }
/// ```
///
/// Each listed method gets a wrapper struct named after the type and method
/// (`CalculatorAdd`, `CalculatorSave`) implementing `ToolFunction`.
#[proc_macro_attribute]
pub fn tools(attr: TokenStream, item: TokenStream) -> TokenStream {
    tools::tools_impl(attr, item)
}

/// Derives `GraphState` and, with a `#[messages]` field, `MessageState`.
///
/// Fields take `#[update(replace)]` (default), `#[update(append)]` for
/// sequences, or `#[update(merge)]` for types implementing `MergeField`.
#[proc_macro_derive(State, attributes(update, messages, tool_memory))]
pub fn derive_state(input: TokenStream) -> TokenStream {
    state::derive_state_impl(input)
}

/// Makes a fieldless enum a closed label set for conditional edges.
///
/// The enum also needs `Clone`, `PartialEq`, `Eq`, `Hash` and `Debug`.
/// `build()` then rejects a path map that leaves a variant unmapped.
#[proc_macro_derive(RouteLabel)]
pub fn derive_route_label(input: TokenStream) -> TokenStream {
    route::derive_route_label_impl(input)
}

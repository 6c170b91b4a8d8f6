/*!
The model layer: the arena ([`types`]), ancestry/LCA/classification ([`ancestry`]), the fluent
construction API ([`handles`]) and the bootstrap compiler ([`bootstrap`]). Everything under
`model` is `pub(crate)` — applications only ever see the handle types re-exported at the crate
root.
*/

pub(crate) mod ancestry;
pub(crate) mod bootstrap;
pub(crate) mod handles;
pub(crate) mod types;

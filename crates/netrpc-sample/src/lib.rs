//! # netrpc-sample
//!
//! A lobby with one procedure of each kind, plus a user-defined payload type
//! (`math::Vec3`) carried by its own serializer pair.
//!
//! Everything callable over the network is generated by `build.rs`:
//! `Lobby::call_rpc_*` senders and `rpc_dispatch_table()`.

pub mod lobby;
pub mod math;

netrpc::include_rpcs!();

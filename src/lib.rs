//! pumpwatch - spot-market pump scanner with an escalating alert ladder
//!
//! The scanning core lives in [`pipeline`]; the binaries under `src/bin/`
//! wire it to Gate.io, Telegram and a SQLite signal log.

pub mod pipeline;

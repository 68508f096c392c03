// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Hierarchically aggregated, exponentially decayed load statistics.

pub mod counter;
pub mod face;
pub mod index;
pub mod node;

pub use counter::{DecayedCounter, SmoothedTriple};
pub use face::{satisfaction_ratio, FaceLoadStats};
pub use index::StatsIndex;
pub use node::StatsNode;

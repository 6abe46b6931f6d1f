// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod history;
pub mod model;
pub mod schedule;
pub mod state;
pub mod timer;
pub mod viewer;
pub mod watch;

pub use history::*;
pub use model::*;
pub use schedule::*;
pub use state::*;
pub use timer::*;
pub use viewer::*;
pub use watch::*;

pub mod action;
pub mod agent;
mod behavior;
pub mod config;
pub mod grid;
pub mod mapdata;
pub mod types;
pub mod world;

pub use action::{ActionError, Clip, Dispatcher, EventLoop, Job, JobKind};
pub use agent::{Agent, Body, Route};
pub use config::{ConfigError, PathAlgorithm, Settings, ViewCone};
pub use grid::{Cell, CellKind, GridError, GridMap, draw_map_diag};
pub use mapdata::{FieldError, MapData, MapDataError, NpcSpec};
pub use types::*;
pub use world::{Command, World};

//! # soundnav-core
//!
//! Streams values derived from tracked transforms (position, distance,
//! orientation) and breach-warning distances to a sound-synthesis server over
//! Open Sound Control.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use soundnav_core::config::Config;
//! use soundnav_core::connection::ConnectionManager;
//! use soundnav_core::scene::TransformScene;
//!
//! let config = Config::load();
//! let mut scene = TransformScene::new();
//! let tool = scene.add_transform("Tool", Matrix4::IDENTITY);
//! let table = config.instrument_table(|name| scene.find(name))?;
//!
//! let mut manager = ConnectionManager::udp(scene);
//! manager.connect(&config.endpoint())?;
//! manager.start_transmission(&table, config.address_root())?;
//!
//! // The host reports changes; the manager sends the instrument's values.
//! for token in manager.host_mut().set_matrix(tool, moved)? {
//!     manager.handle_notification(token);
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`osc`]: OSC encoding (`rosc`) and the UDP client behind the `Connector` seam
//! - [`mapping`]: instrument table and `/<root>/<instrument>/<parameter>` addresses
//! - [`geometry`]: 4x4 matrices, relative transforms, Euler and axis-angle orientation
//! - [`scene`]: the `SceneHost` seam and the in-memory `TransformScene`
//! - [`dispatch`]: per-instrument observers and message generation
//! - [`connection`]: Disconnected / Connected / Streaming lifecycle
//! - [`pure_data`]: Pure Data server process launcher
//! - [`settings`]: persisted named settings
//! - [`config`]: TOML configuration (embedded + user override)

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod mapping;
pub mod osc;
pub mod paths;
pub mod pure_data;
pub mod scene;
pub mod settings;

pub use connection::ConnectionManager;
pub use error::{Result, SoundNavError};
pub use soundnav_types as types;

pub mod campaign;
pub mod entity;
pub mod error;
pub mod grid;
pub mod layout;
pub mod level;
pub mod reader;
pub mod registry;
pub mod scenario;
pub mod store;
pub mod summary;
pub mod tile;

pub use campaign::{CampaignData, CampaignPackages, DirPackages};
pub use entity::{EntityCollections, EntityFactory, EntityId, Order, StandardFactory};
pub use error::{CoreError, CoreErrorCode};
pub use grid::Grid;
pub use level::Level;
pub use store::{DirStore, LevelStore, MemoryStore};

//! Data models for AquaFeed resources.
//!
//! One file per resource family, mirroring the backend's response shapes:
//!
//! - `UserProfile`, `TokenPair`: accounts and credentials
//! - `Company`: tenants owning everything below
//! - `Aquarium`, `Fish`: tank inventory
//! - `Device`: physical IoT feeders
//! - `FeedingSchedule`: per-aquarium feeding plans
//! - `Role`: per-company permission sets

pub mod aquarium;
pub mod company;
pub mod device;
pub mod feeding;
pub mod role;
pub mod user;

pub use aquarium::{Aquarium, AquariumCreate, AquariumUpdate, Fish, FishCreate, FishUpdate};
pub use company::{Company, CompanyCreate, CompanyUpdate};
pub use device::{Device, DeviceCreate, DeviceUpdate};
pub use feeding::{FeedingSchedule, FeedingScheduleCreate, FeedingScheduleUpdate};
pub use role::{Role, RoleCreate, RoleUpdate};
pub use user::{ProfileUpdate, RegisterResponse, TokenPair, UserProfile};

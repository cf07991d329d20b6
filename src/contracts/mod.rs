// Contracts Module - Public ABIs Only

pub mod profile_registry;

pub use profile_registry::{get_profile_level_function, GET_PROFILE_LEVEL, PROFILE_REGISTRY_ABI};

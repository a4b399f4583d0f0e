mod connect_world;
mod setups;
mod steps;

pub use connect_world::ConnectWorld;
